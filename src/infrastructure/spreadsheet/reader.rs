use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};

use super::build_row;
use crate::domain::error::Result;
use crate::domain::table::Table;
use crate::infrastructure::csv::CsvParser;

/// Turns an uploaded file into a [`Table`].
///
/// Workbooks (xlsx, xlsm, xlsb, xls, ods) go through calamine and only the
/// first worksheet is read. Files named `*.csv` go through the CSV parser.
/// The first row is the header row.
pub struct TableReader;

impl TableReader {
    pub fn parse(bytes: &[u8], file_name: Option<&str>) -> Result<Table> {
        if is_csv(file_name) {
            return CsvParser::parse_bytes_auto_detect(bytes);
        }

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range?,
            None => return Ok(Table::default()),
        };

        Ok(Self::from_range(&range))
    }

    fn from_range(range: &Range<Data>) -> Table {
        let mut rows = range.rows();

        let headers: Vec<String> = match rows.next() {
            Some(row) => row.iter().map(cell_text).collect(),
            None => return Table::default(),
        };

        let rows = rows
            .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
            .enumerate()
            .map(|(index, row)| build_row(index, &headers, row.iter().map(cell_text)))
            .collect();

        Table { headers, rows }
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(text) => text.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn is_csv(file_name: Option<&str>) -> bool {
    file_name
        .map(|name| name.to_lowercase().ends_with(".csv"))
        .unwrap_or(false)
}
