// ============================================================
// SPREADSHEET INFRASTRUCTURE LAYER
// ============================================================
// Reading uploads, writing result workbooks, packaging them for download

mod archive;
mod reader;
mod writer;

pub use archive::ArchivePackager;
pub use reader::TableReader;
pub use writer::TableWriter;

use std::collections::HashMap;
use std::io::{Cursor, Seek};

use crate::domain::error::Result;
use crate::domain::table::RowRecord;

/// Serialized workbook produced once per run.
#[derive(Debug, Default)]
pub struct Artifact {
    buffer: Cursor<Vec<u8>>,
}

impl Artifact {
    pub fn new(buffer: Cursor<Vec<u8>>) -> Self {
        Self { buffer }
    }

    /// Reader positioned at the first byte. Writers leave the cursor at the
    /// end, so reading without this yields nothing.
    pub fn into_reader(mut self) -> Result<Cursor<Vec<u8>>> {
        self.buffer.rewind()?;
        Ok(self.buffer)
    }
}

/// Zip header names with cell values into a row. Blank headers become
/// `unnamed_<n>`; cells beyond the header row are dropped.
pub(crate) fn build_row(
    index: usize,
    headers: &[String],
    values: impl IntoIterator<Item = String>,
) -> RowRecord {
    let mut values = values.into_iter();
    let mut fields = HashMap::with_capacity(headers.len());

    for (position, header) in headers.iter().enumerate() {
        let value = values.next().unwrap_or_default();
        let key = column_key(position, header);
        // First occurrence wins for duplicate headers.
        fields.entry(key).or_insert(value);
    }

    RowRecord::new(index, fields)
}

fn column_key(position: usize, header: &str) -> String {
    if header.is_empty() {
        format!("unnamed_{}", position)
    } else {
        header.to_lowercase()
    }
}
