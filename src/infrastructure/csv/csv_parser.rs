// ============================================================
// CSV PARSER
// ============================================================
// Parse CSV uploads into a Table, with encoding fallback

use csv::{ReaderBuilder, StringRecord};
use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;

use crate::domain::error::AppError;
use crate::domain::table::Table;
use crate::infrastructure::spreadsheet::build_row;

/// CSV parser with encoding detection
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvParser {
    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse raw upload bytes, sniffing the delimiter from the first lines
    pub fn parse_bytes_auto_detect(bytes: &[u8]) -> Result<Table, AppError> {
        let content = decode(bytes);
        let sample: String = content.lines().take(10).collect::<Vec<_>>().join("\n");
        Self::default()
            .with_delimiter(Self::detect_delimiter(&sample))
            .parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<Table, AppError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let mut records = reader.records();

        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => return Ok(Table::default()),
        };

        let mut rows = Vec::new();
        for (line, result) in records.enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", line + 1, e))
            })?;
            // Rows with every cell empty are skipped, as in workbooks
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(self.parse_row(rows.len(), &headers, &record));
        }

        Ok(Table { headers, rows })
    }

    fn parse_row(
        &self,
        index: usize,
        headers: &[String],
        record: &StringRecord,
    ) -> crate::domain::table::RowRecord {
        build_row(index, headers, record.iter().map(str::to_string))
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        let sample_lines: Vec<_> = content.lines().take(10).collect();
        if sample_lines.is_empty() {
            return best_delimiter;
        }

        for &delimiter in &candidates {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

/// UTF-8 first (BOM stripped), Windows-1252 otherwise
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(content) => Cow::Borrowed(content),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_csv() {
        let content = "Name,Email\nAlice,alice@example.com\nBob,bob@example.com";
        let table = CsvParser::default().parse_content(content).unwrap();

        assert_eq!(table.headers, vec!["Name", "Email"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].email(), "bob@example.com");
        assert_eq!(table.rows[1].index, 1);
        assert_eq!(table.email_header(), Some("Email"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let content = "name,email\nAlice";
        let table = CsvParser::default().parse_content(content).unwrap();
        assert_eq!(table.rows[0].email(), "");
    }

    #[test]
    fn test_empty_content_has_no_header() {
        let table = CsvParser::default().parse_content("").unwrap();
        assert!(table.headers.is_empty());
        assert_eq!(table.email_header(), None);
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let content = "email,name\na@b.com,Ana\n,\n\nc@d.com,Luis";
        let table = CsvParser::default().parse_content(content).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].email(), "c@d.com");
        assert_eq!(table.rows[1].index, 1);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("a,b,c\nd,e,f"), b',');
        assert_eq!(CsvParser::detect_delimiter("a;b;c\nd;e;f"), b';');
    }

    #[test]
    fn test_latin1_fallback() {
        let bytes = b"email;ciudad\nana@example.com;Bogot\xE1";
        let table = CsvParser::parse_bytes_auto_detect(bytes).unwrap();
        assert_eq!(table.rows[0].fields["ciudad"], "Bogotá");
    }

    #[test]
    fn test_bom_is_stripped() {
        let bytes = b"\xEF\xBB\xBFEmail\nx@y.com";
        let table = CsvParser::parse_bytes_auto_detect(bytes).unwrap();
        assert_eq!(table.email_header(), Some("Email"));
    }
}
