// ============================================================
// TABLE TYPES
// ============================================================
// Rows read from an uploaded spreadsheet and the result sets built from them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::email::CheckOutcome;
#[cfg(test)]
use super::email::ValidationOutcome;

/// Column every uploaded table must carry, compared after lower-casing.
pub const EMAIL_COLUMN: &str = "email";

/// One data row of the uploaded table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    /// Zero-based position among the data rows (header excluded)
    pub index: usize,

    /// Cell text keyed by lower-cased column name
    pub fields: HashMap<String, String>,
}

impl RowRecord {
    pub fn new(index: usize, fields: HashMap<String, String>) -> Self {
        Self { index, fields }
    }

    /// Convenience constructor for a row holding only an email cell
    #[cfg(test)]
    pub fn with_email(index: usize, email: &str) -> Self {
        let mut fields = HashMap::new();
        fields.insert(EMAIL_COLUMN.to_string(), email.to_string());
        Self { index, fields }
    }

    /// Email cell as supplied. Missing cells read as empty.
    pub fn email(&self) -> &str {
        self.fields
            .get(EMAIL_COLUMN)
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Parsed upload: headers in sheet order plus the data rows
#[derive(Debug, Clone, Default)]
pub struct Table {
    /// Header text as it appeared in the file
    pub headers: Vec<String>,

    pub rows: Vec<RowRecord>,
}

impl Table {
    pub fn has_required_column(&self) -> bool {
        self.email_header().is_some()
    }

    /// Original spelling of the email header, e.g. `Email`
    pub fn email_header(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.to_lowercase() == EMAIL_COLUMN)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRow {
    pub row: RowRecord,
    pub outcome: CheckOutcome,
}

/// Append-only collection of classified rows for one pipeline run.
/// Order across chunks is not meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    rows: Vec<ClassifiedRow>,
}

impl ResultSet {
    pub fn push(&mut self, row: ClassifiedRow) {
        self.rows.push(row);
    }

    /// Bulk append of a worker's local list
    pub fn append(&mut self, rows: &mut Vec<ClassifiedRow>) {
        self.rows.append(rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClassifiedRow> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<ClassifiedRow> {
        self.rows
    }
}

/// Per-kind counters for a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub chunks: usize,
    pub valid: usize,
    pub invalid_syntax: usize,
    pub invalid_domain: usize,
    pub lookup_errors: usize,
}

impl BatchSummary {
    pub fn count(&mut self, outcome: &CheckOutcome) {
        match outcome {
            CheckOutcome::Valid => self.valid += 1,
            CheckOutcome::InvalidSyntax => self.invalid_syntax += 1,
            CheckOutcome::InvalidDomain => self.invalid_domain += 1,
            CheckOutcome::LookupError(_) => self.lookup_errors += 1,
        }
    }

    pub fn invalid(&self) -> usize {
        self.invalid_syntax + self.invalid_domain + self.lookup_errors
    }

    pub fn total(&self) -> usize {
        self.valid + self.invalid()
    }
}

/// Output of one batch run
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub valid: ResultSet,
    pub invalid: ResultSet,
    pub summary: BatchSummary,
}

#[cfg(test)]
impl BatchReport {
    pub fn set(&self, outcome: ValidationOutcome) -> &ResultSet {
        match outcome {
            ValidationOutcome::Valid => &self.valid,
            ValidationOutcome::Invalid => &self.invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str]) -> Table {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    #[test]
    fn test_required_column_is_case_insensitive() {
        assert!(table(&["Name", "EMAIL"]).has_required_column());
        assert_eq!(table(&["Name", "eMail"]).email_header(), Some("eMail"));
    }

    #[test]
    fn test_required_column_must_match_exactly() {
        assert!(!table(&["e-mail", "Email Address"]).has_required_column());
        assert!(!table(&[" email"]).has_required_column());
        assert!(!Table::default().has_required_column());
    }

    #[test]
    fn test_missing_email_cell_reads_empty() {
        let row = RowRecord::new(0, HashMap::new());
        assert_eq!(row.email(), "");
    }

    #[test]
    fn test_summary_counts_each_kind() {
        let mut summary = BatchSummary::default();
        summary.count(&CheckOutcome::Valid);
        summary.count(&CheckOutcome::InvalidSyntax);
        summary.count(&CheckOutcome::LookupError("x".to_string()));

        assert_eq!(summary.valid, 1);
        assert_eq!(summary.invalid(), 2);
        assert_eq!(summary.total(), 3);
    }
}
