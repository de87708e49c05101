use std::borrow::Cow;
use std::io::Cursor;

use rust_xlsxwriter::Workbook;

use super::Artifact;
use crate::domain::email::ValidationOutcome;
use crate::domain::error::Result;
use crate::domain::table::{BatchReport, ClassifiedRow, ResultSet};

/// Longest text a worksheet cell accepts.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Collects valid and invalid rows and renders each set as a one-column
/// workbook headed by the email header as it was uploaded.
pub struct TableWriter {
    header: String,
    sheet_name: String,
    valid: ResultSet,
    invalid: ResultSet,
}

impl TableWriter {
    pub fn new(header: impl Into<String>, sheet_name: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            sheet_name: sheet_name.into(),
            valid: ResultSet::default(),
            invalid: ResultSet::default(),
        }
    }

    pub fn record(&mut self, outcome: ValidationOutcome, row: ClassifiedRow) {
        self.set_mut(outcome).push(row);
    }

    pub fn record_report(&mut self, report: BatchReport) {
        let rows = report.valid.into_rows().into_iter().chain(report.invalid.into_rows());
        for row in rows {
            self.record(row.outcome.validation(), row);
        }
    }

    pub fn set(&self, outcome: ValidationOutcome) -> &ResultSet {
        match outcome {
            ValidationOutcome::Valid => &self.valid,
            ValidationOutcome::Invalid => &self.invalid,
        }
    }

    fn set_mut(&mut self, outcome: ValidationOutcome) -> &mut ResultSet {
        match outcome {
            ValidationOutcome::Valid => &mut self.valid,
            ValidationOutcome::Invalid => &mut self.invalid,
        }
    }

    pub fn to_artifact(&self, outcome: ValidationOutcome) -> Result<Artifact> {
        let set = self.set(outcome);
        tracing::debug!(?outcome, rows = set.len(), "rendering result workbook");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&self.sheet_name)?;
        sheet.write_string(0, 0, &self.header)?;

        for (position, classified) in set.iter().enumerate() {
            sheet.write_string(position as u32 + 1, 0, cell_text(classified.row.email()).as_ref())?;
        }

        let mut buffer = Cursor::new(Vec::new());
        workbook.save_to_writer(&mut buffer)?;
        Ok(Artifact::new(buffer))
    }
}

/// Over-long cells are cut to the cell limit so one row cannot fail the file.
fn cell_text(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => Cow::Owned(text[..end].to_string()),
        None => Cow::Borrowed(text),
    }
}
