use std::sync::Arc;

use tokio::sync::Semaphore;

use super::batch_validation::BatchValidationPipeline;
use crate::domain::email::ValidationOutcome;
use crate::domain::error::{AppError, Result};
use crate::domain::table::{BatchSummary, EMAIL_COLUMN};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::email_checker::EmailChecker;
use crate::infrastructure::spreadsheet::{ArchivePackager, TableReader, TableWriter};

pub const MISSING_EMAIL_HEADER: &str = "Missing email header in excel";

/// Zip archive ready for download plus the counts behind it.
pub struct UploadResult {
    pub archive: Vec<u8>,
    pub summary: BatchSummary,
}

/// Upload in, archive out: read the table, validate every row, write the
/// valid and invalid workbooks and zip them.
pub struct ValidateUploadUseCase {
    pipeline: BatchValidationPipeline,
    packager: ArchivePackager,
    sheet_name: String,
}

impl ValidateUploadUseCase {
    pub fn new(checker: Arc<dyn EmailChecker>, config: &AppConfig) -> Self {
        Self {
            pipeline: BatchValidationPipeline::new(
                checker,
                config.chunk_size,
                config.worker_limit(),
            ),
            packager: ArchivePackager::new(
                config.valid_entry_name.clone(),
                config.invalid_entry_name.clone(),
            ),
            sheet_name: config.sheet_name.clone(),
        }
    }

    pub fn with_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.pipeline = self.pipeline.with_permits(permits);
        self
    }

    /// Parsing and rendering run on the blocking pool; only the lookups run
    /// on the request's runtime.
    pub async fn execute(&self, bytes: Vec<u8>, file_name: Option<String>) -> Result<UploadResult> {
        let table = run_blocking("parse", move || {
            TableReader::parse(&bytes, file_name.as_deref())
        })
        .await?;

        if !table.has_required_column() {
            return Err(AppError::NotFound(MISSING_EMAIL_HEADER.to_string()));
        }
        let header = table.email_header().unwrap_or(EMAIL_COLUMN).to_string();

        let report = self.pipeline.run(table.rows).await?;
        let summary = report.summary;

        let sheet_name = self.sheet_name.clone();
        let packager = self.packager.clone();
        let archive = run_blocking("render", move || {
            let mut writer = TableWriter::new(header, sheet_name);
            writer.record_report(report);

            let valid = writer.to_artifact(ValidationOutcome::Valid)?;
            let invalid = writer.to_artifact(ValidationOutcome::Invalid)?;
            packager.pack(valid, invalid)
        })
        .await?;

        Ok(UploadResult {
            archive: archive.into_inner(),
            summary,
        })
    }
}

async fn run_blocking<T, F>(stage: &'static str, job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job).await.map_err(|err| {
        tracing::error!(stage, error = %err, "blocking upload task failed");
        AppError::BatchExecution(format!("{} task failed: {}", stage, err))
    })?
}
