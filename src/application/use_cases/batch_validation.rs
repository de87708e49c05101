//! Batch validation of uploaded rows.
//!
//! Rows are split positionally into chunks and each chunk is validated by
//! its own task. At most `max_workers` tasks are alive at once: a new chunk
//! is dispatched only when a running one has been joined. A worker also
//! holds a permit from the pipeline's semaphore while it runs, so pipelines
//! sharing one semaphore share one process-wide bound.
//!
//! Workers never touch shared state. Each one returns its local valid and
//! invalid lists, and the coordinator appends them to the run's result sets
//! in one bulk append per worker. Order inside a chunk follows input order;
//! order across chunks follows completion order and is not meaningful.
//!
//! A failing lookup only marks its row invalid. A worker that panics or is
//! cancelled fails the whole run, and the remaining workers are aborted when
//! the task set is dropped. No deadline is applied here; wrap the checker in
//! a `TimeoutChecker` to bound lookup latency.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::chunking::{chunk_rows, Chunk};
use crate::domain::email::{CheckOptions, CheckOutcome, EmailAddress, ValidationOutcome};
use crate::domain::error::{AppError, Result};
use crate::domain::table::{BatchReport, BatchSummary, ClassifiedRow, RowRecord};
use crate::infrastructure::email_checker::EmailChecker;

pub struct BatchValidationPipeline {
    checker: Arc<dyn EmailChecker>,
    options: CheckOptions,
    chunk_size: usize,
    max_workers: usize,
    permits: Arc<Semaphore>,
}

/// What one worker hands back to the coordinator.
#[derive(Debug, Default)]
struct ChunkResult {
    index: usize,
    valid: Vec<ClassifiedRow>,
    invalid: Vec<ClassifiedRow>,
    summary: BatchSummary,
}

impl BatchValidationPipeline {
    pub fn new(checker: Arc<dyn EmailChecker>, chunk_size: usize, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            checker,
            options: CheckOptions::BATCH,
            chunk_size: chunk_size.max(1),
            max_workers,
            permits: Arc::new(Semaphore::new(max_workers)),
        }
    }

    /// Draw worker permits from a semaphore shared with other pipelines.
    pub fn with_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.permits = permits;
        self
    }

    pub async fn run(&self, rows: Vec<RowRecord>) -> Result<BatchReport> {
        let batch_id = Uuid::new_v4();
        let row_count = rows.len();
        let mut pending = chunk_rows(rows, self.chunk_size).into_iter();

        info!(
            %batch_id,
            rows = row_count,
            chunks = pending.len(),
            max_workers = self.max_workers,
            "batch validation started"
        );

        let mut workers = JoinSet::new();
        for chunk in pending.by_ref().take(self.max_workers) {
            self.dispatch(&mut workers, chunk);
        }

        let mut report = BatchReport::default();
        while let Some(joined) = workers.join_next().await {
            // Returning early drops the set, which aborts the other workers.
            let result = joined.map_err(|err| worker_failure(batch_id, err))?;
            merge(&mut report, result);

            if let Some(chunk) = pending.next() {
                self.dispatch(&mut workers, chunk);
            }
        }

        let summary = report.summary;
        if summary.lookup_errors > 0 {
            warn!(
                %batch_id,
                lookup_errors = summary.lookup_errors,
                "some addresses could not be checked and were marked invalid"
            );
        }
        info!(
            %batch_id,
            chunks = summary.chunks,
            valid = summary.valid,
            invalid = summary.invalid(),
            "batch validation finished"
        );

        Ok(report)
    }

    fn dispatch(&self, workers: &mut JoinSet<ChunkResult>, chunk: Chunk) {
        let checker = Arc::clone(&self.checker);
        let permits = Arc::clone(&self.permits);
        let options = self.options;
        workers.spawn(async move {
            // Held until the chunk is done. The semaphore is never closed.
            let _permit = permits.acquire_owned().await.ok();
            validate_chunk(checker.as_ref(), chunk, options).await
        });
    }
}

async fn validate_chunk(
    checker: &dyn EmailChecker,
    chunk: Chunk,
    options: CheckOptions,
) -> ChunkResult {
    let mut result = ChunkResult {
        index: chunk.index,
        ..ChunkResult::default()
    };

    for row in chunk.rows {
        let email = EmailAddress::new(row.email());
        let outcome = CheckOutcome::from(checker.check(&email, options).await);

        if let CheckOutcome::LookupError(reason) = &outcome {
            debug!(row = row.index, email = %email, reason = %reason, "email lookup failed");
        }
        result.summary.count(&outcome);

        let target = match outcome.validation() {
            ValidationOutcome::Valid => &mut result.valid,
            ValidationOutcome::Invalid => &mut result.invalid,
        };
        target.push(ClassifiedRow { row, outcome });
    }

    result
}

/// The only mutation of the shared result sets: one bulk append per worker.
fn merge(report: &mut BatchReport, mut result: ChunkResult) {
    debug!(
        chunk = result.index,
        valid = result.valid.len(),
        invalid = result.invalid.len(),
        "chunk merged"
    );

    report.valid.append(&mut result.valid);
    report.invalid.append(&mut result.invalid);

    let summary = &mut report.summary;
    summary.chunks += 1;
    summary.valid += result.summary.valid;
    summary.invalid_syntax += result.summary.invalid_syntax;
    summary.invalid_domain += result.summary.invalid_domain;
    summary.lookup_errors += result.summary.lookup_errors;
}

fn worker_failure(batch_id: Uuid, err: JoinError) -> AppError {
    let reason = if err.is_panic() {
        "chunk worker panicked"
    } else {
        "chunk worker was cancelled"
    };
    tracing::error!(%batch_id, error = %err, "{}", reason);
    AppError::BatchExecution(format!("{}: {}", reason, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::{CheckResult, Verdict};
    use crate::infrastructure::email_checker::stub::StubChecker;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn rows(emails: &[&str]) -> Vec<RowRecord> {
        emails
            .iter()
            .enumerate()
            .map(|(i, email)| RowRecord::with_email(i, email))
            .collect()
    }

    fn generated(n: usize) -> Vec<RowRecord> {
        (0..n)
            .map(|i| {
                let email = match i % 3 {
                    0 => format!("user{}@example.com", i),
                    1 => format!("broken{}@@example.com", i),
                    _ => format!("no-at-sign-{}", i),
                };
                RowRecord::with_email(i, &email)
            })
            .collect()
    }

    fn indexes(report: &BatchReport, outcome: ValidationOutcome) -> BTreeSet<usize> {
        report.set(outcome).iter().map(|c| c.row.index).collect()
    }

    #[tokio::test]
    async fn test_every_row_lands_in_exactly_one_set() {
        let pipeline = BatchValidationPipeline::new(Arc::new(StubChecker::by_shape()), 200, 4);
        let report = pipeline.run(generated(1000)).await.unwrap();

        let valid = indexes(&report, ValidationOutcome::Valid);
        let invalid = indexes(&report, ValidationOutcome::Invalid);

        assert_eq!(report.valid.len() + report.invalid.len(), 1000);
        assert_eq!(valid.len() + invalid.len(), 1000);
        assert!(valid.is_disjoint(&invalid));
        assert_eq!(report.summary.chunks, 5);
        assert_eq!(report.summary.total(), 1000);
    }

    #[tokio::test]
    async fn test_chunking_does_not_change_classification() {
        let input = generated(601);

        let chunked = BatchValidationPipeline::new(Arc::new(StubChecker::by_shape()), 200, 3)
            .run(input.clone())
            .await
            .unwrap();
        let single = BatchValidationPipeline::new(Arc::new(StubChecker::by_shape()), 10_000, 1)
            .run(input)
            .await
            .unwrap();

        assert_eq!(chunked.summary.chunks, 4);
        assert_eq!(single.summary.chunks, 1);
        for outcome in [ValidationOutcome::Valid, ValidationOutcome::Invalid] {
            assert_eq!(indexes(&chunked, outcome), indexes(&single, outcome));
        }
    }

    #[tokio::test]
    async fn test_classification_is_idempotent() {
        let pipeline = BatchValidationPipeline::new(Arc::new(StubChecker::by_shape()), 200, 2);
        let first = pipeline.run(generated(50)).await.unwrap();
        let second = pipeline.run(generated(50)).await.unwrap();

        assert_eq!(first.summary, second.summary);
        assert_eq!(
            indexes(&first, ValidationOutcome::Valid),
            indexes(&second, ValidationOutcome::Valid)
        );
    }

    #[tokio::test]
    async fn test_empty_input_produces_empty_sets() {
        let checker = Arc::new(StubChecker::always(Verdict::Deliverable));
        let pipeline = BatchValidationPipeline::new(checker.clone(), 200, 2);
        let report = pipeline.run(Vec::new()).await.unwrap();

        assert_eq!(report.valid.len(), 0);
        assert_eq!(report.invalid.len(), 0);
        assert_eq!(report.summary.chunks, 0);
        assert_eq!(checker.calls(), 0);
    }

    #[tokio::test]
    async fn test_checker_error_marks_row_invalid() {
        let pipeline = BatchValidationPipeline::new(Arc::new(StubChecker::by_shape()), 200, 2);
        let report = pipeline
            .run(rows(&["ok@example.com", "bad@@nodomain"]))
            .await
            .unwrap();

        assert_eq!(report.valid.len(), 1);
        assert_eq!(report.invalid.len(), 1);

        let invalid = report.invalid.iter().next().unwrap();
        assert_eq!(invalid.row.email(), "bad@@nodomain");
        assert!(matches!(invalid.outcome, CheckOutcome::LookupError(_)));
        assert_eq!(report.summary.lookup_errors, 1);
    }

    #[tokio::test]
    async fn test_emails_are_lowercased_before_checking() {
        let checker = StubChecker::new(|email| {
            if email == "user@example.com" {
                Ok(Verdict::Deliverable)
            } else {
                Ok(Verdict::BadSyntax)
            }
        });
        let pipeline = BatchValidationPipeline::new(Arc::new(checker), 200, 1);
        let report = pipeline.run(rows(&["USER@Example.COM"])).await.unwrap();

        assert_eq!(report.valid.len(), 1);
        // The row itself keeps the uploaded spelling.
        assert_eq!(report.valid.iter().next().unwrap().row.email(), "USER@Example.COM");
    }

    #[tokio::test]
    async fn test_order_within_chunk_follows_input() {
        let pipeline = BatchValidationPipeline::new(
            Arc::new(StubChecker::always(Verdict::Deliverable)),
            500,
            1,
        );
        let report = pipeline.run(generated(300)).await.unwrap();

        let order: Vec<usize> = report.valid.iter().map(|c| c.row.index).collect();
        assert_eq!(order, (0..300).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_worker_panic_fails_the_run() {
        let checker = StubChecker::new(|email| {
            if email == "boom@example.com" {
                panic!("resolver exploded");
            }
            Ok(Verdict::Deliverable)
        });
        let pipeline = BatchValidationPipeline::new(Arc::new(checker), 2, 2);
        let result = pipeline
            .run(rows(&[
                "a@example.com",
                "b@example.com",
                "boom@example.com",
                "c@example.com",
            ]))
            .await;

        assert!(matches!(result, Err(AppError::BatchExecution(_))));
    }

    struct ConcurrencyGauge {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl EmailChecker for ConcurrencyGauge {
        async fn check(&self, _email: &EmailAddress, _options: CheckOptions) -> CheckResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Verdict::Deliverable)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_count_is_bounded() {
        let gauge = Arc::new(ConcurrencyGauge {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let pipeline = BatchValidationPipeline::new(gauge.clone(), 1, 3);
        let report = pipeline.run(generated(30)).await.unwrap();

        assert_eq!(report.valid.len(), 30);
        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 3, "peak concurrency was {}", peak);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_permits_bound_concurrent_runs() {
        let gauge = Arc::new(ConcurrencyGauge {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let permits = Arc::new(Semaphore::new(2));
        let first = BatchValidationPipeline::new(gauge.clone(), 1, 2).with_permits(permits.clone());
        let second = BatchValidationPipeline::new(gauge.clone(), 1, 2).with_permits(permits);

        let (a, b) = tokio::join!(first.run(generated(20)), second.run(generated(20)));

        assert_eq!(a.unwrap().valid.len(), 20);
        assert_eq!(b.unwrap().valid.len(), 20);
        let peak = gauge.peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 2, "peak concurrency was {}", peak);
    }
}
