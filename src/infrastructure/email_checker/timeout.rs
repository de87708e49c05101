use std::time::Duration;

use async_trait::async_trait;

use super::EmailChecker;
use crate::domain::email::{CheckError, CheckOptions, CheckResult, EmailAddress};

/// Puts a deadline on every call of the wrapped checker. A lookup that
/// outlives it yields `CheckError::Timeout`.
pub struct TimeoutChecker<C> {
    inner: C,
    deadline: Duration,
}

impl<C: EmailChecker> TimeoutChecker<C> {
    pub fn new(inner: C, deadline: Duration) -> Self {
        Self { inner, deadline }
    }
}

#[async_trait]
impl<C: EmailChecker> EmailChecker for TimeoutChecker<C> {
    async fn check(&self, email: &EmailAddress, options: CheckOptions) -> CheckResult {
        match tokio::time::timeout(self.deadline, self.inner.check(email, options)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(email = %email, "email check timed out");
                Err(CheckError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::email::Verdict;

    struct SlowChecker(Duration);

    #[async_trait]
    impl EmailChecker for SlowChecker {
        async fn check(&self, _email: &EmailAddress, _options: CheckOptions) -> CheckResult {
            tokio::time::sleep(self.0).await;
            Ok(Verdict::Deliverable)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_lookup_times_out() {
        let checker = TimeoutChecker::new(
            SlowChecker(Duration::from_secs(60)),
            Duration::from_secs(5),
        );
        let result = checker
            .check(&EmailAddress::new("a@b.com"), CheckOptions::BATCH)
            .await;
        assert_eq!(result, Err(CheckError::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_lookup_passes_through() {
        let checker = TimeoutChecker::new(
            SlowChecker(Duration::from_millis(10)),
            Duration::from_secs(5),
        );
        let result = checker
            .check(&EmailAddress::new("a@b.com"), CheckOptions::BATCH)
            .await;
        assert_eq!(result, Ok(Verdict::Deliverable));
    }
}
