use crate::domain::email::{CheckOptions, CheckOutcome, EmailAddress};
use crate::infrastructure::email_checker::EmailChecker;
use std::sync::Arc;

pub struct ValidateEmailUseCase {
    checker: Arc<dyn EmailChecker>,
}

impl ValidateEmailUseCase {
    pub fn new(checker: Arc<dyn EmailChecker>) -> Self {
        Self { checker }
    }

    /// True only when the checker reports the address deliverable. Lookup
    /// failures answer false.
    pub async fn execute(&self, email: &str, options: CheckOptions) -> bool {
        let email = EmailAddress::new(email);
        let outcome = CheckOutcome::from(self.checker.check(&email, options).await);

        if let CheckOutcome::LookupError(reason) = &outcome {
            tracing::debug!(email = %email, reason = %reason, "single email lookup failed");
        }

        outcome.is_valid()
    }
}
