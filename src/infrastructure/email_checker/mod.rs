pub mod dns;
pub mod timeout;

use crate::domain::email::{CheckOptions, CheckResult, EmailAddress};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use dns::{DnsEmailChecker, ResolverSettings};
pub use timeout::TimeoutChecker;

/// Syntax plus deliverability check for one address.
///
/// `Ok(Verdict::Deliverable)` is the only answer treated as valid; callers
/// classify everything else, errors included, as invalid.
#[async_trait]
pub trait EmailChecker: Send + Sync {
    async fn check(&self, email: &EmailAddress, options: CheckOptions) -> CheckResult;
}

/// DNS checker, behind a deadline when one is configured.
pub fn build(settings: &ResolverSettings, deadline: Option<Duration>) -> Arc<dyn EmailChecker> {
    let dns = DnsEmailChecker::new(settings);
    match deadline {
        Some(deadline) => Arc::new(TimeoutChecker::new(dns, deadline)),
        None => Arc::new(dns),
    }
}
