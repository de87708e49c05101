use serde::{Deserialize, Serialize};
use std::fmt;

/// An address as handed to the checker. Lower-cased on construction,
/// nothing else is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn new(raw: &str) -> Self {
        Self(raw.to_lowercase())
    }

    /// Text after the last `@`, if any.
    pub fn domain(&self) -> Option<&str> {
        self.0
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|domain| !domain.is_empty())
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOptions {
    /// Resolve the domain in DNS. When false only the syntax is checked.
    pub verify: bool,
    /// Require a published MX record; A/AAAA fallback is not accepted.
    pub email_protected: bool,
}

impl CheckOptions {
    /// Options used for every row of a batch upload.
    pub const BATCH: CheckOptions = CheckOptions {
        verify: true,
        email_protected: true,
    };
}

/// Successful answer from an email checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Deliverable,
    BadSyntax,
    NoMailDomain,
}

/// The checker could not decide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckError {
    Lookup(String),
    Timeout,
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Lookup(reason) => write!(f, "lookup failed: {}", reason),
            CheckError::Timeout => write!(f, "lookup timed out"),
        }
    }
}

impl std::error::Error for CheckError {}

pub type CheckResult = std::result::Result<Verdict, CheckError>;

/// Per-row classification carried through the batch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum CheckOutcome {
    Valid,
    InvalidSyntax,
    InvalidDomain,
    LookupError(String),
}

impl CheckOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, CheckOutcome::Valid)
    }

    pub fn validation(&self) -> ValidationOutcome {
        if self.is_valid() {
            ValidationOutcome::Valid
        } else {
            ValidationOutcome::Invalid
        }
    }
}

impl From<CheckResult> for CheckOutcome {
    fn from(result: CheckResult) -> Self {
        match result {
            Ok(Verdict::Deliverable) => CheckOutcome::Valid,
            Ok(Verdict::BadSyntax) => CheckOutcome::InvalidSyntax,
            Ok(Verdict::NoMailDomain) => CheckOutcome::InvalidDomain,
            Err(err) => CheckOutcome::LookupError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationOutcome {
    Valid,
    Invalid,
}
