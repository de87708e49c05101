use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use validator::ValidateEmail;

use super::EmailChecker;
use crate::domain::email::{CheckError, CheckOptions, CheckResult, EmailAddress, Verdict};
use crate::domain::error::{AppError, Result};

/// Resolver settings shared by every worker; each worker builds its own
/// resolver on its own runtime.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub config: ResolverConfig,
    pub opts: ResolverOpts,
}

impl ResolverSettings {
    pub fn from_system_conf() -> Result<Self> {
        let (config, opts) = hickory_resolver::system_conf::read_system_conf().map_err(|e| {
            AppError::ConfigError(format!("Failed to read system resolver config: {}", e))
        })?;
        Ok(Self { config, opts })
    }
}

/// Syntax check followed by an MX lookup on the address's domain.
pub struct DnsEmailChecker {
    resolver: TokioAsyncResolver,
}

impl DnsEmailChecker {
    pub fn new(settings: &ResolverSettings) -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(settings.config.clone(), settings.opts.clone()),
        }
    }

    async fn has_address(&self, fqdn: &str) -> CheckResult {
        match self.resolver.lookup_ip(fqdn).await {
            Ok(lookup) if lookup.iter().next().is_some() => Ok(Verdict::Deliverable),
            Ok(_) => Ok(Verdict::NoMailDomain),
            Err(err) if is_missing(&err) => Ok(Verdict::NoMailDomain),
            Err(err) => Err(CheckError::Lookup(err.to_string())),
        }
    }
}

#[async_trait]
impl EmailChecker for DnsEmailChecker {
    async fn check(&self, email: &EmailAddress, options: CheckOptions) -> CheckResult {
        if !email.to_string().validate_email() {
            return Ok(Verdict::BadSyntax);
        }
        if !options.verify {
            return Ok(Verdict::Deliverable);
        }

        let domain = match email.domain() {
            Some(domain) => domain,
            None => return Ok(Verdict::BadSyntax),
        };

        // Domain literals such as user@[10.0.0.1] cannot publish MX records.
        if domain.starts_with('[') {
            return Ok(if options.email_protected {
                Verdict::NoMailDomain
            } else {
                Verdict::Deliverable
            });
        }

        let fqdn = fully_qualified(domain);
        match self.resolver.mx_lookup(fqdn.as_str()).await {
            // A lone "." exchange is a null MX: the domain accepts no mail.
            Ok(lookup) if lookup.iter().any(|mx| !mx.exchange().is_root()) => {
                Ok(Verdict::Deliverable)
            }
            Ok(_) => Ok(Verdict::NoMailDomain),
            Err(err) if is_missing(&err) => {
                if options.email_protected {
                    Ok(Verdict::NoMailDomain)
                } else {
                    self.has_address(&fqdn).await
                }
            }
            Err(err) => {
                tracing::debug!(domain = %domain, error = %err, "mx lookup failed");
                Err(CheckError::Lookup(err.to_string()))
            }
        }
    }
}

/// NXDOMAIN and empty answers both mean the name publishes nothing.
fn is_missing(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

fn fully_qualified(domain: &str) -> String {
    format!("{}.", domain.trim_end_matches('.'))
}
