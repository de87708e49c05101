use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::use_cases::chunking::DEFAULT_CHUNK_SIZE;
use crate::domain::error::{AppError, Result};

const DEFAULT_CONFIG_FILE: &str = "emailcheck.toml";
const ENV_PREFIX: &str = "EMAILCHECK_";

/// Process-wide settings, loaded once at startup and injected into handlers.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    /// Secret compared against the `x-api-key` header.
    #[validate(length(min = 1, message = "api_key must be set"))]
    pub api_key: String,

    /// When set, requests must also carry `Authorization: Bearer <token>`.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Rows per unit of concurrent work.
    #[validate(range(min = 1))]
    pub chunk_size: usize,

    /// Upper bound on concurrently running chunk workers.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_workers: Option<usize>,

    /// Deadline for a single DNS lookup; 0 disables it.
    pub lookup_timeout_secs: u64,

    #[validate(range(min = 1))]
    pub max_upload_bytes: usize,

    /// Download name of the zip archive.
    #[validate(length(min = 1))]
    pub archive_name: String,
    #[validate(length(min = 1))]
    pub valid_entry_name: String,
    #[validate(length(min = 1))]
    pub invalid_entry_name: String,
    #[validate(length(min = 1, max = 31))]
    pub sheet_name: String,

    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            api_key: String::new(),
            access_token: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_workers: None,
            lookup_timeout_secs: 10,
            max_upload_bytes: 10 * 1024 * 1024,
            archive_name: "BASE DE DATOS BOGOTÁ PARA CORREO.zip".to_string(),
            valid_entry_name: "archivo1.xlsx".to_string(),
            invalid_entry_name: "archivo2.xlsx".to_string(),
            sheet_name: "Hoja1".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `emailcheck.toml` (or `$EMAILCHECK_CONFIG`), then
    /// `EMAILCHECK_*` environment variables. A `.env` file is read first.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let path = std::env::var("EMAILCHECK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::from_figment(
            Figment::from(Serialized::defaults(AppConfig::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract()?;
        config
            .validate()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        Ok(config)
    }

    pub fn lookup_timeout(&self) -> Option<Duration> {
        match self.lookup_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Worker limit, defaulting to four per available core. Lookups are
    /// network bound so the pool is wider than the core count.
    pub fn worker_limit(&self) -> usize {
        self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get() * 4)
                .unwrap_or(4)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figment_with(key: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Serialized::default("api_key", key))
    }

    #[test]
    fn test_defaults_match_original_service() {
        let config = AppConfig::from_figment(figment_with("secret")).unwrap();
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.valid_entry_name, "archivo1.xlsx");
        assert_eq!(config.invalid_entry_name, "archivo2.xlsx");
        assert_eq!(config.sheet_name, "Hoja1");
        assert_eq!(config.lookup_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let result = AppConfig::from_figment(figment_with(""));
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let figment = figment_with("secret").merge(Serialized::default("chunk_size", 0));
        assert!(AppConfig::from_figment(figment).is_err());
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let figment =
            figment_with("secret").merge(Serialized::default("lookup_timeout_secs", 0));
        let config = AppConfig::from_figment(figment).unwrap();
        assert_eq!(config.lookup_timeout(), None);
    }

    #[test]
    fn test_worker_limit_is_positive() {
        let config = AppConfig::from_figment(figment_with("secret")).unwrap();
        assert!(config.worker_limit() >= 1);

        let figment = figment_with("secret").merge(Serialized::default("max_workers", 3));
        let config = AppConfig::from_figment(figment).unwrap();
        assert_eq!(config.worker_limit(), 3);
    }
}
