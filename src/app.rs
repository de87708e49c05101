use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::email_checker::ResolverSettings;
use crate::interfaces::http::{add_log, start_server, LogBuffer};

pub async fn run() -> std::io::Result<()> {
    let config = AppConfig::load();

    let filter = config
        .as_ref()
        .map(|config| config.log_filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .try_init();

    let config = match config {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    let resolver = ResolverSettings::from_system_conf().map_err(|e| {
        tracing::error!("Failed to read resolver configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let logs: LogBuffer = Arc::new(Mutex::new(Vec::new()));
    let server = start_server(config.clone(), resolver, logs.clone())?;

    add_log(
        &logs,
        "INFO",
        "System",
        &format!("Email validation service listening on {}:{}", config.host, config.port),
    );

    server.await
}
