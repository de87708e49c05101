pub mod auth;
pub mod error;
pub mod handlers;

use crate::application::{ValidateEmailUseCase, ValidateUploadUseCase};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::email_checker::{self, EmailChecker, ResolverSettings};
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{dev::Server, get, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub type LogBuffer = Arc<Mutex<Vec<LogEntry>>>;

pub struct HttpState {
    pub config: Arc<AppConfig>,
    pub validate_email_use_case: ValidateEmailUseCase,
    pub validate_upload_use_case: ValidateUploadUseCase,
    pub logs: LogBuffer,
}

impl HttpState {
    /// `permits` bounds chunk workers across every worker's uploads.
    pub fn new(
        config: Arc<AppConfig>,
        checker: Arc<dyn EmailChecker>,
        permits: Arc<Semaphore>,
        logs: LogBuffer,
    ) -> Self {
        Self {
            validate_email_use_case: ValidateEmailUseCase::new(checker.clone()),
            validate_upload_use_case: ValidateUploadUseCase::new(checker, &config)
                .with_permits(permits),
            config,
            logs,
        }
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Registers every route. Shared by the server and the handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(
        web::scope("/api/v1")
            .service(handlers::validate_batch)
            .service(handlers::validate_single)
            .service(handlers::get_logs),
    );
}

pub fn add_log_entry(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) -> LogEntry {
    match level {
        "ERROR" => tracing::error!(source, "{}", message),
        "WARN" => tracing::warn!(source, "{}", message),
        "DEBUG" => tracing::debug!(source, "{}", message),
        _ => tracing::info!(source, "{}", message),
    }

    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

pub fn start_server(
    config: Arc<AppConfig>,
    resolver: ResolverSettings,
    logs: LogBuffer,
) -> std::io::Result<Server> {
    let bind = (config.host.clone(), config.port);
    let payload_limit = config.max_upload_bytes;
    let permits = Arc::new(Semaphore::new(config.worker_limit()));

    let server = HttpServer::new(move || {
        // Each worker owns its resolver, bound to that worker's runtime.
        let checker = email_checker::build(&resolver, config.lookup_timeout());
        let state = web::Data::new(HttpState::new(
            config.clone(),
            checker,
            permits.clone(),
            logs.clone(),
        ));
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state)
            .app_data(web::PayloadConfig::new(payload_limit))
            .configure(configure)
    })
    .bind(bind)?
    .run();

    Ok(server)
}
