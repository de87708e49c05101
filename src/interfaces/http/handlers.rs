use actix_multipart::Multipart;
use actix_web::http::header::{
    Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue,
};
use actix_web::{get, post, web, HttpMessage, HttpRequest, HttpResponse};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::auth::Authorized;
use super::{add_log, HttpState};
use crate::domain::email::CheckOptions;
use crate::domain::error::{AppError, Result};

pub const EXCEL_FIELD: &str = "excel";
pub const EXCEL_REQUIRED: &str = "excel file is required";
pub const EMAIL_REQUIRED: &str = "email is required";

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateEmailRequest {
    #[validate(length(min = 1))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateEmailResponse {
    pub results: bool,
}

/// Optional toggles for the single endpoint; both default to on.
#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    pub verify: Option<bool>,
    pub email_protected: Option<bool>,
}

impl CheckQuery {
    fn options(&self) -> CheckOptions {
        CheckOptions {
            verify: self.verify.unwrap_or(true),
            email_protected: self.email_protected.unwrap_or(true),
        }
    }
}

#[post("/validate/email/single/")]
async fn validate_single(
    _auth: Authorized,
    data: web::Data<HttpState>,
    query: web::Query<CheckQuery>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let request = serde_json::from_slice::<ValidateEmailRequest>(&body)
        .ok()
        .filter(|request| request.validate().is_ok())
        .ok_or_else(|| AppError::ValidationError(EMAIL_REQUIRED.to_string()))?;

    let results = data
        .validate_email_use_case
        .execute(&request.email, query.options())
        .await;

    Ok(HttpResponse::Ok().json(ValidateEmailResponse { results }))
}

#[post("/validate/email/")]
async fn validate_batch(
    _auth: Authorized,
    data: web::Data<HttpState>,
    req: HttpRequest,
    payload: Multipart,
) -> Result<HttpResponse> {
    // A request that is not a form at all carries no file.
    if !req.content_type().starts_with("multipart/") {
        return Err(AppError::NotFound(EXCEL_REQUIRED.to_string()));
    }

    let upload = read_upload(payload, data.config.max_upload_bytes)
        .await?
        .ok_or_else(|| AppError::NotFound(EXCEL_REQUIRED.to_string()))?;

    add_log(
        &data.logs,
        "INFO",
        "Batch",
        &format!(
            "Validating upload {} ({} bytes)",
            upload.file_name.as_deref().unwrap_or("<unnamed>"),
            upload.bytes.len()
        ),
    );

    let result = match data
        .validate_upload_use_case
        .execute(upload.bytes, upload.file_name)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            add_log(&data.logs, "ERROR", "Batch", &format!("Validation failed: {}", e));
            return Err(e);
        }
    };

    let summary = result.summary;
    add_log(
        &data.logs,
        if summary.lookup_errors > 0 { "WARN" } else { "INFO" },
        "Batch",
        &format!(
            "Validated {} rows: {} valid, {} invalid ({} lookup errors)",
            summary.total(),
            summary.valid,
            summary.invalid(),
            summary.lookup_errors
        ),
    );

    Ok(HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header(attachment(&data.config.archive_name))
        .insert_header(("x-valid-count", summary.valid.to_string()))
        .insert_header(("x-invalid-count", summary.invalid().to_string()))
        .insert_header(("x-lookup-error-count", summary.lookup_errors.to_string()))
        .body(result.archive))
}

#[get("/logs")]
async fn get_logs(_auth: Authorized, data: web::Data<HttpState>) -> HttpResponse {
    let logs = data
        .logs
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    HttpResponse::Ok().json(&*logs)
}

struct Upload {
    file_name: Option<String>,
    bytes: Vec<u8>,
}

/// Pulls the `excel` field out of the form. Other fields are skipped; a
/// malformed body is rejected.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Option<Upload>> {
    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        if field.name() != Some(EXCEL_FIELD) {
            while field.try_next().await.map_err(multipart_error)?.is_some() {}
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::PayloadTooLarge(limit));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(Some(Upload { file_name, bytes }));
    }

    Ok(None)
}

fn multipart_error(err: actix_multipart::MultipartError) -> AppError {
    AppError::ValidationError(format!("Invalid multipart upload: {}", err))
}

/// `attachment` with an ASCII fallback name and the UTF-8 original.
fn attachment(file_name: &str) -> ContentDisposition {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii() && c != '"' { c } else { '_' })
        .collect();

    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![
            DispositionParam::Filename(fallback),
            DispositionParam::FilenameExt(ExtendedValue {
                charset: Charset::Ext("UTF-8".to_string()),
                language_tag: None,
                value: file_name.as_bytes().to_vec(),
            }),
        ],
    }
}
