//! API key guard for the `/api/v1` routes.
//!
//! Handlers take [`Authorized`] as their first argument. Extraction fails
//! with 401 before the handler body runs when the `x-api-key` header does
//! not match the configured secret, or, if an access token is configured,
//! when `Authorization: Bearer <token>` is missing or wrong.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use sha2::{Digest, Sha256};

use super::HttpState;
use crate::domain::error::AppError;

pub const API_KEY_HEADER: &str = "x-api-key";

pub struct Authorized;

impl FromRequest for Authorized {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize(req))
    }
}

fn authorize(req: &HttpRequest) -> Result<Authorized, AppError> {
    let state = req
        .app_data::<web::Data<HttpState>>()
        .ok_or_else(|| AppError::Internal("HTTP state is not configured".to_string()))?;

    let api_key = header_str(req, API_KEY_HEADER);
    if !secrets_match(api_key, &state.config.api_key) {
        tracing::debug!(present = api_key.is_some(), "rejected api key");
        return Err(AppError::Unauthorized);
    }

    if let Some(expected) = &state.config.access_token {
        let token = header_str(req, AUTHORIZATION.as_str())
            .and_then(|value| value.strip_prefix("Bearer "));
        if !secrets_match(token, expected) {
            tracing::debug!(present = token.is_some(), "rejected access token");
            return Err(AppError::Unauthorized);
        }
    }

    Ok(Authorized)
}

fn header_str<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|value| value.to_str().ok())
}

/// Compares digests so timing does not reveal how much of the secret matched.
fn secrets_match(given: Option<&str>, expected: &str) -> bool {
    match given {
        Some(given) => Sha256::digest(given.as_bytes()) == Sha256::digest(expected.as_bytes()),
        None => false,
    }
}
