// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP error mapping ("User-visible behavior"): every `PulseError` becomes `{ "error":
//! <short>, "category": <kind>, "details": [<string>...] }` at the status code
//! `ErrorKind::http_status` names. Grounded on `rustpress-server::error::HttpError` /
//! `IntoResponse` pattern, narrowed to the one error type this engine actually returns.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pulse_core::PulseError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub category: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Newtype so this crate can implement a foreign trait (`IntoResponse`)
/// on a foreign type (`PulseError`) without an orphan-rule conflict.
pub struct ApiError(pub PulseError);

impl From<PulseError> for ApiError {
    fn from(err: PulseError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(kind = %self.0.kind, message = %self.0.message, "request failed");
        } else {
            tracing::debug!(kind = %self.0.kind, message = %self.0.message, "request rejected");
        }
        let body = ErrorBody { error: self.0.message, category: self.0.kind.to_string(), details: self.0.details };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
