// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET,POST,PUT,PATCH,DELETE /api/<plugin>/...`: forwards the request verbatim to the named
//! plugin's `HandleHTTP` RPC, flattening headers last-value-wins.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Response, StatusCode};
use axum::response::IntoResponse;
use pulse_core::PluginName;
use pulse_wire::HttpRequest;
use std::collections::BTreeMap;

pub async fn proxy(
    State(state): State<AppState>,
    Path((plugin, rest)): Path<(String, String)>,
    method: axum::http::Method,
    headers: HeaderMap,
    uri: axum::http::Uri,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let name = PluginName::from(plugin.as_str());
    let mut path = format!("/{rest}");
    if let Some(query) = uri.query() {
        path.push('?');
        path.push_str(query);
    }

    let mut flat_headers = BTreeMap::new();
    for (key, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            // Last-value-wins: a repeated header overwrites its prior
            // entry in this map ("flattened last-value-wins").
            flat_headers.insert(key.to_string(), value.to_string());
        }
    }

    let request = HttpRequest { method: method.to_string(), path, headers: flat_headers, body: body.to_vec() };
    let response = state.plugins.handle_http(&name, request).await.map_err(ApiError::from)?;

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);
    for (key, value) in &response.headers {
        builder = builder.header(key, value);
    }
    builder
        .body(axum::body::Body::from(response.body))
        .map_err(|e| ApiError::from(pulse_core::PulseError::internal(format!("failed to build proxied response: {e}"))))
}
