//! HTTP endpoint handlers

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::ReferenceRecord;
use crate::output::{self, OutputFormat};
use crate::pipeline::split_references;
use crate::server::AppState;
use crate::utils::request_id;

/// Request body for reference processing
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    /// Free-text references, one per line
    #[serde(default)]
    pub text: String,

    /// OpenRouter API key, forwarded per request and never stored
    #[serde(default)]
    pub api_key: String,
}

/// Base64 payloads of the batch in every export format
#[derive(Debug, Serialize)]
pub struct EncodedData {
    pub json: String,
    pub ris: String,
    pub csv: String,
}

/// Response body for reference processing
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub total: usize,
    pub found: usize,
    pub not_found: usize,
    pub results: Vec<ReferenceRecord>,
    pub encoded_data: EncodedData,
    pub download_id: String,
    pub processing_time: String,
}

/// Process a batch of references: extract, enrich, serialize, store
pub async fn process(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("No text provided"));
    }
    if request.api_key.trim().is_empty() {
        return Err(ApiError::bad_request("No API key provided"));
    }

    let references = split_references(&request.text);
    let outcome = state
        .pipeline
        .process_batch(&references, &request.api_key)
        .await;

    let json = output::to_json(&outcome.records).map_err(ApiError::internal)?;
    let ris = output::to_ris(&outcome.records);
    let csv = output::to_csv(&outcome.records).map_err(ApiError::internal)?;

    let download_id = state
        .artifacts
        .insert(json.clone(), ris.clone(), csv.clone())
        .await;

    let total = outcome.total();
    let found = outcome.found();
    let not_found = outcome.not_found();
    let processing_time = outcome.elapsed_display();

    Ok(Json(ProcessResponse {
        total,
        found,
        not_found,
        results: outcome.records,
        encoded_data: EncodedData {
            json: BASE64.encode(json),
            ris: BASE64.encode(ris),
            csv: BASE64.encode(csv),
        },
        download_id,
        processing_time,
    }))
}

/// Query string for downloads
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Download id returned by the processing endpoint
    #[serde(default)]
    pub id: String,
}

/// Serve a stored batch as a file attachment in the requested format
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(format): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let request_id = request_id("DL");

    if query.id.trim().is_empty() {
        return Err(ApiError::bad_request("No download id provided"));
    }

    let Some(format) = OutputFormat::from_name(&format) else {
        return Err(ApiError::bad_request("Unsupported format"));
    };

    let Some(payload) = state.artifacts.get(&query.id, format).await else {
        warn!("[{}] download miss for id {}", request_id, query.id);
        return Err(ApiError::not_found("Download expired or not found"));
    };

    debug!(
        "[{}] serving {} download, {} bytes",
        request_id,
        format,
        payload.len()
    );

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", format.filename()),
        ),
    ];

    Ok((headers, payload).into_response())
}

/// Liveness endpoint
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Error returned to API clients as `{"error": "..."}` with a paired status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}
