//! HTTP surface
//!
//! One generation endpoint plus a health probe. The payload can arrive three
//! ways, checked in priority order: a multipart `file` part, the `data` query
//! parameter, or the raw request body.

use axum::body::to_bytes;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use regprint_core::{DocxRenderer, LopdfPageCounter, Pipeline, SofficeConverter};
use regprint_types::GenerationRequest;
use serde::Deserialize;
use std::sync::Arc;

/// Hard cap on the request payload.
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

pub type AppPipeline = Pipeline<DocxRenderer, SofficeConverter, LopdfPageCounter>;

pub fn router(pipeline: Arc<AppPipeline>) -> Router {
    Router::new()
        .route("/generate-pdf", post(generate_pdf))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES + 1024))
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::compression::CompressionLayer::new())
        .with_state(pipeline)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy"}))
}

#[derive(Debug, Default, Deserialize)]
struct GenerateQuery {
    data: Option<String>,
}

async fn generate_pdf(
    State(pipeline): State<Arc<AppPipeline>>,
    Query(query): Query<GenerateQuery>,
    req: Request,
) -> Result<Response, ApiError> {
    let request_id = new_request_id();
    log::info!("[{request_id}] starting PDF generation");

    let payload = read_payload(query, req, &request_id).await?;
    if payload.is_empty() {
        return Err(ApiError::input(
            StatusCode::BAD_REQUEST,
            "No data provided",
            &request_id,
        ));
    }
    if payload.len() > MAX_BODY_BYTES {
        return Err(ApiError::input(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request too large",
            &request_id,
        ));
    }

    let request = GenerationRequest::from_json_str(&payload).map_err(|e| {
        ApiError::input(
            StatusCode::BAD_REQUEST,
            format!("Invalid JSON data: {e}"),
            &request_id,
        )
    })?;

    let finished = pipeline.generate(&request).await.map_err(|e| {
        log::error!("[{request_id}] generation failed: {e}");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: e.to_string(),
            kind: e.kind(),
            request_id: request_id.clone(),
        }
    })?;

    // Materialise the PDF before the workspace goes away.
    let bytes = match tokio::fs::read(&finished.path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            finished.workspace.destroy();
            log::error!("[{request_id}] cannot read generated PDF: {e}");
            return Err(ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: format!("cannot read generated PDF: {e}"),
                kind: "resource_error",
                request_id,
            });
        }
    };
    finished.workspace.destroy();

    log::info!(
        "[{request_id}] completed: {} pages, {} bytes",
        finished.pages,
        bytes.len()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=application.pdf",
            ),
        ],
        Bytes::from(bytes),
    )
        .into_response())
}

async fn read_payload(
    query: GenerateQuery,
    req: Request,
    request_id: &str,
) -> Result<String, ApiError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let mut multipart = Multipart::from_request(req, &()).await.map_err(|e| {
            ApiError::input(
                StatusCode::BAD_REQUEST,
                format!("invalid multipart request: {e}"),
                request_id,
            )
        })?;
        while let Some(part) = multipart.next_field().await.map_err(|e| {
            ApiError::input(
                StatusCode::BAD_REQUEST,
                format!("invalid multipart request: {e}"),
                request_id,
            )
        })? {
            if part.name() == Some("file") {
                let bytes = part.bytes().await.map_err(|e| {
                    ApiError::input(
                        StatusCode::BAD_REQUEST,
                        format!("invalid multipart request: {e}"),
                        request_id,
                    )
                })?;
                let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    ApiError::input(
                        StatusCode::BAD_REQUEST,
                        "file part is not valid UTF-8",
                        request_id,
                    )
                })?;
                log::info!(
                    "[{request_id}] received data from file upload, {} bytes",
                    text.len()
                );
                return Ok(text);
            }
        }
        if let Some(data) = query.data {
            log::info!(
                "[{request_id}] received data from query parameter, {} bytes",
                data.len()
            );
            return Ok(data);
        }
        // The multipart body is consumed; nothing left to fall back to.
        return Ok(String::new());
    }

    if let Some(data) = query.data {
        log::info!(
            "[{request_id}] received data from query parameter, {} bytes",
            data.len()
        );
        return Ok(data);
    }

    let bytes = to_bytes(req.into_body(), MAX_BODY_BYTES + 1)
        .await
        .map_err(|_| {
            ApiError::input(StatusCode::PAYLOAD_TOO_LARGE, "Request too large", request_id)
        })?;
    let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
        ApiError::input(
            StatusCode::BAD_REQUEST,
            "request body is not valid UTF-8",
            request_id,
        )
    })?;
    log::info!(
        "[{request_id}] received data from request body, {} bytes",
        text.len()
    );
    Ok(text)
}

/// Correlation id logged with every message of one request.
fn new_request_id() -> String {
    format!(
        "pdf_{}_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        std::process::id()
    )
}

/// A request-level failure, rendered as a JSON error body.
pub struct ApiError {
    status: StatusCode,
    detail: String,
    kind: &'static str,
    request_id: String,
}

impl ApiError {
    // Payload problems are Error::Input failures; the variant supplies the
    // kind string so HTTP and pipeline errors share one taxonomy.
    fn input(status: StatusCode, message: impl Into<String>, request_id: &str) -> Self {
        let detail = message.into();
        let kind = regprint_core::Error::Input(detail.clone()).kind();
        Self {
            status,
            detail,
            kind,
            request_id: request_id.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "detail": self.detail,
                "request_id": self.request_id,
                "kind": self.kind,
            })),
        )
            .into_response()
    }
}
