use crate::domain::AuthenticatedUser;
use crate::error::IngestError;
use crate::identity::IdentityPort;
use crate::pipeline::{IngestPipeline, IngestReport};
use axum::{
    extract::{Multipart, Query},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared state for the HTTP surface.
pub struct AppState {
    pub pipeline: IngestPipeline,
    pub identity: Arc<dyn IdentityPort>,
    pub page_size: usize,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "chemdata",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn message(status: StatusCode, text: &str) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(serde_json::json!({ "message": text })))
}

/// Resolve the bearer token to an approved uploader, or reject the request.
async fn require_uploader(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthenticatedUser, (StatusCode, Json<serde_json::Value>)> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| message(StatusCode::UNAUTHORIZED, "Missing bearer token"))?;

    let user = state
        .identity
        .authenticate(token)
        .await
        .ok_or_else(|| message(StatusCode::UNAUTHORIZED, "Invalid token"))?;

    if !user.is_approved {
        return Err(message(
            StatusCode::FORBIDDEN,
            "Your account is not approved yet.",
        ));
    }
    Ok(user)
}

/// Accept one uploaded file and run it through the ingestion pipeline.
async fn upload(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let uploader = match require_uploader(&state, &headers).await {
        Ok(user) => user,
        Err(rejection) => return rejection,
    };

    // Find the "file" part. No part at all and a part with an empty filename
    // are distinct caller mistakes and get distinct messages.
    let mut upload: Option<(String, Vec<u8>)> = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    return message(StatusCode::BAD_REQUEST, "No selected file");
                }
                match field.bytes().await {
                    Ok(bytes) => {
                        upload = Some((filename, bytes.to_vec()));
                        break;
                    }
                    Err(e) => {
                        warn!("failed to read multipart body: {e}");
                        return message(StatusCode::BAD_REQUEST, "Error reading file");
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                warn!("malformed multipart request: {e}");
                return message(StatusCode::BAD_REQUEST, "Error reading file");
            }
        }
    }
    let Some((filename, bytes)) = upload else {
        return message(StatusCode::BAD_REQUEST, "No file part");
    };

    match state.pipeline.ingest(&filename, &bytes, &uploader).await {
        Ok(report) => {
            info!(%filename, uploader = %uploader.username, "upload accepted");
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "message": report_message(&report),
                    "report": report,
                })),
            )
        }
        Err(IngestError::Schema(column)) => message(
            StatusCode::BAD_REQUEST,
            &format!("'{column}' column not found in the uploaded file."),
        ),
        Err(IngestError::Parse(reason)) => {
            message(StatusCode::BAD_REQUEST, &format!("Error reading file: {reason}"))
        }
        Err(e) => {
            warn!("ingestion failed: {e}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
        }
    }
}

fn report_message(report: &IngestReport) -> String {
    if report.created {
        format!("Table created and {} row(s) uploaded!", report.inserted)
    } else if report.duplicates > 0 && report.inserted == 0 {
        format!(
            "{} duplicate row(s) found. These were not inserted.",
            report.duplicates
        )
    } else {
        format!("{} row(s) successfully uploaded!", report.inserted)
    }
}

#[derive(Debug, Deserialize)]
struct PageParams {
    page: Option<usize>,
    per_page: Option<usize>,
}

/// Paged view of the dataset. Pages are 1-based.
async fn show_data(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let per_page = params.per_page.unwrap_or(state.page_size).max(1);
    let page = params.page.unwrap_or(1).max(1);

    match state.pipeline.store().read_all().await {
        Ok(rows) => {
            let total = rows.len();
            let page_rows: Vec<_> = rows
                .into_iter()
                .skip((page - 1).saturating_mul(per_page))
                .take(per_page)
                .collect();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "page": page,
                    "per_page": per_page,
                    "total": total,
                    "data": page_rows,
                })),
            )
        }
        Err(e) => {
            warn!("failed to read dataset: {e}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read dataset")
        }
    }
}

/// Upload audit history.
async fn show_uploads(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline.store().audits().await {
        Ok(audits) => (StatusCode::OK, Json(serde_json::json!({ "uploads": audits }))),
        Err(e) => {
            warn!("failed to read upload history: {e}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read uploads")
        }
    }
}

/// Create the HTTP router with all routes.
pub fn create_server(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/data", get(show_data))
        .route("/uploads", get(show_uploads))
        .layer(Extension(state))
}

/// Bind and serve until shutdown.
pub async fn run_server(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_server(state);
    info!("chemdata server listening on {addr}");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
