use axum::{extract::State, http::StatusCode, response::Json};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::model::StoreInfo;
use crate::store::RecordStore;

pub type AppState = Arc<ApiContext>;

/// Characters escaped when an id is written as a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Shared by every request: the store handle plus what is needed to render links
pub struct ApiContext {
    pub store: Arc<dyn RecordStore>,
    pub base_url: String,
    pub max_results: i64,
}

impl ApiContext {
    pub fn new(store: Arc<dyn RecordStore>, config: &AppConfig) -> Self {
        Self {
            store,
            base_url: config.base_url(),
            max_results: config.api.max_results,
        }
    }

    pub fn payment_url(&self, id: &str) -> String {
        format!(
            "{}/payments/{}",
            self.base_url,
            utf8_percent_encode(id, PATH_SEGMENT)
        )
    }

    pub fn payments_url(&self, from: i64, to: i64) -> String {
        format!("{}/payments?from={}&to={}", self.base_url, from, to)
    }
}

/// Error bodies are always empty; the cause only goes to the log.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Log `err` once and turn it into the response for `status`
pub fn api_error(status: StatusCode, err: impl std::fmt::Display) -> ApiError {
    if status.is_server_error() {
        log::error!("{}: {}", status, err);
    } else {
        log::info!("{}: {}", status, err);
    }

    (status, Json(ErrorResponse {}))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health_check(State(ctx): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match ctx.store.check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "up".to_string(),
            }),
        ),
        Err(e) => {
            log::warn!("Store check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "down".to_string(),
                }),
            )
        }
    }
}

/// GET /admin/repo
pub async fn get_repo_info(State(ctx): State<AppState>) -> Result<Json<StoreInfo>, ApiError> {
    ctx.store
        .info()
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
}

/// DELETE /admin/repo
/// Purges every record, bypassing version checks
pub async fn delete_repo(State(ctx): State<AppState>) -> Result<StatusCode, ApiError> {
    ctx.store
        .delete_all()
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    log::warn!("Purged all records from {}", ctx.store.description());
    Ok(StatusCode::NO_CONTENT)
}
