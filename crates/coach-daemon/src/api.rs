// api.rs — Router and handlers for `GET/POST {base}/data`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use coach_audit::AuditLog;
use coach_lifecycle::{EventDispatcher, LogSink};
use coach_sync::{DataView, JsonFileOptionStore, OptionStore, PushBody, PushResponse, SyncService};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::auth::{Authenticated, Sessions};
use crate::config::DaemonConfig;

pub type AppState = Arc<DaemonState>;

pub struct DaemonState {
    pub service: SyncService<Box<dyn OptionStore>>,
    pub sessions: Sessions,
}

impl DaemonState {
    pub fn new(service: SyncService<Box<dyn OptionStore>>, sessions: Sessions) -> AppState {
        Arc::new(Self { service, sessions })
    }

    /// Open the file store, audit log and event log named in the config.
    pub fn from_config(config: &DaemonConfig) -> anyhow::Result<AppState> {
        let store: Box<dyn OptionStore> = Box::new(JsonFileOptionStore::new(&config.store.dir)?);
        let audit = AuditLog::open(&config.store.audit_log)?;
        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(LogSink::new(&config.store.events_log)));

        let service = SyncService::new(store)
            .with_audit_log(audit)
            .with_dispatcher(dispatcher);
        let sessions = Sessions::from_accounts(&config.accounts)?;
        if sessions.is_empty() {
            tracing::warn!("no accounts configured; every request will be rejected");
        }
        Ok(Self::new(service, sessions))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "authentication required" })),
            )
                .into_response(),
            ApiError::Internal(detail) => {
                tracing::error!("request failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Build the API router with the routes nested under `base_path`.
pub fn router(state: AppState, base_path: &str) -> Router {
    let api = Router::new()
        .route("/data", get(get_data).post(post_data))
        .with_state(state);

    let base = base_path.trim_end_matches('/');
    let app = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };
    app.layer(CorsLayer::permissive())
}

/// GET {base}/data
async fn get_data(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
) -> Result<Json<DataView>, ApiError> {
    let view = tokio::task::spawn_blocking(move || state.service.load(&caller))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(view))
}

/// POST {base}/data
async fn post_data(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Json(body): Json<PushBody>,
) -> Result<Json<PushResponse>, ApiError> {
    let summary = tokio::task::spawn_blocking(move || state.service.push(&caller, body))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    tracing::debug!(
        collections = summary.reports.len(),
        dropped = summary.dropped_count(),
        "push handled"
    );
    Ok(Json(PushResponse::success()))
}
