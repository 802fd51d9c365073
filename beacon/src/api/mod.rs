//! HTTP API for the escalation service
//!
//! Thin axum layer over the engine and directory. Callers identify
//! themselves with the `x-subject-id` header; there is no session scheme
//! beyond that, authorization decisions live in the engine.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::directory::StoreDirectory;
use crate::escalation::{AlertHistoryEntry, EngineError, Location, SharedEngine};
use crate::store::{AlertRecord, StoreError, Subject};

/// Header carrying the caller's subject id
pub const SUBJECT_HEADER: &str = "x-subject-id";

/// Shared state for all routes
#[derive(Clone)]
pub struct ApiState {
    pub engine: SharedEngine,
    pub directory: Arc<StoreDirectory>,
}

/// Build the service router
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/alerts/trigger", post(trigger_alert))
        .route("/api/alerts/resolve/:alert_id", post(resolve_alert))
        .route("/api/alerts/history", get(alert_history))
        .route("/api/directory/subjects", post(register_subject))
        .route("/api/directory/contacts", post(add_contact))
        .with_state(state)
}

/// API error with its HTTP mapping
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let status = match &e {
            EngineError::SubjectNotFound(_) | EngineError::AlertNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            EngineError::NotAuthorized { .. } => StatusCode::FORBIDDEN,
            EngineError::Store(_) | EngineError::Cache(_) | EngineError::ScheduleFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            warn!("Request failed: {}", e);
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match &e {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            warn!("Request failed: {}", e);
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Extract the caller's subject id from the request headers
fn caller_id(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(SUBJECT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| ApiError::bad_request(format!("missing {} header", SUBJECT_HEADER)))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct TriggerRequest {
    latitude: f64,
    longitude: f64,
}

async fn trigger_alert(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<TriggerRequest>,
) -> Result<Json<AlertRecord>, ApiError> {
    let caller = caller_id(&headers)?;
    let alert = state
        .engine
        .trigger(
            &caller,
            Location {
                latitude: req.latitude,
                longitude: req.longitude,
            },
        )
        .await?;
    Ok(Json(alert))
}

async fn resolve_alert(
    State(state): State<ApiState>,
    Path(alert_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<AlertRecord>, ApiError> {
    let caller = caller_id(&headers)?;
    let alert = state.engine.resolve(&caller, &alert_id).await?;
    Ok(Json(alert))
}

async fn alert_history(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<AlertHistoryEntry>>, ApiError> {
    let caller = caller_id(&headers)?;
    let history = state.engine.history(&caller)?;
    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
struct RegisterSubjectRequest {
    id: String,
    display_name: String,
    delivery_address: Option<String>,
}

async fn register_subject(
    State(state): State<ApiState>,
    Json(req): Json<RegisterSubjectRequest>,
) -> Result<(StatusCode, Json<Subject>), ApiError> {
    if req.id.is_empty() {
        return Err(ApiError::bad_request("subject id must not be empty"));
    }
    let subject = Subject {
        id: req.id,
        display_name: req.display_name,
        delivery_address: req.delivery_address,
    };
    state.directory.register_subject(&subject)?;
    Ok((StatusCode::CREATED, Json(subject)))
}

#[derive(Debug, Deserialize)]
struct AddContactRequest {
    contact_user_id: String,
}

async fn add_contact(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(req): Json<AddContactRequest>,
) -> Result<StatusCode, ApiError> {
    let caller = caller_id(&headers)?;
    state.directory.add_contact(&caller, &req.contact_user_id)?;
    Ok(StatusCode::CREATED)
}
