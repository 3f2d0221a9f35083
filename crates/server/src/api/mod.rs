use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use control_schema::{ApplyError, ApplyReport, ControlCatalog};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::error::ApiError;
use tracing::{error, info, warn};

use crate::app_state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateQuery {
    #[serde(default)]
    report: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateWithReport {
    state: Map<String, Value>,
    report: ApplyReport,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum UpdateResponse {
    State(Map<String, Value>),
    WithReport(UpdateWithReport),
}

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/controls", get(get_controls))
        .route("/api/state", get(get_state).post(update_state))
        .route("/api/reset", post(reset_state))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_controls(State(state): State<Arc<AppState>>) -> Json<ControlCatalog> {
    state.reload_controls().await;
    Json(state.schema.read().await.catalog().clone())
}

async fn get_state(State(state): State<Arc<AppState>>) -> Json<Map<String, Value>> {
    Json(state.state.lock().await.clone())
}

async fn update_state(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UpdateQuery>, QueryRejection>,
    body: Bytes,
) -> ApiResult<UpdateResponse> {
    let Query(query) = query.map_err(|rejection| {
        warn!(%rejection, "rejecting update with a malformed query string");
        api_error(ApiError::validation(rejection.body_text()))
    })?;
    let payload = parse_payload(&body);
    state.reload_controls().await;

    let schema = state.schema.read().await;
    let mut document = state.state.lock().await;
    let report = schema
        .apply_update(&mut document, &payload, &state.store)
        .map_err(|err| persist_failed(&state, err))?;

    info!(
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        "state updated"
    );

    let current = document.clone();
    Ok(Json(if query.report {
        UpdateResponse::WithReport(UpdateWithReport {
            state: current,
            report,
        })
    } else {
        UpdateResponse::State(current)
    }))
}

async fn reset_state(State(state): State<Arc<AppState>>) -> ApiResult<Map<String, Value>> {
    let mut document = state.state.lock().await;
    let fresh = state.store.reset(&state.defaults).map_err(|err| {
        let message = format!("{err:#}");
        error!(path = %state.store.path().display(), error = %message, "failed to reset state");
        api_error(ApiError::persist_failed(&*err))
    })?;
    *document = fresh;
    info!("state reset to defaults");
    Ok(Json(document.clone()))
}

/// Anything other than a JSON object is an empty update.
fn parse_payload(body: &[u8]) -> Map<String, Value> {
    if body.is_empty() {
        return Map::new();
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(payload)) => payload,
        Ok(_) => {
            warn!("update body is not an object; treating it as empty");
            Map::new()
        }
        Err(error) => {
            warn!(%error, "update body is not json; treating it as empty");
            Map::new()
        }
    }
}

fn persist_failed(state: &AppState, err: ApplyError) -> (StatusCode, Json<ApiError>) {
    error!(path = %state.store.path().display(), error = %err, "failed to persist state");
    api_error(ApiError::persist_failed(&err))
}

fn api_error(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status =
        StatusCode::from_u16(error.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
