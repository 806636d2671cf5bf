use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use permalink_core::{DashboardId, Principal};
use permalink_storage::KeyValueStore;
use serde_json::Value;

use crate::access::DashboardAccess;
use crate::error::ApiError;

use super::AppState;
use super::types::*;

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

fn api_error_to_response(err: ApiError) -> Response {
    let status = match &err {
        ApiError::Validation(_) | ApiError::InvalidDashboardId(_) => StatusCode::BAD_REQUEST,
        ApiError::AccessDenied(_) => StatusCode::FORBIDDEN,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::Storage(_)
        | ApiError::Authorization(_)
        | ApiError::Encoding(_)
        | ApiError::ExpiryOutOfRange => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "permalink request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "permalink request rejected");
    }

    error_response(status, err.to_string())
}

pub async fn create_permalink<S, A>(
    State(state): State<AppState<S, A>>,
    Path(dashboard_id): Path<String>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response
where
    S: KeyValueStore + 'static,
    A: DashboardAccess + 'static,
{
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let dashboard_id = match DashboardId::parse(&dashboard_id) {
        Ok(id) => id,
        Err(e) => return api_error_to_response(e.into()),
    };

    match state
        .service
        .create_permalink(&dashboard_id, &payload, &principal)
        .await
    {
        Ok(created) => (
            StatusCode::CREATED,
            Json(CreatePermalinkResponse {
                key: created.key.to_string(),
                url: created.url,
            }),
        )
            .into_response(),
        Err(e) => api_error_to_response(e),
    }
}

pub async fn resolve_permalink<S, A>(
    State(state): State<AppState<S, A>>,
    Path(key): Path<String>,
    Extension(principal): Extension<Principal>,
) -> Response
where
    S: KeyValueStore + 'static,
    A: DashboardAccess + 'static,
{
    match state.service.resolve_permalink(&key, &principal).await {
        Ok(resolved) => (
            StatusCode::OK,
            Json(ResolvePermalinkResponse {
                dashboard_id: resolved.dashboard_id.to_string(),
                state: resolved.state,
            }),
        )
            .into_response(),
        Err(e) => api_error_to_response(e),
    }
}

pub async fn delete_permalink<S, A>(
    State(state): State<AppState<S, A>>,
    Path(key): Path<String>,
    Extension(principal): Extension<Principal>,
) -> Response
where
    S: KeyValueStore + 'static,
    A: DashboardAccess + 'static,
{
    match state.service.delete_permalink(&key, &principal).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => api_error_to_response(e),
    }
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}
