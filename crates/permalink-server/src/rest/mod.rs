mod handlers;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, MatchedPath, State};
use axum::http::Method;
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use permalink_storage::KeyValueStore;

use crate::access::DashboardAccess;
use crate::metrics::{self, Metrics};
use crate::middleware::{AuthState, rest_auth_middleware};
use crate::service::PermalinkService;

const MAX_REQUEST_BODY_SIZE: usize = 1024 * 1024; // 1 MiB

const CREATE_PATH: &str = "/api/v1/dashboard/{dashboard_id}/permalink";
const PERMALINK_PATH: &str = "/api/v1/dashboard/permalink/{key}";

pub struct AppState<S: KeyValueStore, A: DashboardAccess> {
    pub service: Arc<PermalinkService<S, A>>,
    pub metrics: Arc<Metrics>,
}

impl<S: KeyValueStore, A: DashboardAccess> Clone for AppState<S, A> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

fn operation_name(method: &Method, matched_path: &str) -> Option<&'static str> {
    match (method, matched_path) {
        (&Method::POST, CREATE_PATH) => Some("create_permalink"),
        (&Method::GET, PERMALINK_PATH) => Some("resolve_permalink"),
        (&Method::DELETE, PERMALINK_PATH) => Some("delete_permalink"),
        _ => None,
    }
}

async fn metrics_middleware<S, A>(
    State(state): State<AppState<S, A>>,
    request: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> Response
where
    S: KeyValueStore + 'static,
    A: DashboardAccess + 'static,
{
    // Probes and scrapes are not counted.
    let Some(operation) = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|p| operation_name(request.method(), p.as_str()))
    else {
        return next.run(request).await;
    };

    state.metrics.record_request();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    if response.status().is_success() {
        state.metrics.record_success();
    } else {
        state.metrics.record_error();
    }
    state.metrics.record_operation(operation, start.elapsed());

    response
}

pub fn create_router<S, A>(state: AppState<S, A>, auth: AuthState) -> Router
where
    S: KeyValueStore + 'static,
    A: DashboardAccess + 'static,
{
    Router::new()
        .route(CREATE_PATH, post(handlers::create_permalink))
        .route(
            PERMALINK_PATH,
            get(handlers::resolve_permalink).delete(handlers::delete_permalink),
        )
        .route("/healthz", get(handlers::healthz))
        .route(
            "/metrics",
            get(metrics::metrics_handler).with_state(Arc::clone(&state.metrics)),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
        .layer(middleware::from_fn_with_state(auth, rest_auth_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .with_state(state)
}
