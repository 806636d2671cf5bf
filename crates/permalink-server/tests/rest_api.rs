use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use permalink_core::{DashboardId, Principal};
use permalink_server::access::{AccessError, DashboardAccess, GrantTable};
use permalink_server::metrics::Metrics;
use permalink_server::middleware::AuthState;
use permalink_server::rest::{AppState, create_router};
use permalink_server::service::{PermalinkService, PermalinkSettings};
use permalink_storage::InMemoryStore;
use serde_json::{Value, json};

const BASE_URL: &str = "https://superset.example.com";

struct Harness {
    server: TestServer,
    store: InMemoryStore,
    grants: Arc<GrantTable>,
}

/// Refuses every dashboard, admins included.
struct DenyAll;

impl DashboardAccess for DenyAll {
    async fn raise_for_dashboard_access(
        &self,
        principal: &Principal,
        dashboard_id: &DashboardId,
    ) -> Result<(), AccessError> {
        Err(AccessError::Denied {
            principal: principal.name.clone(),
            dashboard_id: dashboard_id.clone(),
        })
    }
}

fn server_with<A: DashboardAccess + 'static>(
    store: &InMemoryStore,
    access: Arc<A>,
    principal: Principal,
) -> TestServer {
    let metrics = Arc::new(Metrics::new());
    let service = PermalinkService::new(
        Arc::new(store.clone()),
        access,
        PermalinkSettings {
            base_url: BASE_URL.to_string(),
            ttl: None,
        },
    )
    .with_metrics(Arc::clone(&metrics));

    let app = create_router(
        AppState {
            service: Arc::new(service),
            metrics,
        },
        AuthState::dev_mode(principal),
    );
    TestServer::new(app).unwrap()
}

fn harness_as(principal: Principal) -> Harness {
    let store = InMemoryStore::new();
    let grants = Arc::new(GrantTable::new());
    let server = server_with(&store, Arc::clone(&grants), principal);

    Harness {
        server,
        store,
        grants,
    }
}

fn admin_harness() -> Harness {
    harness_as(Principal::admin("admin"))
}

async fn create(server: &TestServer, dashboard: &str, state: &Value) -> String {
    let response = server
        .post(&format!("/api/v1/dashboard/{dashboard}/permalink"))
        .json(state)
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["key"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_and_resolve_filter_state_with_hash() {
    // 1. Create a permalink for dashboard 42
    let h = admin_harness();
    let state = json!({
        "filterState": {"FILTER_1": "foo"},
        "hash": "my-anchor",
    });

    let response = h
        .server
        .post("/api/v1/dashboard/42/permalink")
        .json(&state)
        .await;

    // 2. Response carries the key and a URL containing it
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let key = body["key"].as_str().unwrap();
    let url = body["url"].as_str().unwrap();
    assert!(url.contains(key), "url {url} should contain key {key}");
    assert_eq!(url, format!("{BASE_URL}/dashboard/p/{key}/"));

    // 3. Resolve returns the dashboard id as a string and the exact state
    let resolved = h
        .server
        .get(&format!("/api/v1/dashboard/permalink/{key}"))
        .await;
    resolved.assert_status_ok();
    resolved.assert_json(&json!({
        "dashboardId": "42",
        "state": state,
    }));
}

#[tokio::test]
async fn nested_filter_value_round_trips_exactly() {
    let h = admin_harness();
    let state = json!({
        "filterState": {
            "NATIVE_FILTER-1": {
                "id": "NATIVE_FILTER-1",
                "extraFormData": {"filters": [{"col": "country_name", "op": "IN", "val": ["France"]}]},
                "filterState": {"label": "France", "value": ["France"]},
                "ownState": {},
            },
        },
        "urlParams": [["standalone", "1"]],
        "activeTabs": ["TAB-abc"],
    });

    let key = create(&h.server, "world_health", &state).await;

    let body: Value = h
        .server
        .get(&format!("/api/v1/dashboard/permalink/{key}"))
        .await
        .json();
    assert_eq!(body["dashboardId"], "world_health");
    assert_eq!(body["state"], state);
}

#[tokio::test]
async fn unknown_top_level_field_is_rejected_and_nothing_stored() {
    let h = admin_harness();

    let response = h
        .server
        .post("/api/v1/dashboard/42/permalink")
        .json(&json!({"filterState": {"FILTER_1": "foo"}, "foo": "bar"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("foo"));
    assert_eq!(h.store.entry_count(), 0);
}

#[tokio::test]
async fn missing_filter_state_is_rejected() {
    let h = admin_harness();

    let response = h
        .server
        .post("/api/v1/dashboard/42/permalink")
        .json(&json!({"hash": "my-anchor"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(h.store.entry_count(), 0);
}

#[tokio::test]
async fn create_without_dashboard_access_is_forbidden() {
    let h = harness_as(Principal::user("alice"));

    let response = h
        .server
        .post("/api/v1/dashboard/42/permalink")
        .json(&json!({"filterState": {}}))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert!(body["error"].is_string());
    assert_eq!(h.store.entry_count(), 0);
}

#[tokio::test]
async fn admin_refused_by_access_check_cannot_create() {
    // 1. The caller is an admin, but the access check refuses everyone
    let store = InMemoryStore::new();
    let server = server_with(&store, Arc::new(DenyAll), Principal::admin("admin"));

    // 2. A valid payload is still refused
    let response = server
        .post("/api/v1/dashboard/42/permalink")
        .json(&json!({"filterState": {"FILTER_1": "foo"}}))
        .await;

    // 3. Nothing was stored
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert!(body["error"].is_string());
    assert_eq!(store.entry_count(), 0);
}

#[tokio::test]
async fn admin_refused_by_access_check_cannot_resolve() {
    // 1. An admin creates a link while access is allowed
    let h = admin_harness();
    let key = create(&h.server, "42", &json!({"filterState": {}})).await;

    // 2. The same store served behind a refusing access check
    let denied = server_with(&h.store, Arc::new(DenyAll), Principal::admin("admin"));

    denied
        .get(&format!("/api/v1/dashboard/permalink/{key}"))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn very_large_integers_round_trip_exactly() {
    let h = admin_harness();
    let raw = r#"{"filterState":{"FILTER_1":123456789012345678901234567890}}"#;

    let response = h
        .server
        .post("/api/v1/dashboard/42/permalink")
        .content_type("application/json")
        .bytes(raw.as_bytes().to_vec().into())
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    let key = body["key"].as_str().unwrap();

    let resolved = h
        .server
        .get(&format!("/api/v1/dashboard/permalink/{key}"))
        .await;
    resolved.assert_status_ok();
    let text = resolved.text();
    assert!(
        text.contains("123456789012345678901234567890"),
        "digits lost in {text}"
    );
}

#[tokio::test]
async fn resolve_is_forbidden_once_access_is_revoked() {
    // 1. Alice may read dashboard 42
    let h = harness_as(Principal::user("alice"));
    let dashboard = DashboardId::from(42);
    h.grants.grant("alice", dashboard.clone()).unwrap();

    // 2. She creates and resolves a permalink
    let key = create(&h.server, "42", &json!({"filterState": {}})).await;
    let path = format!("/api/v1/dashboard/permalink/{key}");
    h.server.get(&path).await.assert_status_ok();

    // 3. Access is withdrawn
    h.grants.revoke("alice", &dashboard).unwrap();

    // 4. The same link is now refused
    h.server.get(&path).await.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_and_malformed_keys_are_not_found() {
    let h = admin_harness();

    h.server
        .get("/api/v1/dashboard/permalink/00000000-0000-4000-8000-000000000000")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    h.server
        .get("/api/v1/dashboard/permalink/definitely-not-a-key")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_permalink_is_not_found() {
    let h = admin_harness();
    let key = create(&h.server, "42", &json!({"filterState": {}})).await;
    let path = format!("/api/v1/dashboard/permalink/{key}");

    h.server
        .delete(&path)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    h.server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    h.server
        .delete(&path)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_admin_delete_is_forbidden() {
    let h = harness_as(Principal::user("alice"));
    h.grants.grant("alice", DashboardId::from(42)).unwrap();
    let key = create(&h.server, "42", &json!({"filterState": {}})).await;

    h.server
        .delete(&format!("/api/v1/dashboard/permalink/{key}"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert_eq!(h.store.entry_count(), 1);
}

#[tokio::test]
async fn repeated_creates_yield_distinct_keys() {
    let h = admin_harness();
    let state = json!({"filterState": {"FILTER_1": "foo"}});

    let first = create(&h.server, "42", &state).await;
    let second = create(&h.server, "42", &state).await;

    assert_ne!(first, second);
    assert_eq!(h.store.entry_count(), 2);
}

#[tokio::test]
async fn healthz_is_open() {
    let h = harness_as(Principal::user("nobody"));

    let response = h.server.get("/healthz").await;

    response.assert_status_ok();
    response.assert_json(&json!({"status": "ok"}));
}
