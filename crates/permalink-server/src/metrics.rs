use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

#[derive(Debug, Default, Clone, Copy)]
struct OperationStats {
    count: u64,
    total_micros: u64,
}

#[derive(Debug, Default)]
pub struct Metrics {
    request_total: AtomicU64,
    request_success: AtomicU64,
    request_error: AtomicU64,
    permalinks_created: AtomicU64,
    permalinks_resolved: AtomicU64,
    permalinks_deleted: AtomicU64,
    access_denied: AtomicU64,
    entries_purged: AtomicU64,
    operations: Mutex<BTreeMap<&'static str, OperationStats>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.request_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.request_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.request_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permalink_created(&self) {
        self.permalinks_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permalink_resolved(&self) {
        self.permalinks_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_permalink_deleted(&self) {
        self.permalinks_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_access_denied(&self) {
        self.access_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_entries_purged(&self, count: usize) {
        self.entries_purged
            .fetch_add(u64::try_from(count).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    pub fn record_operation(&self, name: &'static str, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        if let Ok(mut ops) = self.operations.lock() {
            let stats = ops.entry(name).or_default();
            stats.count += 1;
            stats.total_micros = stats.total_micros.saturating_add(micros);
        }
    }

    pub fn request_total(&self) -> u64 {
        self.request_total.load(Ordering::Relaxed)
    }

    pub fn request_success(&self) -> u64 {
        self.request_success.load(Ordering::Relaxed)
    }

    pub fn request_error(&self) -> u64 {
        self.request_error.load(Ordering::Relaxed)
    }

    pub fn permalinks_created(&self) -> u64 {
        self.permalinks_created.load(Ordering::Relaxed)
    }

    pub fn permalinks_resolved(&self) -> u64 {
        self.permalinks_resolved.load(Ordering::Relaxed)
    }

    pub fn permalinks_deleted(&self) -> u64 {
        self.permalinks_deleted.load(Ordering::Relaxed)
    }

    pub fn access_denied(&self) -> u64 {
        self.access_denied.load(Ordering::Relaxed)
    }

    pub fn entries_purged(&self) -> u64 {
        self.entries_purged.load(Ordering::Relaxed)
    }

    pub fn operation_count(&self, name: &str) -> u64 {
        self.operations
            .lock()
            .ok()
            .and_then(|ops| ops.get(name).map(|s| s.count))
            .unwrap_or(0)
    }

    pub fn render_prometheus(&self) -> String {
        let mut output = String::new();
        let counters = [
            (
                "permalink_requests_total",
                "Total number of requests.",
                self.request_total(),
            ),
            (
                "permalink_requests_success_total",
                "Total successful requests.",
                self.request_success(),
            ),
            (
                "permalink_requests_error_total",
                "Total failed requests.",
                self.request_error(),
            ),
            (
                "permalink_created_total",
                "Permalinks created.",
                self.permalinks_created(),
            ),
            (
                "permalink_resolved_total",
                "Permalinks resolved.",
                self.permalinks_resolved(),
            ),
            (
                "permalink_deleted_total",
                "Permalinks deleted.",
                self.permalinks_deleted(),
            ),
            (
                "permalink_access_denied_total",
                "Requests refused by the dashboard access check.",
                self.access_denied(),
            ),
            (
                "permalink_entries_purged_total",
                "Expired entries removed by the retention purge.",
                self.entries_purged(),
            ),
        ];

        for (name, help, value) in counters {
            let _ = writeln!(output, "# HELP {name} {help}");
            let _ = writeln!(output, "# TYPE {name} counter");
            let _ = writeln!(output, "{name} {value}");
        }

        let ops = self
            .operations
            .lock()
            .map(|ops| ops.clone())
            .unwrap_or_default();
        if !ops.is_empty() {
            output.push_str(
                "# HELP permalink_operation_duration_seconds Time spent serving each operation.\n",
            );
            output.push_str("# TYPE permalink_operation_duration_seconds summary\n");
            for (name, stats) in &ops {
                #[allow(clippy::cast_precision_loss)]
                let seconds = stats.total_micros as f64 / 1_000_000.0;
                let _ = writeln!(
                    output,
                    "permalink_operation_duration_seconds_sum{{operation=\"{name}\"}} {seconds}"
                );
                let _ = writeln!(
                    output,
                    "permalink_operation_duration_seconds_count{{operation=\"{name}\"}} {}",
                    stats.count
                );
            }
        }

        output
    }
}

pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics.render_prometheus(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_metrics_are_zero() {
        let m = Metrics::new();
        assert_eq!(m.request_total(), 0);
        assert_eq!(m.request_success(), 0);
        assert_eq!(m.request_error(), 0);
        assert_eq!(m.permalinks_created(), 0);
        assert_eq!(m.access_denied(), 0);
    }

    #[test]
    fn record_increments_counters() {
        let m = Metrics::new();
        m.record_request();
        m.record_request();
        m.record_success();
        m.record_error();
        m.record_permalink_created();
        m.record_entries_purged(3);

        assert_eq!(m.request_total(), 2);
        assert_eq!(m.request_success(), 1);
        assert_eq!(m.request_error(), 1);
        assert_eq!(m.permalinks_created(), 1);
        assert_eq!(m.entries_purged(), 3);
    }

    #[test]
    fn render_prometheus_format() {
        let m = Metrics::new();
        m.record_request();
        m.record_success();
        m.record_access_denied();

        let output = m.render_prometheus();

        assert!(output.contains("# TYPE permalink_requests_total counter"));
        assert!(output.contains("permalink_requests_total 1"));
        assert!(output.contains("permalink_requests_success_total 1"));
        assert!(output.contains("permalink_requests_error_total 0"));
        assert!(output.contains("permalink_access_denied_total 1"));
    }

    #[test]
    fn operation_timings_are_rendered_per_operation() {
        let m = Metrics::new();
        m.record_operation("create_permalink", Duration::from_millis(5));
        m.record_operation("create_permalink", Duration::from_millis(5));
        m.record_operation("resolve_permalink", Duration::from_millis(1));

        assert_eq!(m.operation_count("create_permalink"), 2);
        assert_eq!(m.operation_count("delete_permalink"), 0);

        let output = m.render_prometheus();
        assert!(
            output.contains(
                "permalink_operation_duration_seconds_count{operation=\"create_permalink\"} 2"
            ),
            "missing create count: {output}"
        );
        assert!(output.contains("operation=\"resolve_permalink\""));
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_prometheus_text() {
        let metrics = Arc::new(Metrics::new());
        metrics.record_request();
        metrics.record_request();
        metrics.record_success();

        let app = axum::Router::new()
            .route("/metrics", axum::routing::get(metrics_handler))
            .with_state(metrics);

        let server = axum_test::TestServer::new(app).unwrap();
        let response = server.get("/metrics").await;

        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("permalink_requests_total 2"));
        assert!(body.contains("permalink_requests_success_total 1"));
    }
}
