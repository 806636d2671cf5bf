use permalink_core::{DashboardId, EntryKey};

pub fn audit_permalink_created(key: &EntryKey, dashboard_id: &DashboardId, principal: &str) {
    tracing::info!(
        target: "audit",
        event = "permalink_created",
        key = %key,
        dashboard_id = %dashboard_id,
        principal = principal,
        "dashboard permalink created"
    );
}

pub fn audit_permalink_resolved(key: &EntryKey, dashboard_id: &DashboardId, principal: &str) {
    tracing::info!(
        target: "audit",
        event = "permalink_resolved",
        key = %key,
        dashboard_id = %dashboard_id,
        principal = principal,
        "dashboard permalink resolved"
    );
}

pub fn audit_permalink_deleted(key: &EntryKey, principal: &str) {
    tracing::info!(
        target: "audit",
        event = "permalink_deleted",
        key = %key,
        principal = principal,
        "dashboard permalink deleted"
    );
}

pub fn audit_access_denied(operation: &str, dashboard_id: Option<&DashboardId>, principal: &str) {
    tracing::warn!(
        target: "audit",
        event = "access_denied",
        operation = operation,
        dashboard_id = dashboard_id.map(DashboardId::as_str).unwrap_or(""),
        principal = principal,
        "dashboard access denied"
    );
}

pub fn audit_auth_success(principal: &str, key_id: &str) {
    tracing::info!(
        target: "audit",
        event = "auth_success",
        principal = principal,
        key_id = key_id,
        "authentication succeeded"
    );
}

pub fn audit_auth_failure(reason: &str, key_id: Option<&str>) {
    tracing::warn!(
        target: "audit",
        event = "auth_failure",
        reason = reason,
        key_id = key_id.unwrap_or("unknown"),
        "authentication failed"
    );
}
