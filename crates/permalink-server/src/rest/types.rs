use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct CreatePermalinkResponse {
    pub key: String,
    pub url: String,
}

/// `dashboardId` is always rendered as a string, numeric ids included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvePermalinkResponse {
    pub dashboard_id: String,
    pub state: Value,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
