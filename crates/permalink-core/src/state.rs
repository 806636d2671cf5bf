use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const FILTER_STATE: &str = "filterState";
const KNOWN_FIELDS: &[&str] = &[FILTER_STATE, "hash", "urlParams", "activeTabs"];
const REQUIRED_FIELDS: &[&str] = &[FILTER_STATE];

/// Client-side dashboard state captured by a permalink.
///
/// The declared shape is strict: `filterState` is required, every other
/// top-level field is optional, and unknown top-level fields are rejected.
/// Each filter value must be an object or a scalar; what sits inside an
/// object value is not constrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DashboardPermalinkState {
    pub filter_state: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_params: Option<Vec<(String, String)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tabs: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateValidationError {
    #[error("permalink state must be a JSON object")]
    NotAnObject,
    #[error("missing required field '{0}'")]
    MissingField(String),
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("filter '{0}' must be an object or a scalar value")]
    InvalidFilterValue(String),
    #[error("malformed permalink state: {0}")]
    Malformed(String),
}

impl DashboardPermalinkState {
    /// Checks a raw payload against the declared shape.
    ///
    /// The raw value is left untouched so callers can persist exactly what
    /// was submitted once it has been accepted.
    pub fn validate(raw: &Value) -> Result<Self, StateValidationError> {
        let object = raw.as_object().ok_or(StateValidationError::NotAnObject)?;

        if let Some(unknown) = object
            .keys()
            .find(|k| !KNOWN_FIELDS.contains(&k.as_str()))
        {
            return Err(StateValidationError::UnknownField(unknown.clone()));
        }

        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
            return Err(StateValidationError::MissingField(missing.to_string()));
        }

        let state: Self = serde_json::from_value(raw.clone())
            .map_err(|e| StateValidationError::Malformed(e.to_string()))?;

        if let Some((filter_id, _)) = state.filter_state.iter().find(|(_, v)| v.is_array()) {
            return Err(StateValidationError::InvalidFilterValue(filter_id.clone()));
        }

        Ok(state)
    }
}
