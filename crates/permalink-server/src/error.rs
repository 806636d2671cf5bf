use permalink_core::{InvalidDashboardId, StateValidationError};
use permalink_storage::StorageError;

use crate::access::AccessError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid permalink state: {0}")]
    Validation(#[from] StateValidationError),

    #[error("invalid dashboard id: {0}")]
    InvalidDashboardId(#[from] InvalidDashboardId),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("permalink not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("authorization backend error: {0}")]
    Authorization(String),

    #[error("permalink value encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("permalink expiry is out of range")]
    ExpiryOutOfRange,
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key, .. } => ApiError::NotFound(key.to_string()),
            other => ApiError::Storage(other),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Denied { .. } => ApiError::AccessDenied(err.to_string()),
            AccessError::Internal(msg) => ApiError::Authorization(msg),
        }
    }
}
