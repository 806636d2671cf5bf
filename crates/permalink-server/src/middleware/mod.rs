mod auth;

pub use auth::{AuthState, rest_auth_middleware};
