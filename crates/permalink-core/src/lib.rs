pub mod dashboard;
pub mod entry;
pub mod link;
pub mod state;

pub use dashboard::{DashboardId, InvalidDashboardId, Principal};
pub use entry::{EntryKey, KeyParseError, Resource};
pub use link::permalink_url;
pub use state::{DashboardPermalinkState, StateValidationError};
