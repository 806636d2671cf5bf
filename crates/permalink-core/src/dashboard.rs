use std::fmt;

const MAX_DASHBOARD_ID_LEN: usize = 255;

/// Identifier of a dashboard: a numeric id or a slug, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DashboardId(String);

impl DashboardId {
    pub fn parse(raw: &str) -> Result<Self, InvalidDashboardId> {
        if raw.is_empty() {
            return Err(InvalidDashboardId::Empty);
        }
        if raw.len() > MAX_DASHBOARD_ID_LEN {
            return Err(InvalidDashboardId::TooLong {
                len: raw.len(),
                limit: MAX_DASHBOARD_ID_LEN,
            });
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(InvalidDashboardId::InvalidCharacter(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for DashboardId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for DashboardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidDashboardId {
    #[error("dashboard id must not be empty")]
    Empty,
    #[error("dashboard id is {len} bytes, limit is {limit}")]
    TooLong { len: usize, limit: usize },
    #[error("dashboard id contains whitespace or control characters: '{0}'")]
    InvalidCharacter(String),
}

/// The authenticated actor behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    pub name: String,
    pub admin: bool,
}

impl Principal {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            admin: false,
        }
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            admin: true,
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
