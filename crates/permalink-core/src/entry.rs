use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey(Uuid);

impl EntryKey {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Fresh random (v4) key. Collision-resistant across concurrent callers.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn parse(raw: &str) -> Result<Self, KeyParseError> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| KeyParseError(raw.to_string()))
    }
}

impl From<Uuid> for EntryKey {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for EntryKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed entry key: '{0}'")]
pub struct KeyParseError(pub String);

/// Namespace an entry lives under. Lookups never cross namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    DashboardPermalink,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::DashboardPermalink => "dashboard_permalink",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
