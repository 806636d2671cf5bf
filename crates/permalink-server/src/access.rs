use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use permalink_core::{DashboardId, InvalidDashboardId, Principal};

use crate::config::AccessConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("principal '{principal}' may not access dashboard {dashboard_id}")]
    Denied {
        principal: String,
        dashboard_id: DashboardId,
    },
    #[error("{0}")]
    Internal(String),
}

/// Decides whether a principal may read a dashboard.
///
/// Consulted on every create and every resolve; implementations must not
/// assume an earlier answer still holds.
pub trait DashboardAccess: Send + Sync {
    fn raise_for_dashboard_access(
        &self,
        principal: &Principal,
        dashboard_id: &DashboardId,
    ) -> impl Future<Output = Result<(), AccessError>> + Send;
}

#[derive(Debug, Default)]
struct Grants {
    admins: HashSet<String>,
    dashboards: HashMap<String, HashSet<DashboardId>>,
}

/// Explicit per-principal grants. Admins see every dashboard.
#[derive(Debug, Default)]
pub struct GrantTable {
    grants: RwLock<Grants>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &AccessConfig) -> Result<Self, InvalidDashboardId> {
        let mut grants = Grants {
            admins: config.admins.iter().cloned().collect(),
            dashboards: HashMap::new(),
        };

        for grant in &config.grants {
            let ids = grant
                .dashboards
                .iter()
                .map(|raw| DashboardId::parse(raw))
                .collect::<Result<HashSet<_>, _>>()?;
            grants
                .dashboards
                .entry(grant.principal.clone())
                .or_default()
                .extend(ids);
        }

        Ok(Self {
            grants: RwLock::new(grants),
        })
    }

    pub fn grant(&self, principal: &str, dashboard_id: DashboardId) -> Result<(), AccessError> {
        self.write()?
            .dashboards
            .entry(principal.to_string())
            .or_default()
            .insert(dashboard_id);
        Ok(())
    }

    /// Returns whether a grant was actually removed.
    pub fn revoke(&self, principal: &str, dashboard_id: &DashboardId) -> Result<bool, AccessError> {
        Ok(self
            .write()?
            .dashboards
            .get_mut(principal)
            .is_some_and(|ids| ids.remove(dashboard_id)))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Grants>, AccessError> {
        self.grants
            .read()
            .map_err(|_| AccessError::Internal("grant table lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Grants>, AccessError> {
        self.grants
            .write()
            .map_err(|_| AccessError::Internal("grant table lock poisoned".to_string()))
    }
}

impl DashboardAccess for GrantTable {
    async fn raise_for_dashboard_access(
        &self,
        principal: &Principal,
        dashboard_id: &DashboardId,
    ) -> Result<(), AccessError> {
        let grants = self.read()?;

        let allowed = principal.admin
            || grants.admins.contains(&principal.name)
            || grants
                .dashboards
                .get(&principal.name)
                .is_some_and(|ids| ids.contains(dashboard_id));

        if allowed {
            Ok(())
        } else {
            Err(AccessError::Denied {
                principal: principal.name.clone(),
                dashboard_id: dashboard_id.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GrantConfig;

    #[tokio::test]
    async fn admin_principal_sees_every_dashboard() {
        let table = GrantTable::new();

        let result = table
            .raise_for_dashboard_access(&Principal::admin("root"), &DashboardId::from(42))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn user_without_grant_is_denied() {
        let table = GrantTable::new();

        let result = table
            .raise_for_dashboard_access(&Principal::user("alice"), &DashboardId::from(42))
            .await;

        assert_eq!(
            result,
            Err(AccessError::Denied {
                principal: "alice".to_string(),
                dashboard_id: DashboardId::from(42),
            })
        );
    }

    #[tokio::test]
    async fn grant_then_revoke() {
        let table = GrantTable::new();
        let alice = Principal::user("alice");
        let dashboard = DashboardId::from(42);

        table.grant("alice", dashboard.clone()).unwrap();
        assert!(
            table
                .raise_for_dashboard_access(&alice, &dashboard)
                .await
                .is_ok()
        );

        assert!(table.revoke("alice", &dashboard).unwrap());
        assert!(
            table
                .raise_for_dashboard_access(&alice, &dashboard)
                .await
                .is_err()
        );
        assert!(!table.revoke("alice", &dashboard).unwrap());
    }

    #[tokio::test]
    async fn grant_is_scoped_to_one_dashboard() {
        let table = GrantTable::new();
        table.grant("alice", DashboardId::from(1)).unwrap();

        let result = table
            .raise_for_dashboard_access(&Principal::user("alice"), &DashboardId::from(2))
            .await;

        assert!(matches!(result, Err(AccessError::Denied { .. })));
    }

    #[tokio::test]
    async fn from_config_loads_admins_and_grants() {
        let config = AccessConfig {
            admins: vec!["ops".to_string()],
            grants: vec![GrantConfig {
                principal: "alice".to_string(),
                dashboards: vec!["42".to_string(), "world_health".to_string()],
            }],
        };

        let table = GrantTable::from_config(&config).unwrap();

        let slug = DashboardId::parse("world_health").unwrap();
        assert!(
            table
                .raise_for_dashboard_access(&Principal::user("alice"), &slug)
                .await
                .is_ok()
        );
        assert!(
            table
                .raise_for_dashboard_access(&Principal::user("ops"), &DashboardId::from(7))
                .await
                .is_ok()
        );
        assert!(
            table
                .raise_for_dashboard_access(&Principal::user("bob"), &slug)
                .await
                .is_err()
        );
    }

    #[test]
    fn from_config_rejects_invalid_dashboard_id() {
        let config = AccessConfig {
            admins: vec![],
            grants: vec![GrantConfig {
                principal: "alice".to_string(),
                dashboards: vec![String::new()],
            }],
        };

        assert!(matches!(
            GrantTable::from_config(&config),
            Err(InvalidDashboardId::Empty)
        ));
    }
}
