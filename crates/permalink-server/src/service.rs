use std::sync::Arc;

use permalink_core::{
    DashboardId, DashboardPermalinkState, EntryKey, Principal, Resource, permalink_url,
};
use permalink_storage::{KeyValueStore, NewEntry};
use serde_json::Value;
use time::OffsetDateTime;

use crate::access::{AccessError, DashboardAccess};
use crate::audit;
use crate::error::ApiError;
use crate::metrics::Metrics;

#[derive(Debug, Clone)]
pub struct PermalinkSettings {
    pub base_url: String,
    pub ttl: Option<time::Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPermalink {
    pub key: EntryKey,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPermalink {
    pub dashboard_id: DashboardId,
    pub state: Value,
}

pub struct PermalinkService<S: KeyValueStore, A: DashboardAccess> {
    store: Arc<S>,
    access: Arc<A>,
    settings: PermalinkSettings,
    metrics: Option<Arc<Metrics>>,
}

impl<S: KeyValueStore, A: DashboardAccess> PermalinkService<S, A> {
    pub fn new(store: Arc<S>, access: Arc<A>, settings: PermalinkSettings) -> Self {
        Self {
            store,
            access,
            settings,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validates `payload`, checks the caller may read `dashboard_id`, then
    /// stores the payload exactly as submitted.
    ///
    /// Nothing is written unless both checks pass.
    pub async fn create_permalink(
        &self,
        dashboard_id: &DashboardId,
        payload: &Value,
        principal: &Principal,
    ) -> Result<CreatedPermalink, ApiError> {
        DashboardPermalinkState::validate(payload)?;

        self.check_access("create_permalink", principal, dashboard_id)
            .await?;

        let expires_at = self
            .settings
            .ttl
            .map(|ttl| {
                OffsetDateTime::now_utc()
                    .checked_add(ttl)
                    .ok_or(ApiError::ExpiryOutOfRange)
            })
            .transpose()?;
        let value = serde_json::to_vec(payload)?;
        let entry = NewEntry::new(Resource::DashboardPermalink, value)
            .with_parent(dashboard_id.as_str())
            .with_creator(principal.name.as_str())
            .expiring_at(expires_at);

        let key = self.store.create(entry).await?;
        let url = permalink_url(&self.settings.base_url, &key);

        tracing::debug!(%key, dashboard_id = %dashboard_id, "stored dashboard permalink");
        audit::audit_permalink_created(&key, dashboard_id, &principal.name);
        if let Some(metrics) = &self.metrics {
            metrics.record_permalink_created();
        }

        Ok(CreatedPermalink { key, url })
    }

    /// Looks up a permalink and re-checks dashboard access on every call.
    ///
    /// A key that does not parse, an entry that is absent or expired, and an
    /// entry without a usable dashboard id are all reported as not found.
    pub async fn resolve_permalink(
        &self,
        raw_key: &str,
        principal: &Principal,
    ) -> Result<ResolvedPermalink, ApiError> {
        let key = parse_key(raw_key)?;
        let entry = self.store.get(Resource::DashboardPermalink, &key).await?;

        let dashboard_id = entry
            .parent_resource_id
            .as_deref()
            .and_then(|raw| DashboardId::parse(raw).ok())
            .ok_or_else(|| {
                tracing::warn!(%key, "permalink entry has no usable dashboard id");
                ApiError::NotFound(key.to_string())
            })?;

        self.check_access("resolve_permalink", principal, &dashboard_id)
            .await?;

        let state: Value = serde_json::from_slice(&entry.value)?;

        audit::audit_permalink_resolved(&key, &dashboard_id, &principal.name);
        if let Some(metrics) = &self.metrics {
            metrics.record_permalink_resolved();
        }

        Ok(ResolvedPermalink {
            dashboard_id,
            state,
        })
    }

    /// Removes a permalink. Restricted to admin principals.
    pub async fn delete_permalink(
        &self,
        raw_key: &str,
        principal: &Principal,
    ) -> Result<(), ApiError> {
        if !principal.admin {
            self.record_denial("delete_permalink", None, principal);
            return Err(ApiError::AccessDenied(format!(
                "principal '{}' may not delete permalinks",
                principal.name
            )));
        }

        let key = parse_key(raw_key)?;
        self.store
            .delete(Resource::DashboardPermalink, &key)
            .await?;

        audit::audit_permalink_deleted(&key, &principal.name);
        if let Some(metrics) = &self.metrics {
            metrics.record_permalink_deleted();
        }

        Ok(())
    }

    async fn check_access(
        &self,
        operation: &str,
        principal: &Principal,
        dashboard_id: &DashboardId,
    ) -> Result<(), ApiError> {
        match self
            .access
            .raise_for_dashboard_access(principal, dashboard_id)
            .await
        {
            Ok(()) => Ok(()),
            Err(err @ AccessError::Denied { .. }) => {
                self.record_denial(operation, Some(dashboard_id), principal);
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn record_denial(
        &self,
        operation: &str,
        dashboard_id: Option<&DashboardId>,
        principal: &Principal,
    ) {
        audit::audit_access_denied(operation, dashboard_id, &principal.name);
        if let Some(metrics) = &self.metrics {
            metrics.record_access_denied();
        }
    }
}

fn parse_key(raw: &str) -> Result<EntryKey, ApiError> {
    EntryKey::parse(raw).map_err(|_| ApiError::NotFound(raw.to_string()))
}
