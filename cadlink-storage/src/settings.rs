//! Tenant-scoped configuration settings.

use cadlink_core::{CadlinkError, CadlinkResult, StorageError, TenantId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Key/value settings lookup with per-tenant overrides.
pub trait SettingsStore: Send + Sync {
    /// Value of `key` for `tenant`. A tenant-specific value wins over the
    /// global one; `Ok(None)` when neither is set.
    fn get(&self, key: &str, tenant: Option<TenantId>) -> CadlinkResult<Option<String>>;
}

/// In-memory [`SettingsStore`].
#[derive(Debug, Default)]
pub struct InMemorySettings {
    values: RwLock<HashMap<(String, Option<TenantId>), String>>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`InMemorySettings::set`].
    pub fn with(
        self,
        key: impl Into<String>,
        tenant: Option<TenantId>,
        value: impl Into<String>,
    ) -> CadlinkResult<Self> {
        self.set(key, tenant, value)?;
        Ok(self)
    }

    /// Store `value` under `key`; `tenant = None` sets the global value.
    pub fn set(
        &self,
        key: impl Into<String>,
        tenant: Option<TenantId>,
        value: impl Into<String>,
    ) -> CadlinkResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| CadlinkError::Storage(StorageError::LockPoisoned))?;
        values.insert((key.into(), tenant), value.into());
        Ok(())
    }
}

impl SettingsStore for InMemorySettings {
    fn get(&self, key: &str, tenant: Option<TenantId>) -> CadlinkResult<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| CadlinkError::Storage(StorageError::LockPoisoned))?;
        let scoped = tenant.and_then(|t| values.get(&(key.to_string(), Some(t))));
        Ok(scoped
            .or_else(|| values.get(&(key.to_string(), None)))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadlink_core::{EntityIdType, DEFAULT_LOCATION_KEY};

    #[test]
    fn test_missing_key_is_none() {
        let settings = InMemorySettings::new();
        assert_eq!(settings.get(DEFAULT_LOCATION_KEY, None).unwrap(), None);
    }

    #[test]
    fn test_tenant_value_overrides_global() {
        let tenant = TenantId::now_v7();
        let other = TenantId::now_v7();
        let settings = InMemorySettings::new()
            .with(DEFAULT_LOCATION_KEY, None, "WH/Stock")
            .unwrap()
            .with(DEFAULT_LOCATION_KEY, Some(tenant), "WH2/Stock")
            .unwrap();

        assert_eq!(
            settings.get(DEFAULT_LOCATION_KEY, Some(tenant)).unwrap().as_deref(),
            Some("WH2/Stock")
        );
        assert_eq!(
            settings.get(DEFAULT_LOCATION_KEY, Some(other)).unwrap().as_deref(),
            Some("WH/Stock")
        );
        assert_eq!(
            settings.get(DEFAULT_LOCATION_KEY, None).unwrap().as_deref(),
            Some("WH/Stock")
        );
    }
}
