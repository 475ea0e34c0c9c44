//! Shared application state for Axum routers.

use std::sync::Arc;

use cadlink_core::{DEFAULT_CATEGORY_KEY, DEFAULT_LOCATION_KEY};
use cadlink_storage::{InMemoryCatalog, InMemorySettings};
use cadlink_sync::{BomBuilder, Reconciler};

use crate::config::ApiConfig;
use crate::error::ApiResult;

/// Reconciler over the catalog the server runs against.
pub type CatalogReconciler = Reconciler<InMemoryCatalog>;

/// BOM builder over the catalog the server runs against.
pub type CatalogBomBuilder = BomBuilder<InMemoryCatalog>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<CatalogReconciler>,
    pub bom_builder: Arc<CatalogBomBuilder>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(reconciler: Arc<CatalogReconciler>, bom_builder: Arc<CatalogBomBuilder>) -> Self {
        Self {
            reconciler,
            bom_builder,
            start_time: std::time::Instant::now(),
        }
    }

    /// Fresh in-memory catalog wired according to `config`.
    ///
    /// Configured family defaults are stored as global settings.
    pub fn in_memory(config: &ApiConfig) -> ApiResult<Self> {
        let storage = Arc::new(InMemoryCatalog::new());
        let settings = Arc::new(InMemorySettings::new());
        if let Some(location) = &config.default_location {
            settings.set(DEFAULT_LOCATION_KEY, None, location)?;
        }
        if let Some(category) = &config.default_category {
            settings.set(DEFAULT_CATEGORY_KEY, None, category)?;
        }

        let reconciler =
            Reconciler::new(storage.clone(), settings).with_config(config.sync_config());
        Ok(Self::new(
            Arc::new(reconciler),
            Arc::new(BomBuilder::new(storage)),
        ))
    }
}

crate::impl_from_ref!(Arc<CatalogReconciler>, reconciler);
crate::impl_from_ref!(Arc<CatalogBomBuilder>, bom_builder);
crate::impl_from_ref!(std::time::Instant, start_time);
