//! Configuration types

use crate::VariantStrategy;
use serde::{Deserialize, Serialize};

/// Settings key holding the default inventory location of new families.
pub const DEFAULT_LOCATION_KEY: &str = "cadlink.default_location";

/// Settings key holding the default category of new families.
pub const DEFAULT_CATEGORY_KEY: &str = "cadlink.default_category";

/// Reconciler behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SyncConfig {
    /// How variants missing from the catalog are materialized.
    pub variant_strategy: VariantStrategy,
}

impl SyncConfig {
    pub fn with_variant_strategy(mut self, strategy: VariantStrategy) -> Self {
        self.variant_strategy = strategy;
        self
    }
}
