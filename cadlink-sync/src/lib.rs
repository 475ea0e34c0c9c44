//! CADLINK Sync - Catalog Reconciliation
//!
//! Maps design-tool components onto the product catalog:
//! - Idempotent component upsert keyed on `(external_id, configuration, tenant)`
//! - Attribute, value and variant resolution from CAD configurations
//! - Assembly linking with ancestry checks
//! - Bill of materials construction from external ids

pub mod bom;
pub mod reconciler;

pub use bom::BomBuilder;
pub use reconciler::Reconciler;
