//! Audit capability for component changes.
//!
//! Components do not inherit tracking behaviour; a sink is composed onto the
//! reconciler instead and receives one event per change.

use crate::{ComponentId, TenantId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// What happened to a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    Deactivated,
    Linked,
}

/// One entry of a component's change history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentEvent {
    pub component_id: ComponentId,
    pub tenant_id: Option<TenantId>,
    pub action: AuditAction,
    pub message: String,
    pub at: Timestamp,
}

impl ComponentEvent {
    pub fn new(
        component_id: ComponentId,
        tenant_id: Option<TenantId>,
        action: AuditAction,
        message: impl Into<String>,
    ) -> Self {
        Self {
            component_id,
            tenant_id,
            action,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Receiver of component change events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: ComponentEvent);
}
