//! In-memory component change history.

use cadlink_core::{AuditSink, ComponentEvent, ComponentId};
use std::sync::RwLock;

/// [`AuditSink`] that keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    events: RwLock<Vec<ComponentEvent>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events.
    pub fn events(&self) -> Vec<ComponentEvent> {
        match self.events.read() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Events recorded for one component.
    pub fn events_for(&self, component_id: ComponentId) -> Vec<ComponentEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.component_id == component_id)
            .collect()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn record(&self, event: ComponentEvent) {
        tracing::trace!(
            component_id = %event.component_id,
            action = ?event.action,
            "Recording component event"
        );
        match self.events.write() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadlink_core::{AuditAction, EntityIdType};

    #[test]
    fn test_events_filtered_by_component() {
        let log = InMemoryAuditLog::new();
        let a = ComponentId::now_v7();
        let b = ComponentId::now_v7();

        log.record(ComponentEvent::new(a, None, AuditAction::Created, "created"));
        log.record(ComponentEvent::new(b, None, AuditAction::Created, "created"));
        log.record(ComponentEvent::new(a, None, AuditAction::Updated, "updated"));

        assert_eq!(log.events().len(), 3);
        let history = log.events_for(a);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action, AuditAction::Updated);
    }
}
