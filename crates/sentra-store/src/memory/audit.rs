//! In-memory implementation of [`AuditSink`].
//!
//! Collects events in order; tests assert against the log.

use parking_lot::RwLock;

use sentra_core::error::SentraResult;
use sentra_core::models::audit::{SecurityEvent, SecurityEventType};
use sentra_core::repository::AuditSink;

#[derive(Default)]
pub struct MemoryAuditSink {
    events: RwLock<Vec<SecurityEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.read().clone()
    }

    pub fn count_of(&self, event_type: SecurityEventType) -> usize {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    pub fn has(&self, event_type: SecurityEventType) -> bool {
        self.count_of(event_type) > 0
    }
}

impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: SecurityEvent) -> SentraResult<()> {
        self.events.write().push(event);
        Ok(())
    }
}
