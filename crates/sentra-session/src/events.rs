//! Session state-transition notifications.
//!
//! A plain subscribe/unsubscribe surface for external observers (the
//! audit pipeline, a presentation layer). The engine publishes and
//! moves on; a lagging subscriber drops messages, it never blocks a
//! session operation.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use sentra_core::models::session::SessionState;

#[derive(Debug, Clone)]
pub struct SessionNotification {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub state: SessionState,
    pub at: DateTime<Utc>,
}

pub struct SessionEvents {
    tx: broadcast::Sender<SessionNotification>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotification> {
        self.tx.subscribe()
    }

    pub fn publish(&self, notification: SessionNotification) {
        // No receivers is fine.
        let _ = self.tx.send(notification);
    }
}
