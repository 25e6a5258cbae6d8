//! In-memory implementation of [`ActivityRepository`].

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use sentra_core::error::SentraResult;
use sentra_core::models::activity::ActivityEvent;
use sentra_core::repository::ActivityRepository;

#[derive(Default)]
pub struct MemoryActivityRepository {
    events: RwLock<HashMap<Uuid, Vec<ActivityEvent>>>,
}

impl MemoryActivityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActivityRepository for MemoryActivityRepository {
    async fn append(&self, event: ActivityEvent) -> SentraResult<()> {
        self.events
            .write()
            .entry(event.session_id)
            .or_default()
            .push(event);
        Ok(())
    }

    async fn for_session(&self, session_id: Uuid) -> SentraResult<Vec<ActivityEvent>> {
        Ok(self
            .events
            .read()
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }
}
