use anyhow::Result;
use shared::domain::{EventDetails, EventId};

/// Persistent store a presentation layer can use to show the last known
/// snapshot before the controller's first fetch completes. The controller
/// never reads or writes it.
pub trait SnapshotCache: Send + Sync {
    fn load(&self, event_id: &EventId) -> Result<Option<EventDetails>>;
    fn store(&self, event_id: &EventId, details: &EventDetails) -> Result<()>;
}
