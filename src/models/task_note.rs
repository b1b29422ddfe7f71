use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard cap on image attachments per note. Bounds storage fan-out per
/// request; not configurable.
pub const MAX_NOTE_IMAGES: usize = 5;

/// An append-only attachment on a task: free text, up to five opaque
/// image references (already uploaded by the file-storage layer), or
/// both. Notes have no update or delete path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNote {
    /// Monotonic insertion sequence, assigned by the store. Notes for a
    /// task are always returned in `seq` order.
    pub seq: i64,
    pub id: Uuid,
    pub task_id: Uuid,
    pub office_id: Option<Uuid>,
    pub content: Option<String>,
    pub image_refs: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}
