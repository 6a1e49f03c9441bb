use crate::domain::conversation::Side;
use time::OffsetDateTime;
use uuid::Uuid;

/// A single chat message. Append-only: after insert only `is_read` ever
/// changes, and only from false to true.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_side: Side,
    pub content: String,
    pub is_read: bool,
    pub created_at: OffsetDateTime,
    /// Insertion order, used as the sort tie-break for equal timestamps.
    pub seq: i64,
}
