use crate::domain::conversation::ConversationKind;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// The role the requesting actor plays in one feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Owner,
    Customer,
    Peer,
}

/// One row of the merged conversation feed, projected for a single actor.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub conversation_id: Uuid,
    pub kind: ConversationKind,
    /// The order id, booking id, or peer user id this conversation hangs off.
    pub reference_id: Uuid,
    /// Display label: counterparty name for owners and peers, store name for
    /// customers.
    pub label: String,
    pub role: ActorRole,
    pub unread_count: i64,
    pub last_message_at: Option<OffsetDateTime>,
    pub last_excerpt: Option<String>,
}

/// Sorts a feed in place: most unread first, then most recent activity,
/// then conversation id so repeated calls with no new messages return the
/// same order.
pub fn sort_feed(entries: &mut [FeedEntry]) {
    entries.sort_by(|x, y| {
        y.unread_count
            .cmp(&x.unread_count)
            .then_with(|| y.last_message_at.cmp(&x.last_message_at))
            .then_with(|| x.conversation_id.cmp(&y.conversation_id))
    });
}

#[must_use]
pub fn total_unread(entries: &[FeedEntry]) -> i64 {
    entries.iter().map(|e| e.unread_count).sum()
}
