use crate::domain::conversation::ConversationKind;
use crate::domain::feed::{ActorRole, FeedEntry};
use crate::services::feed_service::Feed;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct FeedEntryResponse {
    pub conversation_id: Uuid,
    pub kind: ConversationKind,
    pub reference_id: Uuid,
    pub label: String,
    pub role: ActorRole,
    pub unread_count: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    pub last_excerpt: Option<String>,
}

impl From<FeedEntry> for FeedEntryResponse {
    fn from(entry: FeedEntry) -> Self {
        Self {
            conversation_id: entry.conversation_id,
            kind: entry.kind,
            reference_id: entry.reference_id,
            label: entry.label,
            role: entry.role,
            unread_count: entry.unread_count,
            last_message_at: entry.last_message_at,
            last_excerpt: entry.last_excerpt,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub total_unread: i64,
    /// True when a kind query failed and its conversations are missing.
    pub partial: bool,
    pub conversations: Vec<FeedEntryResponse>,
}

impl From<Feed> for FeedResponse {
    fn from(feed: Feed) -> Self {
        Self {
            total_unread: feed.total_unread,
            partial: feed.partial,
            conversations: feed.entries.into_iter().map(FeedEntryResponse::from).collect(),
        }
    }
}
