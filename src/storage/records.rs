use crate::domain::conversation::{ConversationKind, ConversationSummary, Side};
use crate::domain::message::Message;
use crate::error::{AppError, Result};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub(crate) struct MessageRecord {
    pub(crate) id: Uuid,
    pub(crate) seq: i64,
    pub(crate) conversation_id: Uuid,
    pub(crate) sender_id: Uuid,
    pub(crate) sender_side: String,
    pub(crate) content: String,
    pub(crate) is_read: bool,
    pub(crate) created_at: OffsetDateTime,
}

impl MessageRecord {
    pub(crate) fn into_domain(self) -> Result<Message> {
        let sender_side = Side::parse(&self.sender_side).ok_or(AppError::Internal)?;
        Ok(Message {
            id: self.id,
            seq: self.seq,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            sender_side,
            content: self.content,
            is_read: self.is_read,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ConversationRecord {
    pub(crate) id: Uuid,
    pub(crate) kind: String,
    pub(crate) participant_a: Uuid,
    pub(crate) participant_b: Uuid,
    pub(crate) last_message_at: Option<OffsetDateTime>,
    pub(crate) last_excerpt: Option<String>,
    pub(crate) unread_a: i64,
    pub(crate) unread_b: i64,
}

impl ConversationRecord {
    pub(crate) fn into_domain(self) -> Result<ConversationSummary> {
        let kind = ConversationKind::parse(&self.kind).ok_or(AppError::Internal)?;
        Ok(ConversationSummary {
            id: self.id,
            kind,
            participant_a: self.participant_a,
            participant_b: self.participant_b,
            last_message_at: self.last_message_at,
            last_excerpt: self.last_excerpt,
            unread_a: self.unread_a,
            unread_b: self.unread_b,
        })
    }
}

/// Shape shared by the three per-kind feed queries. `reference_id` is the
/// order id, booking id, or peer user id; `store_name` is NULL for direct
/// rows.
#[derive(Debug, FromRow)]
pub(crate) struct FeedRowRecord {
    pub(crate) id: Uuid,
    pub(crate) reference_id: Uuid,
    pub(crate) participant_a: Uuid,
    pub(crate) participant_b: Uuid,
    pub(crate) unread_a: i64,
    pub(crate) unread_b: i64,
    pub(crate) last_message_at: Option<OffsetDateTime>,
    pub(crate) last_excerpt: Option<String>,
    pub(crate) store_name: Option<String>,
    pub(crate) counterparty_name: String,
}
