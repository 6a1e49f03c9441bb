use crate::config::MessagingConfig;
use crate::domain::conversation::{ConversationRef, ConversationSummary, Side};
use crate::domain::message::Message;
use crate::error::{AppError, Result};
use crate::storage::DbPool;
use crate::storage::conversation_repo::ConversationRepository;
use crate::storage::message_repo::MessageRepository;
use uuid::Uuid;

/// Owns the message log and the conversation summary rows that cache unread
/// counts. Every mutation goes through here so the two stay in lockstep
/// within one transaction.
#[derive(Clone, Debug)]
pub struct MessageService {
    pool: DbPool,
    conversations: ConversationRepository,
    messages: MessageRepository,
    config: MessagingConfig,
}

impl MessageService {
    #[must_use]
    pub fn new(
        pool: DbPool,
        conversations: ConversationRepository,
        messages: MessageRepository,
        config: MessagingConfig,
    ) -> Self {
        Self { pool, conversations, messages, config }
    }

    /// Appends a message and updates the conversation summary in one
    /// transaction: a reader polling right after the commit sees the new
    /// `last_message_at` and the bumped unread count together, or neither.
    ///
    /// # Errors
    /// Returns `AppError::Validation` on empty or oversized content,
    /// `AppError::NotFound` if the reference does not resolve, and
    /// `AppError::Forbidden` if the actor is not a participant.
    #[tracing::instrument(err(level = "warn"), skip(self, content), fields(actor = %actor))]
    pub async fn append(
        &self,
        actor: Uuid,
        conv_ref: &ConversationRef,
        content: &str,
    ) -> Result<Message> {
        validate_content(content, self.config.max_content_chars)?;
        if let ConversationRef::Direct { a, b } = conv_ref {
            if a == b {
                return Err(AppError::Validation("Cannot message yourself".to_string()));
            }
        }

        let mut tx = self.pool.begin().await?;

        let summary = self.conversations.find_or_create(&mut tx, conv_ref).await?;
        let side = summary.side_of(actor).ok_or(AppError::Forbidden)?;

        let message = self.messages.create(&mut tx, summary.id, actor, side, content).await?;
        let excerpt = excerpt_of(content, self.config.excerpt_chars);
        self.conversations
            .record_message(&mut tx, summary.id, side.opposite(), message.created_at, &excerpt)
            .await?;

        tx.commit().await?;

        tracing::debug!(conversation_id = %summary.id, "Message appended");
        Ok(message)
    }

    /// All messages of a conversation, oldest first. No side effects: the
    /// client marks the thread read with a separate explicit call.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` / `AppError::Forbidden` as [`Self::append`].
    #[tracing::instrument(err(level = "warn"), skip(self), fields(actor = %actor))]
    pub async fn list(&self, actor: Uuid, conv_ref: &ConversationRef) -> Result<Vec<Message>> {
        let mut conn = self.pool.acquire().await?;

        let (participant_a, participant_b) =
            self.conversations.resolve_participants(&mut conn, conv_ref).await?;
        if actor != participant_a && actor != participant_b {
            return Err(AppError::Forbidden);
        }

        // No summary row yet means nothing has been sent.
        match self.conversations.find(&mut conn, conv_ref).await? {
            Some(summary) => self.messages.list_for_conversation(&mut conn, summary.id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Marks every counterparty message in the conversation as read and
    /// subtracts exactly that many from the caller's unread counter, in one
    /// transaction. Idempotent: a second call flips nothing and subtracts
    /// nothing.
    ///
    /// Returns (messages flipped, remaining unread count). The remainder is
    /// zero unless an append committed while this call was in flight, in
    /// which case the new message stays counted.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` / `AppError::Forbidden` as [`Self::append`].
    #[tracing::instrument(err(level = "warn"), skip(self), fields(actor = %actor))]
    pub async fn mark_read(&self, actor: Uuid, conv_ref: &ConversationRef) -> Result<(u64, i64)> {
        let mut tx = self.pool.begin().await?;

        let (participant_a, participant_b) =
            self.conversations.resolve_participants(&mut tx, conv_ref).await?;
        let side = if actor == participant_a {
            Side::A
        } else if actor == participant_b {
            Side::B
        } else {
            return Err(AppError::Forbidden);
        };

        let Some(summary) = self.conversations.find(&mut tx, conv_ref).await? else {
            tx.commit().await?;
            return Ok((0, 0));
        };

        let flipped = self.messages.mark_read(&mut tx, summary.id, side).await?;
        let remaining = self
            .conversations
            .consume_unread(
                &mut tx,
                summary.id,
                side,
                i64::try_from(flipped).map_err(|_| AppError::Internal)?,
            )
            .await?;

        tx.commit().await?;

        tracing::debug!(conversation_id = %summary.id, flipped, remaining, "Conversation marked read");
        Ok((flipped, remaining))
    }

    /// Summary row lookup for a reference the actor participates in.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if neither the reference nor a summary
    /// row exists.
    pub async fn summary(&self, actor: Uuid, conv_ref: &ConversationRef) -> Result<ConversationSummary> {
        let mut conn = self.pool.acquire().await?;
        let summary = self.conversations.find(&mut conn, conv_ref).await?.ok_or(AppError::NotFound)?;
        if summary.side_of(actor).is_none() {
            return Err(AppError::Forbidden);
        }
        Ok(summary)
    }
}

fn validate_content(content: &str, max_chars: usize) -> Result<()> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("Message content must not be empty".to_string()));
    }
    let chars = content.chars().count();
    if chars > max_chars {
        return Err(AppError::Validation(format!(
            "Message content exceeds {max_chars} characters"
        )));
    }
    Ok(())
}

/// First `max_chars` characters of the content, safe on multi-byte input.
fn excerpt_of(content: &str, max_chars: usize) -> String {
    content.chars().take(max_chars).collect()
}
