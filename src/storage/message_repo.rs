use crate::domain::conversation::Side;
use crate::domain::message::Message;
use crate::error::Result;
use crate::storage::records::MessageRecord;
use sqlx::PgConnection;
use uuid::Uuid;

const MESSAGE_COLUMNS: &str =
    "id, seq, conversation_id, sender_id, sender_side, content, is_read, created_at";

#[derive(Clone, Debug)]
pub struct MessageRepository;

impl MessageRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Appends a message to a conversation's log. The database stamps
    /// `created_at` and assigns `seq`.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        sender_id: Uuid,
        sender_side: Side,
        content: &str,
    ) -> Result<Message> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            INSERT INTO messages (conversation_id, sender_id, sender_side, content)
            VALUES ($1, $2, $3, $4)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(conversation_id)
        .bind(sender_id)
        .bind(sender_side.as_str())
        .bind(content)
        .fetch_one(&mut *conn)
        .await?;

        record.into_domain()
    }

    /// All messages of one conversation, oldest first, seq as tie-break.
    pub async fn list_for_conversation(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, seq ASC
            "#
        ))
        .bind(conversation_id)
        .fetch_all(&mut *conn)
        .await?;

        records.into_iter().map(MessageRecord::into_domain).collect()
    }

    /// Flips `is_read` on every counterparty message the reader has not seen
    /// yet. Returns the number of messages flipped; zero on a repeat call.
    pub async fn mark_read(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        reader_side: Side,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_read = TRUE
            WHERE conversation_id = $1 AND sender_side <> $2 AND NOT is_read
            "#,
        )
        .bind(conversation_id)
        .bind(reader_side.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }
}

impl Default for MessageRepository {
    fn default() -> Self {
        Self::new()
    }
}
