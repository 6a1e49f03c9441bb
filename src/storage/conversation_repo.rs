use crate::domain::conversation::{ConversationKind, ConversationRef, ConversationSummary, Side};
use crate::error::{AppError, Result};
use crate::storage::records::{ConversationRecord, FeedRowRecord};
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

const SUMMARY_COLUMNS: &str =
    "id, kind, participant_a, participant_b, last_message_at, last_excerpt, unread_a, unread_b";

#[derive(Clone, Debug, Default)]
pub struct ConversationRepository;

impl ConversationRepository {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves a conversation reference to its (side A, side B) participant
    /// pair without touching the conversations table.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the referenced order, booking, or
    /// user does not exist.
    pub async fn resolve_participants(
        &self,
        conn: &mut PgConnection,
        conv_ref: &ConversationRef,
    ) -> Result<(Uuid, Uuid)> {
        match conv_ref {
            ConversationRef::Order(order_id) => sqlx::query_as::<_, (Uuid, Uuid)>(
                r#"
                SELECT s.owner_id, o.customer_id
                FROM orders o
                JOIN stores s ON s.id = o.store_id
                WHERE o.id = $1
                "#,
            )
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(AppError::NotFound),
            ConversationRef::Booking(booking_id) => sqlx::query_as::<_, (Uuid, Uuid)>(
                r#"
                SELECT s.owner_id, b.customer_id
                FROM bookings b
                JOIN stores s ON s.id = b.store_id
                WHERE b.id = $1
                "#,
            )
            .bind(booking_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(AppError::NotFound),
            ConversationRef::Direct { a, b } => {
                let (known,) =
                    sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users WHERE id = $1 OR id = $2")
                        .bind(a)
                        .bind(b)
                        .fetch_one(&mut *conn)
                        .await?;
                if known != 2 {
                    return Err(AppError::NotFound);
                }
                Ok((*a, *b))
            }
        }
    }

    /// Looks up the summary row for a reference, if one exists yet. Summary
    /// rows are created lazily on first message, so a valid reference may
    /// have none.
    pub async fn find(
        &self,
        conn: &mut PgConnection,
        conv_ref: &ConversationRef,
    ) -> Result<Option<ConversationSummary>> {
        let record = match conv_ref {
            ConversationRef::Order(order_id) => {
                sqlx::query_as::<_, ConversationRecord>(&format!(
                    "SELECT {SUMMARY_COLUMNS} FROM conversations WHERE order_id = $1"
                ))
                .bind(order_id)
                .fetch_optional(&mut *conn)
                .await?
            }
            ConversationRef::Booking(booking_id) => {
                sqlx::query_as::<_, ConversationRecord>(&format!(
                    "SELECT {SUMMARY_COLUMNS} FROM conversations WHERE booking_id = $1"
                ))
                .bind(booking_id)
                .fetch_optional(&mut *conn)
                .await?
            }
            ConversationRef::Direct { .. } => {
                let direct_key = conv_ref.direct_key().ok_or(AppError::Internal)?;
                sqlx::query_as::<_, ConversationRecord>(&format!(
                    "SELECT {SUMMARY_COLUMNS} FROM conversations WHERE direct_key = $1"
                ))
                .bind(direct_key)
                .fetch_optional(&mut *conn)
                .await?
            }
        };

        record.map(ConversationRecord::into_domain).transpose()
    }

    /// Returns the summary row for a reference, creating it if this is the
    /// first message in the conversation. The upsert makes racing first
    /// messages converge on the same row.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the reference does not resolve.
    pub async fn find_or_create(
        &self,
        conn: &mut PgConnection,
        conv_ref: &ConversationRef,
    ) -> Result<ConversationSummary> {
        let (participant_a, participant_b) = self.resolve_participants(conn, conv_ref).await?;

        let (ref_column, ref_value, direct_key) = match conv_ref {
            ConversationRef::Order(id) => ("order_id", Some(*id), None),
            ConversationRef::Booking(id) => ("booking_id", Some(*id), None),
            ConversationRef::Direct { .. } => ("direct_key", None, conv_ref.direct_key()),
        };

        let query = format!(
            r#"
            INSERT INTO conversations (kind, {ref_column}, participant_a, participant_b)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ({ref_column}) DO UPDATE SET {ref_column} = EXCLUDED.{ref_column}
            RETURNING {SUMMARY_COLUMNS}
            "#
        );

        let record = match (ref_value, direct_key) {
            (Some(id), _) => {
                sqlx::query_as::<_, ConversationRecord>(&query)
                    .bind(conv_ref.kind().as_str())
                    .bind(id)
                    .bind(participant_a)
                    .bind(participant_b)
                    .fetch_one(&mut *conn)
                    .await?
            }
            (None, Some(key)) => {
                sqlx::query_as::<_, ConversationRecord>(&query)
                    .bind(conv_ref.kind().as_str())
                    .bind(key)
                    .bind(participant_a)
                    .bind(participant_b)
                    .fetch_one(&mut *conn)
                    .await?
            }
            (None, None) => return Err(AppError::Internal),
        };

        record.into_domain()
    }

    /// Folds a freshly appended message into the summary row. The unread
    /// increment happens SQL-side so concurrent appends never lose updates,
    /// and `last_message_at` only moves forward.
    pub async fn record_message(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        recipient_side: Side,
        at: OffsetDateTime,
        excerpt: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE conversations SET
                last_message_at = GREATEST(COALESCE(last_message_at, $2), $2),
                last_excerpt = $3,
                unread_a = unread_a + CASE WHEN $4 = 'a' THEN 1 ELSE 0 END,
                unread_b = unread_b + CASE WHEN $4 = 'b' THEN 1 ELSE 0 END
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(at)
        .bind(excerpt)
        .bind(recipient_side.as_str())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Subtracts the messages a reader just flipped from their unread
    /// counter, clamped at zero, and returns what remains. The counter is
    /// decremented rather than zeroed: an append committing between the
    /// message flip and this update leaves its increment intact, so the
    /// counter never reads zero while an unread message exists.
    pub async fn consume_unread(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        reader_side: Side,
        flipped: i64,
    ) -> Result<i64> {
        let (remaining,) = sqlx::query_as::<_, (i64,)>(
            r#"
            UPDATE conversations SET
                unread_a = CASE WHEN $2 = 'a' THEN GREATEST(unread_a - $3, 0) ELSE unread_a END,
                unread_b = CASE WHEN $2 = 'b' THEN GREATEST(unread_b - $3, 0) ELSE unread_b END
            WHERE id = $1
            RETURNING CASE WHEN $2 = 'a' THEN unread_a ELSE unread_b END
            "#,
        )
        .bind(conversation_id)
        .bind(reader_side.as_str())
        .bind(flipped)
        .fetch_one(&mut *conn)
        .await?;

        Ok(remaining)
    }

    /// Fetches one summary row by id.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if no such conversation exists.
    pub async fn get(&self, conn: &mut PgConnection, id: Uuid) -> Result<ConversationSummary> {
        let record = sqlx::query_as::<_, ConversationRecord>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::NotFound)?;

        record.into_domain()
    }

    /// Live unread count straight from the message log. The summary row is a
    /// cache of this value; tests compare the two.
    pub async fn live_unread(
        &self,
        conn: &mut PgConnection,
        conversation_id: Uuid,
        side: Side,
    ) -> Result<i64> {
        let (count,) = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = $1 AND sender_side <> $2 AND NOT is_read
            "#,
        )
        .bind(conversation_id)
        .bind(side.as_str())
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Conversations of one kind the actor participates in, with display
    /// labels joined in. `reference_id` is the order id, booking id, or peer
    /// user id depending on the kind.
    pub(crate) async fn list_rows_for_kind(
        &self,
        conn: &mut PgConnection,
        actor: Uuid,
        kind: ConversationKind,
    ) -> Result<Vec<FeedRowRecord>> {
        let query = match kind {
            ConversationKind::Order => {
                r#"
                SELECT c.id, o.id AS reference_id, c.participant_a, c.participant_b,
                       c.unread_a, c.unread_b, c.last_message_at, c.last_excerpt,
                       s.name AS store_name, cu.username AS counterparty_name
                FROM conversations c
                JOIN orders o ON o.id = c.order_id
                JOIN stores s ON s.id = o.store_id
                JOIN users cu ON cu.id = o.customer_id
                WHERE c.kind = 'order' AND (c.participant_a = $1 OR c.participant_b = $1)
                "#
            }
            ConversationKind::Booking => {
                r#"
                SELECT c.id, b.id AS reference_id, c.participant_a, c.participant_b,
                       c.unread_a, c.unread_b, c.last_message_at, c.last_excerpt,
                       s.name AS store_name, cu.username AS counterparty_name
                FROM conversations c
                JOIN bookings b ON b.id = c.booking_id
                JOIN stores s ON s.id = b.store_id
                JOIN users cu ON cu.id = b.customer_id
                WHERE c.kind = 'booking' AND (c.participant_a = $1 OR c.participant_b = $1)
                "#
            }
            ConversationKind::Direct => {
                r#"
                SELECT c.id,
                       CASE WHEN c.participant_a = $1 THEN c.participant_b ELSE c.participant_a END
                           AS reference_id,
                       c.participant_a, c.participant_b,
                       c.unread_a, c.unread_b, c.last_message_at, c.last_excerpt,
                       NULL::TEXT AS store_name, pu.username AS counterparty_name
                FROM conversations c
                JOIN users pu ON pu.id =
                    CASE WHEN c.participant_a = $1 THEN c.participant_b ELSE c.participant_a END
                WHERE c.kind = 'direct' AND (c.participant_a = $1 OR c.participant_b = $1)
                "#
            }
        };

        let rows = sqlx::query_as::<_, FeedRowRecord>(query)
            .bind(actor)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows)
    }
}
