use crate::config::FeedConfig;
use crate::domain::conversation::ConversationKind;
use crate::domain::feed::{ActorRole, FeedEntry, sort_feed, total_unread};
use crate::error::Result;
use crate::storage::DbPool;
use crate::storage::conversation_repo::ConversationRepository;
use crate::storage::records::FeedRowRecord;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

const KINDS: [ConversationKind; 3] =
    [ConversationKind::Order, ConversationKind::Booking, ConversationKind::Direct];

/// The merged, sorted conversation feed for one actor.
#[derive(Debug)]
pub struct Feed {
    pub entries: Vec<FeedEntry>,
    pub total_unread: i64,
    /// True when at least one kind query failed or timed out and its rows
    /// are missing from the feed.
    pub partial: bool,
}

/// Aggregator: merges the per-kind conversation summaries into one feed.
#[derive(Clone, Debug)]
pub struct FeedService {
    pool: DbPool,
    conversations: ConversationRepository,
    config: FeedConfig,
}

impl FeedService {
    #[must_use]
    pub fn new(pool: DbPool, conversations: ConversationRepository, config: FeedConfig) -> Self {
        Self { pool, conversations, config }
    }

    /// Builds the actor's feed. Each kind query runs concurrently under its
    /// own deadline; a failed kind is logged and skipped, so the caller gets
    /// a best-effort feed rather than a hard failure.
    #[tracing::instrument(skip(self), fields(actor = %actor))]
    pub async fn feed_for(&self, actor: Uuid) -> Result<Feed> {
        let results = futures::future::join_all(
            KINDS.iter().map(|&kind| self.fetch_kind(actor, kind, self.deadline_for(kind))),
        )
        .await;

        let mut entries = Vec::new();
        let mut partial = false;
        for (kind, outcome) in KINDS.iter().zip(results) {
            match outcome {
                Ok(rows) => {
                    entries.extend(rows.into_iter().map(|row| project_row(actor, *kind, row)));
                }
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "Feed kind query failed; degrading");
                    partial = true;
                }
            }
        }

        sort_feed(&mut entries);
        let total_unread = total_unread(&entries);

        Ok(Feed { entries, total_unread, partial })
    }

    fn deadline_for(&self, kind: ConversationKind) -> Duration {
        let override_ms = match kind {
            ConversationKind::Order => self.config.order_timeout_ms,
            ConversationKind::Booking => self.config.booking_timeout_ms,
            ConversationKind::Direct => self.config.direct_timeout_ms,
        };
        Duration::from_millis(override_ms.unwrap_or(self.config.kind_timeout_ms))
    }

    async fn fetch_kind(
        &self,
        actor: Uuid,
        kind: ConversationKind,
        deadline: Duration,
    ) -> std::result::Result<Vec<FeedRowRecord>, String> {
        let query = async {
            let mut conn = self.pool.acquire().await?;
            self.conversations.list_rows_for_kind(&mut conn, actor, kind).await
        };

        match timeout(deadline, query).await {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("query exceeded {}ms deadline", deadline.as_millis())),
        }
    }
}

/// Projects one summary row into the actor's view of it: which role they
/// play, their unread count, and the label the UI should render.
fn project_row(actor: Uuid, kind: ConversationKind, row: FeedRowRecord) -> FeedEntry {
    let actor_is_a = actor == row.participant_a;
    let unread_count = if actor_is_a { row.unread_a } else { row.unread_b };

    let (role, label) = match kind {
        // Side A is the store owner; owners see the customer's name,
        // customers see the store's name.
        ConversationKind::Order | ConversationKind::Booking => {
            if actor_is_a {
                (ActorRole::Owner, row.counterparty_name)
            } else {
                (ActorRole::Customer, row.store_name.unwrap_or_default())
            }
        }
        ConversationKind::Direct => (ActorRole::Peer, row.counterparty_name),
    };

    FeedEntry {
        conversation_id: row.id,
        kind,
        reference_id: row.reference_id,
        label,
        role,
        unread_count,
        last_message_at: row.last_message_at,
        last_excerpt: row.last_excerpt,
    }
}
