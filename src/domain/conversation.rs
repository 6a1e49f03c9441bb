use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// The three kinds of conversation the marketplace supports. Order and
/// booking conversations tie a customer to a store; direct conversations tie
/// two users with no store involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Order,
    Booking,
    Direct,
}

impl ConversationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Booking => "booking",
            Self::Direct => "direct",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "order" => Some(Self::Order),
            "booking" => Some(Self::Booking),
            "direct" => Some(Self::Direct),
            _ => None,
        }
    }

    /// Wire name for the role a side plays in this kind of conversation.
    #[must_use]
    pub const fn role_of(self, side: Side) -> &'static str {
        match self {
            Self::Order | Self::Booking => match side {
                Side::A => "owner",
                Side::B => "customer",
            },
            Self::Direct => "user",
        }
    }
}

impl std::fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a conversation refers to. The variant determines which marketplace
/// entity the participants are resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationRef {
    Order(Uuid),
    Booking(Uuid),
    /// A user pair, canonicalized so `a < b`. Construct via [`Self::direct`].
    Direct { a: Uuid, b: Uuid },
}

impl ConversationRef {
    /// Builds a direct reference from an unordered user pair.
    #[must_use]
    pub fn direct(x: Uuid, y: Uuid) -> Self {
        if x <= y { Self::Direct { a: x, b: y } } else { Self::Direct { a: y, b: x } }
    }

    #[must_use]
    pub const fn kind(&self) -> ConversationKind {
        match self {
            Self::Order(_) => ConversationKind::Order,
            Self::Booking(_) => ConversationKind::Booking,
            Self::Direct { .. } => ConversationKind::Direct,
        }
    }

    /// Uniqueness key for direct conversations, used as the upsert target.
    #[must_use]
    pub fn direct_key(&self) -> Option<String> {
        match self {
            Self::Direct { a, b } => Some(format!("{a}:{b}")),
            _ => None,
        }
    }
}

/// Which side of a conversation a participant sits on. Side A is the store
/// owner for order/booking conversations and the smaller user id for direct
/// ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl Side {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "a" => Some(Self::A),
            "b" => Some(Self::B),
            _ => None,
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// One summary row per conversation: the read-optimized view that backs
/// unread badges and the feed. Counters are maintained in the same
/// transaction as the message writes they reflect.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub id: Uuid,
    pub kind: ConversationKind,
    pub participant_a: Uuid,
    pub participant_b: Uuid,
    pub last_message_at: Option<OffsetDateTime>,
    pub last_excerpt: Option<String>,
    pub unread_a: i64,
    pub unread_b: i64,
}

impl ConversationSummary {
    /// The side the given actor sits on, if they participate at all.
    #[must_use]
    pub fn side_of(&self, actor: Uuid) -> Option<Side> {
        if actor == self.participant_a {
            Some(Side::A)
        } else if actor == self.participant_b {
            Some(Side::B)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn unread_for(&self, side: Side) -> i64 {
        match side {
            Side::A => self.unread_a,
            Side::B => self.unread_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_ref_is_canonicalized() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        assert_eq!(ConversationRef::direct(x, y), ConversationRef::direct(y, x));
        if let ConversationRef::Direct { a, b } = ConversationRef::direct(x, y) {
            assert!(a <= b);
        }
    }

    #[test]
    fn direct_key_matches_canonical_order() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        assert_eq!(
            ConversationRef::direct(x, y).direct_key(),
            ConversationRef::direct(y, x).direct_key()
        );
        assert_eq!(ConversationRef::Order(x).direct_key(), None);
    }

    #[test]
    fn kind_wire_names_round_trip() {
        for kind in [ConversationKind::Order, ConversationKind::Booking, ConversationKind::Direct] {
            assert_eq!(ConversationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ConversationKind::parse("garbage"), None);
    }

    #[test]
    fn side_of_resolves_participants() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let summary = ConversationSummary {
            id: Uuid::new_v4(),
            kind: ConversationKind::Order,
            participant_a: a,
            participant_b: b,
            last_message_at: None,
            last_excerpt: None,
            unread_a: 2,
            unread_b: 0,
        };
        assert_eq!(summary.side_of(a), Some(Side::A));
        assert_eq!(summary.side_of(b), Some(Side::B));
        assert_eq!(summary.side_of(Uuid::new_v4()), None);
        assert_eq!(summary.unread_for(Side::A), 2);
    }
}
