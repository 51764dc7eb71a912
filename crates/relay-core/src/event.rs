//! The [`Event`] wire type and the kind-classification rules
//! (replaceable/parameterized-replaceable/ephemeral).

use crate::id::{EventId, PubKey, Signature};

/// Signed unix timestamp (`created_at` is a signed 64-bit field, not
/// unsigned, so it round-trips timestamps before the epoch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub const MIN: Self = Self(i64::MIN);
    pub const MAX: Self = Self(i64::MAX);

    pub fn now() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock before unix epoch")
            .as_secs();
        Self(secs as i64)
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification code for an event's meaning, and for the replaceable /
/// parameterized-replaceable / ephemeral rules that key off its numeric
/// range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
pub struct EventKind(pub u16);

impl EventKind {
    /// Replaceable: profile metadata.
    pub const METADATA: Self = Self(0);
    /// Replaceable: contact list.
    pub const CONTACTS: Self = Self(3);
    /// Deletion request; always regular (stored as a tombstone).
    pub const DELETION: Self = Self(5);

    /// `(pubkey, kind)` is the logical identity; only the newest is
    /// logically visible.
    pub fn is_replaceable(self) -> bool {
        self == Self::METADATA || self == Self::CONTACTS || (10_000..20_000).contains(&self.0)
    }

    /// `(pubkey, kind, d-tag-value)` is the logical identity.
    pub fn is_parameterized_replaceable(self) -> bool {
        (30_000..40_000).contains(&self.0)
    }

    /// Not persisted; handed to the subscription broker and discarded.
    pub fn is_ephemeral(self) -> bool {
        (20_000..30_000).contains(&self.0)
    }

    pub fn is_regular(self) -> bool {
        !self.is_replaceable() && !self.is_parameterized_replaceable() && !self.is_ephemeral()
    }
}

impl From<u16> for EventKind {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One tag: an ordered sequence of byte strings, the first being its "key"
/// (often a single ASCII byte; only single-byte keys are indexed).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
pub struct Tag(pub Vec<String>);

impl Tag {
    pub fn key(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn values(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }

    pub fn first_value(&self) -> Option<&str> {
        self.values().first().map(String::as_str)
    }

    /// `Some(byte)` iff this tag's key is exactly one ASCII byte long -
    /// the only kind of tag the index schema can represent.
    pub fn single_letter_key(&self) -> Option<u8> {
        let key = self.key()?;
        let mut bytes = key.bytes();
        let first = bytes.next()?;
        if bytes.next().is_none() {
            Some(first)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
pub struct Tags(pub Vec<Tag>);

impl Tags {
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    /// Value of the first tag keyed `name`, e.g. the `d`-tag value used by
    /// parameterized-replaceable addressing.
    pub fn first_value_of(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|t| t.key() == Some(name))
            .and_then(Tag::first_value)
    }

    /// All values of single-letter-keyed tags matching `letter`.
    pub fn values_of_letter(&self, letter: u8) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(move |t| t.single_letter_key() == Some(letter))
            .filter_map(Tag::first_value)
    }
}

/// Immutable, content-addressed protocol message.
///
/// **Invariant:** `id == SHA256(canonical(pubkey, created_at, kind, tags,
/// content))`, and `sig` verifies against `pubkey` over `id` - neither is
/// enforced by this type itself; see [`crate::verify::VerifiedEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
pub struct Event {
    pub id: EventId,
    pub pubkey: PubKey,
    pub created_at: Timestamp,
    pub kind: EventKind,
    pub tags: Tags,
    pub content: String,
    pub sig: Signature,
}

impl Event {
    /// The `(kind, pubkey)` address of a replaceable event.
    pub fn replaceable_address(&self) -> (EventKind, PubKey) {
        (self.kind, self.pubkey)
    }

    /// The `(kind, pubkey, d-tag-value)` address of a parameterized-
    /// replaceable event. The `d` tag defaults to the empty string when
    /// absent, matching NIP-01.
    pub fn parameterized_address(&self) -> (EventKind, PubKey, String) {
        (
            self.kind,
            self.pubkey,
            self.tags.first_value_of("d").unwrap_or("").to_string(),
        )
    }

    /// Parses the `expiration` tag, if any, as a unix timestamp.
    pub fn expiration(&self) -> Option<Timestamp> {
        self.tags
            .first_value_of("expiration")
            .and_then(|v| v.parse::<i64>().ok())
            .map(Timestamp)
    }

    /// `e`-tag targets this deletion (kind 5) event references, in order.
    pub fn deletion_event_targets(&self) -> impl Iterator<Item = EventId> + '_ {
        self.tags
            .iter()
            .filter(|t| t.single_letter_key() == Some(b'e'))
            .filter_map(|t| t.first_value())
            .filter_map(|v| v.parse::<EventId>().ok())
    }

    /// `a`-tag targets this deletion (kind 5) event references
    /// (`kind:pubkey:d-value`), for parameterized-replaceable deletes.
    pub fn deletion_address_targets(&self) -> impl Iterator<Item = (EventKind, PubKey, String)> + '_ {
        self.tags
            .iter()
            .filter(|t| t.single_letter_key() == Some(b'a'))
            .filter_map(|t| t.first_value())
            .filter_map(|v| {
                let mut parts = v.splitn(3, ':');
                let kind: u16 = parts.next()?.parse().ok()?;
                let pubkey: PubKey = parts.next()?.parse().ok()?;
                let d = parts.next().unwrap_or("").to_string();
                Some((EventKind(kind), pubkey, d))
            })
    }
}
