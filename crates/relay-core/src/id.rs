//! Identifier types: full 32-byte ids/pubkeys, the 8-byte truncated hashes
//! used inside composite index keys, and the 64-byte signature.
//!
//! Grounded on `rostra-core::id`'s array-newtype idiom, but the hex
//! `Display`/`FromStr` (rather than z32/bech32) matches how Nostr ids and
//! pubkeys are conventionally exchanged.

use sha2::{Digest as _, Sha256};
use snafu::Snafu;

#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
pub enum HexParseError {
    InvalidHex,
    InvalidLength,
}

array_type!(
    /// 32-byte event id: `SHA-256` of the canonical serialization.
    struct EventId, 32
);

array_type!(
    /// 32-byte author identifier (`secp256k1` x-only public key).
    struct PubKey, 32
);

array_type!(
    /// 64-byte Schnorr (BIP-340) signature over an [`EventId`].
    struct Signature, 64
);

array_type!(
    /// Truncated 8-byte prefix of `SHA-256(full id)`, used in composite
    /// index keys so a full 32-byte id need not be repeated in every
    /// family. Collisions are resolved by fetching the full event and
    /// comparing (see [`crate::id::IdHash::matches`]).
    struct IdHash, 8
);

array_type!(
    /// Truncated 8-byte prefix of `SHA-256(full pubkey)`.
    struct PubHash, 8
);

array_type!(
    /// Truncated 8-byte prefix of `SHA-256(tag value)`.
    struct IdentHash, 8
);

fn truncated_hash8(bytes: &[u8]) -> [u8; 8] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

impl IdHash {
    pub fn of(id: EventId) -> Self {
        Self(truncated_hash8(id.as_slice()))
    }

    /// Full-width confirmation that `candidate` really is the event this
    /// hash was derived from: the truncated prefix is never itself treated
    /// as identity, since two distinct ids can share it.
    pub fn matches(self, candidate: EventId) -> bool {
        Self::of(candidate) == self
    }
}

impl PubHash {
    pub fn of(pubkey: PubKey) -> Self {
        Self(truncated_hash8(pubkey.as_slice()))
    }

    pub fn matches(self, candidate: PubKey) -> bool {
        Self::of(candidate) == self
    }
}

impl IdentHash {
    pub fn of(value: &str) -> Self {
        Self(truncated_hash8(value.as_bytes()))
    }

    pub fn matches(self, candidate: &str) -> bool {
        Self::of(candidate) == self
    }
}

/// Monotonic 40-bit serial, the primary key of an event within the store.
///
/// Represented as `u64` in memory; only the low 40 bits are ever
/// significant, and the key codec encodes exactly 5 bytes of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "bincode", derive(::bincode::Encode, ::bincode::Decode))]
pub struct Serial(pub u64);

impl Serial {
    pub const MAX: Self = Self((1u64 << 40) - 1);

    pub fn new(value: u64) -> Self {
        debug_assert!(value <= Self::MAX.0, "serial exceeds 40 bits");
        Self(value & Self::MAX.0)
    }
}

impl std::fmt::Display for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
