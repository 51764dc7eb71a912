//! Canonical serialization, id computation, and signature verification.
//!
//! Grounded on `rostra-core::event::verified_event::VerifiedEvent`: an
//! `Event` only becomes a [`VerifiedEvent`] after its id and signature have
//! both been checked, and everything downstream (storage, indexing) only
//! ever accepts the verified form.

use secp256k1::schnorr;
use sha2::{Digest as _, Sha256};
use snafu::{ResultExt as _, Snafu};

use crate::event::Event;
use crate::id::{EventId, PubKey};

/// Builds the canonical `[0, pubkey, created_at, kind, tags, content]` JSON
/// array (NIP-01) whose `SHA-256` is the event id.
fn canonical_json(event: &Event) -> serde_json::Value {
    let tags: Vec<Vec<&str>> = event
        .tags
        .iter()
        .map(|t| t.0.iter().map(String::as_str).collect())
        .collect();

    serde_json::json!([
        0,
        event.pubkey.to_string(),
        event.created_at.0,
        event.kind.0,
        tags,
        event.content,
    ])
}

/// Recomputes the id an event *should* have, independent of the `id` field
/// it carries.
pub fn compute_id(event: &Event) -> EventId {
    let bytes = canonical_json(event).to_string();
    let digest = Sha256::digest(bytes.as_bytes());
    EventId(digest.into())
}

#[derive(Debug, Snafu)]
pub enum VerifiedEventError {
    #[snafu(display("event id does not match its canonical serialization"))]
    IdMismatch,
    #[snafu(display("signature does not verify against pubkey"))]
    SignatureInvalid { source: secp256k1::Error },
}

pub type VerifiedEventResult<T> = Result<T, VerifiedEventError>;

/// Abstraction over Schnorr verification, so an external signer/verifier
/// (an HSM, a remote key custodian) can stand in for the default
/// [`Secp256k1Verifier`].
pub trait Verifier {
    fn verify_schnorr(
        &self,
        pubkey: &PubKey,
        message: &EventId,
        sig: &crate::id::Signature,
    ) -> Result<(), secp256k1::Error>;
}

/// Default [`Verifier`] using `libsecp256k1`'s BIP-340 Schnorr
/// implementation directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Verifier;

impl Verifier for Secp256k1Verifier {
    fn verify_schnorr(
        &self,
        pubkey: &PubKey,
        message: &EventId,
        sig: &crate::id::Signature,
    ) -> Result<(), secp256k1::Error> {
        let xonly = secp256k1::XOnlyPublicKey::from_slice(pubkey.as_slice())?;
        let signature = schnorr::Signature::from_slice(sig.as_slice())?;
        signature.verify(message.as_slice(), &xonly)
    }
}

/// An [`Event`] whose `id` and `sig` have both been checked.
///
/// Invariants:
/// * `event.id == compute_id(&event)`
/// * `event.sig` verifies against `event.pubkey` over `event.id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedEvent {
    event: Event,
}

impl VerifiedEvent {
    pub fn verify(event: Event, verifier: &impl Verifier) -> VerifiedEventResult<Self> {
        if compute_id(&event) != event.id {
            return IdMismatchSnafu.fail();
        }

        verifier
            .verify_schnorr(&event.pubkey, &event.id, &event.sig)
            .context(SignatureInvalidSnafu)?;

        Ok(Self { event })
    }

    /// Verifies using the default [`Secp256k1Verifier`].
    pub fn verify_default(event: Event) -> VerifiedEventResult<Self> {
        Self::verify(event, &Secp256k1Verifier)
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn into_event(self) -> Event {
        self.event
    }
}

impl std::ops::Deref for VerifiedEvent {
    type Target = Event;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Tags, Timestamp};

    fn signed_event(content: &str) -> Event {
        let secp = secp256k1::Secp256k1::new();
        let keypair = secp256k1::Keypair::new(&secp, &mut secp256k1::rand::thread_rng());
        let (xonly, _parity) = keypair.x_only_public_key();

        let mut event = Event {
            id: EventId::ZERO,
            pubkey: PubKey(xonly.serialize()),
            created_at: Timestamp(1_700_000_000),
            kind: EventKind(1),
            tags: Tags::default(),
            content: content.to_string(),
            sig: crate::id::Signature([0u8; 64]),
        };
        event.id = compute_id(&event);

        let sig = secp.sign_schnorr(event.id.as_slice(), &keypair);
        event.sig = crate::id::Signature(sig.to_byte_array());
        event
    }

    #[test]
    fn verifies_well_formed_event() {
        let event = signed_event("hello");
        assert!(VerifiedEvent::verify_default(event).is_ok());
    }

    #[test]
    fn rejects_tampered_content() {
        let mut event = signed_event("hello");
        event.content = "tampered".to_string();
        assert!(matches!(
            VerifiedEvent::verify_default(event),
            Err(VerifiedEventError::IdMismatch)
        ));
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut event = signed_event("hello");
        event.sig = crate::id::Signature([1u8; 64]);
        assert!(matches!(
            VerifiedEvent::verify_default(event),
            Err(VerifiedEventError::SignatureInvalid { .. })
        ));
    }
}
