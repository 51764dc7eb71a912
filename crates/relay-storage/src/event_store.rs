//! Save/delete/fetch, replaceable/parameterized-replaceable/deletion/
//! expiration rules, and per-author data-usage accounting.
//!
//! Grounded on `rostra-client-db::tx_ops::insert_event_tx` for the
//! "resolve address, schedule supersession, write index fan in one
//! transaction" shape, and on `IdsDataUsageRecord` for the usage-counter
//! idiom (simplified: no content-lifecycle states, since events here are
//! not split into separate metadata/content blobs).

use std::path::Path;

use redb::{ReadableTable as _, TableDefinition};
use relay_core::event::{Event, EventKind, Timestamp};
use relay_core::id::{EventId, IdHash, IdentHash, PubHash, PubKey, Serial};
use snafu::{OptionExt as _, ResultExt as _};
use tracing::{debug, info, warn};

use crate::engine::{Storage, StorageConfig, WriteTransactionCtx};
use crate::error::{
    BlockedByTombstoneSnafu, DuplicateIdSnafu, IdMismatchSnafu, NewerReplacementExistsSnafu,
    SaveError, SaveResult, SignatureInvalidSnafu, StorageError, StorageResult,
};
use crate::schema;

const LOG_TARGET: &str = "relay::event_store";

const DATA_USAGE_TABLE: TableDefinition<[u8; 32], [u8; 32]> = TableDefinition::new("relay_data_usage");

/// Per-author aggregate storage accounting, bincode-free since it's only
/// two 64-bit counters and doesn't need to share the event blob's format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataUsage {
    pub event_count: u64,
    pub byte_count: u64,
}

impl DataUsage {
    fn encode(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[0..8].copy_from_slice(&self.event_count.to_be_bytes());
        out[8..16].copy_from_slice(&self.byte_count.to_be_bytes());
        out
    }

    fn decode(bytes: [u8; 32]) -> Self {
        Self {
            event_count: u64::from_be_bytes(bytes[0..8].try_into().unwrap()),
            byte_count: u64::from_be_bytes(bytes[8..16].try_into().unwrap()),
        }
    }
}

/// What became of a save attempt: persisted events get a serial,
/// ephemeral ones are only handed to the subscription broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(Serial),
    Ephemeral,
}

pub struct EventStore {
    storage: Storage,
}

impl EventStore {
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self {
            storage: Storage::open_in_memory()?,
        })
    }

    pub fn open(config: &StorageConfig) -> StorageResult<Self> {
        Ok(Self {
            storage: Storage::open(config)?,
        })
    }

    pub fn open_path(data_dir: &Path) -> StorageResult<Self> {
        Ok(Self {
            storage: Storage::open_path(data_dir)?,
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn fetch_by_serial(&self, serial: Serial) -> StorageResult<Option<Event>> {
        self.storage.view(|tx| {
            let Some(bytes) = tx.open_table(schema::TABLE)?.get(schema::evt::key(serial).as_slice())?.map(|g| g.value().to_vec()) else {
                return Ok(None);
            };
            let event: Event = relay_core::binary::decode_from_slice(&bytes)?;
            Ok(Some(event))
        })
    }

    /// Resolves a full id to its serial. Disambiguates truncated-hash
    /// collisions in `eid` by comparing each candidate's full stored id
    /// rather than trusting the first hash match.
    pub fn find_serial_by_id(&self, id: EventId) -> StorageResult<Option<Serial>> {
        let idhash = IdHash::of(id);
        self.storage.view(|tx| {
            let table = tx.open_table(schema::TABLE)?;
            let prefix = schema::eid::prefix_of(idhash);
            for entry in table.range(prefix.as_slice()..)? {
                let (k, _v) = entry?;
                let key = k.value();
                if !key.starts_with(&prefix) {
                    break;
                }
                let serial = schema::eid::decode_serial(key).ok().context(crate::error::KeyDecodeSnafu)?;
                let Some(bytes) = table
                    .get(schema::evt::key(serial).as_slice())?
                    .map(|g| g.value().to_vec())
                else {
                    continue;
                };
                let event: Event = relay_core::binary::decode_from_slice(&bytes)?;
                if event.id == id {
                    return Ok(Some(serial));
                }
            }
            Ok(None)
        })
    }

    /// Resolves `id` to its stored event, verifying against truncated-hash
    /// collisions by comparing the full id.
    pub fn find_event_by_id(&self, id: EventId) -> StorageResult<Option<(Serial, Event)>> {
        let Some(serial) = self.find_serial_by_id(id)? else {
            return Ok(None);
        };
        let Some(event) = self.fetch_by_serial(serial)? else {
            return Ok(None);
        };
        if event.id != id {
            return Ok(None);
        }
        Ok(Some((serial, event)))
    }

    fn data_usage(&self, pubkey: PubKey) -> StorageResult<DataUsage> {
        self.storage.view(|tx| {
            let table = tx.open_table(DATA_USAGE_TABLE)?;
            Ok(table.get(pubkey.0)?.map(|g| DataUsage::decode(g.value())).unwrap_or_default())
        })
    }

    pub fn data_usage_for(&self, pubkey: PubKey) -> StorageResult<DataUsage> {
        self.data_usage(pubkey)
    }

    fn adjust_data_usage(
        tx: &WriteTransactionCtx,
        pubkey: PubKey,
        event_delta: i64,
        byte_delta: i64,
    ) -> StorageResult<()> {
        let mut table = tx.open_table(DATA_USAGE_TABLE)?;
        let mut usage = table.get(pubkey.0)?.map(|g| DataUsage::decode(g.value())).unwrap_or_default();
        usage.event_count = usage.event_count.saturating_add_signed(event_delta);
        usage.byte_count = usage.byte_count.saturating_add_signed(byte_delta);
        table.insert(pubkey.0, usage.encode())?;
        Ok(())
    }

    /// The full index fan for `event` at `serial`:
    /// one key per applicable family, always recomputable from the stored
    /// event so delete-by-serial needs no separate bookkeeping.
    fn index_fan_keys(event: &Event, serial: Serial) -> Vec<Vec<u8>> {
        let idhash = IdHash::of(event.id);
        let pubhash = PubHash::of(event.pubkey);
        let mut keys = vec![
            schema::eid::key(idhash, serial),
            schema::fpc::key(serial, event.id, pubhash, event.created_at),
            schema::cat::key(event.created_at, serial),
            schema::kc::key(event.kind, event.created_at, serial),
            schema::pc::key(pubhash, event.created_at, serial),
            schema::kpc::key(event.kind, pubhash, event.created_at, serial),
        ];

        for tag in event.tags.iter() {
            let Some(letter) = tag.single_letter_key() else {
                continue;
            };
            let Some(value) = tag.first_value() else {
                continue;
            };
            let valuehash = IdentHash::of(value);
            keys.push(schema::tc::key(letter, valuehash, event.created_at, serial));
            keys.push(schema::tkc::key(event.kind, letter, valuehash, event.created_at, serial));
            keys.push(schema::tpc::key(pubhash, letter, valuehash, event.created_at, serial));
            keys.push(schema::tkp::key(event.kind, pubhash, letter, valuehash, event.created_at, serial));
        }

        if let Some(expiry) = event.expiration() {
            keys.push(schema::exp::key(expiry, serial));
        }

        keys
    }

    /// Writes the event blob and its full index fan inside an already-open
    /// transaction. Does not allocate the serial; the caller decides that
    /// so replaceable-supersession bookkeeping shares the transaction.
    fn write_event_tx(tx: &WriteTransactionCtx, event: &Event, serial: Serial) -> StorageResult<()> {
        let blob = relay_core::binary::encode_to_vec(event)?;
        tx.set(&schema::evt::key(serial), &blob)?;
        for key in Self::index_fan_keys(event, serial) {
            tx.set(&key, schema::EMPTY)?;
        }
        Self::adjust_data_usage(tx, event.pubkey, 1, blob.len() as i64)?;
        Ok(())
    }

    /// Deletes a previously-saved event's blob and full index fan in one
    /// transaction, recomputing the fan deterministically from the stored
    /// event. Tolerates the event
    /// already being gone (treats not-found as success, per §7).
    pub fn delete_by_serial(&self, serial: Serial) -> StorageResult<()> {
        self.storage.update(|tx| {
            let Some(bytes) = tx.get(&schema::evt::key(serial))? else {
                return Ok(());
            };
            let event: Event = relay_core::binary::decode_from_slice(&bytes)?;
            tx.delete(&schema::evt::key(serial))?;
            for key in Self::index_fan_keys(&event, serial) {
                tx.delete(&key)?;
            }
            Self::adjust_data_usage(tx, event.pubkey, -1, -(bytes.len() as i64))?;
            Ok(())
        })
    }

    /// Serials of prior events tagged at a single-letter-key address
    /// (used both for parameterized-replaceable collapse via `d` and for
    /// deletion-tombstone lookups via `e`/`a`).
    pub(crate) fn serials_by_tag(
        &self,
        pubhash: PubHash,
        letter: u8,
        valuehash: IdentHash,
    ) -> StorageResult<Vec<Serial>> {
        let prefix = schema::tpc::prefix_of(pubhash, letter, valuehash);
        self.storage.view(|tx| {
            let table = tx.open_table(schema::TABLE)?;
            let mut out = Vec::new();
            for entry in table.range(prefix.as_slice()..)? {
                let (k, _v) = entry?;
                let key = k.value();
                if !key.starts_with(&prefix) {
                    break;
                }
                match schema::tpc::decode_serial(key) {
                    Ok(serial) => out.push(serial),
                    Err(_) => warn!(target: LOG_TARGET, "corrupt tpc index entry, skipping"),
                }
            }
            Ok(out)
        })
    }

    pub(crate) fn is_owner(pubkey: PubKey, owner_pubkeys: &[PubKey]) -> bool {
        owner_pubkeys.contains(&pubkey)
    }

    /// Checks for a deletion tombstone that blocks `event` from being
    /// saved.
    pub(crate) fn blocked_by_tombstone(&self, event: &Event, owner_pubkeys: &[PubKey]) -> StorageResult<bool> {
        if event.kind.is_parameterized_replaceable() {
            let (kind, pubkey, d) = event.parameterized_address();
            let address = format!("{}:{}:{}", kind.0, pubkey, d);
            let valuehash = IdentHash::of(&address);
            for candidate_pubkey in std::iter::once(event.pubkey).chain(owner_pubkeys.iter().copied()) {
                let pubhash = PubHash::of(candidate_pubkey);
                for serial in self.serials_by_tag(pubhash, b'a', valuehash)? {
                    if let Some(candidate) = self.fetch_by_serial(serial)? {
                        if candidate.kind == EventKind::DELETION
                            && candidate.created_at >= event.created_at
                            && (Self::is_owner(candidate.pubkey, owner_pubkeys)
                                || candidate.pubkey == event.pubkey)
                        {
                            return Ok(true);
                        }
                    }
                }
            }
            return Ok(false);
        }

        let idhex = event.id.to_string();
        let valuehash = IdentHash::of(&idhex);
        for candidate_pubkey in std::iter::once(event.pubkey).chain(owner_pubkeys.iter().copied()) {
            let pubhash = PubHash::of(candidate_pubkey);
            for serial in self.serials_by_tag(pubhash, b'e', valuehash)? {
                if let Some(candidate) = self.fetch_by_serial(serial)? {
                    if candidate.kind == EventKind::DELETION {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    /// Saves `event`, applying duplicate/tombstone/signature checks,
    /// replaceable/parameterized-replaceable supersession, and the full
    /// index fan, all within one transaction.
    pub fn save(
        &self,
        event: Event,
        no_verify: bool,
        owner_pubkeys: &[PubKey],
        verifier: &impl relay_core::verify::Verifier,
        on_committed: impl FnOnce(Event) + Send + 'static,
    ) -> SaveResult<SaveOutcome> {
        if event.kind.is_ephemeral() {
            on_committed(event);
            return Ok(SaveOutcome::Ephemeral);
        }

        if !no_verify {
            if self.find_serial_by_id(event.id)?.is_some() {
                return DuplicateIdSnafu.fail();
            }
            if relay_core::verify::compute_id(&event) != event.id {
                return IdMismatchSnafu.fail();
            }
            verifier
                .verify_schnorr(&event.pubkey, &event.id, &event.sig)
                .context(SignatureInvalidSnafu)?;
        }

        if self.blocked_by_tombstone(&event, owner_pubkeys)? {
            return BlockedByTombstoneSnafu.fail();
        }

        let pubhash = PubHash::of(event.pubkey);
        let mut to_delete_after_commit = Vec::new();

        if event.kind.is_replaceable() {
            for (serial, prior) in self.fetch_replaceable_priors(event.kind, pubhash)? {
                if prior.created_at > event.created_at {
                    return NewerReplacementExistsSnafu.fail();
                }
                to_delete_after_commit.push(serial);
            }
        } else if event.kind.is_parameterized_replaceable() {
            let (kind, _pubkey, d) = event.parameterized_address();
            let valuehash = IdentHash::of(&d);
            for serial in self.serials_by_tag(pubhash, b'd', valuehash)? {
                let Some(prior) = self.fetch_by_serial(serial)? else {
                    continue;
                };
                if prior.kind != kind || prior.pubkey != event.pubkey {
                    continue;
                }
                if prior.parameterized_address().2 != d {
                    continue;
                }
                if prior.created_at > event.created_at {
                    return NewerReplacementExistsSnafu.fail();
                }
                to_delete_after_commit.push(serial);
            }
        }

        let result = self.storage.update::<_, SaveError>(|tx| {
            let serial = tx.next_serial().map_err(SaveError::from)?;
            Self::write_event_tx(tx, &event, serial).map_err(SaveError::from)?;
            Ok(serial)
        })?;

        for serial in to_delete_after_commit {
            if let Err(err) = self.delete_by_serial(serial) {
                warn!(target: LOG_TARGET, %serial, err = %relay_util_error::FmtCompact::fmt_compact(&err), "failed to delete superseded event");
            }
        }

        if event.kind == EventKind::DELETION {
            if let Err(err) = self.enact_deletion_targets(&event, owner_pubkeys) {
                warn!(target: LOG_TARGET, err = %relay_util_error::FmtCompact::fmt_compact(&err), "failed to enact deletion targets");
            }
        }

        info!(target: LOG_TARGET, serial = %result, id = %event.id, kind = %event.kind, "saved event");
        on_committed(event);
        Ok(SaveOutcome::Saved(result))
    }

    /// Enacts a kind-5 deletion event's `e`/`a`-tag targets by removing the
    /// referenced events' blobs and index keys, provided the deleter owns
    /// them or is an admin.
    fn enact_deletion_targets(&self, deleter: &Event, owner_pubkeys: &[PubKey]) -> StorageResult<()> {
        for id in deleter.deletion_event_targets() {
            let Some((serial, target)) = self.find_event_by_id(id)? else {
                continue;
            };
            if target.created_at > deleter.created_at {
                continue;
            }
            if target.pubkey != deleter.pubkey && !Self::is_owner(deleter.pubkey, owner_pubkeys) {
                continue;
            }
            self.delete_by_serial(serial)?;
        }

        for (kind, pubkey, d) in deleter.deletion_address_targets() {
            if pubkey != deleter.pubkey && !Self::is_owner(deleter.pubkey, owner_pubkeys) {
                continue;
            }
            let pubhash = PubHash::of(pubkey);
            let valuehash = IdentHash::of(&d);
            for serial in self.serials_by_tag(pubhash, b'd', valuehash)? {
                let Some(target) = self.fetch_by_serial(serial)? else {
                    continue;
                };
                if target.kind != kind || target.pubkey != pubkey || target.created_at > deleter.created_at {
                    continue;
                }
                if target.parameterized_address().2 != d {
                    continue;
                }
                self.delete_by_serial(serial)?;
            }
        }

        Ok(())
    }

    fn fetch_replaceable_priors(
        &self,
        kind: EventKind,
        pubhash: PubHash,
    ) -> StorageResult<Vec<(Serial, Event)>> {
        let prefix = schema::kpc::prefix_of(kind, pubhash);
        let serials = self.storage.view(|tx| {
            let table = tx.open_table(schema::TABLE)?;
            let mut out = Vec::new();
            for entry in table.range(prefix.as_slice()..)? {
                let (k, _v) = entry?;
                let key = k.value();
                if !key.starts_with(&prefix) {
                    break;
                }
                match schema::kpc::decode_serial(key) {
                    Ok(serial) => out.push(serial),
                    Err(_) => warn!(target: LOG_TARGET, "corrupt kpc index entry, skipping"),
                }
            }
            Ok::<_, StorageError>(out)
        })?;

        let mut out = Vec::with_capacity(serials.len());
        for serial in serials {
            if let Some(event) = self.fetch_by_serial(serial)? {
                out.push((serial, event));
            }
        }
        Ok(out)
    }

    /// Scans the `exp` family for events whose expiry has passed and
    /// deletes them. Runs on a
    /// 10-minute cadence in the containing application; exposed here as a
    /// single sweep so the caller owns scheduling.
    pub fn sweep_expired(&self, now: Timestamp) -> StorageResult<usize> {
        let bound = schema::exp::range_bound(now);
        let prefix = schema::prefix::EXP;
        let expired = self.storage.view(|tx| {
            let table = tx.open_table(schema::TABLE)?;
            let mut out = Vec::new();
            for entry in table.range(prefix.as_slice()..=bound.as_slice())? {
                let (k, _v) = entry?;
                let key = k.value();
                if !key.starts_with(prefix) {
                    break;
                }
                match schema::exp::decode(key) {
                    Ok(decoded) => out.push(decoded.serial),
                    Err(_) => warn!(target: LOG_TARGET, "corrupt exp index entry, skipping"),
                }
            }
            Ok::<_, StorageError>(out)
        })?;

        let count = expired.len();
        for serial in expired {
            self.delete_by_serial(serial)?;
        }
        if count > 0 {
            debug!(target: LOG_TARGET, count, "swept expired events");
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use relay_core::event::{Tag, Tags};
    use relay_core::verify::Secp256k1Verifier;

    use super::*;

    struct Key {
        keypair: secp256k1::Keypair,
    }

    impl Key {
        fn new() -> Self {
            let secp = secp256k1::Secp256k1::new();
            Self {
                keypair: secp256k1::Keypair::new(&secp, &mut secp256k1::rand::thread_rng()),
            }
        }

        fn pubkey(&self) -> PubKey {
            PubKey(self.keypair.x_only_public_key().0.serialize())
        }

        fn sign(&self, kind: u16, created_at: i64, tags: Vec<Tag>, content: &str) -> Event {
            let secp = secp256k1::Secp256k1::new();
            let mut event = Event {
                id: EventId::ZERO,
                pubkey: self.pubkey(),
                created_at: Timestamp(created_at),
                kind: EventKind(kind),
                tags: Tags(tags),
                content: content.to_string(),
                sig: relay_core::id::Signature([0u8; 64]),
            };
            event.id = relay_core::verify::compute_id(&event);
            let sig = secp.sign_schnorr(event.id.as_slice(), &self.keypair);
            event.sig = relay_core::id::Signature(sig.to_byte_array());
            event
        }
    }

    fn save(store: &EventStore, event: Event) -> SaveResult<SaveOutcome> {
        store.save(event, false, &[], &Secp256k1Verifier, |_| {})
    }

    #[test]
    fn save_fetch_round_trip() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        let event = key.sign(1, 100, vec![], "hello");
        let outcome = save(&store, event.clone()).unwrap();
        let SaveOutcome::Saved(serial) = outcome else {
            panic!("expected persisted event");
        };
        let (found_serial, found) = store.find_event_by_id(event.id).unwrap().unwrap();
        assert_eq!(found_serial, serial);
        assert_eq!(found, event);
    }

    #[test]
    fn duplicate_id_rejected() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        let event = key.sign(1, 100, vec![], "hello");
        save(&store, event.clone()).unwrap();
        let err = save(&store, event).unwrap_err();
        assert!(matches!(err, SaveError::DuplicateId));
    }

    #[test]
    fn replaceable_collapse_keeps_newest() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        for created_at in [100, 200, 150] {
            // 150 arrives after 200 and is correctly rejected as stale.
            let _ = save(&store, key.sign(0, created_at, vec![], ""));
        }

        let prior = store.fetch_replaceable_priors(EventKind(0), PubHash::of(key.pubkey())).unwrap();
        assert_eq!(prior.len(), 1);
        assert_eq!(prior[0].1.created_at, Timestamp(200));
    }

    #[test]
    fn replaceable_rejects_older_after_newer_saved() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        save(&store, key.sign(0, 200, vec![], "")).unwrap();
        let err = save(&store, key.sign(0, 100, vec![], "")).unwrap_err();
        assert!(matches!(err, SaveError::NewerReplacementExists));
    }

    #[test]
    fn parameterized_replaceable_keeps_newest_per_d_tag() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        for created_at in [100, 200, 300] {
            save(
                &store,
                key.sign(30_000, created_at, vec![Tag(vec!["d".to_string(), "x".to_string()])], ""),
            )
            .unwrap();
        }
        save(
            &store,
            key.sign(30_000, 150, vec![Tag(vec!["d".to_string(), "y".to_string()])], ""),
        )
        .unwrap();

        let x_priors = store
            .serials_by_tag(PubHash::of(key.pubkey()), b'd', IdentHash::of("x"))
            .unwrap();
        assert_eq!(x_priors.len(), 1);
        let event = store.fetch_by_serial(x_priors[0]).unwrap().unwrap();
        assert_eq!(event.created_at, Timestamp(300));
    }

    #[test]
    fn deletion_by_e_tag_blocks_future_saves_and_removes_target() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        let target = key.sign(1, 100, vec![], "hello");
        save(&store, target.clone()).unwrap();

        let deletion = key.sign(5, 200, vec![Tag(vec!["e".to_string(), target.id.to_string()])], "");
        save(&store, deletion).unwrap();

        assert!(store.find_event_by_id(target.id).unwrap().is_none());
    }

    #[test]
    fn tombstone_blocks_resave_of_deleted_event() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        let target = key.sign(1, 100, vec![], "hello");
        save(&store, target.clone()).unwrap();

        let deletion = key.sign(5, 200, vec![Tag(vec!["e".to_string(), target.id.to_string()])], "");
        save(&store, deletion).unwrap();

        let result = save(&store, target);
        assert!(matches!(result, Err(SaveError::BlockedByTombstone)));
    }

    #[test]
    fn ephemeral_events_are_not_persisted() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        let event = key.sign(20_000, 100, vec![], "");
        let outcome = save(&store, event).unwrap();
        assert_eq!(outcome, SaveOutcome::Ephemeral);
    }

    #[test]
    fn deleting_twice_is_idempotent() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        let event = key.sign(1, 100, vec![], "hello");
        let SaveOutcome::Saved(serial) = save(&store, event).unwrap() else {
            panic!("expected persisted event");
        };
        store.delete_by_serial(serial).unwrap();
        store.delete_by_serial(serial).unwrap();
    }

    #[test]
    fn expiration_sweep_removes_past_events() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        let event = key.sign(1, 100, vec![Tag(vec!["expiration".to_string(), "150".to_string()])], "");
        save(&store, event.clone()).unwrap();

        let swept = store.sweep_expired(Timestamp(200)).unwrap();
        assert_eq!(swept, 1);
        assert!(store.find_event_by_id(event.id).unwrap().is_none());
    }

    #[test]
    fn expiration_sweep_includes_events_expiring_exactly_at_now() {
        let store = EventStore::open_in_memory().unwrap();
        let key = Key::new();
        let event = key.sign(1, 100, vec![Tag(vec!["expiration".to_string(), "150".to_string()])], "");
        save(&store, event.clone()).unwrap();

        let swept = store.sweep_expired(Timestamp(150)).unwrap();
        assert_eq!(swept, 1);
        assert!(store.find_event_by_id(event.id).unwrap().is_none());
    }
}
