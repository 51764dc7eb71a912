//! The 13 index families, each disambiguated by a 3-byte
//! ASCII prefix inside one flat `redb` table.
//!
//! Grounded on `rostra-client-db::tables`'s `def_table!` idiom: one module
//! per family declaring its key shape, generalized here to hand-built
//! binary keys (rather than bincode-encoded ones) so that bytewise key
//! order always matches numeric order.

use relay_core::event::{EventKind, Timestamp};
use relay_core::id::{EventId, IdHash, IdentHash, PubHash, Serial};
use redb::TableDefinition;

use crate::codec::{KeyBuilder, KeyReader, KeyTooShort};

/// The single flat keyspace. Value is empty (`&[]`) for every index entry;
/// only `evt` carries a real payload (the bincode-encoded event blob).
pub const TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("relay");

pub const EMPTY: &[u8] = &[];

pub mod prefix {
    pub const EVT: &[u8; 3] = b"evt";
    pub const EID: &[u8; 3] = b"eid";
    pub const FPC: &[u8; 3] = b"fpc";
    pub const CAT: &[u8; 3] = b"c--";
    pub const KC: &[u8; 3] = b"kc-";
    pub const PC: &[u8; 3] = b"pc-";
    pub const KPC: &[u8; 3] = b"kpc";
    pub const TC: &[u8; 3] = b"tc-";
    pub const TKC: &[u8; 3] = b"tkc";
    pub const TPC: &[u8; 3] = b"tpc";
    pub const TKP: &[u8; 3] = b"tkp";
    pub const EXP: &[u8; 3] = b"exp";
    pub const VER: &[u8; 3] = b"ver";
}

/// `evt`: `5 serial -> event blob`. Primary store.
pub mod evt {
    use super::*;

    pub fn key(serial: Serial) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::EVT)
            .push_serial(serial)
            .into_bytes()
    }
}

/// `eid`: `8 idhash, 5 serial`. Find serial by id.
pub mod eid {
    use super::*;

    pub fn key(idhash: IdHash, serial: Serial) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::EID)
            .push_idhash(idhash)
            .push_serial(serial)
            .into_bytes()
    }

    pub fn prefix_of(idhash: IdHash) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::EID)
            .push_idhash(idhash)
            .into_bytes()
    }

    pub fn decode_serial(key: &[u8]) -> Result<Serial, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        r.read_idhash()?;
        r.read_serial()
    }
}

/// `fpc`: `5 serial, 32 id, 8 pubhash, 8 created_at`. Decode result
/// metadata without loading the event body.
pub mod fpc {
    use super::*;

    pub fn key(serial: Serial, id: EventId, pubhash: PubHash, created_at: Timestamp) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::FPC)
            .push_serial(serial)
            .push_id32(id.0)
            .push_pubhash(pubhash)
            .push_timestamp(created_at)
            .into_bytes()
    }

    pub fn key_prefix(serial: Serial) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::FPC)
            .push_serial(serial)
            .into_bytes()
    }

    pub struct Decoded {
        pub serial: Serial,
        pub id: EventId,
        pub pubhash: PubHash,
        pub created_at: Timestamp,
    }

    pub fn decode(key: &[u8]) -> Result<Decoded, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        Ok(Decoded {
            serial: r.read_serial()?,
            id: EventId(r.read_id32()?),
            pubhash: r.read_pubhash()?,
            created_at: r.read_timestamp()?,
        })
    }
}

/// `c--`: `8 created_at, 5 serial`. Time scan, no other constraint.
pub mod cat {
    use super::*;

    pub fn key(created_at: Timestamp, serial: Serial) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::CAT)
            .push_timestamp(created_at)
            .push_serial(serial)
            .into_bytes()
    }

    pub fn range_bound(created_at: Timestamp) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::CAT)
            .push_timestamp(created_at)
            .push_serial(Serial::MAX)
            .into_bytes()
    }

    pub fn decode_serial(key: &[u8]) -> Result<Serial, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        r.read_timestamp()?;
        r.read_serial()
    }
}

/// `kc-`: `2 kind, 8 created_at, 5 serial`. By kind.
pub mod kc {
    use super::*;

    pub fn key(kind: EventKind, created_at: Timestamp, serial: Serial) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::KC)
            .push_kind(kind)
            .push_timestamp(created_at)
            .push_serial(serial)
            .into_bytes()
    }

    pub fn range_bound(kind: EventKind, created_at: Timestamp) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::KC)
            .push_kind(kind)
            .push_timestamp(created_at)
            .push_serial(Serial::MAX)
            .into_bytes()
    }

    pub fn prefix_of(kind: EventKind) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::KC).push_kind(kind).into_bytes()
    }

    pub fn decode_serial(key: &[u8]) -> Result<Serial, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        r.read_kind()?;
        r.read_timestamp()?;
        r.read_serial()
    }
}

/// `pc-`: `8 pubhash, 8 created_at, 5 serial`. By author.
pub mod pc {
    use super::*;

    pub fn key(pubhash: PubHash, created_at: Timestamp, serial: Serial) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::PC)
            .push_pubhash(pubhash)
            .push_timestamp(created_at)
            .push_serial(serial)
            .into_bytes()
    }

    pub fn range_bound(pubhash: PubHash, created_at: Timestamp) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::PC)
            .push_pubhash(pubhash)
            .push_timestamp(created_at)
            .push_serial(Serial::MAX)
            .into_bytes()
    }

    pub fn prefix_of(pubhash: PubHash) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::PC)
            .push_pubhash(pubhash)
            .into_bytes()
    }

    pub fn decode_serial(key: &[u8]) -> Result<Serial, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        r.read_pubhash()?;
        r.read_timestamp()?;
        r.read_serial()
    }
}

/// `kpc`: `2 kind, 8 pubhash, 8 created_at, 5 serial`. By author+kind.
pub mod kpc {
    use super::*;

    pub fn key(kind: EventKind, pubhash: PubHash, created_at: Timestamp, serial: Serial) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::KPC)
            .push_kind(kind)
            .push_pubhash(pubhash)
            .push_timestamp(created_at)
            .push_serial(serial)
            .into_bytes()
    }

    pub fn range_bound(kind: EventKind, pubhash: PubHash, created_at: Timestamp) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::KPC)
            .push_kind(kind)
            .push_pubhash(pubhash)
            .push_timestamp(created_at)
            .push_serial(Serial::MAX)
            .into_bytes()
    }

    pub fn prefix_of(kind: EventKind, pubhash: PubHash) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::KPC)
            .push_kind(kind)
            .push_pubhash(pubhash)
            .into_bytes()
    }

    pub fn decode_serial(key: &[u8]) -> Result<Serial, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        r.read_kind()?;
        r.read_pubhash()?;
        r.read_timestamp()?;
        r.read_serial()
    }
}

/// `tc-`: `1 letter, 8 valuehash, 8 created_at, 5 serial`. By tag.
pub mod tc {
    use super::*;

    pub fn key(letter: u8, valuehash: IdentHash, created_at: Timestamp, serial: Serial) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TC)
            .push_u8(letter)
            .push_identhash(valuehash)
            .push_timestamp(created_at)
            .push_serial(serial)
            .into_bytes()
    }

    pub fn range_bound(letter: u8, valuehash: IdentHash, created_at: Timestamp) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TC)
            .push_u8(letter)
            .push_identhash(valuehash)
            .push_timestamp(created_at)
            .push_serial(Serial::MAX)
            .into_bytes()
    }

    pub fn prefix_of(letter: u8, valuehash: IdentHash) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TC)
            .push_u8(letter)
            .push_identhash(valuehash)
            .into_bytes()
    }

    pub fn decode_serial(key: &[u8]) -> Result<Serial, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        r.read_u8()?;
        r.read_identhash()?;
        r.read_timestamp()?;
        r.read_serial()
    }
}

/// `tkc`: `2 kind, 1 letter, 8 valuehash, 8 created_at, 5 serial`. Tag+kind.
pub mod tkc {
    use super::*;

    pub fn key(
        kind: EventKind,
        letter: u8,
        valuehash: IdentHash,
        created_at: Timestamp,
        serial: Serial,
    ) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TKC)
            .push_kind(kind)
            .push_u8(letter)
            .push_identhash(valuehash)
            .push_timestamp(created_at)
            .push_serial(serial)
            .into_bytes()
    }

    pub fn range_bound(kind: EventKind, letter: u8, valuehash: IdentHash, created_at: Timestamp) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TKC)
            .push_kind(kind)
            .push_u8(letter)
            .push_identhash(valuehash)
            .push_timestamp(created_at)
            .push_serial(Serial::MAX)
            .into_bytes()
    }

    pub fn prefix_of(kind: EventKind, letter: u8, valuehash: IdentHash) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TKC)
            .push_kind(kind)
            .push_u8(letter)
            .push_identhash(valuehash)
            .into_bytes()
    }

    pub fn decode_serial(key: &[u8]) -> Result<Serial, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        r.read_kind()?;
        r.read_u8()?;
        r.read_identhash()?;
        r.read_timestamp()?;
        r.read_serial()
    }
}

/// `tpc`: `8 pubhash, 1 letter, 8 valuehash, 8 created_at, 5 serial`. Tag+author.
pub mod tpc {
    use super::*;

    pub fn key(
        pubhash: PubHash,
        letter: u8,
        valuehash: IdentHash,
        created_at: Timestamp,
        serial: Serial,
    ) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TPC)
            .push_pubhash(pubhash)
            .push_u8(letter)
            .push_identhash(valuehash)
            .push_timestamp(created_at)
            .push_serial(serial)
            .into_bytes()
    }

    pub fn range_bound(pubhash: PubHash, letter: u8, valuehash: IdentHash, created_at: Timestamp) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TPC)
            .push_pubhash(pubhash)
            .push_u8(letter)
            .push_identhash(valuehash)
            .push_timestamp(created_at)
            .push_serial(Serial::MAX)
            .into_bytes()
    }

    pub fn prefix_of(pubhash: PubHash, letter: u8, valuehash: IdentHash) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TPC)
            .push_pubhash(pubhash)
            .push_u8(letter)
            .push_identhash(valuehash)
            .into_bytes()
    }

    pub fn decode_serial(key: &[u8]) -> Result<Serial, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        r.read_pubhash()?;
        r.read_u8()?;
        r.read_identhash()?;
        r.read_timestamp()?;
        r.read_serial()
    }
}

/// `tkp`: `2 kind, 8 pubhash, 1 letter, 8 valuehash, 8 created_at, 5
/// serial`. Full composite.
pub mod tkp {
    use super::*;

    #[allow(clippy::too_many_arguments)]
    pub fn key(
        kind: EventKind,
        pubhash: PubHash,
        letter: u8,
        valuehash: IdentHash,
        created_at: Timestamp,
        serial: Serial,
    ) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TKP)
            .push_kind(kind)
            .push_pubhash(pubhash)
            .push_u8(letter)
            .push_identhash(valuehash)
            .push_timestamp(created_at)
            .push_serial(serial)
            .into_bytes()
    }

    pub fn range_bound(
        kind: EventKind,
        pubhash: PubHash,
        letter: u8,
        valuehash: IdentHash,
        created_at: Timestamp,
    ) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TKP)
            .push_kind(kind)
            .push_pubhash(pubhash)
            .push_u8(letter)
            .push_identhash(valuehash)
            .push_timestamp(created_at)
            .push_serial(Serial::MAX)
            .into_bytes()
    }

    pub fn prefix_of(kind: EventKind, pubhash: PubHash, letter: u8, valuehash: IdentHash) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::TKP)
            .push_kind(kind)
            .push_pubhash(pubhash)
            .push_u8(letter)
            .push_identhash(valuehash)
            .into_bytes()
    }

    pub fn decode_serial(key: &[u8]) -> Result<Serial, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        r.read_kind()?;
        r.read_pubhash()?;
        r.read_u8()?;
        r.read_identhash()?;
        r.read_timestamp()?;
        r.read_serial()
    }
}

/// `exp`: `8 expiry_ts, 5 serial`. Expiration sweeper.
pub mod exp {
    use super::*;

    pub fn key(expiry: Timestamp, serial: Serial) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::EXP)
            .push_timestamp(expiry)
            .push_serial(serial)
            .into_bytes()
    }

    pub fn range_bound(expiry: Timestamp) -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::EXP)
            .push_timestamp(expiry)
            .push_serial(Serial::MAX)
            .into_bytes()
    }

    pub struct Decoded {
        pub expiry: Timestamp,
        pub serial: Serial,
    }

    pub fn decode(key: &[u8]) -> Result<Decoded, KeyTooShort> {
        let mut r = KeyReader::new(&key[3..]);
        Ok(Decoded {
            expiry: r.read_timestamp()?,
            serial: r.read_serial()?,
        })
    }
}

/// `ver`: `4 version`. Schema version singleton.
pub mod ver {
    use super::*;

    pub fn key() -> Vec<u8> {
        KeyBuilder::with_prefix(prefix::VER).into_bytes()
    }

    pub fn encode_value(version: u32) -> Vec<u8> {
        version.to_be_bytes().to_vec()
    }

    pub fn decode_value(bytes: &[u8]) -> Result<u32, KeyTooShort> {
        let arr: [u8; 4] = bytes.try_into().map_err(|_| KeyTooShort)?;
        Ok(u32::from_be_bytes(arr))
    }
}

