//! Storage-engine and event-store error kinds.
//!
//! Grounded on `rostra-client-db::DbError`: transparent wrapping of `redb`'s
//! error types plus implicit `Location` capture on every variant that can
//! actually occur at more than one call site.

use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    Database {
        source: redb::DatabaseError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Table {
        source: redb::TableError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Storage {
        source: redb::StorageError,
        #[snafu(implicit)]
        location: Location,
    },
    Transaction {
        #[snafu(source(from(redb::TransactionError, Box::new)))]
        source: Box<redb::TransactionError>,
        #[snafu(implicit)]
        location: Location,
    },
    Commit {
        source: redb::CommitError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("schema version {db_ver} is newer than supported version {code_ver}"))]
    VersionTooHigh {
        db_ver: u32,
        code_ver: u32,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(transparent)]
    Encode { source: relay_core::binary::EncodeError },
    #[snafu(transparent)]
    Decode { source: relay_core::binary::DecodeError },
    #[snafu(display("corrupt index entry could not be decoded"))]
    KeyDecode {
        #[snafu(implicit)]
        location: Location,
    },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SaveError {
    #[snafu(transparent)]
    Storage { source: StorageError },
    #[snafu(display("an event with this id already exists"))]
    DuplicateId,
    #[snafu(display("a newer event already occupies this replaceable address"))]
    NewerReplacementExists,
    #[snafu(display("blocked by a deletion tombstone"))]
    BlockedByTombstone,
    #[snafu(display("recomputed id does not match the event's id"))]
    IdMismatch,
    #[snafu(display("signature does not verify"))]
    SignatureInvalid { source: secp256k1::Error },
}

pub type SaveResult<T> = std::result::Result<T, SaveError>;
