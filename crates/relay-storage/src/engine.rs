//! The storage engine: transactional `view`/`update` scopes over one
//! `redb` database, prefix iteration, and monotonic serial allocation.
//!
//! Grounded on `rostra-client-db::{Database, WriteTransactionCtx}`: the
//! commit-hook pattern is carried over unchanged; `redb_bincode`'s
//! table-per-type wrapper is dropped in favor of the raw `&[u8]`/`&[u8]`
//! table in [`crate::schema`], since the index keys need exact byte
//! control the bincode wrapper doesn't give us. The `view`/`update` names
//! themselves are not the teacher's own method names (see DESIGN.md).

use std::ops;
use std::path::{Path, PathBuf};

use redb::{ReadableTable as _, TableDefinition};
use snafu::ResultExt as _;

use crate::error::{
    CommitSnafu, DatabaseSnafu, StorageError, StorageResult, TransactionSnafu, VersionTooHighSnafu,
};
use crate::schema::{self, TABLE};

/// Configuration accepted from the containing application.
///
/// `block_cache_size`/`block_size`/`log_level` are tuning knobs for KV
/// stores like RocksDB; `redb` has no equivalent internal logger or block
/// cache to wire them to, so they are recorded for observability but have
/// no effect. `data_dir` is the one option that actually changes behavior.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
    pub block_cache_size: usize,
    pub block_size: usize,
    pub log_level: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            block_cache_size: 64 * 1024 * 1024,
            block_size: 4096,
            log_level: "info".to_string(),
        }
    }
}

const LOG_TARGET: &str = "relay::storage";

/// Current schema version; bump when a migration is added.
const SCHEMA_VERSION: u32 = 1;

/// Counter table for [`Storage::next_serial`]: kept separate from the flat
/// index table since it's engine bookkeeping, not an index family.
const COUNTER_TABLE: TableDefinition<(), u64> = TableDefinition::new("relay_serial_counter");

/// A write transaction with post-commit hooks, so side effects that must
/// only happen after a successful commit (subscription-broker delivery)
/// can be registered while still inside the transaction closure.
pub struct WriteTransactionCtx {
    dbtx: redb::WriteTransaction,
    on_commit: std::sync::Mutex<Vec<Box<dyn FnOnce() + Send + 'static>>>,
}

impl From<redb::WriteTransaction> for WriteTransactionCtx {
    fn from(dbtx: redb::WriteTransaction) -> Self {
        Self {
            dbtx,
            on_commit: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl ops::Deref for WriteTransactionCtx {
    type Target = redb::WriteTransaction;

    fn deref(&self) -> &Self::Target {
        &self.dbtx
    }
}

impl ops::DerefMut for WriteTransactionCtx {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.dbtx
    }
}

impl WriteTransactionCtx {
    pub fn on_commit(&self, f: impl FnOnce() + Send + 'static) {
        self.on_commit
            .lock()
            .expect("poisoned lock")
            .push(Box::new(f));
    }

    fn commit(self) -> Result<(), redb::CommitError> {
        let Self { dbtx, on_commit } = self;
        dbtx.commit()?;
        for hook in on_commit.lock().expect("poisoned lock").drain(..) {
            hook();
        }
        Ok(())
    }

    /// Atomically allocates the next 40-bit serial as part of this
    /// transaction.
    pub fn next_serial(&self) -> StorageResult<relay_core::id::Serial> {
        let mut counter = self.dbtx.open_table(COUNTER_TABLE)?;
        let next = counter
            .get(())?
            .map(|g| g.value())
            .unwrap_or(0);
        counter.insert((), next + 1)?;
        Ok(relay_core::id::Serial::new(next))
    }

    pub fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let table = self.dbtx.open_table(TABLE)?;
        Ok(table.get(key)?.map(|g| g.value().to_vec()))
    }

    pub fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut table = self.dbtx.open_table(TABLE)?;
        table.insert(key, value)?;
        Ok(())
    }

    pub fn delete(&self, key: &[u8]) -> StorageResult<()> {
        let mut table = self.dbtx.open_table(TABLE)?;
        table.remove(key)?;
        Ok(())
    }
}

pub struct Storage {
    inner: redb::Database,
}

impl Storage {
    pub fn open_in_memory() -> StorageResult<Self> {
        tracing::debug!(target: LOG_TARGET, "opening in-memory storage");
        let inner = redb::Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .context(DatabaseSnafu)?;
        Self::open_inner(inner)
    }

    pub fn open(config: &StorageConfig) -> StorageResult<Self> {
        let data_dir = config
            .data_dir
            .as_deref()
            .expect("data_dir required to open a persistent store");
        Self::open_path(data_dir)
    }

    pub fn open_path(data_dir: &Path) -> StorageResult<Self> {
        tracing::debug!(target: LOG_TARGET, path = %data_dir.display(), "opening storage");
        std::fs::create_dir_all(data_dir).ok();
        let inner = redb::Database::create(data_dir.join("relay.redb")).context(DatabaseSnafu)?;
        Self::open_inner(inner)
    }

    fn open_inner(inner: redb::Database) -> StorageResult<Self> {
        let storage = Self { inner };
        storage.update::<_, StorageError>(|tx| {
            tx.open_table(TABLE)?;
            tx.open_table(COUNTER_TABLE)?;
            Ok(())
        })?;
        storage.run_migrations()?;
        Ok(storage)
    }

    fn run_migrations(&self) -> StorageResult<()> {
        self.update(|tx| {
            let current = match tx.get(&schema::ver::key())? {
                Some(bytes) => schema::ver::decode_value(&bytes).unwrap_or(0),
                None => 0,
            };

            if current > SCHEMA_VERSION {
                return VersionTooHighSnafu {
                    db_ver: current,
                    code_ver: SCHEMA_VERSION,
                }
                .fail();
            }

            if current < SCHEMA_VERSION {
                tracing::info!(target: LOG_TARGET, from = current, to = SCHEMA_VERSION, "running migrations");
                tx.set(&schema::ver::key(), &schema::ver::encode_value(SCHEMA_VERSION))?;
            }

            Ok(())
        })
    }

    /// Read-only transactional scope. May run concurrently with other
    /// `view` scopes against a consistent snapshot.
    pub fn view<T, E>(&self, f: impl FnOnce(&redb::ReadTransaction) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let tx = self.inner.begin_read().context(TransactionSnafu)?;
        f(&tx)
    }

    /// Read-write transactional scope. All writes land atomically on
    /// success, or none do.
    pub fn update<T, E>(&self, f: impl FnOnce(&WriteTransactionCtx) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let dbtx = WriteTransactionCtx::from(self.inner.begin_write().context(TransactionSnafu)?);
        let result = f(&dbtx)?;
        dbtx.commit().context(CommitSnafu)?;
        Ok(result)
    }

    /// Lazily iterates all keys with the given `prefix`, in ascending or
    /// descending key order.
    pub fn prefix_iter(
        &self,
        tx: &redb::ReadTransaction,
        prefix: &[u8],
        reverse: bool,
    ) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let table = tx.open_table(TABLE)?;
        let upper = prefix_upper_bound(prefix);
        let range = match &upper {
            Some(upper) => table.range(prefix..upper.as_slice())?,
            None => table.range(prefix..)?,
        };

        let mut out: Vec<(Vec<u8>, Vec<u8>)> = range
            .filter_map(|r| r.ok())
            .map(|(k, v)| (k.value().to_vec(), v.value().to_vec()))
            .collect();

        if reverse {
            out.reverse();
        }
        Ok(out)
    }
}

/// The smallest byte string greater than every string starting with
/// `prefix`, used as an exclusive upper range bound. `None` if `prefix` is
/// all `0xff` (no finite upper bound exists, so the range is unbounded).
fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last != 0xff {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serials_are_monotonic_and_never_reused() {
        let storage = Storage::open_in_memory().unwrap();
        let serials: Vec<_> = (0..5)
            .map(|_| storage.update::<_, StorageError>(|tx| tx.next_serial()).unwrap())
            .collect();
        for w in serials.windows(2) {
            assert!(w[0].0 < w[1].0);
        }
    }

    #[test]
    fn prefix_iter_respects_prefix_nesting() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .update::<_, StorageError>(|tx| {
                tx.set(b"kc-\x00\x01AAAAA", &[])?;
                tx.set(b"kc-\x00\x02BBBBB", &[])?;
                tx.set(b"pc-XXXXXXXXXXXXXXXXXX", &[])?;
                Ok(())
            })
            .unwrap();

        storage
            .view::<_, StorageError>(|tx| {
                let hits = storage.prefix_iter(tx, b"kc-", false)?;
                assert_eq!(hits.len(), 2);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn prefix_upper_bound_handles_all_ff() {
        assert_eq!(prefix_upper_bound(&[0xff, 0xff]), None);
        assert_eq!(prefix_upper_bound(b"ab"), Some(b"ac".to_vec()));
    }

    #[test]
    fn on_disk_storage_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let storage = Storage::open_path(dir.path()).unwrap();
        let serial = storage.update::<_, StorageError>(|tx| tx.next_serial()).unwrap();
        storage
            .update::<_, StorageError>(|tx| tx.set(b"kc-\x00\x01AAAAA", b"payload"))
            .unwrap();
        drop(storage);

        let reopened = Storage::open_path(dir.path()).unwrap();
        let value = reopened
            .view::<_, StorageError>(|tx| {
                let table = tx.open_table(TABLE)?;
                Ok(table.get(b"kc-\x00\x01AAAAA".as_slice())?.map(|g| g.value().to_vec()))
            })
            .unwrap();
        assert_eq!(value.as_deref(), Some(b"payload".as_slice()));

        let next = reopened.update::<_, StorageError>(|tx| tx.next_serial()).unwrap();
        assert!(next.0 > serial.0, "serial counter must survive reopen");
    }
}
