use crate::domain::ports::KeyValueStorage;
use crate::error::{CheckoutError, Result};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;

/// Column family holding fragment-cache entries.
pub const CF_FRAGMENTS: &str = "fragments";

/// Persistent [`KeyValueStorage`] on RocksDB, used by the CLI so cached
/// fragments survive between invocations the way `localStorage` survives
/// page loads.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStorage {
    db: Arc<DB>,
}

impl RocksDbStorage {
    /// Opens or creates the database at `path`, creating the column family if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_FRAGMENTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(CF_FRAGMENTS)
            .ok_or_else(|| CheckoutError::Storage("fragments column family not found".to_string()))
    }
}

impl KeyValueStorage for RocksDbStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let cf = self.cf()?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| CheckoutError::Storage(format!("non-UTF-8 value for {key}: {e}"))),
            None => Ok(None),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let cf = self.cf()?;
        self.db.put_cf(cf, key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let cf = self.cf()?;
        self.db.delete_cf(cf, key.as_bytes())?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let cf = self.cf()?;
        let mut keys = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }
}
