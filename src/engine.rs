//! The public facade: `Get`/`Set`/`Delete`/`Sync`, orchestrating the cache,
//! data store, meta store, and write worker behind one global mutex.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::Cache;
use crate::datastore::DataStore;
use crate::error::EngineError;
use crate::metastore::MetaStore;
use crate::worker::{WorkItem, WorkQueue};

pub const DATA_FILE_NAME: &str = "andbdata.bin";
pub const META_FILE_NAME: &str = "andbmeta.bin";

const SYNC_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// A durable key/value engine backed by a data file and a meta file in a
/// store directory.
///
/// `cache` is guarded by the engine's global mutex, which every public
/// operation holds for its full duration. `data`/`meta` are reference
/// counted so the write worker can hold its own handles and perform durable
/// writes without the engine mutex held across that I/O; each still carries
/// its own internal mutex, independently redundant with the engine mutex
/// for this single-worker architecture.
pub struct Engine {
    cache: Mutex<Cache>,
    data: Arc<DataStore>,
    meta: Arc<MetaStore>,
    work: WorkQueue,
}

impl Engine {
    /// Opens (creating if absent) `andbdata.bin`/`andbmeta.bin` under
    /// `store_dir` and constructs an engine over them. The cache starts
    /// empty; it is populated lazily on the first `Get` miss.
    pub fn open(store_dir: impl AsRef<Path>) -> Result<Self> {
        let store_dir = store_dir.as_ref();
        let data_path = store_dir.join(DATA_FILE_NAME);
        let meta_path = store_dir.join(META_FILE_NAME);

        let data_file = open_store_file(&data_path).context("open data file")?;
        let meta_file = open_store_file(&meta_path).context("open meta file")?;

        Ok(Self::new(data_file, meta_file, meta_path))
    }

    /// Constructs an engine directly over already-open file handles.
    pub fn new(data_file: File, meta_file: File, meta_path: impl Into<PathBuf>) -> Self {
        Self {
            cache: Mutex::new(Cache::new()),
            data: Arc::new(DataStore::new(data_file)),
            meta: Arc::new(MetaStore::new(meta_file, meta_path)),
            work: WorkQueue::start(),
        }
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let mut cache = self.cache.lock();

        debug!(key, "begin get");

        if let Some(value) = cache.get(key) {
            return Ok(value.to_string());
        }

        load_store(&self.data, &self.meta, &mut cache)
            .map_err(|e| anyhow!("load store: {e}"))?;

        match cache.get(key) {
            Some(value) => Ok(value.to_string()),
            None => Err(EngineError::NotFound.into()),
        }
    }

    /// Enqueues the durable write, then synchronously updates the cache and
    /// returns — durable persistence is concurrent and may still be in
    /// flight when this returns.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut cache = self.cache.lock();

        debug!(key, value, "begin set");

        let data = self.data.clone();
        let meta = self.meta.clone();
        let work_key = key.to_string();
        let work_value = value.to_string();

        self.work.enqueue(WorkItem::new(
            format!("set {work_key} => {work_value}"),
            move || -> Result<()> {
                let (key_offset, value_offset) = data
                    .write_key_value(&work_key, &work_value)
                    .map_err(|e| anyhow!("write key/value data: {e}"))?;
                meta.write(&work_key, &work_value, key_offset, value_offset)
            },
        ));

        cache.set(key, value);

        Ok(())
    }

    /// Enqueues the meta-block removal, then synchronously deletes the
    /// cache entry and returns.
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.lock();

        debug!(key, "begin delete");

        let meta = self.meta.clone();
        let work_key = key.to_string();

        self.work.enqueue(WorkItem::new(
            format!("delete {work_key}"),
            move || -> Result<()> {
                meta.delete_block(&work_key)
                    .map_err(|e| anyhow!("delete meta block: {e}"))
            },
        ));

        cache.delete(key);

        Ok(())
    }

    /// Blocks until the work queue has drained. Any work that hit the
    /// retry bound and was dropped is silently lost: `Sync` cannot report
    /// a failure it was never told about.
    pub fn sync(&self) -> Result<()> {
        while !self.work.is_empty() {
            std::thread::sleep(SYNC_POLL_INTERVAL);
        }
        Ok(())
    }
}

fn open_store_file(path: &Path) -> Result<File> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o600)
            .open(path)
            .map_err(Into::into)
    }
    #[cfg(not(unix))]
    {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(Into::into)
    }
}

/// Rebuilds the cache by iterating every block in the meta file in file
/// order, verifying the three CRC32 scopes, and reading payloads from the
/// data file. Because later writes overwrite earlier ones in the cache,
/// the result reflects the most recent durable write per key. On any
/// corruption finding, hydration aborts and the cache is left in whatever
/// partial state it reached; a subsequent successful hydration will
/// re-overwrite those keys.
fn load_store(data: &DataStore, meta: &MetaStore, cache: &mut Cache) -> Result<()> {
    trace!("loading store");

    meta.for_each_block(|block| {
        let expected = block.calculate_crc32();
        if block.crc32 != expected {
            return Err(EngineError::CorruptBlockCrc {
                stored: block.crc32,
                expected,
            }
            .into());
        }

        let key_bytes = data
            .read_data(block.key_offset, block.key_length)
            .map_err(|e| EngineError::CorruptRead(format!("read key data: {e}")))?;
        let actual_key_crc32 = crc32fast::hash(&key_bytes);
        if actual_key_crc32 != block.key_crc32 {
            return Err(EngineError::CorruptKeyCrc {
                actual: actual_key_crc32,
                stored: block.key_crc32,
            }
            .into());
        }

        let value_bytes = data
            .read_data(block.value_offset, block.value_length)
            .map_err(|e| EngineError::CorruptRead(format!("read value data: {e}")))?;
        let actual_value_crc32 = crc32fast::hash(&value_bytes);
        if actual_value_crc32 != block.value_crc32 {
            return Err(EngineError::CorruptValueCrc {
                actual: actual_value_crc32,
                stored: block.value_crc32,
            }
            .into());
        }

        let key = String::from_utf8_lossy(&key_bytes).into_owned();
        let value = String::from_utf8_lossy(&value_bytes).into_owned();
        trace!(key, value, "loading");
        cache.set(key, value);

        Ok(())
    })
    .map_err(|e| anyhow!("for each block: {e}"))
}
