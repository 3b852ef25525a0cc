//! File-backed key-value bucket.
//!
//! A single named bucket persisted in one file, opened once per process.
//! Keys iterate in sorted order. One write transaction commits at a time;
//! reads snapshot the bucket and never block behind a writer for the
//! duration of a scan. Every committed write rewrites the bucket image
//! through a temp file and rename, so a crash leaves either the old or the
//! new image, never a torn one.

use crate::error::{Result, TrackerError};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Magic bytes for the bucket file.
const BUCKET_MAGIC: &[u8; 4] = b"BKT\0";

/// Current bucket format version.
const BUCKET_VERSION: u8 = 1;

/// A named, file-backed key-value bucket.
pub struct Bucket {
    /// Path to the bucket file.
    path: PathBuf,

    /// Bucket name, verified against the file header on open.
    name: String,

    /// Lock file for exclusive access.
    _lock_file: File,

    /// In-memory image of the bucket.
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,

    /// Serializes write transactions.
    write_lock: Mutex<()>,
}

impl Bucket {
    /// Open a bucket file, creating it if absent.
    pub fn open(path: impl AsRef<Path>, name: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Acquire lock
        let lock_file = Self::acquire_lock(&path)?;

        let exists = path.exists();
        let entries = if exists {
            Self::load(&path, name)?
        } else {
            BTreeMap::new()
        };

        let bucket = Self {
            path,
            name: name.to_string(),
            _lock_file: lock_file,
            entries: RwLock::new(entries),
            write_lock: Mutex::new(()),
        };

        // Initialize the file so a later open finds a valid header
        if !exists {
            bucket.persist(&bucket.entries.read())?;
        }

        Ok(bucket)
    }

    /// Snapshot of all key/value pairs, in key-sorted order.
    pub fn scan(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Snapshot of all keys, in sorted order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of entries in the bucket.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the bucket holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Write one key/value pair in a single write transaction.
    ///
    /// An existing key is overwritten in place. The in-memory image is
    /// swapped only after the new file image is durable.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let _txn = self.write_lock.lock();

        let mut next = self.entries.read().clone();
        next.insert(key.to_vec(), value.to_vec());
        self.persist(&next)?;

        *self.entries.write() = next;
        Ok(())
    }

    /// Delete one key in a single write transaction.
    ///
    /// Deleting an absent key is not an error.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let _txn = self.write_lock.lock();

        let mut next = self.entries.read().clone();
        next.remove(key);
        self.persist(&next)?;

        *self.entries.write() = next;
        Ok(())
    }

    /// Write the bucket image atomically: temp file, fsync, rename.
    fn persist(&self, entries: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<()> {
        let mut buf = Vec::new();

        // Header
        buf.extend_from_slice(BUCKET_MAGIC);
        buf.push(BUCKET_VERSION);
        buf.extend_from_slice(&(self.name.len() as u16).to_le_bytes());
        buf.extend_from_slice(self.name.as_bytes());
        buf.extend_from_slice(&(entries.len() as u64).to_le_bytes());

        // Entries
        for (key, value) in entries {
            buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
            buf.extend_from_slice(key);
            buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
            buf.extend_from_slice(value);
            buf.extend_from_slice(&crc32fast::hash(value).to_le_bytes());
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = File::create(&tmp).map_err(storage_err)?;
        file.write_all(&buf).map_err(storage_err)?;
        file.sync_all().map_err(storage_err)?;
        fs::rename(&tmp, &self.path).map_err(storage_err)?;

        Ok(())
    }

    /// Parse a bucket file into its in-memory image.
    fn load(path: &Path, name: &str) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        let data = fs::read(path)?;
        let mut r = Reader { data: &data, pos: 0 };

        // Magic
        let magic = r.take(4)?;
        if magic != &BUCKET_MAGIC[..] {
            return Err(TrackerError::InvalidFormat("invalid bucket magic".into()));
        }

        // Version
        let version = r.u8()?;
        if version != BUCKET_VERSION {
            return Err(TrackerError::InvalidFormat(format!(
                "unsupported bucket version: {version}"
            )));
        }

        // Name
        let name_len = r.u16()? as usize;
        let stored_name = r.take(name_len)?;
        if stored_name != name.as_bytes() {
            return Err(TrackerError::InvalidFormat(format!(
                "bucket name mismatch: expected {name:?}, found {:?}",
                String::from_utf8_lossy(stored_name)
            )));
        }

        // Entries
        let count = r.u64()?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let key_len = r.u32()? as usize;
            let key = r.take(key_len)?.to_vec();

            let val_len = r.u32()? as usize;
            let value = r.take(val_len)?.to_vec();

            let stored = r.u32()?;
            let computed = crc32fast::hash(&value);
            if stored != computed {
                return Err(TrackerError::ChecksumMismatch {
                    expected: stored,
                    got: computed,
                });
            }

            entries.insert(key, value);
        }

        Ok(entries)
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = path.with_extension("lock");
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| TrackerError::Locked)?;

        Ok(lock_file)
    }
}

fn storage_err(e: std::io::Error) -> TrackerError {
    TrackerError::Storage(e.to_string())
}

/// Byte cursor over a bucket image.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| TrackerError::Corruption("truncated bucket file".into()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }
}
