//! Directory-backed tagged cache that survives process restarts
//!
//! Layout:
//!
//! ```text
//! <root>/<sha256(tag)>/<sha256(key)>      one entry per file
//! <root>/.trash-<sha256(tag)>-<n>         tag directory being removed
//! ```
//!
//! Each entry file holds one JSON header line (`key`, `expires_at_ms`) followed
//! by the raw value bytes. Writes go to a temporary file in the same directory
//! and are renamed into place, so readers never see a partial entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;

use super::config::DEFAULT_MAX_VALUE_SIZE;
use super::error::{CacheError, CacheResult};
use super::key::CacheKey;
use super::provider::{CacheProvider, CacheStats};
use crate::identity::CacheTag;

const TRASH_PREFIX: &str = ".trash-";
const TMP_PREFIX: &str = ".tmp-";

#[derive(Debug, Serialize, Deserialize)]
struct EntryHeader {
    key: String,
    expires_at_ms: Option<u64>,
}

impl EntryHeader {
    fn is_live(&self, now_ms: u64) -> bool {
        self.expires_at_ms.is_none_or(|exp| now_ms <= exp)
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    invalidations: AtomicU64,
    errors: AtomicU64,
    scratch: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }
}

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Persistent cache that keeps one directory per tag
///
/// Entries outlive the process, so a cache built by one run serves lookups of
/// the next. [`invalidate_tag`](CacheProvider::invalidate_tag) renames the tag
/// directory out of the way before deleting it, so readers see either every
/// entry of the tag or none.
///
/// Entries are filed under the tag of their key. A write whose tag differs
/// from the key's tag is refused with [`CacheError::TagMismatch`].
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    counters: Arc<Counters>,
    max_value_size: usize,
}

impl FileCache {
    /// Cache rooted at `root`; the directory is created on first write
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            counters: Arc::default(),
            max_value_size: DEFAULT_MAX_VALUE_SIZE,
        }
    }

    #[must_use]
    pub const fn with_max_value_size(mut self, max: usize) -> Self {
        self.max_value_size = max;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tag_dir(&self, tag: &CacheTag) -> PathBuf {
        self.root.join(sha256_hex(tag.as_str()))
    }

    fn entry_path(&self, key: &CacheKey) -> (PathBuf, String) {
        let key_string = key.to_key_string();
        let path = self.tag_dir(key.tag()).join(sha256_hex(&key_string));
        (path, key_string)
    }

    fn io_error(&self, op: &str, path: &Path, e: &std::io::Error) -> CacheError {
        Counters::bump(&self.counters.errors, 1);
        CacheError::Connection(format!("{op} {}: {e}", path.display()))
    }

    /// Read the live value at `path`, dropping it if it expired
    async fn read_live(&self, path: &Path, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error("read", path, &e)),
        };

        let Some(split) = bytes.iter().position(|&b| b == b'\n') else {
            return Err(CacheError::Deserialization(format!(
                "{}: missing entry header",
                path.display()
            )));
        };
        let header: EntryHeader = serde_json::from_slice(&bytes[..split])
            .map_err(|e| CacheError::Deserialization(format!("{}: {e}", path.display())))?;

        if header.key != key {
            return Ok(None);
        }

        if !header.is_live(unix_millis(SystemTime::now())) {
            match fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(self.io_error("remove", path, &e)),
            }
            return Ok(None);
        }

        Ok(Some(bytes[split + 1..].to_vec()))
    }

    async fn write_entry(&self, dir: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(dir).await?;

        let n = self.counters.scratch.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!("{TMP_PREFIX}{}-{n}", std::process::id()));

        fs::write(&tmp, contents).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl CacheProvider for FileCache {
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Vec<u8>>> {
        let (path, key_string) = self.entry_path(key);

        let found = self.read_live(&path, &key_string).await?;
        if found.is_some() {
            Counters::bump(&self.counters.hits, 1);
        } else {
            Counters::bump(&self.counters.misses, 1);
        }
        Ok(found)
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &[u8],
        ttl: Option<Duration>,
        tag: &CacheTag,
    ) -> CacheResult<()> {
        if value.len() > self.max_value_size {
            return Err(CacheError::ValueTooLarge {
                size: value.len(),
                max: self.max_value_size,
            });
        }
        if key.tag() != tag {
            return Err(CacheError::TagMismatch {
                key_tag: key.tag().to_string(),
                tag: tag.to_string(),
            });
        }

        let (path, key_string) = self.entry_path(key);
        let header = EntryHeader {
            key: key_string,
            expires_at_ms: ttl.map(|ttl| {
                SystemTime::now()
                    .checked_add(ttl)
                    .map_or(u64::MAX, unix_millis)
            }),
        };

        let mut contents = serde_json::to_vec(&header)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        contents.push(b'\n');
        contents.extend_from_slice(value);

        let dir = self.tag_dir(tag);
        // A concurrent invalidation may move the directory away mid-write
        let mut result = self.write_entry(&dir, &path, &contents).await;
        if matches!(&result, Err(e) if e.kind() == ErrorKind::NotFound) {
            result = self.write_entry(&dir, &path, &contents).await;
        }
        result.map_err(|e| self.io_error("write", &path, &e))?;

        Counters::bump(&self.counters.sets, 1);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> CacheResult<bool> {
        let (path, _) = self.entry_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                Counters::bump(&self.counters.deletes, 1);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_error("remove", &path, &e)),
        }
    }

    async fn exists(&self, key: &CacheKey) -> CacheResult<bool> {
        let (path, key_string) = self.entry_path(key);
        Ok(self.read_live(&path, &key_string).await?.is_some())
    }

    async fn invalidate_tag(&self, tag: &CacheTag) -> CacheResult<u64> {
        let dir = self.tag_dir(tag);
        let n = self.counters.scratch.fetch_add(1, Ordering::Relaxed);
        let trash = self.root.join(format!(
            "{TRASH_PREFIX}{}-{}-{n}",
            sha256_hex(tag.as_str()),
            std::process::id()
        ));

        match fs::rename(&dir, &trash).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Counters::bump(&self.counters.invalidations, 1);
                return Ok(0);
            }
            Err(e) => return Err(self.io_error("rename", &dir, &e)),
        }

        let mut removed = 0u64;
        let mut entries = fs::read_dir(&trash)
            .await
            .map_err(|e| self.io_error("list", &trash, &e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.io_error("list", &trash, &e))?
        {
            if !entry.file_name().to_string_lossy().starts_with(TMP_PREFIX) {
                removed += 1;
            }
        }

        fs::remove_dir_all(&trash)
            .await
            .map_err(|e| self.io_error("remove", &trash, &e))?;

        Counters::bump(&self.counters.invalidations, 1);
        Counters::bump(&self.counters.deletes, removed);
        Ok(removed)
    }

    async fn health_check(&self) -> CacheResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| self.io_error("create", &self.root, &e))?;

        let metadata = fs::metadata(&self.root)
            .await
            .map_err(|e| self.io_error("inspect", &self.root, &e))?;
        if metadata.permissions().readonly() {
            return Err(CacheError::Connection(format!(
                "{} is read-only",
                self.root.display()
            )));
        }
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            sets: c.sets.load(Ordering::Relaxed),
            deletes: c.deletes.load(Ordering::Relaxed),
            invalidations: c.invalidations.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            size_bytes: None,
            entry_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::TableIdentity;

    fn tag(name: &str) -> CacheTag {
        CacheTag::explicit(name).unwrap()
    }

    fn users_key(t: &CacheTag) -> CacheKey {
        CacheKey::table(t, &TableIdentity::new(Some("test"), "users"))
    }

    #[tokio::test]
    async fn test_entries_survive_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let t = tag("persist");
        let key = users_key(&t);

        FileCache::new(dir.path())
            .set(&key, b"descriptor", None, &t)
            .await
            .unwrap();

        let reopened = FileCache::new(dir.path());
        assert_eq!(reopened.get(&key).await.unwrap(), Some(b"descriptor".to_vec()));
        assert!(reopened.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_root_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("not-created"));
        let t = tag("a");

        assert!(cache.get(&users_key(&t)).await.unwrap().is_none());
        assert!(!cache.delete(&users_key(&t)).await.unwrap());
        assert_eq!(cache.invalidate_tag(&t).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let t = tag("a");
        let key = users_key(&t);

        cache.set(&key, b"one", None, &t).await.unwrap();
        cache.set(&key, b"two", None, &t).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn test_value_containing_newlines_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let t = tag("a");
        let key = users_key(&t);
        let value = b"{\n  \"kind\": \"table\"\n}\n".to_vec();

        cache.set(&key, &value, None, &t).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let t = tag("a");
        let key = users_key(&t);

        cache.set(&key, b"x", None, &t).await.unwrap();
        assert!(cache.delete(&key).await.unwrap());
        assert!(!cache.delete(&key).await.unwrap());
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_tag_only_touches_that_tag() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let (a, b) = (tag("a"), tag("b"));
        let a1 = users_key(&a);
        let a2 = CacheKey::freshness(&a);
        let b1 = users_key(&b);

        cache.set(&a1, b"1", None, &a).await.unwrap();
        cache.set(&a2, b"2", None, &a).await.unwrap();
        cache.set(&b1, b"3", None, &b).await.unwrap();

        assert_eq!(cache.invalidate_tag(&a).await.unwrap(), 2);

        assert!(cache.get(&a1).await.unwrap().is_none());
        assert!(!cache.exists(&a2).await.unwrap());
        assert_eq!(cache.get(&b1).await.unwrap(), Some(b"3".to_vec()));

        // Nothing is left behind next to the tag directories
        let mut leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        leftovers.sort();
        assert_eq!(leftovers, vec![sha256_hex(b.as_str())]);
    }

    #[tokio::test]
    async fn test_writes_after_invalidation_start_a_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let t = tag("a");
        let key = users_key(&t);

        cache.set(&key, b"old", None, &t).await.unwrap();
        cache.invalidate_tag(&t).await.unwrap();
        cache.set(&key, b"new", None, &t).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn test_mismatched_write_tag_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let key = users_key(&tag("a"));

        let err = cache.set(&key, b"x", None, &tag("shared")).await.unwrap_err();

        assert!(matches!(err, CacheError::TagMismatch { .. }));
        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiry_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let t = tag("a");
        let key = users_key(&t);

        cache
            .set(&key, b"x", Some(Duration::from_millis(20)), &t)
            .await
            .unwrap();
        assert!(cache.exists(&key).await.unwrap());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.get(&key).await.unwrap().is_none());
        let (path, _) = cache.entry_path(&key);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_value_too_large_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path()).with_max_value_size(8);
        let t = tag("a");
        let key = users_key(&t);

        let err = cache.set(&key, &[0u8; 9], None, &t).await.unwrap_err();
        assert!(matches!(err, CacheError::ValueTooLarge { size: 9, max: 8 }));

        cache.set(&key, &[0u8; 8], None, &t).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let t = tag("a");
        let key = users_key(&t);

        cache.set(&key, b"x", None, &t).await.unwrap();
        let (path, _) = cache.entry_path(&key);
        std::fs::write(&path, b"not a header").unwrap();

        let err = cache.get(&key).await.unwrap_err();
        assert!(matches!(err, CacheError::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_stats_count_operations() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path());
        let t = tag("a");
        let key = users_key(&t);

        cache.set(&key, b"x", None, &t).await.unwrap();
        cache.get(&key).await.unwrap();
        cache.get(&CacheKey::freshness(&t)).await.unwrap();
        cache.invalidate_tag(&t).await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.invalidations, 1);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.entry_count, None);
    }

    #[tokio::test]
    async fn test_health_check_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("cache");
        let cache = FileCache::new(&root);

        cache.health_check().await.unwrap();
        assert!(root.is_dir());
    }
}
