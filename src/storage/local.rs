//! Local filesystem cache backend.
//!
//! One JSON envelope per key, named after the SHA-256 of the key so any tag
//! maps to a safe file name.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── 3f1c…e9.json   # {"key": "ow:stats:pc:Player-1234", "expires_at": …, "value": …}
//! └── a07b…12.json
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::CacheStore;

/// Distinguishes temp files of concurrent writers within one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk form of one cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    key: String,
    expires_at: DateTime<Utc>,
    value: String,
}

impl Envelope {
    fn is_fresh(&self) -> bool {
        Utc::now() < self.expires_at
    }
}

/// Local filesystem cache backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// File holding the entry of a key.
    fn path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root_dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Private temp file next to `path`, unique per write.
    fn tmp_path(path: &Path) -> PathBuf {
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("{}-{n}.tmp", std::process::id()))
    }

    /// Write bytes atomically (write to temp, then rename).
    ///
    /// Concurrent writers of one key never share a temp file; the last
    /// rename wins.
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.root_dir).await?;

        let tmp = Self::tmp_path(path);
        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.flush().await?;
            drop(file);
            tokio::fs::rename(&tmp, path).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::Io(e));
        }
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_envelope(path: &Path) -> Result<Option<Envelope>> {
        match Self::read_bytes(path).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| AppError::cache(format!("corrupt entry {}: {e}", path.display()))),
            None => Ok(None),
        }
    }

    async fn remove_file(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl CacheStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        let Some(envelope) = Self::read_envelope(&path).await? else {
            return Ok(None);
        };
        if envelope.key != key {
            return Err(AppError::cache(format!(
                "entry {} holds key {}",
                path.display(),
                envelope.key
            )));
        }
        if !envelope.is_fresh() {
            Self::remove_file(&path).await?;
            return Ok(None);
        }
        Ok(Some(envelope.value.into_bytes()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let ttl = TimeDelta::from_std(ttl).map_err(AppError::cache)?;
        let value = String::from_utf8(value.to_vec()).map_err(AppError::cache)?;
        let envelope = Envelope {
            key: key.to_string(),
            expires_at: Utc::now() + ttl,
            value,
        };
        let bytes = serde_json::to_vec(&envelope)?;
        self.write_bytes(&self.path(key), &bytes).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_envelope(&path).await {
                Ok(Some(envelope)) if envelope.is_fresh() => {
                    if envelope.key.starts_with(prefix) {
                        keys.push(envelope.key);
                    }
                }
                Ok(Some(_)) => Self::remove_file(&path).await?,
                Ok(None) => {}
                Err(e) => log::warn!("Skipping cache file: {e}"),
            }
        }
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        Self::remove_file(&self.path(key)).await
    }
}
