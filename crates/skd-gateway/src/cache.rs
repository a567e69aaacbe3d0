//! TTL file cache for onboarding directory responses.
//!
//! Entries are explicit JSON envelopes of (fetched-at, value) rather than
//! bare bodies keyed off file mtime, so freshness survives copies and
//! clock-skewed filesystems. Single-writer within one run; concurrent
//! runs against the same directory must be serialized externally.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    fetched_at: DateTime<Utc>,
    value: Value,
}

pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    pub fn new(dir: impl AsRef<Path>, ttl_hours: u64) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("create cache dir {dir:?}"))?;
        Ok(Self {
            dir,
            ttl: Duration::hours(ttl_hours as i64),
        })
    }

    /// Fresh value for `key`, or None when absent, stale, or unreadable.
    /// A corrupt entry is a cache miss, not an error; the caller refetches
    /// and overwrites it.
    pub fn get(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        let raw = fs::read_to_string(&path).ok()?;
        let envelope: Envelope = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(key, %err, "discarding corrupt cache entry");
                return None;
            }
        };
        if Utc::now() - envelope.fetched_at >= self.ttl {
            tracing::debug!(key, "cache entry expired");
            return None;
        }
        Some(envelope.value)
    }

    pub fn put(&self, key: &str, value: &Value) -> Result<()> {
        let envelope = Envelope {
            fetched_at: Utc::now(),
            value: value.clone(),
        };
        let raw = serde_json::to_string_pretty(&envelope).context("serialize cache envelope")?;
        fs::write(self.path_for(key), raw).with_context(|| format!("write cache entry {key}"))
    }

    /// Drop exactly this key. Removing a missing entry is a no-op.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("invalidate cache entry {key}")),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}
