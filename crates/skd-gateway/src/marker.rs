//! Last-processed-epoch marker.
//!
//! One file, one integer. Absent or corrupt reads as "never run"; the
//! marker is written exactly once, at the end of a successful run.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct EpochMarker {
    path: PathBuf,
}

impl EpochMarker {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Last fully processed epoch, or 0 when the marker is missing or
    /// does not parse.
    pub fn last_run(&self) -> u64 {
        match fs::read_to_string(&self.path) {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(path = ?self.path, "corrupt epoch marker, treating as never run");
                0
            }),
            Err(_) => 0,
        }
    }

    pub fn record(&self, epoch: u64) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create marker dir {parent:?}"))?;
        }
        fs::write(&self.path, epoch.to_string())
            .with_context(|| format!("write epoch marker {:?}", self.path))
    }
}
