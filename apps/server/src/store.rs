//! Last-known price snapshot persisted as a small JSON file.

use floorwatch_core::PriceSnapshot;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Single-writer JSON store for the last notified snapshot.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored snapshot. A missing or unreadable file yields the
    /// zero-value default.
    pub fn load(&self) -> PriceSnapshot {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No memory file, starting from defaults");
                return PriceSnapshot::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read memory file");
                return PriceSnapshot::default();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Malformed memory file, using defaults");
            PriceSnapshot::default()
        })
    }

    /// Replace the stored snapshot. Written to a sibling temp file first and
    /// renamed over the original.
    pub fn save(&self, snapshot: &PriceSnapshot) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        snapshot.serialize(&mut ser)?;

        let tmp = self.tmp_path();
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
