use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use client_core::SnapshotCache;
use shared::domain::{EventDetails, EventId};

/// One JSON file per event under a cache directory.
pub struct FileSnapshotCache {
    dir: PathBuf,
}

impl FileSnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, event_id: &EventId) -> PathBuf {
        let file_stem: String = event_id
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("event-{file_stem}.json"))
    }
}

impl SnapshotCache for FileSnapshotCache {
    fn load(&self, event_id: &EventId) -> Result<Option<EventDetails>> {
        let path = self.path_for(event_id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read cache file '{}'", path.display()))
            }
        };
        let details: EventDetails = serde_json::from_slice(&raw)
            .with_context(|| format!("corrupt cache file '{}'", path.display()))?;
        // Ids are sanitized into file names, so two ids can share a file.
        Ok(Some(details).filter(|details| &details.id == event_id))
    }

    fn store(&self, event_id: &EventId, details: &EventDetails) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create cache directory '{}'", self.dir.display())
        })?;
        let path = self.path_for(event_id);
        let raw = serde_json::to_vec_pretty(details)?;
        fs::write(&path, raw)
            .with_context(|| format!("failed to write cache file '{}'", path.display()))?;
        Ok(())
    }
}
