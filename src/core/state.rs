use crate::core::tracker::TrackerSnapshot;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// JSON file holding the tracker snapshot between runs.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file doesn't exist yet.
    pub fn load(&self) -> Result<Option<TrackerSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    pub fn save(&self, snapshot: &TrackerSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace state file: {}", self.path.display()))?;

        tracing::debug!(path = ?self.path, items = snapshot.items.len(), "Saved tracker state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tracker::{TrackerConfig, VinTracker};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::new(dir.path().join("state.json"));
        assert!(state.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::new(dir.path().join("nested").join("state.json"));
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let mut tracker = VinTracker::new(TrackerConfig::default());
        tracker.record_observation("VIN1", now, true);
        state.save(&tracker.snapshot(now)).unwrap();

        let loaded = state.load().unwrap().unwrap();
        assert_eq!(loaded.saved_at, now);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].id, "VIN1");
        assert_eq!(loaded.items[0].notification_count, 1);
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = StateFile::new(&path).load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse state file"));
    }
}
