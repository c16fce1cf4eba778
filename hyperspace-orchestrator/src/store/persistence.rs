//! Durable JSON snapshotting for [`super::Store`].
//!
//! Every mutation re-serializes the whole store and lands it via a
//! write-to-staging-file-then-rename sequence, so a reader never observes a
//! half-written snapshot. The previous snapshot is kept alongside the new
//! one as `state.json.bak` before the rename commits, since a commissioning
//! run or deployment history is expensive to reconstruct by hand if a write
//! lands corrupt.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

pub fn save_state<T: Serialize>(snapshot_path: &Path, state: &T) -> Result<()> {
    if let Some(dir) = snapshot_path.parent() {
        std::fs::create_dir_all(dir).context("failed to create state directory")?;
    }

    let json = serde_json::to_string_pretty(state).context("failed to serialize store snapshot")?;

    let staging_path = snapshot_path.with_extension("json.staging");
    let mut staging_file = std::fs::File::create(&staging_path).context("failed to create staging snapshot file")?;
    staging_file
        .write_all(json.as_bytes())
        .context("failed to write staging snapshot file")?;
    staging_file.sync_all().context("failed to sync staging snapshot file")?;

    if snapshot_path.exists() {
        let backup_path = snapshot_path.with_extension("json.bak");
        let _ = std::fs::copy(snapshot_path, &backup_path);
    }

    std::fs::rename(&staging_path, snapshot_path).context("failed to commit staging snapshot file")?;
    Ok(())
}

pub fn load_state<T: DeserializeOwned + Default>(snapshot_path: &Path) -> Result<T> {
    if !snapshot_path.exists() {
        return Ok(T::default());
    }
    let file = std::fs::File::open(snapshot_path).context("failed to open store snapshot")?;
    let reader = std::io::BufReader::new(file);
    serde_json::from_reader(reader).context("failed to deserialize store snapshot")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Sample {
        count: u32,
    }

    #[test]
    fn load_missing_file_returns_default() {
        let dir = std::env::temp_dir().join(format!("hyperspace-persist-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("state.json");
        let loaded: Sample = load_state(&path).unwrap();
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn save_then_load_round_trips_and_leaves_a_backup_of_the_prior_snapshot() {
        let dir = std::env::temp_dir().join(format!("hyperspace-persist-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("state.json");

        save_state(&path, &Sample { count: 1 }).unwrap();
        save_state(&path, &Sample { count: 2 }).unwrap();

        let loaded: Sample = load_state(&path).unwrap();
        assert_eq!(loaded, Sample { count: 2 });

        let backup: Sample = load_state(&path.with_extension("json.bak")).unwrap();
        assert_eq!(backup, Sample { count: 1 });

        std::fs::remove_dir_all(&dir).ok();
    }
}
