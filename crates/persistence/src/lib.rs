#![deny(warnings)]

//! Snapshot store for the in-progress run: one pretty-printed JSON document.
//!
//! A single writer is assumed. Saves go through a sibling temp file and a
//! rename, so a reader never sees a half-written snapshot.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the snapshot file.
pub const STATE_ENV: &str = "DILEMMA_SIM_STATE";

/// Used when neither a flag nor the environment names a file.
pub const DEFAULT_STATE_PATH: &str = "./saves/sim_state.json";

/// `DILEMMA_SIM_STATE` when set and non-empty, else `./saves/sim_state.json`.
pub fn default_state_path() -> PathBuf {
    match std::env::var(STATE_ENV) {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p.trim()),
        _ => PathBuf::from(DEFAULT_STATE_PATH),
    }
}

/// An explicit path wins over the environment and the default.
pub fn resolve_state_path(explicit: Option<&Path>) -> PathBuf {
    explicit.map(Path::to_path_buf).unwrap_or_else(default_state_path)
}

pub fn exists(path: &Path) -> bool {
    path.is_file()
}

pub fn load(path: &Path) -> Result<Value> {
    if !exists(path) {
        bail!(
            "no saved simulation at {} (run `start` first)",
            path.display()
        );
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("snapshot {} is not valid JSON", path.display()))?;
    if !value.is_object() {
        bail!("snapshot {} is not a JSON object", path.display());
    }
    debug!(path = %path.display(), bytes = text.len(), "snapshot loaded");
    Ok(value)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "sim_state.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

pub fn save(path: &Path, snapshot: &Value) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating save directory {}", parent.display()))?;
    }
    let text = serde_json::to_string_pretty(snapshot).context("encoding snapshot")?;
    let tmp = temp_path(path);
    fs::write(&tmp, text.as_bytes())
        .with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("replacing snapshot {}", path.display()))?;
    debug!(path = %path.display(), bytes = text.len(), "snapshot saved");
    Ok(())
}

/// Removes the snapshot; `false` when there was none.
pub fn delete(path: &Path) -> Result<bool> {
    if !exists(path) {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("deleting snapshot {}", path.display()))?;
    info!(path = %path.display(), "snapshot deleted");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/run.json");
        let snap = json!({"scenario": "intel_mosaic", "tick": 4, "world": {"cash": "10.50"}});
        save(&path, &snap).unwrap();
        assert_eq!(load(&path).unwrap(), snap);
        assert!(!temp_path(&path).exists());
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        save(&path, &json!({"tick": 1})).unwrap();
        save(&path, &json!({"tick": 2})).unwrap();
        assert_eq!(load(&path).unwrap()["tick"], json!(2));
    }

    #[test]
    fn missing_and_corrupt_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = load(&path).unwrap_err().to_string();
        assert!(err.contains("no saved simulation"));
        fs::write(&path, "{ not json").unwrap();
        assert!(load(&path).is_err());
        fs::write(&path, "[1, 2]").unwrap();
        assert!(load(&path).is_err());
    }

    #[test]
    fn delete_reports_whether_anything_was_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        assert!(!delete(&path).unwrap());
        save(&path, &json!({})).unwrap();
        assert!(delete(&path).unwrap());
        assert!(!exists(&path));
    }

    #[test]
    fn explicit_path_wins() {
        let p = Path::new("/tmp/elsewhere.json");
        assert_eq!(resolve_state_path(Some(p)), p.to_path_buf());
    }
}
