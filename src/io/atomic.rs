//! Atomic JSON file I/O: write to a sibling temp file, fsync it, rename
//! into place, and retain the previous version as `.bak`.

use crate::error::{CoreError, ErrorCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_path_for(target: &Path) -> PathBuf {
    let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
    let pid = std::process::id();
    let file_name = target.file_name().and_then(|n| n.to_str()).unwrap_or("state");
    let temp_name = format!(".{file_name}.tmp.{pid}.{counter}");
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(temp_name),
        _ => PathBuf::from(temp_name),
    }
}

/// Serialize `value` as pretty JSON and write it to `target` atomically.
/// If `target` already exists, its previous contents are copied to
/// `target` + `.bak` before the rename, so a corrupt write never loses
/// the last-known-good state.
pub fn write_json_atomically<T: Serialize>(target: &Path, value: &T) -> Result<(), CoreError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CoreError::ConfigParse { reason: format!("failed to serialize {}: {e}", target.display()) })?;

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| CoreError::WriteFailed { path: parent.to_path_buf(), source })?;
        }
    }

    let temp = temp_path_for(target);
    {
        let mut file = File::create(&temp).map_err(|source| CoreError::WriteFailed { path: temp.clone(), source })?;
        file.write_all(json.as_bytes()).map_err(|source| CoreError::WriteFailed { path: temp.clone(), source })?;
        file.sync_all().map_err(|source| CoreError::WriteFailed { path: temp.clone(), source })?;
    }

    if target.exists() {
        let backup = backup_path_for(target);
        let _ = fs::copy(target, &backup);
    }

    fs::rename(&temp, target).map_err(|source| {
        log::warn!("{}: atomic rename failed, temp file left at {}", ErrorCode::IO_ATOMIC_RENAME, temp.display());
        CoreError::AtomicRenameFailed { temp: temp.clone(), target: target.to_path_buf(), source }
    })
}

pub fn backup_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// Read and deserialize a JSON file. Missing files are not distinguished
/// here; callers that want "absent means default" should check
/// `path.exists()` first.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let bytes = fs::read(path).map_err(|source| CoreError::ReadFailed { path: path.to_path_buf(), source })?;
    serde_json::from_slice(&bytes).map_err(|e| CoreError::StateCorrupt {
        path: path.to_path_buf(),
        backup: backup_path_for(path),
        reason: e.to_string(),
    })
}
