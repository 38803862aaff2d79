use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use chrono::Utc;
use tracing::debug;

use crate::emoji::{Emoji, EmojiCatalog, EmojiListResponse};
use crate::error::{AppError, Result};

/// Raw admin-list responses written to disk, one file per run. File
/// names sort chronologically, so "the previous run" is an offset from
/// the end of the sorted listing.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn write(&self, response: &EmojiListResponse) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| AppError::WriteFile {
            path: self.dir.display().to_string(),
            source: e,
        })?;

        let name = format!("{}.json", Utc::now().format("%Y-%m-%dT%H-%M-%S%.3fZ"));
        let path = self.dir.join(name);
        let file = File::create(&path).map_err(|e| AppError::WriteFile {
            path: path.display().to_string(),
            source: e,
        })?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, response)
            .map_err(|e| AppError::JsonSerialize(e.to_string()))?;
        Ok(path)
    }

    /// Read the snapshot `offset` files back from the newest one. Offset
    /// 0 is the latest snapshot, 1 the one before it. A missing directory
    /// or not enough snapshots is a first run, not an error.
    pub fn read_back(&self, offset: usize) -> Result<Option<EmojiListResponse>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::ReadFile {
                    path: self.dir.display().to_string(),
                    source: e,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AppError::ReadFile {
                path: self.dir.display().to_string(),
                source: e,
            })?;
            let file_type = entry.file_type().map_err(|e| AppError::ReadFile {
                path: self.dir.display().to_string(),
                source: e,
            })?;
            if !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }

        if names.len() <= offset {
            return Ok(None);
        }
        names.sort();
        let Some(selected) = names.get(names.len() - 1 - offset) else {
            return Ok(None);
        };

        let path = self.dir.join(selected);
        debug!(path = %path.display(), "reading emoji snapshot");
        let file = File::open(&path).map_err(|e| AppError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;
        let reader = BufReader::new(file);
        let response =
            serde_json::from_reader(reader).map_err(|e| AppError::JsonParse(e.to_string()))?;
        Ok(Some(response))
    }
}

/// Emojis present in a previous snapshot but gone from the current
/// catalog, with their uploader and creation time intact.
pub fn detect_deleted(previous: &EmojiListResponse, current: &EmojiCatalog) -> Vec<Emoji> {
    previous
        .emoji
        .iter()
        .filter(|e| !current.contains(&e.name))
        .cloned()
        .collect()
}
