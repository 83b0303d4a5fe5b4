//! File-based storage.

use super::{BoxFuture, Storage, StorageError, StorageResult, serialize};
use crate::diagram::Diagram;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each diagram as `<id>.json` in a directory.
///
/// Saving writes a temporary file and swaps it in, keeping the previous file
/// as a backup until the swap succeeded. A failed save leaves the last good
/// file in place.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a file storage in `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/shapeflow/diagrams/`
    /// On Windows: `%LOCALAPPDATA%\shapeflow\diagrams\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("shapeflow").join("diagrams"))
    }

    /// File path for a document ID, with unsafe characters replaced.
    fn document_path(&self, id: &str) -> PathBuf {
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.json", safe_id))
    }

    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Replace `path` with `contents` without ever leaving it half-written.
fn write_atomic(path: &Path, contents: &str) -> StorageResult<()> {
    let tmp = sibling(path, ".tmp");
    let backup = sibling(path, ".bak");
    let io = |what: &str, p: &Path, e: std::io::Error| {
        StorageError::Io(format!("Failed to {} {}: {}", what, p.display(), e))
    };

    fs::write(&tmp, contents).map_err(|e| io("write", &tmp, e))?;

    let had_previous = path.exists();
    if had_previous {
        if let Err(e) = fs::rename(path, &backup) {
            let _ = fs::remove_file(&tmp);
            return Err(io("back up", path, e));
        }
    }
    if let Err(e) = fs::rename(&tmp, path) {
        if had_previous {
            if let Err(restore) = fs::rename(&backup, path) {
                log::error!("Could not restore {}: {}", path.display(), restore);
            }
        }
        let _ = fs::remove_file(&tmp);
        return Err(io("replace", path, e));
    }
    if had_previous {
        if let Err(e) = fs::remove_file(&backup) {
            log::warn!("Could not remove backup {}: {}", backup.display(), e);
        }
    }
    Ok(())
}

impl Storage for FileStorage {
    fn save(&self, id: &str, diagram: &Diagram) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.document_path(id);
        let json = serialize(diagram);
        Box::pin(async move {
            let result = json.and_then(|json| write_atomic(&path, &json));
            match &result {
                Ok(()) => log::info!("Saved diagram to {}", path.display()),
                Err(e) => log::error!("Saving {} failed: {}", path.display(), e),
            }
            result
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Diagram>> {
        let path = self.document_path(id);
        let id_owned = id.to_string();
        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id_owned));
            }
            let json = fs::read_to_string(&path).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            Diagram::from_json(&json).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.document_path(id);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }
            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut ids = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "json") {
                    if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                        ids.push(name.to_string());
                    }
                }
            }
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.document_path(id);
        Box::pin(async move { Ok(path.exists()) })
    }
}
