//! File-backed storage adapter.

use crate::{SecureStorage, StorageResult};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::UNIX_EPOCH;
use tracing::warn;

/// Storage backend keeping all keys in a single JSON file.
///
/// Every mutation rewrites the file atomically (write to a temp file in the
/// same directory, fsync, rename over the original), so a crash mid-write
/// leaves either the old or the new content on disk, never a mix.
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles across callers sharing this adapter.
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Create a file-backed storage rooted at `path`. No IO happens until
    /// the first operation.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> HashMap<String, String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed reading storage file, treating as empty");
                return HashMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Corrupted storage file, treating as empty");
                HashMap::new()
            }
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> StorageResult<()> {
        let content = serde_json::to_string(map)
            .map_err(|e| crate::StorageError::Encoding(e.to_string()))?;
        atomic_write(&self.path, &content)?;
        Ok(())
    }
}

impl SecureStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut map = self.read_map();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.read_map().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.write_lock.lock().unwrap();
        let mut map = self.read_map();
        let removed = map.remove(key).is_some();
        if removed {
            self.write_map(&map)?;
        }
        Ok(removed)
    }
}

fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("storage");
    let tmp_name = format!(
        ".{}.crewgate.tmp.{}",
        file_name,
        std::time::SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    );
    let tmp_path = dir.join(tmp_name);

    let write_result = (|| -> std::io::Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;

        // Credentials live in this file; keep it owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp_path, path)?;

        if let Ok(parent_dir) = fs::File::open(dir) {
            let _ = parent_dir.sync_all();
        }

        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    Ok(())
}
