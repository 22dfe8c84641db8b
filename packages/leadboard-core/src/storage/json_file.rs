/// Local JSON file backend.
///
/// - Atomic writes (write to .tmp, fsync, rename)
/// - Refuses to replace a non-empty file with empty content
/// - SHA-256 of the last read/written content guards against clobbering a
///   file that another session rewrote in the meantime
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{RecordBackend, StorageError};
use crate::types::{Group, RecordStore};

const FORMAT_VERSION: u32 = 1;

/// On-disk layout.
#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    groups: Vec<Group>,
}

pub struct JsonFileBackend {
    path: PathBuf,
    /// SHA-256 of the content last read or written, `None` before the
    /// first load or when the file did not exist.
    known_hash: Option<String>,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            known_hash: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compute SHA-256 hash of content (for change detection).
    fn content_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.replace("\r\n", "\n").as_bytes());
        hex::encode(hasher.finalize())
    }

    fn read_existing(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
    /// Refuses to write empty content over a non-empty file.
    fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
        if content.trim().is_empty() {
            if let Ok(existing) = fs::read_to_string(path) {
                if !existing.trim().is_empty() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "Refusing to overwrite non-empty file with empty content",
                    ));
                }
            }
        }

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let tmp_path = path.with_extension("leadboard.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        // fsync directory for rename durability
        if let Some(dir) = path.parent() {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    }
}

impl RecordBackend for JsonFileBackend {
    fn load(&mut self) -> Result<Option<RecordStore>, StorageError> {
        let Some(content) = self.read_existing()? else {
            log::info!(
                "[leadboard.storage] No store at {}, starting empty",
                self.path.display()
            );
            self.known_hash = None;
            return Ok(None);
        };

        let file: StoreFile = serde_json::from_str(&content)?;
        if file.version > FORMAT_VERSION {
            return Err(StorageError::InvalidData(format!(
                "{} has format version {}, newest supported is {}",
                self.path.display(),
                file.version,
                FORMAT_VERSION
            )));
        }
        self.known_hash = Some(Self::content_hash(&content));
        Ok(Some(RecordStore {
            groups: file.groups,
        }))
    }

    fn save(&mut self, store: &RecordStore) -> Result<(), StorageError> {
        let disk_hash = self
            .read_existing()?
            .map(|content| Self::content_hash(&content));

        if disk_hash.is_some() && disk_hash != self.known_hash {
            log::warn!(
                "[leadboard.storage] {} changed on disk since last read",
                self.path.display()
            );
            return Err(StorageError::Conflict {
                location: self.path.display().to_string(),
            });
        }

        let file = StoreFile {
            version: FORMAT_VERSION,
            groups: store.groups.clone(),
        };
        let mut json = serde_json::to_string_pretty(&file)?;
        json.push('\n');
        let new_hash = Self::content_hash(&json);

        if disk_hash.as_deref() == Some(new_hash.as_str()) {
            log::debug!(
                "[leadboard.storage] {} already up to date",
                self.path.display()
            );
            return Ok(());
        }

        Self::atomic_write(&self.path, &json)?;
        self.known_hash = Some(new_hash);
        log::debug!(
            "[leadboard.storage] Wrote {} leads to {}",
            store.len(),
            self.path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Lead;
    use tempfile::TempDir;

    fn sample_store() -> RecordStore {
        let mut store = RecordStore::with_groups(["Todo", "Done", "Trash"]);
        let mut lead = Lead::new("a1b2c3d4", "Bakkerij Jansen");
        lead.contact = "Peter".to_string();
        lead.price = "€ 500".to_string();
        store.groups[0].leads.push(lead);
        store
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut backend = JsonFileBackend::new(dir.path().join("board.json"));
        assert!(backend.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("board.json");
        let store = sample_store();

        let mut backend = JsonFileBackend::new(&path);
        assert!(backend.load().unwrap().is_none());
        backend.save(&store).unwrap();

        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("Bakkerij Jansen"));
        assert!(!path.with_extension("leadboard.tmp").exists());

        let mut fresh = JsonFileBackend::new(&path);
        let loaded = fresh.load().unwrap().unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.groups[1].leads.len(), 0);
    }

    #[test]
    fn test_repeated_saves_after_own_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("board.json");
        let mut store = sample_store();

        let mut backend = JsonFileBackend::new(&path);
        backend.load().unwrap();
        backend.save(&store).unwrap();

        let lead = store.remove("a1b2c3d4").unwrap();
        store.groups[1].leads.push(lead);
        backend.save(&store).unwrap();
        backend.save(&store).unwrap();

        let loaded = JsonFileBackend::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.groups[1].leads[0].id, "a1b2c3d4");
    }

    #[test]
    fn test_conflict_when_file_changed_elsewhere() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("board.json");
        let store = sample_store();

        let mut ours = JsonFileBackend::new(&path);
        ours.load().unwrap();
        ours.save(&store).unwrap();

        let mut theirs = JsonFileBackend::new(&path);
        let mut their_store = theirs.load().unwrap().unwrap();
        their_store.groups[0].leads.clear();
        theirs.save(&their_store).unwrap();

        let err = ours.save(&store).unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));

        // Reloading adopts the new baseline.
        ours.load().unwrap();
        ours.save(&store).unwrap();
    }

    #[test]
    fn test_unread_existing_file_is_not_clobbered() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("board.json");
        fs::write(&path, r#"{"version":1,"groups":[]}"#).unwrap();

        let mut backend = JsonFileBackend::new(&path);
        let err = backend.save(&sample_store()).unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("board.json");
        fs::write(&path, "not json").unwrap();

        let mut backend = JsonFileBackend::new(&path);
        assert!(matches!(
            backend.load(),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_newer_format_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("board.json");
        fs::write(&path, r#"{"version":99,"groups":[]}"#).unwrap();

        let mut backend = JsonFileBackend::new(&path);
        assert!(matches!(
            backend.load(),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_atomic_write_refuses_empty_over_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("board.json");
        fs::write(&path, "{}").unwrap();
        assert!(JsonFileBackend::atomic_write(&path, "  \n").is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }
}
