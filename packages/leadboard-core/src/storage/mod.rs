pub mod json_file;
pub mod memory;
pub mod sheet;

use crate::types::RecordStore;

/// Abstract storage trait for record store backends.
/// Implementations: MemoryBackend (session only), JsonFileBackend (local
/// file), SheetBackend (tabular sheet service).
///
/// Saving always replaces the whole store.
pub trait RecordBackend {
    /// Load the stored board. `Ok(None)` means nothing has been stored yet.
    fn load(&mut self) -> Result<Option<RecordStore>, StorageError>;

    /// Replace the stored board with `store`.
    fn save(&mut self, store: &RecordStore) -> Result<(), StorageError>;

    /// Short human-readable location, for log lines.
    fn describe(&self) -> String;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid store data: {0}")]
    InvalidData(String),

    #[error("Store {location} changed since it was last read; refusing to overwrite")]
    Conflict { location: String },

    #[error("Sheet service error: {0}")]
    Remote(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::InvalidData(err.to_string())
    }
}
