/// Session-only backend: nothing survives the process.
use super::{RecordBackend, StorageError};
use crate::types::RecordStore;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    stored: Option<RecordStore>,
    saves: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: RecordStore) -> Self {
        Self {
            stored: Some(store),
            saves: 0,
        }
    }

    pub fn stored(&self) -> Option<&RecordStore> {
        self.stored.as_ref()
    }

    /// Number of successful saves so far.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl RecordBackend for MemoryBackend {
    fn load(&mut self) -> Result<Option<RecordStore>, StorageError> {
        Ok(self.stored.clone())
    }

    fn save(&mut self, store: &RecordStore) -> Result<(), StorageError> {
        self.stored = Some(store.clone());
        self.saves += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
