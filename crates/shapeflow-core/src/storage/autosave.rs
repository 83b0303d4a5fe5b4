//! Periodic saving of the edited diagram.

use crate::diagram::Diagram;
use crate::storage::{FileStorage, Storage, StorageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Key under which the most recently saved diagram is mirrored.
pub const LAST_DOCUMENT_KEY: &str = "__last_document__";

/// Document ID used until one is set.
pub const DEFAULT_DOCUMENT_ID: &str = "untitled";

/// Saves a diagram when it has unsaved changes and the interval elapsed.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    interval: Duration,
    last_save: Option<Instant>,
    dirty: bool,
    current_doc_id: Option<String>,
}

impl<S: Storage> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
            current_doc_id: None,
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Pick up the diagram's modified flag.
    pub fn observe(&mut self, diagram: &Diagram) {
        if diagram.is_modified() {
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_document_id(&mut self, id: Option<String>) {
        self.current_doc_id = id;
    }

    pub fn document_id(&self) -> &str {
        self.current_doc_id.as_deref().unwrap_or(DEFAULT_DOCUMENT_ID)
    }

    /// Whether the diagram is dirty and the interval has passed since the last save.
    pub fn should_save(&self) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save if needed. Returns whether a save happened.
    pub async fn maybe_save(&mut self, diagram: &mut Diagram) -> StorageResult<bool> {
        self.observe(diagram);
        if !self.should_save() {
            return Ok(false);
        }
        self.save(diagram).await?;
        Ok(true)
    }

    /// Save now and clear the diagram's modified flag.
    pub async fn save(&mut self, diagram: &mut Diagram) -> StorageResult<()> {
        let doc_id = self.document_id().to_string();
        self.storage.save(&doc_id, diagram).await?;
        self.storage.save(LAST_DOCUMENT_KEY, diagram).await?;

        diagram.set_modified(false);
        self.last_save = Some(Instant::now());
        self.dirty = false;
        Ok(())
    }

    /// Load a diagram and make it the current document.
    pub async fn load(&mut self, id: &str) -> StorageResult<Diagram> {
        let diagram = self.storage.load(id).await?;
        self.current_doc_id = Some(id.to_string());
        self.dirty = false;
        self.last_save = Some(Instant::now());
        Ok(diagram)
    }

    /// Load the most recently saved diagram, if any.
    pub async fn load_last(&mut self) -> Option<Diagram> {
        match self.storage.load(LAST_DOCUMENT_KEY).await {
            Ok(diagram) => {
                self.dirty = false;
                self.last_save = Some(Instant::now());
                Some(diagram)
            }
            Err(e) => {
                log::debug!("No last document to restore: {}", e);
                None
            }
        }
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.storage.delete(id).await
    }

    /// Saved document IDs, without the last-document mirror.
    pub async fn list_documents(&self) -> StorageResult<Vec<String>> {
        let mut docs = self.storage.list().await?;
        docs.retain(|id| id != LAST_DOCUMENT_KEY);
        Ok(docs)
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

/// File storage in the platform's data directory.
pub fn create_default_storage() -> StorageResult<Arc<FileStorage>> {
    Ok(Arc::new(FileStorage::default_location()?))
}

/// Auto-save manager over the default file storage.
pub fn create_autosave_manager() -> StorageResult<AutoSaveManager<FileStorage>> {
    Ok(AutoSaveManager::new(create_default_storage()?))
}
