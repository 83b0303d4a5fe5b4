//! In-memory storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult, serialize};
use crate::diagram::Diagram;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for tests and ephemeral sessions.
///
/// Diagrams are kept in serialized form, so a load always yields an
/// independent copy.
#[derive(Default)]
pub struct MemoryStorage {
    documents: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, diagram: &Diagram) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let json = serialize(diagram);
        Box::pin(async move {
            let json = json?;
            let mut docs = self.documents.write().map_err(lock_error)?;
            docs.insert(id, json);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Diagram>> {
        let id = id.to_string();
        Box::pin(async move {
            let json = {
                let docs = self.documents.read().map_err(lock_error)?;
                docs.get(&id).cloned().ok_or_else(|| StorageError::NotFound(id.clone()))?
            };
            Ok(Diagram::from_json(&json)?)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut docs = self.documents.write().map_err(lock_error)?;
            docs.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let docs = self.documents.read().map_err(lock_error)?;
            Ok(docs.keys().cloned().collect())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let docs = self.documents.read().map_err(lock_error)?;
            Ok(docs.contains_key(&id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::ShapeNode;
    use crate::storage::block_on;
    use kurbo::{Point, Size};

    fn sample() -> Diagram {
        let mut diagram = Diagram::new();
        diagram
            .add_shape(ShapeNode::rect(Point::new(10.0, 10.0), Size::new(40.0, 20.0)), None)
            .unwrap();
        diagram
    }

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        let diagram = sample();

        block_on(storage.save("test", &diagram)).unwrap();
        let loaded = block_on(storage.load("test")).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.top_level(), diagram.top_level());
        assert!(!loaded.is_modified());
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_exists_and_delete() {
        let storage = MemoryStorage::new();
        assert!(!block_on(storage.exists("test")).unwrap());
        block_on(storage.save("test", &sample())).unwrap();
        assert!(block_on(storage.exists("test")).unwrap());
        block_on(storage.delete("test")).unwrap();
        assert!(!block_on(storage.exists("test")).unwrap());
    }

    #[test]
    fn test_list() {
        let storage = MemoryStorage::new();
        let diagram = sample();
        block_on(storage.save("doc1", &diagram)).unwrap();
        block_on(storage.save("doc2", &diagram)).unwrap();

        let list = block_on(storage.list()).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&"doc1".to_string()));
        assert!(list.contains(&"doc2".to_string()));
    }
}
