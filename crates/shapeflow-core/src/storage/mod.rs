//! Storage abstraction for persisted diagrams.
//!
//! Backends store the versioned JSON record produced by
//! [`Diagram::to_json`] under a document ID.

mod autosave;
mod file;
mod memory;

pub use autosave::{
    AutoSaveManager, DEFAULT_AUTOSAVE_INTERVAL_SECS, DEFAULT_DOCUMENT_ID, LAST_DOCUMENT_KEY,
    create_autosave_manager, create_default_storage,
};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::diagram::Diagram;
use crate::error::DiagramError;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

impl From<DiagramError> for StorageError {
    fn from(err: DiagramError) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for storage operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Trait for diagram storage backends.
pub trait Storage: Send + Sync {
    /// Save a diagram.
    fn save(&self, id: &str, diagram: &Diagram) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a diagram.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Diagram>>;

    /// Delete a diagram; missing IDs are not an error.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all stored IDs.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Serialize up front so the returned future does not borrow the diagram.
fn serialize(diagram: &Diagram) -> StorageResult<String> {
    diagram.to_json().map_err(StorageError::from)
}

/// Minimal executor for the immediately-ready storage futures.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}
