//! Remote file-share storage: the collaborator the upload handler talks to.
//!
//! The handler only sees [`ShareConnector`] and [`FileShareStore`]. The Azure
//! Files REST client and the in-memory share both implement them.

pub mod azure_files;
pub mod connection_string;
pub mod handles;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use handles::{ByteRange, DirectoryRef, FileRef, ShareRef, MAX_RANGE_BYTES};

/// Failures reported by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Missing or malformed connection settings, or credentials the service refused.
    #[error("Storage configuration error: {0}")]
    Configuration(String),

    #[error("Remote resource not found: {0}")]
    NotFound(String),

    /// Network or service-side condition that may clear on its own.
    #[error("Transient storage failure: {0}")]
    Transient(String),

    #[error("Unexpected storage failure: {0}")]
    Unexpected(String),
}

impl StorageError {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::Configuration(_) => "configuration",
            StorageError::NotFound(_) => "not_found",
            StorageError::Transient(_) => "transient",
            StorageError::Unexpected(_) => "unexpected",
        }
    }

    /// Classify a non-success HTTP status returned by the storage service.
    pub fn from_status(status: u16, error_code: Option<&str>, resource: &str) -> Self {
        let detail = match error_code {
            Some(code) => format!("{} returned {} ({})", resource, status, code),
            None => format!("{} returned {}", resource, status),
        };

        match status {
            401 | 403 => StorageError::Configuration(detail),
            404 => StorageError::NotFound(detail),
            408 | 429 | 500 | 502 | 503 | 504 => StorageError::Transient(detail),
            _ => StorageError::Unexpected(detail),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Share/directory/file operations used by the upload handler.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileShareStore: Send + Sync {
    async fn share_exists(&self, share: &ShareRef) -> StorageResult<bool>;

    /// Create `file` with the declared size, replacing any existing file of that name.
    async fn create_file(&self, file: &FileRef, size: u64) -> StorageResult<()>;

    /// Write `data` into `range` of an existing file. `data` must be exactly `range.length()` bytes.
    async fn upload_range(&self, file: &FileRef, range: ByteRange, data: Bytes) -> StorageResult<()>;
}

/// Produces a store for one invocation.
#[cfg_attr(test, mockall::automock)]
pub trait ShareConnector: Send + Sync {
    fn connect(&self) -> StorageResult<Arc<dyn FileShareStore>>;
}

/// Connector that hands out the same store on every call.
#[derive(Clone)]
pub struct SharedStore {
    store: Arc<dyn FileShareStore>,
}

impl SharedStore {
    pub fn new(store: Arc<dyn FileShareStore>) -> Self {
        Self { store }
    }
}

impl ShareConnector for SharedStore {
    fn connect(&self) -> StorageResult<Arc<dyn FileShareStore>> {
        Ok(Arc::clone(&self.store))
    }
}
