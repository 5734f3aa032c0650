//! In-memory file share for local runs and tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::{ByteRange, FileRef, FileShareStore, ShareRef, StorageError, StorageResult};

#[derive(Debug, Default)]
struct ShareState {
    directories: HashSet<String>,
    /// Keyed by `directory/name`.
    files: HashMap<String, Vec<u8>>,
}

/// Shares, directories and files held in process memory.
#[derive(Debug, Default)]
pub struct MemoryFileShare {
    shares: RwLock<HashMap<String, ShareState>>,
}

impl MemoryFileShare {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding one share with one (possibly nested) directory.
    pub fn with_directory(share: &str, directory: &str) -> Self {
        let mut state = ShareState::default();
        state.directories.insert(normalize(directory));

        let mut shares = HashMap::new();
        shares.insert(share.to_string(), state);
        Self {
            shares: RwLock::new(shares),
        }
    }

    pub async fn add_share(&self, share: &str) {
        self.shares
            .write()
            .await
            .entry(share.to_string())
            .or_default();
    }

    pub async fn read_file(&self, file: &FileRef) -> Option<Vec<u8>> {
        let shares = self.shares.read().await;
        shares
            .get(file.share().name())
            .and_then(|state| state.files.get(&file_key(file)))
            .cloned()
    }

    pub async fn file_count(&self) -> usize {
        self.shares
            .read()
            .await
            .values()
            .map(|state| state.files.len())
            .sum()
    }
}

fn normalize(directory: &str) -> String {
    directory.trim_matches('/').to_string()
}

fn file_key(file: &FileRef) -> String {
    format!("{}/{}", file.directory().path(), file.name())
}

#[async_trait]
impl FileShareStore for MemoryFileShare {
    async fn share_exists(&self, share: &ShareRef) -> StorageResult<bool> {
        Ok(self.shares.read().await.contains_key(share.name()))
    }

    async fn create_file(&self, file: &FileRef, size: u64) -> StorageResult<()> {
        let size = usize::try_from(size).map_err(|_| {
            StorageError::Unexpected(format!("file size {} exceeds addressable memory", size))
        })?;

        let mut shares = self.shares.write().await;
        let state = shares
            .get_mut(file.share().name())
            .ok_or_else(|| StorageError::NotFound(format!("share '{}'", file.share().name())))?;

        if !state.directories.contains(file.directory().path()) {
            return Err(StorageError::NotFound(format!(
                "directory '{}' in share '{}'",
                file.directory().path(),
                file.share().name()
            )));
        }

        state.files.insert(file_key(file), vec![0; size]);
        Ok(())
    }

    async fn upload_range(&self, file: &FileRef, range: ByteRange, data: Bytes) -> StorageResult<()> {
        if data.len() as u64 != range.length() {
            return Err(StorageError::Unexpected(format!(
                "range of {} bytes given {} bytes of data",
                range.length(),
                data.len()
            )));
        }

        let mut shares = self.shares.write().await;
        let content = shares
            .get_mut(file.share().name())
            .and_then(|state| state.files.get_mut(&file_key(file)))
            .ok_or_else(|| StorageError::NotFound(format!("file '{}'", file)))?;

        if range.end() > content.len() as u64 {
            return Err(StorageError::Unexpected(format!(
                "range ending at {} exceeds file size {}",
                range.end(),
                content.len()
            )));
        }

        let start = range.offset() as usize;
        content[start..start + data.len()].copy_from_slice(&data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str) -> FileRef {
        ShareRef::new("contractsshare").directory("uploads").file(name)
    }

    #[tokio::test]
    async fn test_create_then_upload() {
        let store = MemoryFileShare::with_directory("contractsshare", "uploads");
        let file = target("a.txt");

        store.create_file(&file, 5).await.unwrap();
        assert_eq!(store.read_file(&file).await, Some(vec![0; 5]));

        store
            .upload_range(&file, ByteRange::new(0, 5), Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(store.read_file(&file).await.as_deref(), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn test_create_replaces_existing_content() {
        let store = MemoryFileShare::with_directory("contractsshare", "uploads");
        let file = target("a.txt");

        store.create_file(&file, 3).await.unwrap();
        store
            .upload_range(&file, ByteRange::new(0, 3), Bytes::from_static(b"old"))
            .await
            .unwrap();
        store.create_file(&file, 2).await.unwrap();

        assert_eq!(store.read_file(&file).await, Some(vec![0, 0]));
        assert_eq!(store.file_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_share_and_directory() {
        let store = MemoryFileShare::new();
        assert!(!store.share_exists(&ShareRef::new("contractsshare")).await.unwrap());
        assert!(matches!(
            store.create_file(&target("a.txt"), 1).await,
            Err(StorageError::NotFound(_))
        ));

        store.add_share("contractsshare").await;
        assert!(store.share_exists(&ShareRef::new("contractsshare")).await.unwrap());
        assert!(matches!(
            store.create_file(&target("a.txt"), 1).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_requires_created_file() {
        let store = MemoryFileShare::with_directory("contractsshare", "uploads");
        let result = store
            .upload_range(&target("ghost.txt"), ByteRange::new(0, 1), Bytes::from_static(b"x"))
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_upload_outside_file_size() {
        let store = MemoryFileShare::with_directory("contractsshare", "uploads");
        let file = target("a.txt");
        store.create_file(&file, 2).await.unwrap();

        let result = store
            .upload_range(&file, ByteRange::new(1, 2), Bytes::from_static(b"xy"))
            .await;
        assert!(matches!(result, Err(StorageError::Unexpected(_))));

        let result = store
            .upload_range(&file, ByteRange::new(0, 2), Bytes::from_static(b"x"))
            .await;
        assert!(matches!(result, Err(StorageError::Unexpected(_))));
    }
}
