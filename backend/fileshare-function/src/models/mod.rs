use bytes::Bytes;

use crate::config::StorageConfig;
use crate::storage::{FileRef, ShareRef};

/// A named binary payload taken from the multipart body.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Attachment {
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Where uploads are written: a share and a directory inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub share_name: String,
    pub directory: String,
}

impl UploadTarget {
    pub fn share(&self) -> ShareRef {
        ShareRef::new(&self.share_name)
    }

    /// Remote file for an attachment, named exactly as declared by the client.
    pub fn file_for(&self, attachment: &Attachment) -> FileRef {
        self.share()
            .directory(&self.directory)
            .file(&attachment.file_name)
    }
}

impl From<&StorageConfig> for UploadTarget {
    fn from(config: &StorageConfig) -> Self {
        Self {
            share_name: config.share_name.clone(),
            directory: config.directory.clone(),
        }
    }
}

impl Default for UploadTarget {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}
