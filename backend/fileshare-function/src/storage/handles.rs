//! Typed references into a remote file share.
//!
//! Handles are plain values: building one never touches the network, and
//! they are rebuilt for every invocation.

use std::fmt;

/// Reference to a named share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRef {
    name: String,
}

impl ShareRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self, path: impl Into<String>) -> DirectoryRef {
        DirectoryRef {
            share: self.clone(),
            path: path.into().trim_matches('/').to_string(),
        }
    }
}

/// Reference to a directory inside a share. The path may span several segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRef {
    share: ShareRef,
    path: String,
}

impl DirectoryRef {
    pub fn share(&self) -> &ShareRef {
        &self.share
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The file name is used verbatim as a single path segment.
    pub fn file(&self, name: impl Into<String>) -> FileRef {
        FileRef {
            directory: self.clone(),
            name: name.into(),
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|segment| !segment.is_empty())
    }
}

/// Reference to a file inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    directory: DirectoryRef,
    name: String,
}

impl FileRef {
    pub fn share(&self) -> &ShareRef {
        self.directory.share()
    }

    pub fn directory(&self) -> &DirectoryRef {
        &self.directory
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path segments below the share: directory segments followed by the file name.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.directory.segments().collect();
        segments.push(&self.name);
        segments
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.share().name())?;
        for segment in self.segments() {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// Largest range the file service accepts in a single Put Range call.
pub const MAX_RANGE_BYTES: u64 = 4 * 1024 * 1024;

/// Half-open byte range `[offset, offset + length)` within a remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    offset: u64,
    length: u64,
}

impl ByteRange {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// `bytes=first-last` with an inclusive last byte; `None` for an empty range.
    pub fn header_value(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(format!("bytes={}-{}", self.offset, self.end() - 1))
    }
}
