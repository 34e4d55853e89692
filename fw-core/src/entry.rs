//! File system entries

use crate::NormalizedPath;
use serde::{Deserialize, Serialize};

/// Entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// Immediate child of a directory, as reported by a gateway listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: NormalizedPath,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(path: NormalizedPath, kind: EntryKind) -> Self {
        Self { path, kind }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn name(&self) -> Option<&str> {
        self.path.name()
    }
}
