//! File and directory metadata
//!
//! [`RawStat`] is what a gateway reports for a single entry. [`snapshot`]
//! turns that, plus discovery for directory sizes and content hashing for
//! files, into one immutable [`MetadataSnapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    backend::Gateway,
    digest::{sniff_mime, ContentDigest},
    discovery::discover,
    entry::EntryKind,
    error::FwResult,
    NormalizedPath,
};

/// Unix-style permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub mode: u32,
}

impl Permissions {
    pub fn new(mode: u32) -> Self {
        Self { mode }
    }

    pub fn is_readable(&self) -> bool {
        self.mode & 0o444 != 0
    }

    pub fn is_writable(&self) -> bool {
        self.mode & 0o222 != 0
    }

    pub fn is_executable(&self) -> bool {
        self.mode & 0o111 != 0
    }
}

/// Backend-native facts about one entry. Fields a backend cannot provide
/// stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStat {
    pub size: Option<u64>,
    pub permissions: Option<Permissions>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub readable: Option<bool>,
    pub writable: Option<bool>,
    pub executable: Option<bool>,
}

impl RawStat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.permissions = Some(Permissions::new(mode));
        self
    }

    /// Explicit access flag, else derived from the mode bits
    pub fn readable(&self) -> Option<bool> {
        self.readable.or(self.permissions.map(|p| p.is_readable()))
    }

    pub fn writable(&self) -> Option<bool> {
        self.writable.or(self.permissions.map(|p| p.is_writable()))
    }

    pub fn executable(&self) -> Option<bool> {
        self.executable.or(self.permissions.map(|p| p.is_executable()))
    }
}

/// Point-in-time facts about one path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub path: NormalizedPath,
    pub exists: bool,
    pub kind: Option<EntryKind>,
    pub name: Option<String>,
    pub parent: Option<NormalizedPath>,
    pub extension: Option<String>,
    pub name_without_extension: Option<String>,
    /// Byte length for files, sum over all contained files for directories
    pub size: u64,
    pub permissions: Option<Permissions>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub accessed: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub readable: Option<bool>,
    pub writable: Option<bool>,
    pub executable: Option<bool>,
    pub mime_type: Option<String>,
    pub digest: Option<ContentDigest>,
}

impl MetadataSnapshot {
    fn missing(path: &NormalizedPath) -> Self {
        Self {
            path: path.clone(),
            exists: false,
            kind: None,
            name: None,
            parent: None,
            extension: None,
            name_without_extension: None,
            size: 0,
            permissions: None,
            owner: None,
            group: None,
            created: None,
            accessed: None,
            modified: None,
            readable: None,
            writable: None,
            executable: None,
            mime_type: None,
            digest: None,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == Some(EntryKind::File)
    }

    pub fn is_directory(&self) -> bool {
        self.kind == Some(EntryKind::Directory)
    }
}

/// Collect a [`MetadataSnapshot`] for `path` in one pass.
///
/// A missing path is not an error here; the snapshot just says
/// `exists: false`.
pub fn snapshot(gateway: &dyn Gateway, path: &NormalizedPath) -> FwResult<MetadataSnapshot> {
    let kind = match gateway.stat_type(path)? {
        Some(kind) => kind,
        None => return Ok(MetadataSnapshot::missing(path)),
    };
    let raw = gateway.stat(path)?;

    let is_file = kind == EntryKind::File;
    let size = match kind {
        EntryKind::Directory => directory_size(gateway, path)?,
        _ => raw.size.unwrap_or(0),
    };

    // Content-derived fields stay null when the content cannot be read
    let (digest, mime_type) = if is_file {
        match gateway.read_all(path) {
            Ok(data) => (Some(ContentDigest::of(&data)), sniff_mime(&data)),
            Err(e) => {
                debug!(%path, error = %e, "content unreadable, skipping digest");
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    Ok(MetadataSnapshot {
        path: path.clone(),
        exists: true,
        kind: Some(kind),
        name: path.name().map(String::from),
        parent: path.parent(),
        extension: if is_file { path.extension().map(String::from) } else { None },
        name_without_extension: if is_file { path.stem().map(String::from) } else { None },
        size,
        permissions: raw.permissions,
        owner: raw.owner.clone(),
        group: raw.group.clone(),
        created: raw.created,
        accessed: raw.accessed,
        modified: raw.modified,
        readable: raw.readable(),
        writable: raw.writable(),
        executable: raw.executable(),
        mime_type,
        digest,
    })
}

/// Sum of the byte lengths of every file under `path`
pub fn directory_size(gateway: &dyn Gateway, path: &NormalizedPath) -> FwResult<u64> {
    let manifest = discover(gateway, path)?;
    let mut total = 0u64;
    for file in &manifest.files {
        total += gateway.stat(file)?.size.unwrap_or(0);
    }
    Ok(total)
}
