//! Operation options

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Overwrite an existing file
    pub replace: bool,
    /// Append to an existing file instead of overwriting it
    pub append: bool,
    /// Discard existing content before writing
    pub truncate: bool,
}

impl WriteOptions {
    pub fn replace() -> Self {
        Self { replace: true, ..Default::default() }
    }

    pub fn append() -> Self {
        Self { append: true, ..Default::default() }
    }

    fn allows_existing(&self) -> bool {
        self.replace || self.append || self.truncate
    }

    pub(crate) fn check_existing(&self, path: &str) -> crate::FwResult<()> {
        if self.allows_existing() {
            Ok(())
        } else {
            Err(crate::FwError::Conflict(path.to_string()))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOptions {
    pub recursive: bool,
    /// Extensions to keep, compared case-insensitively, without the dot.
    /// Empty keeps everything.
    pub extensions: Vec<String>,
    pub include_files: bool,
    pub include_folders: bool,
    /// Glob matched against the entry name
    pub name_mask: Option<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            extensions: Vec::new(),
            include_files: true,
            include_folders: true,
            name_mask: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyOptions {
    /// New name for the copied entry; keeps the source name when `None`
    pub target_name: Option<String>,
    /// Overwrite existing target files
    pub replace: bool,
}

impl CopyOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self { target_name: Some(name.into()), replace: false }
    }

    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TouchOptions {
    /// Defaults to now
    pub modified: Option<DateTime<Utc>>,
    /// Defaults to now
    pub accessed: Option<DateTime<Utc>>,
}
