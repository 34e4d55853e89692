//! Normalized absolute paths
//!
//! Every path crossing into a backend goes through [`normalize`] first. The
//! resulting [`NormalizedPath`] is always absolute, uses `/` as separator and
//! contains no empty, `.` or `..` segments.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FwError, FwResult};

pub const SEPARATOR: char = '/';

/// Canonical absolute path inside a backend's namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedPath {
    segments: Vec<String>,
}

/// Canonicalize `raw` into a [`NormalizedPath`].
///
/// Backslashes are treated as separators. Relative input is rejected rather
/// than resolved against a working directory. A `..` with nothing left to pop
/// is dropped, so the result never climbs above `/`.
pub fn normalize(raw: &str) -> FwResult<NormalizedPath> {
    if raw.is_empty() {
        return Err(FwError::InvalidPath(raw.to_string()));
    }
    let unified = raw.replace('\\', "/");
    if !unified.starts_with(SEPARATOR) {
        return Err(FwError::InvalidPath(raw.to_string()));
    }

    let mut segments: Vec<String> = Vec::new();
    for part in unified.split(SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    tracing::debug!(path = raw, "discarding '..' above root");
                }
            }
            seg => segments.push(seg.to_string()),
        }
    }
    Ok(NormalizedPath { segments })
}

impl NormalizedPath {
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    /// Append a single child name. Names containing separators or dot
    /// segments are rejected.
    pub fn join(&self, name: &str) -> FwResult<Self> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(FwError::InvalidPath(name.to_string()));
        }
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(Self { segments })
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn extension(&self) -> Option<&str> {
        self.name()
            .and_then(|n| n.rsplit_once('.'))
            .filter(|(stem, _)| !stem.is_empty())
            .map(|(_, ext)| ext)
    }

    pub fn stem(&self) -> Option<&str> {
        let name = self.name()?;
        match self.extension() {
            Some(ext) => Some(&name[..name.len() - ext.len() - 1]),
            None => Some(name),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// True when `self` equals `ancestor` or lies beneath it
    pub fn starts_with(&self, ancestor: &NormalizedPath) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }

    /// Replace the `from` prefix of this path with `to`.
    ///
    /// Returns `None` when `self` is not under `from`.
    pub fn rebase(&self, from: &NormalizedPath, to: &NormalizedPath) -> Option<Self> {
        let rest = self.segments.strip_prefix(from.segments.as_slice())?;
        let mut segments = to.segments.clone();
        segments.extend(rest.iter().cloned());
        Some(Self { segments })
    }

    pub fn as_string(&self) -> String {
        if self.segments.is_empty() {
            SEPARATOR.to_string()
        } else {
            let mut out = String::new();
            for seg in &self.segments {
                out.push(SEPARATOR);
                out.push_str(seg);
            }
            out
        }
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl TryFrom<String> for NormalizedPath {
    type Error = FwError;

    fn try_from(value: String) -> FwResult<Self> {
        normalize(&value)
    }
}

impl From<NormalizedPath> for String {
    fn from(value: NormalizedPath) -> Self {
        value.as_string()
    }
}

impl std::str::FromStr for NormalizedPath {
    type Err = FwError;

    fn from_str(s: &str) -> FwResult<Self> {
        normalize(s)
    }
}
