//! Backend gateway trait
//!
//! The minimal set of primitives the orchestration layer needs from a storage
//! backend. Paths are always [`NormalizedPath`]s relative to the backend's
//! configured root; mapping them onto a physical location is the gateway's job.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::any::Any;

use crate::{
    entry::{DirEntry, EntryKind},
    error::FwResult,
    metadata::RawStat,
    NormalizedPath,
};

/// Storage backend gateway
///
/// Implementations are used from one thread at a time by a single
/// [`AdapterHandle`](crate::AdapterHandle); no method is expected to be
/// reentrant.
pub trait Gateway: Send {
    /// Short human readable backend name
    fn display_name(&self) -> &str;

    /// Access to the concrete gateway, for callers that need backend specifics
    fn as_any(&self) -> &dyn Any;

    /// Establish the underlying connection. Called once per handle.
    fn open(&self) -> FwResult<()>;

    /// Tear down the underlying connection
    fn close(&self) -> FwResult<()>;

    fn exists(&self, path: &NormalizedPath) -> FwResult<bool>;

    /// Kind of the entry at `path`, following symbolic links.
    ///
    /// Directory is tested first, then file, then link (for dangling links
    /// on backends that can see them). `None` when nothing is there.
    fn stat_type(&self, path: &NormalizedPath) -> FwResult<Option<EntryKind>>;

    /// Raw backend metadata. Fails with `NotFound` when nothing is there.
    fn stat(&self, path: &NormalizedPath) -> FwResult<RawStat>;

    /// Immediate children of a directory. Symbolic links are reported as
    /// [`EntryKind::Symlink`] and never resolved.
    fn list(&self, path: &NormalizedPath) -> FwResult<Vec<DirEntry>>;

    fn read_all(&self, path: &NormalizedPath) -> FwResult<Bytes>;

    /// Create or overwrite a file. Fails if the parent directory is absent.
    fn write_all(&self, path: &NormalizedPath, data: &[u8]) -> FwResult<()>;

    /// Append to a file, creating it when absent
    fn append_all(&self, path: &NormalizedPath, data: &[u8]) -> FwResult<()>;

    /// Create a single directory. Fails if the parent is absent.
    fn make_directory(&self, path: &NormalizedPath) -> FwResult<()>;

    fn remove_file(&self, path: &NormalizedPath) -> FwResult<()>;

    /// Remove an empty directory
    fn remove_directory(&self, path: &NormalizedPath) -> FwResult<()>;

    fn set_permissions(&self, path: &NormalizedPath, mode: u32) -> FwResult<()>;

    fn set_owner(&self, path: &NormalizedPath, owner: &str) -> FwResult<()>;

    fn set_group(&self, path: &NormalizedPath, group: &str) -> FwResult<()>;

    fn set_times(
        &self,
        path: &NormalizedPath,
        modified: DateTime<Utc>,
        accessed: DateTime<Utc>,
    ) -> FwResult<()>;
}
