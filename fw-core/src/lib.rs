//! Fileway Core
//!
//! Path normalization, subtree discovery, metadata snapshots and the
//! copy/move/delete orchestration shared by every storage backend.

pub mod backend;
pub mod digest;
pub mod discovery;
pub mod entry;
pub mod error;
pub mod handle;
pub mod metadata;
pub mod operations;
pub mod path;
pub mod transfer;

#[cfg(test)]
pub mod testing;

pub use backend::Gateway;
pub use discovery::{discover, DirectoryManifest};
pub use entry::{DirEntry, EntryKind};
pub use error::{ErrorKind, FwError, FwResult, TransferOp};
pub use handle::{AdapterHandle, ConnectionState, HandleConfig};
pub use metadata::{MetadataSnapshot, Permissions, RawStat};
pub use operations::{CopyOptions, ListOptions, TouchOptions, WriteOptions};
pub use path::{normalize, NormalizedPath};
