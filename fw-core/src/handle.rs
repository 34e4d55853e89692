//! Adapter handles
//!
//! An [`AdapterHandle`] owns one backend gateway together with its
//! configuration and connection state, and exposes the path-string based
//! operation surface. Every operation normalizes its path before touching the
//! backend and requires the handle to be connected.

use std::any::Any;
use std::cell::Cell;
use std::fmt;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    backend::Gateway,
    discovery::discover,
    entry::{DirEntry, EntryKind},
    error::{FwError, FwResult},
    metadata::{snapshot, MetadataSnapshot, RawStat},
    normalize,
    operations::{CopyOptions, ListOptions, TouchOptions, WriteOptions},
    transfer::{self, TransferPlan},
    NormalizedPath,
};

/// Per-handle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleConfig {
    /// Physical location the handle's `/` maps to
    pub root: String,
    /// Mode applied to files the handle creates
    #[serde(default)]
    pub file_mode: Option<u32>,
    /// Mode applied to directories the handle creates
    #[serde(default)]
    pub dir_mode: Option<u32>,
    #[serde(default)]
    pub read_only: bool,
}

impl HandleConfig {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            file_mode: None,
            dir_mode: None,
            read_only: false,
        }
    }
}

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

pub struct AdapterHandle {
    name: String,
    config: HandleConfig,
    gateway: Box<dyn Gateway>,
    state: Cell<ConnectionState>,
}

impl fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterHandle")
            .field("name", &self.name)
            .field("backend", &self.gateway.display_name())
            .field("config", &self.config)
            .field("state", &self.state.get())
            .finish()
    }
}

impl AdapterHandle {
    pub fn new(name: impl Into<String>, config: HandleConfig, gateway: Box<dyn Gateway>) -> Self {
        Self {
            name: name.into(),
            config,
            gateway,
            state: Cell::new(ConnectionState::Disconnected),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &str {
        &self.config.root
    }

    pub fn config(&self) -> &HandleConfig {
        &self.config
    }

    pub fn display_name(&self) -> &str {
        self.gateway.display_name()
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_connected(&self) -> bool {
        self.state.get() == ConnectionState::Connected
    }

    /// Downcast the gateway to its concrete type
    pub fn gateway_as<T: Any>(&self) -> Option<&T> {
        self.gateway.as_any().downcast_ref::<T>()
    }

    /// Open the backend connection. A no-op when already connected; a closed
    /// handle cannot be reopened.
    pub fn connect(&self) -> FwResult<()> {
        match self.state.get() {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Closed => {
                return Err(FwError::Connection(format!("handle {} is closed", self.name)))
            }
            ConnectionState::Disconnected | ConnectionState::Connecting => {}
        }

        self.state.set(ConnectionState::Connecting);
        match self.gateway.open() {
            Ok(()) => {
                self.state.set(ConnectionState::Connected);
                debug!(handle = %self.name, backend = self.gateway.display_name(), "connected");
                Ok(())
            }
            Err(e) => {
                self.state.set(ConnectionState::Disconnected);
                Err(match e {
                    FwError::Connection(_) => e,
                    other => FwError::Connection(format!("{}: {}", self.name, other)),
                })
            }
        }
    }

    /// Close the connection. Idempotent.
    pub fn close(&self) -> FwResult<()> {
        if self.state.get() != ConnectionState::Connected {
            return Ok(());
        }
        self.state.set(ConnectionState::Closed);
        debug!(handle = %self.name, "closing");
        self.gateway.close()
    }

    pub(crate) fn gateway(&self) -> FwResult<&dyn Gateway> {
        if self.is_connected() {
            Ok(self.gateway.as_ref())
        } else {
            Err(FwError::Connection(format!(
                "handle {} is {:?}",
                self.name,
                self.state.get()
            )))
        }
    }

    pub(crate) fn ensure_writable(&self, path: &NormalizedPath) -> FwResult<()> {
        if self.config.read_only {
            Err(FwError::PermissionDenied(format!("{} (read-only backend {})", path, self.name)))
        } else {
            Ok(())
        }
    }

    /// Create one directory, applying the configured directory mode
    pub(crate) fn make_directory(&self, path: &NormalizedPath) -> FwResult<()> {
        let gateway = self.gateway()?;
        gateway.make_directory(path)?;
        if let Some(mode) = self.config.dir_mode {
            gateway.set_permissions(path, mode)?;
        }
        Ok(())
    }

    /// Write a whole file, applying the configured file mode when it is new
    pub(crate) fn put_file(&self, path: &NormalizedPath, data: &[u8], existed: bool) -> FwResult<()> {
        let gateway = self.gateway()?;
        gateway.write_all(path, data)?;
        if !existed {
            if let Some(mode) = self.config.file_mode {
                gateway.set_permissions(path, mode)?;
            }
        }
        Ok(())
    }

    fn require_parent_directory(&self, path: &NormalizedPath) -> FwResult<()> {
        let parent = path
            .parent()
            .ok_or_else(|| FwError::InvalidTarget(path.to_string()))?;
        match self.gateway()?.stat_type(&parent)? {
            Some(EntryKind::Directory) => Ok(()),
            _ => Err(FwError::NotFound(parent.to_string())),
        }
    }

    fn require_existing(&self, path: &NormalizedPath) -> FwResult<EntryKind> {
        self.gateway()?
            .stat_type(path)?
            .ok_or_else(|| FwError::NotFound(path.to_string()))
    }

    pub fn exists(&self, path: &str) -> FwResult<bool> {
        let path = normalize(path)?;
        self.gateway()?.exists(&path)
    }

    /// Snapshot of `path`; a missing path yields `exists: false`
    pub fn metadata(&self, path: &str) -> FwResult<MetadataSnapshot> {
        let path = normalize(path)?;
        snapshot(self.gateway()?, &path)
    }

    /// Backend attributes of an existing entry, without reading content
    pub fn attributes(&self, path: &str) -> FwResult<(EntryKind, RawStat)> {
        let path = normalize(path)?;
        let kind = self.require_existing(&path)?;
        Ok((kind, self.gateway()?.stat(&path)?))
    }

    pub fn read(&self, path: &str) -> FwResult<Bytes> {
        let path = normalize(path)?;
        match self.require_existing(&path)? {
            EntryKind::Directory => Err(FwError::InvalidTarget(path.to_string())),
            _ => self.gateway()?.read_all(&path),
        }
    }

    pub fn write(&self, path: &str, data: &[u8], options: &WriteOptions) -> FwResult<()> {
        let path = normalize(path)?;
        let gateway = self.gateway()?;
        self.ensure_writable(&path)?;

        let existing = gateway.stat_type(&path)?;
        if existing == Some(EntryKind::Directory) || path.is_root() {
            return Err(FwError::InvalidTarget(path.to_string()));
        }
        self.require_parent_directory(&path)?;

        let existed = existing.is_some();
        if existed {
            options.check_existing(&path.to_string())?;
        }

        if existed && options.append && !options.truncate {
            debug!(%path, bytes = data.len(), "append");
            gateway.append_all(&path, data)
        } else {
            debug!(%path, bytes = data.len(), existed, "write");
            self.put_file(&path, data, existed)
        }
    }

    pub fn create_directory(&self, path: &str) -> FwResult<()> {
        let path = normalize(path)?;
        let gateway = self.gateway()?;
        self.ensure_writable(&path)?;
        if gateway.stat_type(&path)?.is_some() {
            return Err(FwError::Conflict(path.to_string()));
        }
        self.require_parent_directory(&path)?;
        self.make_directory(&path)
    }

    /// Entries below a directory, filtered and sorted by path
    pub fn list(&self, path: &str, options: &ListOptions) -> FwResult<Vec<DirEntry>> {
        let path = normalize(path)?;
        let gateway = self.gateway()?;
        match self.require_existing(&path)? {
            EntryKind::Directory => {}
            _ => return Err(FwError::InvalidTarget(path.to_string())),
        }

        let mask = match &options.name_mask {
            Some(mask) => Some(
                glob::Pattern::new(mask).map_err(|e| FwError::InvalidPath(format!("{mask}: {e}")))?,
            ),
            None => None,
        };
        let extensions: Vec<String> = options
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();

        let entries = if options.recursive {
            let manifest = discover(gateway, &path)?;
            let dirs = manifest
                .directories
                .into_iter()
                .skip(1)
                .map(|d| DirEntry::new(d, EntryKind::Directory));
            let links = manifest.links;
            let files = manifest.files.into_iter().map(|f| {
                let kind = if links.contains(&f) { EntryKind::Symlink } else { EntryKind::File };
                DirEntry::new(f, kind)
            });
            dirs.chain(files).collect()
        } else {
            gateway.list(&path)?
        };

        let mut entries: Vec<DirEntry> = entries
            .into_iter()
            .filter(|entry| {
                if entry.is_directory() {
                    return options.include_folders;
                }
                if !options.include_files {
                    return false;
                }
                extensions.is_empty()
                    || entry
                        .path
                        .extension()
                        .map(|ext| extensions.contains(&ext.to_lowercase()))
                        .unwrap_or(false)
            })
            .filter(|entry| match (&mask, entry.name()) {
                (Some(mask), Some(name)) => mask.matches(name),
                _ => true,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    pub fn delete(&self, path: &str) -> FwResult<()> {
        let path = normalize(path)?;
        transfer::delete(self, &path)
    }

    /// Copy `path` into `target_directory` on `target`, or on this handle
    /// when `target` is `None`
    pub fn copy(
        &self,
        path: &str,
        target_directory: &str,
        options: &CopyOptions,
        target: Option<&AdapterHandle>,
    ) -> FwResult<()> {
        let plan = TransferPlan::new(
            normalize(path)?,
            target.unwrap_or(self),
            normalize(target_directory)?,
            options,
        );
        transfer::copy(self, &plan).map(|_| ())
    }

    /// Copy, then remove the source once the copy completed
    pub fn move_to(
        &self,
        path: &str,
        target_directory: &str,
        options: &CopyOptions,
        target: Option<&AdapterHandle>,
    ) -> FwResult<()> {
        let plan = TransferPlan::new(
            normalize(path)?,
            target.unwrap_or(self),
            normalize(target_directory)?,
            options,
        );
        transfer::move_entry(self, &plan)
    }

    pub fn change_permission(&self, path: &str, mode: u32) -> FwResult<()> {
        let path = normalize(path)?;
        self.require_existing(&path)?;
        self.ensure_writable(&path)?;
        self.gateway()?.set_permissions(&path, mode)
    }

    pub fn change_owner(&self, path: &str, owner: &str) -> FwResult<()> {
        let path = normalize(path)?;
        self.require_existing(&path)?;
        self.ensure_writable(&path)?;
        self.gateway()?.set_owner(&path, owner)
    }

    pub fn change_group(&self, path: &str, group: &str) -> FwResult<()> {
        let path = normalize(path)?;
        self.require_existing(&path)?;
        self.ensure_writable(&path)?;
        self.gateway()?.set_group(&path, group)
    }

    /// Create an empty file when absent, then update its timestamps
    pub fn touch(&self, path: &str, options: &TouchOptions) -> FwResult<()> {
        let path = normalize(path)?;
        let gateway = self.gateway()?;
        self.ensure_writable(&path)?;

        let existed = gateway.stat_type(&path)?.is_some();
        if !existed {
            self.require_parent_directory(&path)?;
            self.put_file(&path, &[], false)?;
        }

        let explicit = options.modified.is_some() || options.accessed.is_some();
        if existed || explicit {
            let now = Utc::now();
            gateway.set_times(
                &path,
                options.modified.unwrap_or(now),
                options.accessed.unwrap_or(now),
            )?;
        }
        Ok(())
    }
}
