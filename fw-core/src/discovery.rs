//! Subtree discovery
//!
//! Walks a path into a [`DirectoryManifest`]: every directory in top-down
//! order and every file in traversal order. Manifests are computed fresh for
//! each operation and never stored.

use crate::{backend::Gateway, entry::EntryKind, error::FwResult, NormalizedPath};

/// Ordered listing of a subtree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryManifest {
    /// Directories, each one before any of its descendants
    pub directories: Vec<NormalizedPath>,
    pub files: Vec<NormalizedPath>,
    /// Members of `files` the backend reported as symbolic links
    pub links: Vec<NormalizedPath>,
}

impl DirectoryManifest {
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.directories.len() + self.files.len()
    }

    /// Directories deepest first, the order they can be removed in
    pub fn directories_bottom_up(&self) -> impl Iterator<Item = &NormalizedPath> {
        self.directories.iter().rev()
    }
}

/// Enumerate the subtree rooted at `path`.
///
/// A file yields a manifest holding just that file. A path that no longer
/// exists yields an empty manifest. Entries the backend reports as symbolic
/// links are recorded as files and never descended into.
pub fn discover(gateway: &dyn Gateway, path: &NormalizedPath) -> FwResult<DirectoryManifest> {
    let mut manifest = DirectoryManifest::default();

    match gateway.stat_type(path)? {
        None => {
            tracing::debug!(%path, "discovery target vanished");
        }
        Some(EntryKind::Directory) => {
            manifest.directories.push(path.clone());
            walk(gateway, path, &mut manifest)?;
        }
        Some(EntryKind::File) => manifest.files.push(path.clone()),
        Some(EntryKind::Symlink) => {
            manifest.files.push(path.clone());
            manifest.links.push(path.clone());
        }
    }

    tracing::debug!(
        %path,
        directories = manifest.directories.len(),
        files = manifest.files.len(),
        "discovered subtree"
    );
    Ok(manifest)
}

fn walk(gateway: &dyn Gateway, dir: &NormalizedPath, manifest: &mut DirectoryManifest) -> FwResult<()> {
    let mut children = gateway.list(dir)?;
    children.sort_by(|a, b| a.path.cmp(&b.path));

    for child in children {
        match child.kind {
            EntryKind::Directory => {
                manifest.directories.push(child.path.clone());
                walk(gateway, &child.path, manifest)?;
            }
            EntryKind::File => manifest.files.push(child.path),
            EntryKind::Symlink => {
                manifest.links.push(child.path.clone());
                manifest.files.push(child.path);
            }
        }
    }
    Ok(())
}
