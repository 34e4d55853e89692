//! Local filesystem backend

use bytes::Bytes;
use chrono::{DateTime, Utc};
use filetime::FileTime;
use fw_core::{
    entry::{DirEntry, EntryKind},
    error::{FwError, FwResult},
    metadata::{Permissions, RawStat},
    Gateway, NormalizedPath,
};
use std::any::Any;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Local filesystem backend rooted at a directory
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn to_real_path(&self, path: &NormalizedPath) -> PathBuf {
        let mut real = self.root.clone();
        for seg in path.segments() {
            real.push(seg);
        }
        real
    }

    fn raw_stat(meta: &fs::Metadata) -> RawStat {
        let mut stat = RawStat::new().with_size(if meta.is_dir() { 0 } else { meta.len() });

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            stat.permissions = Some(Permissions::new(meta.mode() & 0o7777));
            stat.owner = Some(meta.uid().to_string());
            stat.group = Some(meta.gid().to_string());
        }
        #[cfg(not(unix))]
        {
            let mode = if meta.permissions().readonly() { 0o444 } else { 0o666 };
            stat.permissions = Some(Permissions::new(mode));
        }

        if let Ok(modified) = meta.modified() {
            stat.modified = Some(modified.into());
        }
        if let Ok(accessed) = meta.accessed() {
            stat.accessed = Some(accessed.into());
        }
        if let Ok(created) = meta.created() {
            stat.created = Some(created.into());
        }
        stat
    }
}

/// Access as the calling process would get it, uid 0 included
#[cfg(unix)]
fn effective_access(real: &Path, stat: &mut RawStat) {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(real.as_os_str().as_bytes()) else {
        return;
    };
    // SAFETY: c_path is a valid NUL-terminated string for the whole call
    let check = |mode: libc::c_int| unsafe { libc::access(c_path.as_ptr(), mode) == 0 };
    stat.readable = Some(check(libc::R_OK));
    stat.writable = Some(check(libc::W_OK));
    stat.executable = Some(check(libc::X_OK));
}

fn file_time(at: DateTime<Utc>) -> FileTime {
    FileTime::from_unix_time(at.timestamp(), at.timestamp_subsec_nanos())
}

impl Gateway for LocalBackend {
    fn display_name(&self) -> &str {
        "Local Filesystem"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn open(&self) -> FwResult<()> {
        if self.root.is_dir() {
            debug!(root = %self.root.display(), "local backend ready");
            Ok(())
        } else {
            Err(FwError::Connection(format!(
                "local root {} is not a directory",
                self.root.display()
            )))
        }
    }

    fn close(&self) -> FwResult<()> {
        Ok(())
    }

    fn exists(&self, path: &NormalizedPath) -> FwResult<bool> {
        Ok(self.stat_type(path)?.is_some())
    }

    fn stat_type(&self, path: &NormalizedPath) -> FwResult<Option<EntryKind>> {
        let real = self.to_real_path(path);
        match fs::metadata(&real) {
            Ok(meta) if meta.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                match fs::symlink_metadata(&real) {
                    Ok(meta) if meta.file_type().is_symlink() => Ok(Some(EntryKind::Symlink)),
                    _ => Ok(None),
                }
            }
            Err(e) => Err(FwError::io(path.to_string(), e)),
        }
    }

    fn stat(&self, path: &NormalizedPath) -> FwResult<RawStat> {
        let real = self.to_real_path(path);
        let meta = fs::metadata(&real)
            .or_else(|_| fs::symlink_metadata(&real))
            .map_err(|e| FwError::io(path.to_string(), e))?;
        let mut stat = Self::raw_stat(&meta);
        #[cfg(unix)]
        effective_access(&real, &mut stat);
        Ok(stat)
    }

    fn list(&self, path: &NormalizedPath) -> FwResult<Vec<DirEntry>> {
        let real = self.to_real_path(path);
        if !real.is_dir() {
            return Err(if real.exists() {
                FwError::InvalidTarget(path.to_string())
            } else {
                FwError::NotFound(path.to_string())
            });
        }

        let mut entries = Vec::new();
        let read_dir = fs::read_dir(&real).map_err(|e| FwError::io(path.to_string(), e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| FwError::io(path.to_string(), e))?;
            // Every child must round-trip through a path, or a tree walk
            // would silently miss it
            let name = entry.file_name().into_string().map_err(|raw| {
                FwError::InvalidPath(format!("{}/{}", path, raw.to_string_lossy()))
            })?;
            let child = path.join(&name).map_err(|_| {
                warn!(dir = %path, name, "entry name cannot be addressed");
                FwError::InvalidPath(format!("{}/{}", path, name))
            })?;
            let file_type = entry
                .file_type()
                .map_err(|e| FwError::io(child.to_string(), e))?;
            let kind = if file_type.is_symlink() {
                EntryKind::Symlink
            } else if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(DirEntry::new(child, kind));
        }
        Ok(entries)
    }

    fn read_all(&self, path: &NormalizedPath) -> FwResult<Bytes> {
        let data = fs::read(self.to_real_path(path)).map_err(|e| FwError::io(path.to_string(), e))?;
        Ok(Bytes::from(data))
    }

    fn write_all(&self, path: &NormalizedPath, data: &[u8]) -> FwResult<()> {
        fs::write(self.to_real_path(path), data).map_err(|e| FwError::io(path.to_string(), e))
    }

    fn append_all(&self, path: &NormalizedPath, data: &[u8]) -> FwResult<()> {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.to_real_path(path))
            .map_err(|e| FwError::io(path.to_string(), e))?;
        file.write_all(data).map_err(|e| FwError::io(path.to_string(), e))
    }

    fn make_directory(&self, path: &NormalizedPath) -> FwResult<()> {
        fs::create_dir(self.to_real_path(path)).map_err(|e| FwError::io(path.to_string(), e))
    }

    fn remove_file(&self, path: &NormalizedPath) -> FwResult<()> {
        fs::remove_file(self.to_real_path(path)).map_err(|e| FwError::io(path.to_string(), e))
    }

    fn remove_directory(&self, path: &NormalizedPath) -> FwResult<()> {
        fs::remove_dir(self.to_real_path(path)).map_err(|e| FwError::io(path.to_string(), e))
    }

    #[cfg(unix)]
    fn set_permissions(&self, path: &NormalizedPath, mode: u32) -> FwResult<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(self.to_real_path(path), fs::Permissions::from_mode(mode))
            .map_err(|e| FwError::io(path.to_string(), e))
    }

    #[cfg(not(unix))]
    fn set_permissions(&self, path: &NormalizedPath, mode: u32) -> FwResult<()> {
        let real = self.to_real_path(path);
        let mut perms = fs::metadata(&real)
            .map_err(|e| FwError::io(path.to_string(), e))?
            .permissions();
        perms.set_readonly(mode & 0o222 == 0);
        fs::set_permissions(&real, perms).map_err(|e| FwError::io(path.to_string(), e))
    }

    #[cfg(unix)]
    fn set_owner(&self, path: &NormalizedPath, owner: &str) -> FwResult<()> {
        let uid: u32 = owner
            .parse()
            .map_err(|_| FwError::Unsupported(format!("owner must be a numeric uid: {owner}")))?;
        std::os::unix::fs::chown(self.to_real_path(path), Some(uid), None)
            .map_err(|e| FwError::io(path.to_string(), e))
    }

    #[cfg(not(unix))]
    fn set_owner(&self, path: &NormalizedPath, _owner: &str) -> FwResult<()> {
        Err(FwError::Unsupported(format!("chown on this platform: {path}")))
    }

    #[cfg(unix)]
    fn set_group(&self, path: &NormalizedPath, group: &str) -> FwResult<()> {
        let gid: u32 = group
            .parse()
            .map_err(|_| FwError::Unsupported(format!("group must be a numeric gid: {group}")))?;
        std::os::unix::fs::chown(self.to_real_path(path), None, Some(gid))
            .map_err(|e| FwError::io(path.to_string(), e))
    }

    #[cfg(not(unix))]
    fn set_group(&self, path: &NormalizedPath, _group: &str) -> FwResult<()> {
        Err(FwError::Unsupported(format!("chgrp on this platform: {path}")))
    }

    fn set_times(
        &self,
        path: &NormalizedPath,
        modified: DateTime<Utc>,
        accessed: DateTime<Utc>,
    ) -> FwResult<()> {
        filetime::set_file_times(self.to_real_path(path), file_time(accessed), file_time(modified))
            .map_err(|e| FwError::io(path.to_string(), e))
    }
}
