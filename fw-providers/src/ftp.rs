//! FTP storage backend
//!
//! Plain FTP over a single control connection. Entry kinds and attributes are
//! recovered by parsing `LIST` output of the parent directory, so symbolic
//! links are reported as links and never followed.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use fw_core::{
    entry::{DirEntry, EntryKind},
    error::{FwError, FwResult},
    metadata::{Permissions, RawStat},
    Gateway, NormalizedPath,
};
use std::any::Any;
use std::cell::RefCell;
use std::io::Cursor;
use std::net::ToSocketAddrs;
use std::time::Duration;
use suppaftp::list::{File, PosixPexQuery};
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode, Status};
use tracing::{debug, warn};

use crate::config::FtpSettings;

/// FTP backend rooted at a remote directory
pub struct FtpBackend {
    settings: FtpSettings,
    root: String,
    stream: RefCell<Option<FtpStream>>,
}

impl FtpBackend {
    pub fn new(settings: FtpSettings, root: impl Into<String>) -> Self {
        Self {
            settings,
            root: root.into(),
            stream: RefCell::new(None),
        }
    }

    pub fn settings(&self) -> &FtpSettings {
        &self.settings
    }

    /// Convert to remote path
    fn remote_path(&self, path: &NormalizedPath) -> String {
        let base = self.root.trim_end_matches('/');
        if path.is_root() {
            if base.is_empty() {
                "/".to_string()
            } else {
                base.to_string()
            }
        } else {
            format!("{}{}", base, path)
        }
    }

    fn with_stream<T>(
        &self,
        path: &NormalizedPath,
        op: impl FnOnce(&mut FtpStream, &str) -> Result<T, FtpError>,
    ) -> FwResult<T> {
        let mut guard = self.stream.borrow_mut();
        let stream = guard
            .as_mut()
            .ok_or_else(|| FwError::Connection(format!("ftp session to {} is not open", self.settings.host)))?;
        let remote = self.remote_path(path);
        op(stream, &remote).map_err(|e| map_ftp_error(path, e))
    }

    fn list_lines(&self, dir: &NormalizedPath) -> FwResult<Vec<String>> {
        self.with_stream(dir, |s, remote| s.list(Some(remote)))
    }

    fn lookup(&self, path: &NormalizedPath) -> FwResult<Option<Row>> {
        lookup_in(path, &mut |dir: &NormalizedPath| self.list_lines(dir))
    }
}

type Row = (DirEntry, RawStat);

/// Listing row describing `path`, found in its parent's listing.
///
/// Every ancestor is resolved first: `LIST` of a file answers with the
/// file's own row, so a row is only trusted once its parent is known to be
/// a directory. A parent the server reports as unavailable means absent.
fn lookup_in(
    path: &NormalizedPath,
    list: &mut dyn FnMut(&NormalizedPath) -> FwResult<Vec<String>>,
) -> FwResult<Option<Row>> {
    let Some(parent) = path.parent() else {
        return Ok(None);
    };
    if !parent.is_root() {
        match lookup_in(&parent, list)? {
            Some((entry, _)) if entry.kind != EntryKind::File => {}
            _ => return Ok(None),
        }
    }
    let lines = match list(&parent) {
        Ok(lines) => lines,
        Err(FwError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e),
    };
    Ok(parse_listing(&parent, &lines)
        .into_iter()
        .filter_map(Result::ok)
        .find(|(entry, _)| entry.path == *path))
}

fn map_ftp_error(path: &NormalizedPath, err: FtpError) -> FwError {
    match err {
        FtpError::ConnectionError(e) => FwError::Connection(format!("{}: {}", path, e)),
        FtpError::UnexpectedResponse(ref resp) if matches!(resp.status, Status::FileUnavailable) => {
            FwError::NotFound(path.to_string())
        }
        other => FwError::Backend {
            path: path.to_string(),
            message: other.to_string(),
        },
    }
}

/// Parse `LIST` lines for the directory `dir`. Lines that do not parse
/// (`total 12` headers and the like) and the `.`/`..` entries are skipped.
/// A name that cannot be addressed as a child path yields an error row.
fn parse_listing(dir: &NormalizedPath, lines: &[String]) -> Vec<FwResult<Row>> {
    let mut rows = Vec::new();
    for line in lines {
        let file = match line.parse::<File>() {
            Ok(file) => file,
            Err(_) => {
                debug!(line, "skipping unparsable listing line");
                continue;
            }
        };
        let name = file.name();
        if name == "." || name == ".." {
            continue;
        }
        let path = match dir.join(name) {
            Ok(path) => path,
            Err(_) => {
                warn!(dir = %dir, name, "entry name cannot be addressed");
                rows.push(Err(FwError::InvalidPath(format!("{}/{}", dir, name))));
                continue;
            }
        };
        let kind = if file.is_symlink() {
            EntryKind::Symlink
        } else if file.is_directory() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        rows.push(Ok((DirEntry::new(path, kind), raw_stat(&file))));
    }
    rows
}

fn raw_stat(file: &File) -> RawStat {
    let mut stat = RawStat::new()
        .with_size(if file.is_directory() { 0 } else { file.size() as u64 })
        .with_modified(DateTime::<Utc>::from(file.modified()));
    stat.permissions = Some(Permissions::new(mode_of(file)));
    stat.owner = file.uid().map(|uid| uid.to_string());
    stat.group = file.gid().map(|gid| gid.to_string());
    stat
}

fn mode_of(file: &File) -> u32 {
    let classes = [
        (PosixPexQuery::Owner, 6),
        (PosixPexQuery::Group, 3),
        (PosixPexQuery::Others, 0),
    ];
    let mut mode = 0;
    for (class, shift) in classes {
        if file.can_read(class) {
            mode |= 0o4 << shift;
        }
        if file.can_write(class) {
            mode |= 0o2 << shift;
        }
        if file.can_execute(class) {
            mode |= 0o1 << shift;
        }
    }
    mode
}

impl Gateway for FtpBackend {
    fn display_name(&self) -> &str {
        "FTP"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn open(&self) -> FwResult<()> {
        let settings = &self.settings;
        let addr = (settings.host.as_str(), settings.port)
            .to_socket_addrs()
            .map_err(|e| FwError::Connection(format!("{}: {}", settings.host, e)))?
            .next()
            .ok_or_else(|| FwError::Connection(format!("{}: no address", settings.host)))?;

        let connection = |e: FtpError| FwError::Connection(format!("{}: {}", settings.host, e));
        let mut stream = FtpStream::connect_timeout(addr, Duration::from_secs(settings.timeout_secs))
            .map_err(connection)?;
        stream
            .login(
                settings.username.as_str(),
                settings.password.as_deref().unwrap_or(""),
            )
            .map_err(connection)?;
        stream.set_mode(if settings.passive { Mode::Passive } else { Mode::Active });
        stream.transfer_type(FileType::Binary).map_err(connection)?;

        debug!(host = %settings.host, port = settings.port, root = %self.root, "ftp session open");
        *self.stream.borrow_mut() = Some(stream);
        Ok(())
    }

    fn close(&self) -> FwResult<()> {
        if let Some(mut stream) = self.stream.borrow_mut().take() {
            if let Err(e) = stream.quit() {
                warn!(host = %self.settings.host, error = %e, "ftp quit failed");
            }
        }
        Ok(())
    }

    fn exists(&self, path: &NormalizedPath) -> FwResult<bool> {
        Ok(self.stat_type(path)?.is_some())
    }

    fn stat_type(&self, path: &NormalizedPath) -> FwResult<Option<EntryKind>> {
        if path.is_root() {
            return Ok(Some(EntryKind::Directory));
        }
        Ok(self.lookup(path)?.map(|(entry, _)| entry.kind))
    }

    fn stat(&self, path: &NormalizedPath) -> FwResult<RawStat> {
        if path.is_root() {
            return Ok(RawStat::new().with_size(0));
        }
        self.lookup(path)?
            .map(|(_, stat)| stat)
            .ok_or_else(|| FwError::NotFound(path.to_string()))
    }

    fn list(&self, path: &NormalizedPath) -> FwResult<Vec<DirEntry>> {
        match self.stat_type(path)? {
            None => Err(FwError::NotFound(path.to_string())),
            Some(EntryKind::File) => Err(FwError::InvalidTarget(path.to_string())),
            Some(_) => parse_listing(path, &self.list_lines(path)?)
                .into_iter()
                .map(|row| row.map(|(entry, _)| entry))
                .collect(),
        }
    }

    fn read_all(&self, path: &NormalizedPath) -> FwResult<Bytes> {
        let cursor = self.with_stream(path, |s, remote| s.retr_as_buffer(remote))?;
        Ok(Bytes::from(cursor.into_inner()))
    }

    fn write_all(&self, path: &NormalizedPath, data: &[u8]) -> FwResult<()> {
        self.with_stream(path, |s, remote| s.put_file(remote, &mut Cursor::new(data)))
            .map(|_| ())
    }

    fn append_all(&self, path: &NormalizedPath, data: &[u8]) -> FwResult<()> {
        self.with_stream(path, |s, remote| s.append_file(remote, &mut Cursor::new(data)))
            .map(|_| ())
    }

    fn make_directory(&self, path: &NormalizedPath) -> FwResult<()> {
        self.with_stream(path, |s, remote| s.mkdir(remote))
    }

    fn remove_file(&self, path: &NormalizedPath) -> FwResult<()> {
        self.with_stream(path, |s, remote| s.rm(remote))
    }

    fn remove_directory(&self, path: &NormalizedPath) -> FwResult<()> {
        self.with_stream(path, |s, remote| s.rmdir(remote))
    }

    fn set_permissions(&self, path: &NormalizedPath, mode: u32) -> FwResult<()> {
        self.with_stream(path, |s, remote| s.site(format!("CHMOD {:o} {}", mode, remote)))
            .map(|_| ())
    }

    fn set_owner(&self, path: &NormalizedPath, _owner: &str) -> FwResult<()> {
        Err(FwError::Unsupported(format!("ftp chown: {}", path)))
    }

    fn set_group(&self, path: &NormalizedPath, _group: &str) -> FwResult<()> {
        Err(FwError::Unsupported(format!("ftp chgrp: {}", path)))
    }

    fn set_times(
        &self,
        path: &NormalizedPath,
        _modified: DateTime<Utc>,
        _accessed: DateTime<Utc>,
    ) -> FwResult<()> {
        Err(FwError::Unsupported(format!("ftp set times: {}", path)))
    }
}
