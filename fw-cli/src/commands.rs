// SPDX-License-Identifier: AGPL-3.0-or-later
//! CLI command implementations

use chrono::{DateTime, Utc};
use console::style;
use fw_core::{
    AdapterHandle, CopyOptions, EntryKind, FwError, FwResult, ListOptions, TouchOptions,
    WriteOptions,
};
use fw_providers::{BackendKind, BackendRegistry, FwConfig};
use std::io::{Read, Write};
use std::path::Path;
use tabled::{Table, Tabled};
use tracing::debug;

const SCHEME: &str = "fw://";
const LOCAL_BACKEND: &str = "local";

/// Configured backends, connected lazily
pub struct Context {
    registry: BackendRegistry,
}

impl Context {
    pub fn load(config: Option<&Path>) -> FwResult<Self> {
        let config = FwConfig::load_or_default(config)?;
        debug!(backends = config.backends.len(), "configuration loaded");
        Ok(Self {
            registry: BackendRegistry::new(config),
        })
    }

    fn handle(&mut self, backend: &str) -> FwResult<&AdapterHandle> {
        self.registry.get(backend)
    }
}

/// A path on a named backend
#[derive(Debug, PartialEq, Eq)]
struct Location {
    backend: String,
    path: String,
}

/// Parse a path argument
/// Supports:
/// - fw://backend/path - explicit backend
/// - /absolute/path - local backend
/// - relative/path - local backend, resolved against the working directory
fn parse_location(raw: &str) -> FwResult<Location> {
    if let Some(rest) = raw.strip_prefix(SCHEME) {
        let (backend, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        if backend.is_empty() {
            return Err(FwError::InvalidPath(raw.to_string()));
        }
        return Ok(Location {
            backend: backend.to_string(),
            path: path.to_string(),
        });
    }

    let path = if raw.starts_with('/') {
        raw.to_string()
    } else {
        let cwd = std::env::current_dir().map_err(|e| FwError::io(raw, e))?;
        cwd.join(raw).to_string_lossy().into_owned()
    };
    Ok(Location {
        backend: LOCAL_BACKEND.to_string(),
        path,
    })
}

/// Parse an octal mode such as `644` or `0o755`
fn parse_mode(raw: &str) -> FwResult<u32> {
    let digits = raw.trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| FwError::InvalidTarget(format!("invalid mode {raw}")))
}

/// Format a timestamp for display
fn format_time(dt: Option<DateTime<Utc>>) -> String {
    dt.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Format file size
fn format_size(size: Option<u64>, human: bool) -> String {
    match size {
        Some(s) if human => bytesize::ByteSize(s).to_string(),
        Some(s) => s.to_string(),
        None => "-".to_string(),
    }
}

/// Format entry kind
fn format_kind(kind: EntryKind) -> String {
    match kind {
        EntryKind::Directory => style("d").cyan().to_string(),
        EntryKind::File => "-".to_string(),
        EntryKind::Symlink => style("l").magenta().to_string(),
    }
}

/// Format permissions
fn format_permissions(mode: Option<u32>) -> String {
    match mode {
        Some(m) => {
            let bits = [
                (0o400, 'r'),
                (0o200, 'w'),
                (0o100, 'x'),
                (0o040, 'r'),
                (0o020, 'w'),
                (0o010, 'x'),
                (0o004, 'r'),
                (0o002, 'w'),
                (0o001, 'x'),
            ];
            bits.iter()
                .map(|(bit, c)| if m & bit != 0 { *c } else { '-' })
                .collect()
        }
        None => "---------".to_string(),
    }
}

#[derive(Tabled)]
struct LsEntry {
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Permissions")]
    perms: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Name")]
    name: String,
}

/// Listing filters
pub struct LsFilter {
    pub recursive: bool,
    pub extensions: Vec<String>,
    pub mask: Option<String>,
    pub files_only: bool,
    pub dirs_only: bool,
}

impl LsFilter {
    fn options(&self) -> ListOptions {
        ListOptions {
            recursive: self.recursive,
            extensions: self.extensions.clone(),
            include_files: !self.dirs_only,
            include_folders: !self.files_only,
            name_mask: self.mask.clone(),
        }
    }
}

/// List directory contents
pub fn ls(ctx: &mut Context, path: &str, filter: &LsFilter, long: bool, human: bool) -> FwResult<()> {
    let loc = parse_location(path)?;
    let handle = ctx.handle(&loc.backend)?;
    let listing = handle.list(&loc.path, &filter.options())?;
    let base = fw_core::normalize(&loc.path)?;

    let display_name = |entry: &fw_core::DirEntry| -> String {
        if filter.recursive {
            let rel = &entry.path.segments()[base.depth()..];
            rel.join("/")
        } else {
            entry.name().unwrap_or("?").to_string()
        }
    };

    if listing.is_empty() {
        println!("(empty directory)");
        return Ok(());
    }

    if long {
        let mut rows = Vec::with_capacity(listing.len());
        for entry in &listing {
            let (_, stat) = handle.attributes(&entry.path.as_string())?;
            rows.push(LsEntry {
                kind: format_kind(entry.kind),
                perms: format_permissions(stat.permissions.map(|p| p.mode)),
                size: format_size(stat.size, human),
                modified: format_time(stat.modified),
                name: display_name(entry),
            });
        }
        println!("{}", Table::new(rows));
    } else {
        for entry in &listing {
            println!("{}", display_name(entry));
        }
    }

    Ok(())
}

/// Display file contents
pub fn cat(ctx: &mut Context, path: &str) -> FwResult<()> {
    let loc = parse_location(path)?;
    let data = ctx.handle(&loc.backend)?.read(&loc.path)?;
    std::io::stdout()
        .write_all(&data)
        .map_err(|e| FwError::io("<stdout>", e))
}

/// Write a file from stdin or a local file
pub fn put(
    ctx: &mut Context,
    path: &str,
    from: Option<&Path>,
    replace: bool,
    append: bool,
    truncate: bool,
) -> FwResult<()> {
    let loc = parse_location(path)?;
    let data = match from {
        Some(file) => std::fs::read(file).map_err(|e| FwError::io(file.display().to_string(), e))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| FwError::io("<stdin>", e))?;
            buf
        }
    };

    let options = WriteOptions {
        replace,
        append,
        truncate,
    };
    ctx.handle(&loc.backend)?.write(&loc.path, &data, &options)?;
    println!("Wrote {} to {}", bytesize::ByteSize(data.len() as u64), path);
    Ok(())
}

/// Create directories
pub fn mkdir(ctx: &mut Context, paths: &[String]) -> FwResult<()> {
    for path in paths {
        let loc = parse_location(path)?;
        ctx.handle(&loc.backend)?.create_directory(&loc.path)?;
        println!("Created {}", path);
    }
    Ok(())
}

fn copy_options(name: Option<String>, force: bool) -> CopyOptions {
    CopyOptions {
        target_name: name,
        replace: force,
    }
}

/// Copy a file or tree into a directory
pub fn cp(ctx: &mut Context, source: &str, dest: &str, name: Option<String>, force: bool) -> FwResult<()> {
    let src = parse_location(source)?;
    let dst = parse_location(dest)?;
    let options = copy_options(name, force);

    if src.backend == dst.backend {
        ctx.handle(&src.backend)?
            .copy(&src.path, &dst.path, &options, None)?;
    } else {
        let handles = ctx
            .registry
            .get_many(&[src.backend.as_str(), dst.backend.as_str()])?;
        handles[0].copy(&src.path, &dst.path, &options, Some(handles[1]))?;
    }

    println!("Copied {} -> {}", source, dest);
    Ok(())
}

/// Move a file or tree into a directory
pub fn mv(ctx: &mut Context, source: &str, dest: &str, name: Option<String>, force: bool) -> FwResult<()> {
    let src = parse_location(source)?;
    let dst = parse_location(dest)?;
    let options = copy_options(name, force);

    if src.backend == dst.backend {
        ctx.handle(&src.backend)?
            .move_to(&src.path, &dst.path, &options, None)?;
    } else {
        let handles = ctx
            .registry
            .get_many(&[src.backend.as_str(), dst.backend.as_str()])?;
        handles[0].move_to(&src.path, &dst.path, &options, Some(handles[1]))?;
    }

    println!("Moved {} -> {}", source, dest);
    Ok(())
}

/// Remove files or trees
pub fn rm(ctx: &mut Context, paths: &[String]) -> FwResult<()> {
    for path in paths {
        let loc = parse_location(path)?;
        ctx.handle(&loc.backend)?.delete(&loc.path)?;
        println!("Removed {}", path);
    }
    Ok(())
}

/// Show file/directory information
pub fn stat(ctx: &mut Context, path: &str, json: bool) -> FwResult<()> {
    let loc = parse_location(path)?;
    let snapshot = ctx.handle(&loc.backend)?.metadata(&loc.path)?;

    if json {
        let out = serde_json::to_string_pretty(&snapshot).map_err(|e| FwError::io(path, e.into()))?;
        println!("{out}");
        return Ok(());
    }

    if !snapshot.exists {
        return Err(FwError::NotFound(snapshot.path.to_string()));
    }

    println!("  Path: {}", snapshot.path);
    if let Some(kind) = snapshot.kind {
        println!("  Type: {:?}", kind);
    }
    println!("  Size: {} ({})", snapshot.size, bytesize::ByteSize(snapshot.size));

    if let Some(perms) = snapshot.permissions {
        println!("  Mode: {:o} ({})", perms.mode, format_permissions(Some(perms.mode)));
    }
    if let (Some(owner), Some(group)) = (&snapshot.owner, &snapshot.group) {
        println!("  Owner: {}:{}", owner, group);
    }
    if let Some(modified) = snapshot.modified {
        println!("  Modified: {}", modified);
    }
    if let Some(created) = snapshot.created {
        println!("  Created: {}", created);
    }
    if let Some(mime) = &snapshot.mime_type {
        println!("  MIME: {}", mime);
    }
    if let Some(digest) = &snapshot.digest {
        println!("  MD5: {}", digest.md5);
        println!("  SHA1: {}", digest.sha1);
    }

    Ok(())
}

/// Change permission bits
pub fn chmod(ctx: &mut Context, mode: &str, path: &str) -> FwResult<()> {
    let mode = parse_mode(mode)?;
    let loc = parse_location(path)?;
    ctx.handle(&loc.backend)?.change_permission(&loc.path, mode)
}

/// Change owner
pub fn chown(ctx: &mut Context, owner: &str, path: &str) -> FwResult<()> {
    let loc = parse_location(path)?;
    ctx.handle(&loc.backend)?.change_owner(&loc.path, owner)
}

/// Change group
pub fn chgrp(ctx: &mut Context, group: &str, path: &str) -> FwResult<()> {
    let loc = parse_location(path)?;
    ctx.handle(&loc.backend)?.change_group(&loc.path, group)
}

/// Create a file or refresh its timestamps
pub fn touch(ctx: &mut Context, path: &str) -> FwResult<()> {
    let loc = parse_location(path)?;
    ctx.handle(&loc.backend)?
        .touch(&loc.path, &TouchOptions::default())
}

/// List configured backends
pub fn backends(ctx: &Context) -> FwResult<()> {
    println!("Configured backends:");
    for backend in ctx.registry.configs() {
        let kind = match backend.kind {
            BackendKind::Local => style("local").green(),
            BackendKind::Ftp => style("ftp").cyan(),
        };
        let location = match &backend.ftp {
            Some(ftp) => format!("{}:{}{}", ftp.host, ftp.port, backend.handle.root),
            None => backend.handle.root.clone(),
        };
        let access = if backend.handle.read_only { " (read-only)" } else { "" };
        println!("  {} ({}) - {}{}", backend.name, kind, location, access);
    }
    Ok(())
}
