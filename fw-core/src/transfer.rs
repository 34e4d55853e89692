//! Copy, move and delete orchestration
//!
//! Multi-step operations are sequenced from a [`DirectoryManifest`]:
//! target directories are created top-down before any file beneath them is
//! written, and deletions remove every file before removing directories
//! bottom-up. Nothing is rolled back when a step fails; the error reports the
//! failing path and every entry already completed.

use tracing::{debug, info, warn};

use crate::{
    backend::Gateway,
    discovery::{discover, DirectoryManifest},
    entry::EntryKind,
    error::{FwError, FwResult, TransferOp},
    handle::AdapterHandle,
    operations::CopyOptions,
    NormalizedPath,
};

/// One copy or move request, alive for the duration of the call
#[derive(Debug, Clone)]
pub struct TransferPlan<'a> {
    pub source: NormalizedPath,
    pub target: &'a AdapterHandle,
    pub target_directory: NormalizedPath,
    pub target_name: Option<String>,
    pub replace: bool,
}

impl<'a> TransferPlan<'a> {
    pub fn new(
        source: NormalizedPath,
        target: &'a AdapterHandle,
        target_directory: NormalizedPath,
        options: &CopyOptions,
    ) -> Self {
        Self {
            source,
            target,
            target_directory,
            target_name: options.target_name.clone().filter(|n| !n.is_empty()),
            replace: options.replace,
        }
    }
}

/// Copy `plan.source` from `source` into `plan.target`.
///
/// Returns the source manifest so a move can delete exactly what was copied.
pub fn copy(source: &AdapterHandle, plan: &TransferPlan<'_>) -> FwResult<DirectoryManifest> {
    run_copy(source, plan, TransferOp::Copy).map(|(manifest, _)| manifest)
}

/// Copy, then remove the source if and only if the copy completed.
pub fn move_entry(source: &AdapterHandle, plan: &TransferPlan<'_>) -> FwResult<()> {
    if plan.source.is_root() {
        return Err(FwError::RootProtection(plan.source.to_string()));
    }
    source.ensure_writable(&plan.source)?;

    let (manifest, destination) = run_copy(source, plan, TransferOp::Move)?;
    if std::ptr::eq(source, plan.target) && destination == plan.source {
        // Rewritten in place; the source is also the result
        debug!(source = %plan.source, "move onto itself, nothing to remove");
        return Ok(());
    }
    let removed = remove_manifest(source.gateway()?, &manifest, TransferOp::Move)?;

    info!(
        source = %plan.source,
        target = %plan.target_directory,
        removed,
        "move complete"
    );
    Ok(())
}

/// Remove `path` and everything beneath it. The backend root is refused.
pub fn delete(handle: &AdapterHandle, path: &NormalizedPath) -> FwResult<()> {
    if path.is_root() {
        return Err(FwError::RootProtection(handle.root().to_string()));
    }
    let gateway = handle.gateway()?;
    handle.ensure_writable(path)?;

    if gateway.stat_type(path)?.is_none() {
        return Err(FwError::NotFound(path.to_string()));
    }

    let manifest = discover(gateway, path)?;
    let removed = remove_manifest(gateway, &manifest, TransferOp::Delete)?;
    info!(%path, removed, "delete complete");
    Ok(())
}

fn run_copy(
    source: &AdapterHandle,
    plan: &TransferPlan<'_>,
    op: TransferOp,
) -> FwResult<(DirectoryManifest, NormalizedPath)> {
    let src_gw = source.gateway()?;
    let dst_gw = plan.target.gateway()?;

    let kind = src_gw
        .stat_type(&plan.source)?
        .ok_or_else(|| FwError::NotFound(plan.source.to_string()))?;

    check_target_directory(plan.target, dst_gw, &plan.target_directory)?;

    let name = match plan.target_name.as_deref().or(plan.source.name()) {
        Some(name) => name.to_string(),
        None => return Err(FwError::AmbiguousTarget(plan.source.to_string())),
    };
    let destination = plan.target_directory.join(&name)?;

    if std::ptr::eq(source, plan.target) {
        // Only an implicit name is ambiguous; an explicit one follows the replace policy
        if destination == plan.source && plan.target_name.is_none() {
            return Err(FwError::AmbiguousTarget(destination.to_string()));
        }
        if kind == EntryKind::Directory
            && destination != plan.source
            && destination.starts_with(&plan.source)
        {
            return Err(FwError::InvalidTarget(destination.to_string()));
        }
    }

    debug!(%op, source = %plan.source, %destination, replace = plan.replace, "starting transfer");

    if kind != EntryKind::Directory {
        copy_file(src_gw, &plan.source, plan.target, dst_gw, &destination, plan.replace)?;
        info!(%op, source = %plan.source, %destination, "file copied");
        let manifest = DirectoryManifest {
            files: vec![plan.source.clone()],
            ..Default::default()
        };
        return Ok((manifest, destination));
    }

    let manifest = discover(src_gw, &plan.source)?;
    let mut completed: Vec<String> = Vec::new();

    for dir in &manifest.directories {
        let target_dir = rebase(dir, &plan.source, &destination)?;
        let created = ensure_directory(plan.target, dst_gw, &target_dir)
            .map_err(|e| abort(op, &target_dir, &completed, e))?;
        if created {
            completed.push(target_dir.to_string());
        }
    }

    for file in &manifest.files {
        let target_file = rebase(file, &plan.source, &destination)?;
        copy_file(src_gw, file, plan.target, dst_gw, &target_file, plan.replace)
            .map_err(|e| abort(op, &target_file, &completed, e))?;
        completed.push(target_file.to_string());
    }

    info!(
        %op,
        source = %plan.source,
        %destination,
        directories = manifest.directories.len(),
        files = manifest.files.len(),
        "tree copied"
    );
    Ok((manifest, destination))
}

fn check_target_directory(
    target: &AdapterHandle,
    gateway: &dyn Gateway,
    dir: &NormalizedPath,
) -> FwResult<()> {
    target.ensure_writable(dir)?;
    match gateway.stat_type(dir)? {
        Some(EntryKind::Directory) => {}
        _ => return Err(FwError::InvalidTarget(dir.to_string())),
    }
    if gateway.stat(dir)?.writable() == Some(false) {
        return Err(FwError::PermissionDenied(dir.to_string()));
    }
    Ok(())
}

/// Create `dir` unless it is already a directory. Returns whether it was created.
fn ensure_directory(
    target: &AdapterHandle,
    gateway: &dyn Gateway,
    dir: &NormalizedPath,
) -> FwResult<bool> {
    match gateway.stat_type(dir)? {
        Some(EntryKind::Directory) => Ok(false),
        Some(_) => Err(FwError::Conflict(dir.to_string())),
        None => {
            target.make_directory(dir)?;
            Ok(true)
        }
    }
}

/// Single-file write with the replace policy: an existing target is left
/// untouched unless `replace` is set.
fn copy_file(
    src_gw: &dyn Gateway,
    from: &NormalizedPath,
    target: &AdapterHandle,
    dst_gw: &dyn Gateway,
    to: &NormalizedPath,
    replace: bool,
) -> FwResult<()> {
    let existing = dst_gw.stat_type(to)?;
    match existing {
        Some(EntryKind::Directory) => return Err(FwError::InvalidTarget(to.to_string())),
        Some(_) if !replace => return Err(FwError::Conflict(to.to_string())),
        _ => {}
    }

    let data = src_gw.read_all(from)?;
    target.put_file(to, &data, existing.is_some())?;
    debug!(%from, %to, bytes = data.len(), "file written");
    Ok(())
}

/// Remove every file, then every directory deepest first. Stops at the first
/// failure. Returns the number of entries removed.
fn remove_manifest(
    gateway: &dyn Gateway,
    manifest: &DirectoryManifest,
    op: TransferOp,
) -> FwResult<usize> {
    let mut removed: Vec<String> = Vec::with_capacity(manifest.len());

    for file in &manifest.files {
        gateway
            .remove_file(file)
            .map_err(|e| abort(op, file, &removed, e))?;
        debug!(%file, "removed file");
        removed.push(file.to_string());
    }

    for dir in manifest.directories_bottom_up() {
        gateway
            .remove_directory(dir)
            .map_err(|e| abort(op, dir, &removed, e))?;
        debug!(%dir, "removed directory");
        removed.push(dir.to_string());
    }

    Ok(removed.len())
}

fn rebase(
    path: &NormalizedPath,
    from: &NormalizedPath,
    to: &NormalizedPath,
) -> FwResult<NormalizedPath> {
    path.rebase(from, to)
        .ok_or_else(|| FwError::InvalidPath(path.to_string()))
}

fn abort(op: TransferOp, path: &NormalizedPath, completed: &[String], source: FwError) -> FwError {
    warn!(%op, %path, completed = completed.len(), error = %source, "aborting");
    FwError::transfer(op, path.to_string(), completed.to_vec(), source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::handle::HandleConfig;
    use crate::normalize;
    use crate::testing::{Event, MemoryGateway};

    fn p(raw: &str) -> NormalizedPath {
        normalize(raw).unwrap()
    }

    fn connected(gw: MemoryGateway) -> AdapterHandle {
        let handle = AdapterHandle::new("mem", HandleConfig::new("/"), Box::new(gw));
        handle.connect().unwrap();
        handle
    }

    fn mem(handle: &AdapterHandle) -> &MemoryGateway {
        handle.gateway_as::<MemoryGateway>().unwrap()
    }

    fn sample_tree() -> MemoryGateway {
        let gw = MemoryGateway::new();
        gw.add_dir("/src");
        gw.add_file("/src/a.txt", b"alpha");
        gw.add_dir("/src/sub");
        gw.add_file("/src/sub/b.txt", b"bravo");
        gw.add_dir("/dst");
        gw
    }

    fn plan<'a>(src: &str, target: &'a AdapterHandle, dir: &str, opts: CopyOptions) -> TransferPlan<'a> {
        TransferPlan::new(p(src), target, p(dir), &opts)
    }

    #[test]
    fn test_copy_file_conflict_leaves_target() {
        let gw = MemoryGateway::new();
        gw.add_file("/a.txt", b"new");
        gw.add_dir("/b");
        gw.add_file("/b/x", b"old");
        let h = connected(gw);

        let err = copy(&h, &plan("/a.txt", &h, "/b", CopyOptions::named("x"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(mem(&h).content("/b/x").unwrap(), b"old");
    }

    #[test]
    fn test_copy_file_replace() {
        let gw = MemoryGateway::new();
        gw.add_file("/a.txt", b"new");
        gw.add_dir("/b");
        gw.add_file("/b/x", b"old");
        let h = connected(gw);

        copy(&h, &plan("/a.txt", &h, "/b", CopyOptions::named("x").with_replace(true))).unwrap();
        assert_eq!(mem(&h).content("/b/x").unwrap(), b"new");
        assert_eq!(mem(&h).content("/a.txt").unwrap(), b"new");
    }

    #[test]
    fn test_copy_file_keeps_name_by_default() {
        let gw = MemoryGateway::new();
        gw.add_file("/a.txt", b"data");
        gw.add_dir("/b");
        let h = connected(gw);

        copy(&h, &plan("/a.txt", &h, "/b", CopyOptions::default())).unwrap();
        assert_eq!(mem(&h).content("/b/a.txt").unwrap(), b"data");
    }

    #[test]
    fn test_copy_onto_self_is_ambiguous() {
        let gw = MemoryGateway::new();
        gw.add_dir("/d");
        gw.add_file("/d/a.txt", b"data");
        let h = connected(gw);

        let err = copy(&h, &plan("/d/a.txt", &h, "/d", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousTarget);

        let err = copy(&h, &plan("/d", &h, "/", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousTarget);

        copy(&h, &plan("/d/a.txt", &h, "/d", CopyOptions::named("b.txt"))).unwrap();
        assert_eq!(mem(&h).content("/d/b.txt").unwrap(), b"data");
    }

    #[test]
    fn test_copy_onto_self_with_explicit_name_follows_replace() {
        let gw = MemoryGateway::new();
        gw.add_dir("/d");
        gw.add_file("/d/a.txt", b"data");
        gw.add_dir("/d/sub");
        gw.add_file("/d/sub/b.txt", b"bravo");
        let h = connected(gw);

        let err = copy(&h, &plan("/d/a.txt", &h, "/d", CopyOptions::named("a.txt"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        copy(&h, &plan("/d/a.txt", &h, "/d", CopyOptions::named("a.txt").with_replace(true))).unwrap();
        assert_eq!(mem(&h).content("/d/a.txt").unwrap(), b"data");

        let err = copy(&h, &plan("/d", &h, "/", CopyOptions::named("d"))).unwrap_err();
        assert_eq!(err.root_cause().kind(), ErrorKind::Conflict);

        copy(&h, &plan("/d", &h, "/", CopyOptions::named("d").with_replace(true))).unwrap();
        assert_eq!(mem(&h).content("/d/sub/b.txt").unwrap(), b"bravo");
    }

    #[test]
    fn test_move_onto_self_with_replace_keeps_entry() {
        let gw = MemoryGateway::new();
        gw.add_dir("/d");
        gw.add_file("/d/a.txt", b"data");
        let h = connected(gw);

        move_entry(&h, &plan("/d/a.txt", &h, "/d", CopyOptions::named("a.txt").with_replace(true))).unwrap();
        assert_eq!(mem(&h).content("/d/a.txt").unwrap(), b"data");

        move_entry(&h, &plan("/d", &h, "/", CopyOptions::named("d").with_replace(true))).unwrap();
        assert_eq!(mem(&h).content("/d/a.txt").unwrap(), b"data");
    }

    #[test]
    fn test_copy_into_own_subtree_is_invalid() {
        let h = connected(sample_tree());
        let err = copy(&h, &plan("/src", &h, "/src/sub", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);
    }

    #[test]
    fn test_copy_preconditions() {
        let h = connected(sample_tree());

        let err = copy(&h, &plan("/missing", &h, "/dst", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = copy(&h, &plan("/src/a.txt", &h, "/nowhere", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);

        let err = copy(&h, &plan("/src/sub", &h, "/src/a.txt", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTarget);

        mem(&h).set_mode("/dst", 0o555);
        let err = copy(&h, &plan("/src/a.txt", &h, "/dst", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn test_copy_tree_with_new_name() {
        let h = connected(sample_tree());

        copy(&h, &plan("/src", &h, "/dst", CopyOptions::named("out"))).unwrap();

        let gw = mem(&h);
        assert_eq!(
            gw.paths_under("/dst"),
            vec!["/dst/out", "/dst/out/a.txt", "/dst/out/sub", "/dst/out/sub/b.txt"]
        );
        assert_eq!(gw.content("/dst/out/a.txt").unwrap(), b"alpha");
        assert_eq!(gw.content("/dst/out/sub/b.txt").unwrap(), b"bravo");
    }

    #[test]
    fn test_copy_tree_creates_directories_before_files() {
        let h = connected(sample_tree());
        copy(&h, &plan("/src", &h, "/dst", CopyOptions::default())).unwrap();

        let events = mem(&h).events();
        for (i, event) in events.iter().enumerate() {
            if let Event::Write(file) = event {
                let parent = p(file).parent().unwrap().to_string();
                let created_at = events
                    .iter()
                    .position(|e| *e == Event::MakeDirectory(parent.clone()))
                    .expect("parent created");
                assert!(created_at < i, "{file} written before {parent} existed");
            }
        }
    }

    #[test]
    fn test_copy_tree_merges_into_existing_directory() {
        let gw = sample_tree();
        gw.add_dir("/dst/src");
        gw.add_file("/dst/src/keep.txt", b"keep");
        let h = connected(gw);

        copy(&h, &plan("/src", &h, "/dst", CopyOptions::default())).unwrap();
        let gw = mem(&h);
        assert_eq!(gw.content("/dst/src/keep.txt").unwrap(), b"keep");
        assert_eq!(gw.content("/dst/src/sub/b.txt").unwrap(), b"bravo");
    }

    #[test]
    fn test_copy_tree_conflict_aborts_without_rollback() {
        let gw = sample_tree();
        gw.add_dir("/dst/src");
        gw.add_dir("/dst/src/sub");
        gw.add_file("/dst/src/sub/b.txt", b"existing");
        let h = connected(gw);

        let err = copy(&h, &plan("/src", &h, "/dst", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert_eq!(err.root_cause().kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("/dst/src/sub/b.txt"));
        assert_eq!(err.completed(), ["/dst/src/a.txt".to_string()]);

        let gw = mem(&h);
        assert_eq!(gw.content("/dst/src/a.txt").unwrap(), b"alpha");
        assert_eq!(gw.content("/dst/src/sub/b.txt").unwrap(), b"existing");
    }

    #[test]
    fn test_copy_tree_write_failure_names_path() {
        let gw = sample_tree();
        gw.fail_on("/dst/src/a.txt");
        let h = connected(gw);

        let err = copy(&h, &plan("/src", &h, "/dst", CopyOptions::default())).unwrap_err();
        match &err {
            FwError::Transfer { op, path, .. } => {
                assert_eq!(*op, TransferOp::Copy);
                assert_eq!(path, "/dst/src/a.txt");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!mem(&h).has("/dst/src/sub/b.txt"));
    }

    #[test]
    fn test_copy_applies_default_modes_to_new_entries() {
        let mut config = HandleConfig::new("/");
        config.file_mode = Some(0o600);
        config.dir_mode = Some(0o700);
        let h = AdapterHandle::new("mem", config, Box::new(sample_tree()));
        h.connect().unwrap();

        copy(&h, &plan("/src", &h, "/dst", CopyOptions::default())).unwrap();
        assert_eq!(mem(&h).mode("/dst/src"), Some(0o700));
        assert_eq!(mem(&h).mode("/dst/src/sub/b.txt"), Some(0o600));
        assert_eq!(mem(&h).mode("/src/sub/b.txt"), Some(0o644));
    }

    #[test]
    fn test_copy_across_handles() {
        let src = connected(sample_tree());
        let dst_gw = MemoryGateway::new();
        dst_gw.add_dir("/inbox");
        let dst = connected(dst_gw);

        copy(&src, &plan("/src", &dst, "/inbox", CopyOptions::default())).unwrap();
        assert_eq!(mem(&dst).content("/inbox/src/sub/b.txt").unwrap(), b"bravo");
        assert!(mem(&src).has("/src/sub/b.txt"));
    }

    #[test]
    fn test_copy_across_handles_to_same_path_is_allowed() {
        let src = connected(sample_tree());
        let dst_gw = MemoryGateway::new();
        let dst = connected(dst_gw);

        copy(&src, &plan("/src", &dst, "/", CopyOptions::default())).unwrap();
        assert_eq!(mem(&dst).content("/src/a.txt").unwrap(), b"alpha");
    }

    #[test]
    fn test_copy_to_read_only_target() {
        let src = connected(sample_tree());
        let mut config = HandleConfig::new("/");
        config.read_only = true;
        let dst = AdapterHandle::new("ro", config, Box::new(MemoryGateway::new()));
        dst.connect().unwrap();

        let err = copy(&src, &plan("/src", &dst, "/", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn test_move_tree() {
        let h = connected(sample_tree());
        move_entry(&h, &plan("/src", &h, "/dst", CopyOptions::named("out"))).unwrap();

        let gw = mem(&h);
        assert!(!gw.has("/src"));
        assert!(gw.paths_under("/").iter().all(|p| !p.starts_with("/src")));
        assert_eq!(gw.content("/dst/out/a.txt").unwrap(), b"alpha");
        assert_eq!(gw.content("/dst/out/sub/b.txt").unwrap(), b"bravo");
    }

    #[test]
    fn test_move_matches_copy_result() {
        let copied = connected(sample_tree());
        copy(&copied, &plan("/src", &copied, "/dst", CopyOptions::default())).unwrap();

        let moved = connected(sample_tree());
        move_entry(&moved, &plan("/src", &moved, "/dst", CopyOptions::default())).unwrap();

        assert_eq!(mem(&copied).paths_under("/dst"), mem(&moved).paths_under("/dst"));
        assert!(!mem(&moved).has("/src"));
    }

    #[test]
    fn test_move_file_across_handles() {
        let src = connected(sample_tree());
        let dst = connected(MemoryGateway::new());

        move_entry(&src, &plan("/src/a.txt", &dst, "/", CopyOptions::named("renamed.txt"))).unwrap();
        assert!(!mem(&src).has("/src/a.txt"));
        assert_eq!(mem(&dst).content("/renamed.txt").unwrap(), b"alpha");
    }

    #[test]
    fn test_failed_move_keeps_source() {
        let gw = sample_tree();
        gw.fail_on("/dst/src/sub/b.txt");
        let h = connected(gw);

        let err = move_entry(&h, &plan("/src", &h, "/dst", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert!(matches!(err, FwError::Transfer { op: TransferOp::Move, .. }));

        let gw = mem(&h);
        assert_eq!(gw.content("/src/a.txt").unwrap(), b"alpha");
        assert_eq!(gw.content("/src/sub/b.txt").unwrap(), b"bravo");
        assert_eq!(gw.content("/dst/src/a.txt").unwrap(), b"alpha");
        assert!(gw.events().iter().all(|e| !matches!(e, Event::RemoveFile(_) | Event::RemoveDirectory(_))));
    }

    #[test]
    fn test_move_root_is_refused() {
        let h = connected(sample_tree());
        let err = move_entry(&h, &plan("/", &h, "/dst", CopyOptions::named("all"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RootProtection);
        assert!(mem(&h).events().is_empty());
    }

    #[test]
    fn test_delete_root_is_refused() {
        let h = connected(sample_tree());
        let err = delete(&h, &NormalizedPath::root()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RootProtection);
        assert!(mem(&h).events().is_empty());
        assert!(mem(&h).has("/src/a.txt"));
    }

    #[test]
    fn test_delete_tree_removes_files_first() {
        let gw = MemoryGateway::new();
        gw.add_dir("/d");
        gw.add_file("/d/1", b"1");
        gw.add_dir("/d/x");
        gw.add_file("/d/x/2", b"2");
        gw.add_dir("/d/x/y");
        gw.add_file("/d/x/y/3", b"3");
        gw.add_dir("/d/z");
        let h = connected(gw);

        delete(&h, &p("/d")).unwrap();

        let gw = mem(&h);
        assert!(!gw.has("/d"));
        assert!(gw.paths_under("/").is_empty());

        let events = gw.events();
        let last_file = events.iter().rposition(|e| matches!(e, Event::RemoveFile(_))).unwrap();
        let first_dir = events.iter().position(|e| matches!(e, Event::RemoveDirectory(_))).unwrap();
        assert!(last_file < first_dir);

        let dirs: Vec<&str> = events
            .iter()
            .filter(|e| matches!(e, Event::RemoveDirectory(_)))
            .map(|e| e.path())
            .collect();
        assert_eq!(dirs, vec!["/d/z", "/d/x/y", "/d/x", "/d"]);
    }

    #[test]
    fn test_delete_single_file() {
        let h = connected(sample_tree());
        delete(&h, &p("/src/a.txt")).unwrap();
        assert!(!mem(&h).has("/src/a.txt"));
        assert!(mem(&h).has("/src/sub/b.txt"));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let h = connected(sample_tree());
        assert_eq!(delete(&h, &p("/ghost")).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_aborts_and_reports_removed() {
        let gw = sample_tree();
        gw.fail_on("/src/sub/b.txt");
        let h = connected(gw);

        let err = delete(&h, &p("/src")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transfer);
        assert_eq!(err.completed(), ["/src/a.txt".to_string()]);
        assert!(mem(&h).has("/src/sub"));
        assert!(mem(&h).has("/src"));
    }

    #[test]
    fn test_operations_require_connection() {
        let h = AdapterHandle::new("mem", HandleConfig::new("/"), Box::new(sample_tree()));
        let err = delete(&h, &p("/src")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        let err = copy(&h, &plan("/src", &h, "/dst", CopyOptions::default())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
