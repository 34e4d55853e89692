//! In-memory gateway with an event log, for exercising orchestration order

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::{
    backend::Gateway,
    entry::{DirEntry, EntryKind},
    error::{FwError, FwResult},
    metadata::RawStat,
    normalize, NormalizedPath,
};

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, mode: u32 },
    Dir { mode: u32 },
    Link { target: NormalizedPath },
}

#[derive(Debug, Clone, Default)]
struct Attrs {
    owner: Option<String>,
    group: Option<String>,
    modified: Option<DateTime<Utc>>,
    accessed: Option<DateTime<Utc>>,
}

/// Mutating call observed by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    MakeDirectory(String),
    Write(String),
    Append(String),
    RemoveFile(String),
    RemoveDirectory(String),
    SetPermissions(String, u32),
}

impl Event {
    pub fn path(&self) -> &str {
        match self {
            Event::MakeDirectory(p)
            | Event::Write(p)
            | Event::Append(p)
            | Event::RemoveFile(p)
            | Event::RemoveDirectory(p)
            | Event::SetPermissions(p, _) => p,
        }
    }
}

pub struct MemoryGateway {
    nodes: RefCell<BTreeMap<NormalizedPath, Node>>,
    attrs: RefCell<BTreeMap<NormalizedPath, Attrs>>,
    events: RefCell<Vec<Event>>,
    failing: RefCell<BTreeSet<NormalizedPath>>,
    fail_open: Cell<bool>,
    opened: Cell<u32>,
    closed: Cell<u32>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(NormalizedPath::root(), Node::Dir { mode: 0o755 });
        Self {
            nodes: RefCell::new(nodes),
            attrs: RefCell::new(BTreeMap::new()),
            events: RefCell::new(Vec::new()),
            failing: RefCell::new(BTreeSet::new()),
            fail_open: Cell::new(false),
            opened: Cell::new(0),
            closed: Cell::new(0),
        }
    }

    fn key(raw: &str) -> NormalizedPath {
        normalize(raw).expect("test paths are absolute")
    }

    pub fn add_dir(&self, raw: &str) {
        self.nodes.borrow_mut().insert(Self::key(raw), Node::Dir { mode: 0o755 });
    }

    pub fn add_file(&self, raw: &str, data: &[u8]) {
        self.nodes
            .borrow_mut()
            .insert(Self::key(raw), Node::File { data: data.to_vec(), mode: 0o644 });
    }

    pub fn add_symlink(&self, raw: &str, target: &str) {
        self.nodes
            .borrow_mut()
            .insert(Self::key(raw), Node::Link { target: Self::key(target) });
    }

    pub fn set_mode(&self, raw: &str, new_mode: u32) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&Self::key(raw)) {
            match node {
                Node::File { mode, .. } | Node::Dir { mode } => *mode = new_mode,
                Node::Link { .. } => {}
            }
        }
    }

    /// Make every mutating call and read on `raw` fail
    pub fn fail_on(&self, raw: &str) {
        self.failing.borrow_mut().insert(Self::key(raw));
    }

    pub fn fail_open(&self) {
        self.fail_open.set(true);
    }

    pub fn content(&self, raw: &str) -> Option<Vec<u8>> {
        match self.nodes.borrow().get(&Self::key(raw)) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn has(&self, raw: &str) -> bool {
        self.nodes.borrow().contains_key(&Self::key(raw))
    }

    pub fn is_dir(&self, raw: &str) -> bool {
        matches!(self.nodes.borrow().get(&Self::key(raw)), Some(Node::Dir { .. }))
    }

    pub fn mode(&self, raw: &str) -> Option<u32> {
        match self.nodes.borrow().get(&Self::key(raw)) {
            Some(Node::File { mode, .. }) | Some(Node::Dir { mode }) => Some(*mode),
            _ => None,
        }
    }

    /// Every path under `raw`, excluding `raw` itself
    pub fn paths_under(&self, raw: &str) -> Vec<String> {
        let base = Self::key(raw);
        self.nodes
            .borrow()
            .keys()
            .filter(|k| k.starts_with(&base) && **k != base)
            .map(|k| k.to_string())
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn open_count(&self) -> u32 {
        self.opened.get()
    }

    pub fn close_count(&self) -> u32 {
        self.closed.get()
    }

    fn check_failure(&self, path: &NormalizedPath) -> FwResult<()> {
        if self.failing.borrow().contains(path) {
            Err(FwError::Backend {
                path: path.to_string(),
                message: "injected failure".into(),
            })
        } else {
            Ok(())
        }
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn resolve(&self, path: &NormalizedPath) -> Option<(NormalizedPath, Node)> {
        let nodes = self.nodes.borrow();
        let mut current = path.clone();
        for _ in 0..8 {
            match nodes.get(&current)? {
                Node::Link { target } => current = target.clone(),
                node => return Some((current, node.clone())),
            }
        }
        None
    }

    fn require_parent_dir(&self, path: &NormalizedPath) -> FwResult<()> {
        let parent = path
            .parent()
            .ok_or_else(|| FwError::InvalidTarget(path.to_string()))?;
        match self.nodes.borrow().get(&parent) {
            Some(Node::Dir { .. }) => Ok(()),
            _ => Err(FwError::NotFound(parent.to_string())),
        }
    }
}

impl Gateway for MemoryGateway {
    fn display_name(&self) -> &str {
        "Memory"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn open(&self) -> FwResult<()> {
        if self.fail_open.get() {
            return Err(FwError::Connection("refused".into()));
        }
        self.opened.set(self.opened.get() + 1);
        Ok(())
    }

    fn close(&self) -> FwResult<()> {
        self.closed.set(self.closed.get() + 1);
        Ok(())
    }

    fn exists(&self, path: &NormalizedPath) -> FwResult<bool> {
        Ok(self.stat_type(path)?.is_some())
    }

    fn stat_type(&self, path: &NormalizedPath) -> FwResult<Option<EntryKind>> {
        if !self.nodes.borrow().contains_key(path) {
            return Ok(None);
        }
        Ok(Some(match self.resolve(path) {
            Some((_, Node::Dir { .. })) => EntryKind::Directory,
            Some((_, Node::File { .. })) => EntryKind::File,
            _ => EntryKind::Symlink,
        }))
    }

    fn stat(&self, path: &NormalizedPath) -> FwResult<RawStat> {
        let (resolved, node) = self
            .resolve(path)
            .ok_or_else(|| FwError::NotFound(path.to_string()))?;
        let attrs = self.attrs.borrow().get(&resolved).cloned().unwrap_or_default();
        let mut stat = match node {
            Node::File { data, mode } => RawStat::new().with_size(data.len() as u64).with_mode(mode),
            Node::Dir { mode } => RawStat::new().with_mode(mode),
            Node::Link { .. } => RawStat::new(),
        };
        stat.owner = attrs.owner;
        stat.group = attrs.group;
        stat.modified = attrs.modified;
        stat.accessed = attrs.accessed;
        Ok(stat)
    }

    fn list(&self, path: &NormalizedPath) -> FwResult<Vec<DirEntry>> {
        match self.resolve(path) {
            Some((_, Node::Dir { .. })) => {}
            Some(_) => return Err(FwError::InvalidTarget(path.to_string())),
            None => return Err(FwError::NotFound(path.to_string())),
        }
        let nodes = self.nodes.borrow();
        Ok(nodes
            .iter()
            .filter(|(k, _)| k.parent().as_ref() == Some(path))
            .map(|(k, node)| {
                let kind = match node {
                    Node::File { .. } => EntryKind::File,
                    Node::Dir { .. } => EntryKind::Directory,
                    Node::Link { .. } => EntryKind::Symlink,
                };
                DirEntry::new(k.clone(), kind)
            })
            .collect())
    }

    fn read_all(&self, path: &NormalizedPath) -> FwResult<Bytes> {
        self.check_failure(path)?;
        match self.resolve(path) {
            Some((_, Node::File { data, .. })) => Ok(Bytes::from(data)),
            Some(_) => Err(FwError::InvalidTarget(path.to_string())),
            None => Err(FwError::NotFound(path.to_string())),
        }
    }

    fn write_all(&self, path: &NormalizedPath, data: &[u8]) -> FwResult<()> {
        self.check_failure(path)?;
        self.require_parent_dir(path)?;
        let mut nodes = self.nodes.borrow_mut();
        let mode = match nodes.get(path) {
            Some(Node::Dir { .. }) => return Err(FwError::InvalidTarget(path.to_string())),
            Some(Node::File { mode, .. }) => *mode,
            _ => 0o644,
        };
        nodes.insert(path.clone(), Node::File { data: data.to_vec(), mode });
        drop(nodes);
        self.record(Event::Write(path.to_string()));
        Ok(())
    }

    fn append_all(&self, path: &NormalizedPath, data: &[u8]) -> FwResult<()> {
        self.check_failure(path)?;
        self.require_parent_dir(path)?;
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(path) {
            Some(Node::File { data: existing, .. }) => existing.extend_from_slice(data),
            Some(_) => return Err(FwError::InvalidTarget(path.to_string())),
            None => {
                nodes.insert(path.clone(), Node::File { data: data.to_vec(), mode: 0o644 });
            }
        }
        drop(nodes);
        self.record(Event::Append(path.to_string()));
        Ok(())
    }

    fn make_directory(&self, path: &NormalizedPath) -> FwResult<()> {
        self.check_failure(path)?;
        self.require_parent_dir(path)?;
        if self.nodes.borrow().contains_key(path) {
            return Err(FwError::Conflict(path.to_string()));
        }
        self.nodes.borrow_mut().insert(path.clone(), Node::Dir { mode: 0o755 });
        self.record(Event::MakeDirectory(path.to_string()));
        Ok(())
    }

    fn remove_file(&self, path: &NormalizedPath) -> FwResult<()> {
        self.check_failure(path)?;
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get(path) {
            Some(Node::File { .. }) | Some(Node::Link { .. }) => {
                nodes.remove(path);
            }
            Some(Node::Dir { .. }) => return Err(FwError::InvalidTarget(path.to_string())),
            None => return Err(FwError::NotFound(path.to_string())),
        }
        drop(nodes);
        self.record(Event::RemoveFile(path.to_string()));
        Ok(())
    }

    fn remove_directory(&self, path: &NormalizedPath) -> FwResult<()> {
        self.check_failure(path)?;
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get(path) {
            Some(Node::Dir { .. }) => {}
            Some(_) => return Err(FwError::InvalidTarget(path.to_string())),
            None => return Err(FwError::NotFound(path.to_string())),
        }
        if nodes.keys().any(|k| k.parent().as_ref() == Some(path)) {
            return Err(FwError::Backend {
                path: path.to_string(),
                message: "directory not empty".into(),
            });
        }
        nodes.remove(path);
        drop(nodes);
        self.record(Event::RemoveDirectory(path.to_string()));
        Ok(())
    }

    fn set_permissions(&self, path: &NormalizedPath, new_mode: u32) -> FwResult<()> {
        self.check_failure(path)?;
        let resolved = self
            .resolve(path)
            .map(|(p, _)| p)
            .ok_or_else(|| FwError::NotFound(path.to_string()))?;
        if let Some(Node::File { mode, .. } | Node::Dir { mode }) =
            self.nodes.borrow_mut().get_mut(&resolved)
        {
            *mode = new_mode;
        }
        self.record(Event::SetPermissions(path.to_string(), new_mode));
        Ok(())
    }

    fn set_owner(&self, path: &NormalizedPath, owner: &str) -> FwResult<()> {
        let resolved = self
            .resolve(path)
            .map(|(p, _)| p)
            .ok_or_else(|| FwError::NotFound(path.to_string()))?;
        self.attrs.borrow_mut().entry(resolved).or_default().owner = Some(owner.to_string());
        Ok(())
    }

    fn set_group(&self, path: &NormalizedPath, group: &str) -> FwResult<()> {
        let resolved = self
            .resolve(path)
            .map(|(p, _)| p)
            .ok_or_else(|| FwError::NotFound(path.to_string()))?;
        self.attrs.borrow_mut().entry(resolved).or_default().group = Some(group.to_string());
        Ok(())
    }

    fn set_times(
        &self,
        path: &NormalizedPath,
        modified: DateTime<Utc>,
        accessed: DateTime<Utc>,
    ) -> FwResult<()> {
        let resolved = self
            .resolve(path)
            .map(|(p, _)| p)
            .ok_or_else(|| FwError::NotFound(path.to_string()))?;
        let mut attrs = self.attrs.borrow_mut();
        let entry = attrs.entry(resolved).or_default();
        entry.modified = Some(modified);
        entry.accessed = Some(accessed);
        Ok(())
    }
}
