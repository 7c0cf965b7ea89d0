//! The in-memory file system engine.
//!
//! `MemoryFs` binds canonical path strings to node-tree operations and
//! implements the same observable contract a real-disk wrapper would:
//! existence, streams, delete/move/copy, timestamps, listing. It is built for
//! test suites that consume path descriptors without touching real storage.
//!
//! Single-threaded and synchronous: every operation is a finite computation
//! over in-memory state, and independent instances never interact.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::{FsError, PathError};
use crate::path::chars::MAX_PATH_LENGTH;
use crate::path::descriptor::FsTag;
use crate::path::{Drive, RootedDirectory, RootedFile};
use crate::resolve;
use crate::stream::{FileStream, StreamMode};
use crate::tree::{NodeId, NodeTree};

static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

pub struct MemoryFs {
    pub(crate) tag: FsTag,
    pub(crate) tree: NodeTree,
    current_directory: Option<RootedDirectory>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    // -- Construction -----------------------------------------------------

    /// An empty file system with no drives.
    pub fn new() -> Self {
        let tag = FsTag(NEXT_TAG.fetch_add(1, Ordering::Relaxed));
        Self {
            tag,
            tree: NodeTree::new(Self::now()),
            current_directory: None,
        }
    }

    /// An empty file system with the given drives mounted.
    pub fn with_drives<'a, I>(drives: I) -> Result<Self, FsError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut fs = Self::new();
        for drive in drives {
            fs.add_drive(drive)?;
        }
        Ok(fs)
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    // -- Drives -----------------------------------------------------------

    /// Mount a drive (or UNC share), reusing it if already present.
    pub fn add_drive(&mut self, raw: &str) -> Result<Drive, FsError> {
        let drive = Drive::from_string(raw)?.with_owner(self.tag);
        let root = self.tree.root();
        self.tree
            .create_or_reuse_folder(root, drive.canonical(), Self::now())?;
        debug!(drive = drive.canonical(), "drive mounted");
        Ok(drive)
    }

    /// The mounted drives, in mount order.
    pub fn drives(&self) -> Vec<Drive> {
        self.tree
            .children(self.tree.root())
            .into_iter()
            .filter_map(|id| Drive::from_string(self.tree.node(id).name.clone()).ok())
            .map(|d| d.with_owner(self.tag))
            .collect()
    }

    // -- Descriptor factories ---------------------------------------------

    /// Build a drive descriptor owned by this instance.
    pub fn drive(&self, raw: &str) -> Result<Drive, FsError> {
        Ok(Drive::from_string(raw)?.with_owner(self.tag))
    }

    /// Build a rooted directory descriptor owned by this instance.
    pub fn rooted_directory(&self, raw: &str) -> Result<RootedDirectory, FsError> {
        Ok(RootedDirectory::from_string(raw)?.with_owner(self.tag))
    }

    /// Build a rooted file descriptor owned by this instance.
    pub fn rooted_file(&self, raw: &str) -> Result<RootedFile, FsError> {
        Ok(RootedFile::from_string(raw)?.with_owner(self.tag))
    }

    // -- Existence ---------------------------------------------------------

    /// Whether the directory exists. Never errors.
    pub fn directory_exists(&self, dir: &RootedDirectory) -> bool {
        match resolve::lookup(&self.tree, dir.canonical()) {
            Some(id) => self.tree.node(id).is_folder(),
            None => false,
        }
    }

    /// Whether the file exists. Never errors.
    pub fn file_exists(&self, file: &RootedFile) -> bool {
        match resolve::lookup(&self.tree, file.canonical()) {
            Some(id) => self.tree.node(id).is_file(),
            None => false,
        }
    }

    // -- Directories --------------------------------------------------------

    /// Create the directory and any missing intermediate folders. The drive
    /// itself must already be mounted.
    pub fn create_directory(&mut self, dir: &RootedDirectory) -> Result<(), FsError> {
        self.guard_owner(dir.owner())?;
        resolve::create_dirs(&mut self.tree, dir.canonical(), Self::now())?;
        debug!(path = dir.canonical(), "directory created");
        Ok(())
    }

    /// Delete a directory, `Ok(false)` when it does not exist. Drive roots
    /// are not deletable. A non-recursive delete of a populated directory
    /// fails with `NotEmpty`; an open file anywhere below fails with `InUse`
    /// before anything is detached.
    pub fn delete_directory(
        &mut self,
        dir: &RootedDirectory,
        recursive: bool,
    ) -> Result<bool, FsError> {
        self.guard_owner(dir.owner())?;
        if dir.is_drive_root() {
            return Err(FsError::InvalidOperation(format!(
                "cannot delete drive root: {}",
                dir.canonical()
            )));
        }
        let id = match resolve::lookup(&self.tree, dir.canonical()) {
            Some(id) => id,
            None => return Ok(false),
        };
        if !self.tree.node(id).is_folder() {
            return Err(FsError::NotADirectory(dir.canonical().to_string()));
        }
        if !recursive && !self.tree.children(id).is_empty() {
            return Err(FsError::NotEmpty(dir.canonical().to_string()));
        }
        self.tree.remove(id, Self::now())?;
        // A current directory inside the deleted subtree no longer resolves.
        if let Some(current) = &self.current_directory {
            if path_within(current.canonical(), dir.canonical()) {
                self.current_directory = None;
            }
        }
        debug!(path = dir.canonical(), "directory deleted");
        Ok(true)
    }

    // -- Streams -----------------------------------------------------------

    /// Open an existing file for reading. Concurrent read streams are
    /// independent; each owns its own cursor.
    pub fn open_read(&self, file: &RootedFile) -> Result<FileStream, FsError> {
        self.guard_owner(file.owner())?;
        let id = self.resolve_file(file)?;
        let data = self.file_data(id);
        Ok(FileStream::open(&data, StreamMode::Read))
    }

    /// Create-always-overwrite: any existing node of that name is disposed
    /// and replaced by a fresh empty file.
    pub fn open_write(&mut self, file: &RootedFile) -> Result<FileStream, FsError> {
        self.guard_owner(file.owner())?;
        let parent = self.resolve_parent(file)?;
        let now = Self::now();
        let id = self
            .tree
            .create_file(parent, file.file_name().as_str(), now)?;
        debug!(path = file.canonical(), "file created for writing");
        let data = self.file_data(id);
        Ok(FileStream::open(&data, StreamMode::Write))
    }

    /// Open-or-create keeping content, positioned at the end.
    pub fn open_append(&mut self, file: &RootedFile) -> Result<FileStream, FsError> {
        self.open_writer(file, StreamMode::Append)
    }

    /// Open-or-create keeping content, read + write + seek.
    pub fn open_modify(&mut self, file: &RootedFile) -> Result<FileStream, FsError> {
        self.open_writer(file, StreamMode::Modify)
    }

    fn open_writer(&mut self, file: &RootedFile, mode: StreamMode) -> Result<FileStream, FsError> {
        self.guard_owner(file.owner())?;
        let parent = self.resolve_parent(file)?;
        let now = Self::now();
        let id = self
            .tree
            .create_or_reuse_file(parent, file.file_name().as_str(), now)?;
        let data = self.file_data(id);
        if data.is_open() {
            return Err(FsError::InUse(file.canonical().to_string()));
        }
        self.tree.node_mut(id).last_write = now;
        Ok(FileStream::open(&data, mode))
    }

    // -- Whole-file convenience --------------------------------------------

    /// The file's content as bytes.
    pub fn read_file(&self, file: &RootedFile) -> Result<Vec<u8>, FsError> {
        self.guard_owner(file.owner())?;
        let id = self.resolve_file(file)?;
        Ok(self.file_data(id).content.borrow().clone())
    }

    /// The file's content as UTF-8 text.
    pub fn read_to_string(&self, file: &RootedFile) -> Result<String, FsError> {
        String::from_utf8(self.read_file(file)?).map_err(|_| {
            FsError::InvalidOperation(format!("not valid UTF-8: {}", file.canonical()))
        })
    }

    /// Replace the file's content, creating it (and discarding any previous
    /// content) like a write stream would.
    pub fn write_file(&mut self, file: &RootedFile, bytes: &[u8]) -> Result<(), FsError> {
        self.guard_owner(file.owner())?;
        let parent = self.resolve_parent(file)?;
        let now = Self::now();
        let id = self
            .tree
            .create_file(parent, file.file_name().as_str(), now)?;
        *self.file_data(id).content.borrow_mut() = bytes.to_vec();
        debug!(path = file.canonical(), size = bytes.len(), "file written");
        Ok(())
    }

    /// Append bytes, creating the file if missing and keeping its content.
    pub fn append_file(&mut self, file: &RootedFile, bytes: &[u8]) -> Result<(), FsError> {
        self.guard_owner(file.owner())?;
        let parent = self.resolve_parent(file)?;
        let now = Self::now();
        let id = self
            .tree
            .create_or_reuse_file(parent, file.file_name().as_str(), now)?;
        let data = self.file_data(id);
        if data.is_open() {
            return Err(FsError::InUse(file.canonical().to_string()));
        }
        data.content.borrow_mut().extend_from_slice(bytes);
        self.tree.node_mut(id).last_write = now;
        Ok(())
    }

    /// Delete a file, `Ok(false)` when it does not exist, `InUse` while a
    /// stream holds it open.
    pub fn delete_file(&mut self, file: &RootedFile) -> Result<bool, FsError> {
        self.guard_owner(file.owner())?;
        let id = match resolve::lookup(&self.tree, file.canonical()) {
            Some(id) => id,
            None => return Ok(false),
        };
        if !self.tree.node(id).is_file() {
            return Err(FsError::NotAFile(file.canonical().to_string()));
        }
        self.tree.remove(id, Self::now())?;
        debug!(path = file.canonical(), "file deleted");
        Ok(true)
    }

    // -- Move & copy -------------------------------------------------------

    /// Re-parent and rename in a single tree mutation; the destination node
    /// is the source node, content and timestamps included.
    pub fn move_file(&mut self, source: &RootedFile, dest: &RootedFile) -> Result<(), FsError> {
        self.guard_owner(source.owner())?;
        self.guard_owner(dest.owner())?;
        let id = self.resolve_file(source)?;
        let dest_parent = self.resolve_parent(dest)?;
        self.tree
            .move_node(id, dest_parent, dest.file_name().as_str(), Self::now())?;
        debug!(from = source.canonical(), to = dest.canonical(), "file moved");
        Ok(())
    }

    /// Move a directory subtree. Fails when the destination exists, lies
    /// inside the source, or would push a descendant's path past the length
    /// limit.
    pub fn move_directory(
        &mut self,
        source: &RootedDirectory,
        dest: &RootedDirectory,
    ) -> Result<(), FsError> {
        self.guard_owner(source.owner())?;
        self.guard_owner(dest.owner())?;
        if source.is_drive_root() || dest.is_drive_root() {
            return Err(FsError::InvalidOperation(
                "cannot move a drive root".to_string(),
            ));
        }
        let id = self.resolve_dir(source)?;
        self.ensure_descendants_fit(id, dest.canonical())?;
        let dest_parent = self.resolve_dir(&dest.parent()?)?;
        let dest_name = last_segment(dest.canonical());
        self.tree
            .move_node(id, dest_parent, dest_name, Self::now())?;
        debug!(
            from = source.canonical(),
            to = dest.canonical(),
            "directory moved"
        );
        Ok(())
    }

    /// Duplicate a file's content into a fresh node at the destination.
    pub fn copy_file(&mut self, source: &RootedFile, dest: &RootedFile) -> Result<(), FsError> {
        self.guard_owner(source.owner())?;
        self.guard_owner(dest.owner())?;
        let id = self.resolve_file(source)?;
        let dest_parent = self.resolve_parent(dest)?;
        self.tree
            .copy_node(id, dest_parent, dest.file_name().as_str(), Self::now())?;
        debug!(from = source.canonical(), to = dest.canonical(), "file copied");
        Ok(())
    }

    /// Recursive structural copy of a directory subtree. Best-effort: a
    /// failure partway leaves the already-copied part in place.
    pub fn copy_directory(
        &mut self,
        source: &RootedDirectory,
        dest: &RootedDirectory,
    ) -> Result<(), FsError> {
        self.guard_owner(source.owner())?;
        self.guard_owner(dest.owner())?;
        if dest.is_drive_root() {
            return Err(FsError::InvalidOperation(
                "cannot copy onto a drive root".to_string(),
            ));
        }
        let id = self.resolve_dir(source)?;
        self.ensure_descendants_fit(id, dest.canonical())?;
        let dest_parent = self.resolve_dir(&dest.parent()?)?;
        let dest_name = last_segment(dest.canonical());
        self.tree
            .copy_node(id, dest_parent, dest_name, Self::now())?;
        debug!(
            from = source.canonical(),
            to = dest.canonical(),
            "directory copied"
        );
        Ok(())
    }

    // -- Timestamps --------------------------------------------------------

    /// Last write time of a file, epoch milliseconds.
    pub fn last_modified(&self, file: &RootedFile) -> Result<u64, FsError> {
        self.guard_owner(file.owner())?;
        let id = self.resolve_file(file)?;
        Ok(self.tree.node(id).last_write)
    }

    pub fn set_last_modified(&mut self, file: &RootedFile, at: u64) -> Result<(), FsError> {
        self.guard_owner(file.owner())?;
        let id = self.resolve_file(file)?;
        self.tree.node_mut(id).last_write = at;
        Ok(())
    }

    pub fn last_accessed(&self, file: &RootedFile) -> Result<u64, FsError> {
        self.guard_owner(file.owner())?;
        let id = self.resolve_file(file)?;
        Ok(self.tree.node(id).last_access)
    }

    pub fn set_last_accessed(&mut self, file: &RootedFile, at: u64) -> Result<(), FsError> {
        self.guard_owner(file.owner())?;
        let id = self.resolve_file(file)?;
        self.tree.node_mut(id).last_access = at;
        Ok(())
    }

    pub fn directory_last_modified(&self, dir: &RootedDirectory) -> Result<u64, FsError> {
        self.guard_owner(dir.owner())?;
        let id = self.resolve_dir(dir)?;
        Ok(self.tree.node(id).last_write)
    }

    pub fn set_directory_last_modified(
        &mut self,
        dir: &RootedDirectory,
        at: u64,
    ) -> Result<(), FsError> {
        self.guard_owner(dir.owner())?;
        let id = self.resolve_dir(dir)?;
        self.tree.node_mut(id).last_write = at;
        Ok(())
    }

    pub fn directory_last_accessed(&self, dir: &RootedDirectory) -> Result<u64, FsError> {
        self.guard_owner(dir.owner())?;
        let id = self.resolve_dir(dir)?;
        Ok(self.tree.node(id).last_access)
    }

    pub fn set_directory_last_accessed(
        &mut self,
        dir: &RootedDirectory,
        at: u64,
    ) -> Result<(), FsError> {
        self.guard_owner(dir.owner())?;
        let id = self.resolve_dir(dir)?;
        self.tree.node_mut(id).last_access = at;
        Ok(())
    }

    // -- Listing -----------------------------------------------------------

    /// Files directly inside the directory, in creation order.
    pub fn files(&self, dir: &RootedDirectory) -> Result<Vec<RootedFile>, FsError> {
        self.guard_owner(dir.owner())?;
        let id = self.resolve_dir(dir)?;
        Ok(self
            .tree
            .children(id)
            .into_iter()
            .filter(|&child| self.tree.node(child).is_file())
            .map(|child| RootedFile::from_canonical(self.tree.full_path(child), Some(self.tag)))
            .collect())
    }

    /// Directories directly inside the directory, in creation order.
    pub fn directories(&self, dir: &RootedDirectory) -> Result<Vec<RootedDirectory>, FsError> {
        self.guard_owner(dir.owner())?;
        let id = self.resolve_dir(dir)?;
        Ok(self
            .tree
            .children(id)
            .into_iter()
            .filter(|&child| self.tree.node(child).is_folder())
            .map(|child| {
                RootedDirectory::from_canonical(self.tree.full_path(child), Some(self.tag))
            })
            .collect())
    }

    /// Every file anywhere below the directory.
    pub fn all_files(&self, dir: &RootedDirectory) -> Result<Vec<RootedFile>, FsError> {
        self.guard_owner(dir.owner())?;
        let id = self.resolve_dir(dir)?;
        let mut found = Vec::new();
        self.collect_files(id, &mut found);
        Ok(found)
    }

    fn collect_files(&self, id: NodeId, found: &mut Vec<RootedFile>) {
        for child in self.tree.children(id) {
            if self.tree.node(child).is_file() {
                found.push(RootedFile::from_canonical(
                    self.tree.full_path(child),
                    Some(self.tag),
                ));
            } else {
                self.collect_files(child, found);
            }
        }
    }

    // -- Current directory -------------------------------------------------

    pub fn current_directory(&self) -> Option<&RootedDirectory> {
        self.current_directory.as_ref()
    }

    /// Set the instance's current directory; it must exist.
    pub fn set_current_directory(&mut self, dir: RootedDirectory) -> Result<(), FsError> {
        self.guard_owner(dir.owner())?;
        if !self.directory_exists(&dir) {
            return Err(FsError::NotFound(dir.canonical().to_string()));
        }
        self.current_directory = Some(dir);
        Ok(())
    }

    // -- Lifecycle ---------------------------------------------------------

    /// Drop every node and buffer, unmounting all drives.
    pub fn clear(&mut self) {
        self.tree.clear(Self::now());
        self.current_directory = None;
        debug!("file system cleared");
    }

    // -- Internals ---------------------------------------------------------

    fn guard_owner(&self, owner: Option<FsTag>) -> Result<(), FsError> {
        match owner {
            None => Ok(()),
            Some(tag) if tag == self.tag => Ok(()),
            Some(_) => Err(FsError::InvalidOperation(
                "descriptor belongs to a different file system instance".to_string(),
            )),
        }
    }

    fn resolve_file(&self, file: &RootedFile) -> Result<NodeId, FsError> {
        let id = resolve::lookup(&self.tree, file.canonical())
            .ok_or_else(|| FsError::NotFound(file.canonical().to_string()))?;
        if !self.tree.node(id).is_file() {
            return Err(FsError::NotAFile(file.canonical().to_string()));
        }
        Ok(id)
    }

    fn resolve_dir(&self, dir: &RootedDirectory) -> Result<NodeId, FsError> {
        let id = resolve::lookup(&self.tree, dir.canonical())
            .ok_or_else(|| FsError::NotFound(dir.canonical().to_string()))?;
        if !self.tree.node(id).is_folder() {
            return Err(FsError::NotADirectory(dir.canonical().to_string()));
        }
        Ok(id)
    }

    /// The node of the directory containing `file`; it must exist.
    fn resolve_parent(&self, file: &RootedFile) -> Result<NodeId, FsError> {
        self.resolve_dir(&file.parent())
    }

    fn file_data(&self, id: NodeId) -> crate::tree::FileData {
        match self.tree.node(id).file_data() {
            Some(data) => data.clone(),
            None => unreachable!("resolved file id points at a folder"),
        }
    }

    /// Re-rooting a subtree can lengthen every descendant's path; verify the
    /// deepest one still fits before mutating, so listing never has to hand
    /// out a descriptor past the limit.
    fn ensure_descendants_fit(&self, id: NodeId, dest_canonical: &str) -> Result<(), FsError> {
        let (suffix_len, suffix) = self.longest_suffix(id);
        let length = dest_canonical.chars().count() + suffix_len;
        if length > MAX_PATH_LENGTH {
            return Err(FsError::Path(PathError::PathTooLong {
                length,
                path: format!("{dest_canonical}{suffix}"),
            }));
        }
        Ok(())
    }

    /// The longest `\name\...` chain below the node, as (char count, text).
    fn longest_suffix(&self, id: NodeId) -> (usize, String) {
        let mut deepest = (0, String::new());
        for child in self.tree.children(id) {
            let name = self.tree.node(child).name.clone();
            let (below_len, below) = self.longest_suffix(child);
            let len = 1 + name.chars().count() + below_len;
            if len > deepest.0 {
                deepest = (len, format!("\\{name}{below}"));
            }
        }
        deepest
    }
}

/// Whether `path` is `ancestor` itself or lies below it, canonically.
fn path_within(path: &str, ancestor: &str) -> bool {
    match (path.get(..ancestor.len()), path.get(ancestor.len()..)) {
        (Some(head), Some(tail)) => {
            head.eq_ignore_ascii_case(ancestor) && (tail.is_empty() || tail.starts_with('\\'))
        }
        _ => false,
    }
}

fn last_segment(canonical: &str) -> &str {
    match canonical.rfind('\\') {
        Some(pos) => &canonical[pos + 1..],
        None => canonical,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
