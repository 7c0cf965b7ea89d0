//! The in-memory node hierarchy backing [`crate::MemoryFs`].
//!
//! Nodes live in an arena and are addressed by [`NodeId`] indices; a node
//! holds its parent's id as a non-owning back-reference, and folders own the
//! ordered list of their children's ids. Freed slots are recycled through a
//! free list. Sibling names are unique case-insensitively, and a node exists
//! exactly while it is reachable from the root.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::FsError;

// ---------------------------------------------------------------------------
// Node types
// ---------------------------------------------------------------------------

/// Stable handle to a node in the arena. Invalidated when the node is
/// removed; the tree does not hand out ids for vacant slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(usize);

/// Payload of a file node. The buffer and the open-handle count are shared
/// with live streams, so a stream stays usable across tree mutations and the
/// tree can tell whether anyone still holds the file open.
#[derive(Debug, Clone)]
pub(crate) struct FileData {
    pub content: Rc<RefCell<Vec<u8>>>,
    pub open_handles: Rc<Cell<usize>>,
}

impl FileData {
    pub(crate) fn new() -> Self {
        Self {
            content: Rc::new(RefCell::new(Vec::new())),
            open_handles: Rc::new(Cell::new(0)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open_handles.get() > 0
    }
}

#[derive(Debug)]
pub(crate) enum NodePayload {
    Folder { children: Vec<NodeId> },
    File(FileData),
}

#[derive(Debug)]
pub(crate) struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub payload: NodePayload,
    pub last_write: u64,
    pub last_access: u64,
}

impl Node {
    fn folder(name: String, parent: Option<NodeId>, now: u64) -> Self {
        Self {
            name,
            parent,
            payload: NodePayload::Folder {
                children: Vec::new(),
            },
            last_write: now,
            last_access: now,
        }
    }

    fn file(name: String, parent: NodeId, now: u64) -> Self {
        Self {
            name,
            parent: Some(parent),
            payload: NodePayload::File(FileData::new()),
            last_write: now,
            last_access: now,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.payload, NodePayload::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.payload, NodePayload::Folder { .. })
    }

    pub fn file_data(&self) -> Option<&FileData> {
        match &self.payload {
            NodePayload::File(data) => Some(data),
            NodePayload::Folder { .. } => None,
        }
    }

    fn children(&self) -> &[NodeId] {
        match &self.payload {
            NodePayload::Folder { children } => children,
            NodePayload::File(_) => &[],
        }
    }
}

#[derive(Debug)]
enum Slot {
    Occupied(Node),
    Vacant { next_free: Option<usize> },
}

// ---------------------------------------------------------------------------
// NodeTree
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub(crate) struct NodeTree {
    slots: Vec<Slot>,
    free_head: Option<usize>,
}

impl NodeTree {
    /// A tree with only the nameless root folder. Drive nodes sit directly
    /// below it.
    pub fn new(now: u64) -> Self {
        Self {
            slots: vec![Slot::Occupied(Node::folder(String::new(), None, now))],
            free_head: None,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        match &self.slots[id.0] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("stale node id {}", id.0),
        }
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match &mut self.slots[id.0] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("stale node id {}", id.0),
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free_head {
            Some(index) => {
                self.free_head = match self.slots[index] {
                    Slot::Vacant { next_free } => next_free,
                    Slot::Occupied(_) => unreachable!("free list points at occupied slot"),
                };
                self.slots[index] = Slot::Occupied(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.slots[id.0] = Slot::Vacant {
            next_free: self.free_head,
        };
        self.free_head = Some(id.0);
    }

    // -- Lookup -----------------------------------------------------------

    /// Case-insensitive child lookup.
    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)
            .children()
            .iter()
            .copied()
            .find(|&child| self.node(child).name.eq_ignore_ascii_case(name))
    }

    /// Children in insertion order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.node(parent).children().to_vec()
    }

    /// Join of ancestor names from the root; the nameless root contributes
    /// nothing, so the result starts at the drive token.
    pub fn full_path(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current);
            if node.parent.is_some() {
                names.push(&node.name);
            }
            cursor = node.parent;
        }
        names.reverse();
        names.join("\\")
    }

    fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.node(id).parent;
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.node(current).parent;
        }
        false
    }

    fn touch(&mut self, id: NodeId, now: u64) {
        let node = self.node_mut(id);
        node.last_write = now;
        node.last_access = now;
    }

    /// Fail with `InUse` if any file in the subtree is held open by a
    /// stream. Checked in full before any detachment, so a failed removal
    /// mutates nothing.
    pub fn ensure_removable(&self, id: NodeId) -> Result<(), FsError> {
        let node = self.node(id);
        if let Some(data) = node.file_data() {
            if data.is_open() {
                return Err(FsError::InUse(self.full_path(id)));
            }
        }
        for child in node.children() {
            self.ensure_removable(*child)?;
        }
        Ok(())
    }

    // -- Lifecycle --------------------------------------------------------

    /// Return the existing folder of this name, or create and attach a new
    /// one. An existing file of the same name is in the way.
    pub fn create_or_reuse_folder(
        &mut self,
        parent: NodeId,
        name: &str,
        now: u64,
    ) -> Result<NodeId, FsError> {
        if let Some(existing) = self.child_by_name(parent, name) {
            if self.node(existing).is_folder() {
                return Ok(existing);
            }
            return Err(FsError::NotADirectory(self.full_path(existing)));
        }
        let id = self.alloc(Node::folder(name.to_string(), Some(parent), now));
        self.attach(parent, id, now);
        Ok(id)
    }

    /// Fail-fast create: any existing same-named node is disposed and
    /// replaced by a fresh empty file. Models "create, always overwrite".
    pub fn create_file(&mut self, parent: NodeId, name: &str, now: u64) -> Result<NodeId, FsError> {
        if let Some(existing) = self.child_by_name(parent, name) {
            self.remove(existing, now)?;
        }
        let id = self.alloc(Node::file(name.to_string(), parent, now));
        self.attach(parent, id, now);
        Ok(id)
    }

    /// Open-or-create: an existing file is returned with its content
    /// preserved. Models the append/modify stream semantics.
    pub fn create_or_reuse_file(
        &mut self,
        parent: NodeId,
        name: &str,
        now: u64,
    ) -> Result<NodeId, FsError> {
        if let Some(existing) = self.child_by_name(parent, name) {
            if self.node(existing).is_file() {
                return Ok(existing);
            }
            return Err(FsError::NotAFile(self.full_path(existing)));
        }
        let id = self.alloc(Node::file(name.to_string(), parent, now));
        self.attach(parent, id, now);
        Ok(id)
    }

    /// Detach a node from its parent and dispose its subtree. Fails without
    /// mutating if any file below is open.
    pub fn remove(&mut self, id: NodeId, now: u64) -> Result<(), FsError> {
        self.ensure_removable(id)?;
        if let Some(parent) = self.node(id).parent {
            self.detach(parent, id, now);
        }
        self.release_subtree(id);
        Ok(())
    }

    /// Re-parent and rename in a single tree mutation. The moved node keeps
    /// its timestamps and content identity.
    pub fn move_node(
        &mut self,
        id: NodeId,
        dest_parent: NodeId,
        dest_name: &str,
        now: u64,
    ) -> Result<(), FsError> {
        if dest_parent == id || self.is_descendant_of(dest_parent, id) {
            return Err(FsError::InvalidOperation(format!(
                "cannot move {} into its own subtree",
                self.full_path(id)
            )));
        }
        if let Some(existing) = self.child_by_name(dest_parent, dest_name) {
            if existing != id {
                return Err(FsError::AlreadyExists(self.full_path(existing)));
            }
        }
        if let Some(old_parent) = self.node(id).parent {
            self.detach(old_parent, id, now);
        }
        let node = self.node_mut(id);
        node.name = dest_name.to_string();
        node.parent = Some(dest_parent);
        self.attach(dest_parent, id, now);
        Ok(())
    }

    /// Recursive structural copy. File buffers are duplicated; the copy gets
    /// fresh timestamps and no open handles.
    pub fn copy_node(
        &mut self,
        id: NodeId,
        dest_parent: NodeId,
        dest_name: &str,
        now: u64,
    ) -> Result<NodeId, FsError> {
        if self.child_by_name(dest_parent, dest_name).is_some() {
            return Err(FsError::AlreadyExists(format!(
                "{}\\{}",
                self.full_path(dest_parent),
                dest_name
            )));
        }
        let copy = self.duplicate(id, dest_parent, dest_name, now);
        self.attach(dest_parent, copy, now);
        Ok(copy)
    }

    fn duplicate(&mut self, id: NodeId, dest_parent: NodeId, name: &str, now: u64) -> NodeId {
        if self.node(id).is_file() {
            let bytes = match self.node(id).file_data() {
                Some(data) => data.content.borrow().clone(),
                None => Vec::new(),
            };
            let copy = self.alloc(Node::file(name.to_string(), dest_parent, now));
            if let Some(data) = self.node(copy).file_data() {
                *data.content.borrow_mut() = bytes;
            }
            return copy;
        }

        let copy = self.alloc(Node::folder(name.to_string(), Some(dest_parent), now));
        for child in self.children(id) {
            let child_name = self.node(child).name.clone();
            let child_copy = self.duplicate(child, copy, &child_name, now);
            if let NodePayload::Folder { children } = &mut self.node_mut(copy).payload {
                children.push(child_copy);
            }
        }
        copy
    }

    /// Drop every node and start over with a fresh root, releasing all
    /// buffers still referenced only by the tree.
    pub fn clear(&mut self, now: u64) {
        self.slots.clear();
        self.free_head = None;
        self.slots
            .push(Slot::Occupied(Node::folder(String::new(), None, now)));
    }

    // -- Internals --------------------------------------------------------

    fn attach(&mut self, parent: NodeId, child: NodeId, now: u64) {
        if let NodePayload::Folder { children } = &mut self.node_mut(parent).payload {
            children.push(child);
        }
        self.touch(parent, now);
    }

    fn detach(&mut self, parent: NodeId, child: NodeId, now: u64) {
        if let NodePayload::Folder { children } = &mut self.node_mut(parent).payload {
            children.retain(|&c| c != child);
        }
        self.touch(parent, now);
    }

    fn release_subtree(&mut self, id: NodeId) {
        for child in self.children(id) {
            self.release_subtree(child);
        }
        self.release(id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_drive() -> (NodeTree, NodeId) {
        let mut tree = NodeTree::new(1);
        let drive = tree.create_or_reuse_folder(tree.root(), "c:", 1).unwrap();
        (tree, drive)
    }

    #[test]
    fn create_or_reuse_folder_reuses_case_insensitively() {
        let (mut tree, drive) = tree_with_drive();
        let a = tree.create_or_reuse_folder(drive, "Work", 2).unwrap();
        let b = tree.create_or_reuse_folder(drive, "WORK", 3).unwrap();
        assert_eq!(a, b);
        assert_eq!(tree.node(a).name, "Work");
    }

    #[test]
    fn folder_creation_touches_parent_timestamps() {
        let (mut tree, drive) = tree_with_drive();
        tree.create_or_reuse_folder(drive, "sub", 42).unwrap();
        assert_eq!(tree.node(drive).last_write, 42);
        assert_eq!(tree.node(drive).last_access, 42);
    }

    #[test]
    fn create_file_replaces_existing_content() {
        let (mut tree, drive) = tree_with_drive();
        let first = tree.create_file(drive, "f.txt", 2).unwrap();
        if let Some(data) = tree.node(first).file_data() {
            data.content.borrow_mut().extend_from_slice(b"old");
        }
        let second = tree.create_file(drive, "f.txt", 3).unwrap();
        let data = tree.node(second).file_data().unwrap();
        assert!(data.content.borrow().is_empty());
    }

    #[test]
    fn create_or_reuse_file_preserves_content() {
        let (mut tree, drive) = tree_with_drive();
        let first = tree.create_or_reuse_file(drive, "f.txt", 2).unwrap();
        if let Some(data) = tree.node(first).file_data() {
            data.content.borrow_mut().extend_from_slice(b"kept");
        }
        let second = tree.create_or_reuse_file(drive, "F.TXT", 3).unwrap();
        assert_eq!(first, second);
        let data = tree.node(second).file_data().unwrap();
        assert_eq!(&*data.content.borrow(), b"kept");
    }

    #[test]
    fn reuse_with_wrong_node_kind_fails() {
        let (mut tree, drive) = tree_with_drive();
        tree.create_or_reuse_folder(drive, "x", 2).unwrap();
        assert!(matches!(
            tree.create_or_reuse_file(drive, "x", 3),
            Err(FsError::NotAFile(_))
        ));
        tree.create_file(drive, "y", 4).unwrap();
        assert!(matches!(
            tree.create_or_reuse_folder(drive, "y", 5),
            Err(FsError::NotADirectory(_))
        ));
    }

    #[test]
    fn full_path_joins_ancestor_names() {
        let (mut tree, drive) = tree_with_drive();
        let sub = tree.create_or_reuse_folder(drive, "a", 2).unwrap();
        let file = tree.create_file(sub, "f.txt", 3).unwrap();
        assert_eq!(tree.full_path(file), "c:\\a\\f.txt");
        assert_eq!(tree.full_path(drive), "c:");
    }

    #[test]
    fn remove_detaches_and_recycles_slots() {
        let (mut tree, drive) = tree_with_drive();
        let sub = tree.create_or_reuse_folder(drive, "a", 2).unwrap();
        tree.create_file(sub, "f.txt", 3).unwrap();
        tree.remove(sub, 4).unwrap();
        assert!(tree.child_by_name(drive, "a").is_none());
        assert_eq!(tree.node(drive).last_write, 4);

        // Freed slots are reused by the next allocation.
        let replacement = tree.create_or_reuse_folder(drive, "b", 5).unwrap();
        assert_eq!(replacement, sub);
    }

    #[test]
    fn remove_fails_while_a_descendant_file_is_open() {
        let (mut tree, drive) = tree_with_drive();
        let sub = tree.create_or_reuse_folder(drive, "a", 2).unwrap();
        let file = tree.create_file(sub, "f.txt", 3).unwrap();
        let handles = tree.node(file).file_data().unwrap().open_handles.clone();

        handles.set(1);
        assert!(matches!(tree.remove(sub, 4), Err(FsError::InUse(_))));
        assert!(tree.child_by_name(drive, "a").is_some());

        handles.set(0);
        tree.remove(sub, 5).unwrap();
    }

    #[test]
    fn move_node_preserves_timestamps_and_content() {
        let (mut tree, drive) = tree_with_drive();
        let src_dir = tree.create_or_reuse_folder(drive, "src", 2).unwrap();
        let dst_dir = tree.create_or_reuse_folder(drive, "dst", 2).unwrap();
        let file = tree.create_file(src_dir, "f.txt", 10).unwrap();
        if let Some(data) = tree.node(file).file_data() {
            data.content.borrow_mut().extend_from_slice(b"payload");
        }

        tree.move_node(file, dst_dir, "g.txt", 20).unwrap();

        assert!(tree.child_by_name(src_dir, "f.txt").is_none());
        assert_eq!(tree.child_by_name(dst_dir, "g.txt"), Some(file));
        assert_eq!(tree.node(file).last_write, 10);
        let data = tree.node(file).file_data().unwrap();
        assert_eq!(&*data.content.borrow(), b"payload");
        // Both parents were touched by the mutation.
        assert_eq!(tree.node(src_dir).last_write, 20);
        assert_eq!(tree.node(dst_dir).last_write, 20);
    }

    #[test]
    fn move_into_own_subtree_fails() {
        let (mut tree, drive) = tree_with_drive();
        let outer = tree.create_or_reuse_folder(drive, "outer", 2).unwrap();
        let inner = tree.create_or_reuse_folder(outer, "inner", 3).unwrap();
        assert!(matches!(
            tree.move_node(outer, inner, "outer", 4),
            Err(FsError::InvalidOperation(_))
        ));
    }

    #[test]
    fn move_onto_existing_name_fails() {
        let (mut tree, drive) = tree_with_drive();
        let a = tree.create_file(drive, "a.txt", 2).unwrap();
        tree.create_file(drive, "b.txt", 3).unwrap();
        assert!(matches!(
            tree.move_node(a, drive, "B.TXT", 4),
            Err(FsError::AlreadyExists(_))
        ));
    }

    #[test]
    fn copy_node_duplicates_structure_and_content() {
        let (mut tree, drive) = tree_with_drive();
        let src = tree.create_or_reuse_folder(drive, "src", 2).unwrap();
        let sub = tree.create_or_reuse_folder(src, "sub", 3).unwrap();
        let file = tree.create_file(sub, "f.txt", 4).unwrap();
        if let Some(data) = tree.node(file).file_data() {
            data.content.borrow_mut().extend_from_slice(b"data");
        }

        let copy = tree.copy_node(src, drive, "copy", 50).unwrap();
        let copy_sub = tree.child_by_name(copy, "sub").unwrap();
        let copy_file = tree.child_by_name(copy_sub, "f.txt").unwrap();
        let copy_data = tree.node(copy_file).file_data().unwrap();
        assert_eq!(&*copy_data.content.borrow(), b"data");
        assert_eq!(tree.node(copy_file).last_write, 50);

        // The buffers are independent.
        if let Some(data) = tree.node(file).file_data() {
            data.content.borrow_mut().extend_from_slice(b"-more");
        }
        let copy_data = tree.node(copy_file).file_data().unwrap();
        assert_eq!(&*copy_data.content.borrow(), b"data");
    }

    #[test]
    fn clear_resets_to_a_bare_root() {
        let (mut tree, drive) = tree_with_drive();
        tree.create_file(drive, "f.txt", 2).unwrap();
        tree.clear(9);
        assert!(tree.children(tree.root()).is_empty());
    }
}
