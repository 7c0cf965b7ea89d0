//! Serializable captures of a whole file system.
//!
//! A snapshot records every directory and file with timestamps, file content
//! base64-encoded so the JSON stays valid for arbitrary bytes. Restoring
//! validates the entire snapshot before touching the tree, so a corrupt
//! snapshot never leaves the instance half-wiped.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FsError;
use crate::memfs::MemoryFs;
use crate::path::builder::{canonicalize, PathKind};
use crate::path::descriptor::split_root_token;
use crate::resolve;
use crate::tree::NodeId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub path: String,
    pub last_write: u64,
    pub last_access: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    /// Base64 of the file's bytes.
    pub content: String,
    pub last_write: u64,
    pub last_access: u64,
}

/// A point-in-time capture of a `MemoryFs`. Directories are listed parent
/// before child, drive roots included, so a restore can replay them in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub directories: Vec<DirectoryRecord>,
    pub files: Vec<FileRecord>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, FsError> {
        serde_json::to_string_pretty(self).map_err(|e| FsError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, FsError> {
        serde_json::from_str(json).map_err(|e| FsError::Snapshot(e.to_string()))
    }
}

impl MemoryFs {
    /// Capture the full tree. Open streams do not block a snapshot; the
    /// capture sees the buffer content as of this call.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot {
            directories: Vec::new(),
            files: Vec::new(),
        };
        self.capture(self.tree.root(), &mut snapshot);
        snapshot
    }

    fn capture(&self, id: NodeId, out: &mut Snapshot) {
        for child in self.tree.children(id) {
            let node = self.tree.node(child);
            let path = self.tree.full_path(child);
            if let Some(data) = node.file_data() {
                out.files.push(FileRecord {
                    path,
                    content: STANDARD.encode(&*data.content.borrow()),
                    last_write: node.last_write,
                    last_access: node.last_access,
                });
            } else {
                out.directories.push(DirectoryRecord {
                    path,
                    last_write: node.last_write,
                    last_access: node.last_access,
                });
                self.capture(child, out);
            }
        }
    }

    /// Replace the instance's entire state with the snapshot's. The snapshot
    /// is validated in full first; on a validation error nothing is changed.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), FsError> {
        let mut directories = Vec::with_capacity(snapshot.directories.len());
        for record in &snapshot.directories {
            let canonical = canonicalize(&record.path, PathKind::RootedDirectory)?;
            directories.push((canonical, record.last_write, record.last_access));
        }

        let mut files = Vec::with_capacity(snapshot.files.len());
        for record in &snapshot.files {
            let canonical = canonicalize(&record.path, PathKind::RootedFile)?;
            let bytes = STANDARD.decode(&record.content).map_err(|e| {
                FsError::Snapshot(format!("invalid base64 for {}: {e}", record.path))
            })?;
            files.push((canonical, bytes, record.last_write, record.last_access));
        }

        self.clear();

        for (canonical, last_write, last_access) in directories {
            let (token, rest) = split_root_token(&canonical);
            let id = if rest.is_empty() {
                let root = self.tree.root();
                self.tree.create_or_reuse_folder(root, token, last_write)?
            } else {
                resolve::create_dirs(&mut self.tree, &canonical, last_write)?
            };
            let node = self.tree.node_mut(id);
            node.last_write = last_write;
            node.last_access = last_access;
        }

        for (canonical, bytes, last_write, last_access) in files {
            let cut = canonical.rfind('\\').unwrap_or(canonical.len());
            let parent = resolve::lookup(&self.tree, &canonical[..cut]).ok_or_else(|| {
                FsError::Snapshot(format!("file without a recorded parent: {canonical}"))
            })?;
            let id = self
                .tree
                .create_or_reuse_file(parent, &canonical[cut + 1..], last_write)?;
            let node = self.tree.node_mut(id);
            node.last_write = last_write;
            node.last_access = last_access;
            match node.file_data() {
                Some(data) => *data.content.borrow_mut() = bytes,
                None => unreachable!("freshly created file node has file data"),
            }
        }

        debug!(
            directories = snapshot.directories.len(),
            files = snapshot.files.len(),
            "snapshot restored"
        );
        Ok(())
    }
}
