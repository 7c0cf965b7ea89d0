//! Walking the node tree along canonical path strings.
//!
//! Resolution never invents an error on its own: a missing segment is simply
//! `None`, and the caller decides whether that means "does not exist" or a
//! failure. Creation is the one exception; it requires the drive node to be
//! present already.

use crate::error::FsError;
use crate::path::descriptor::{rooted_segments, split_root_token};
use crate::tree::{NodeId, NodeTree};

/// Locate the node a canonical rooted path refers to, returning `None` at
/// the first missing segment.
pub(crate) fn lookup(tree: &NodeTree, canonical: &str) -> Option<NodeId> {
    let (token, _) = split_root_token(canonical);
    let mut current = tree.child_by_name(tree.root(), token)?;
    for segment in rooted_segments(canonical) {
        current = tree.child_by_name(current, segment)?;
    }
    Some(current)
}

/// Create-or-reuse every folder along a canonical directory path. The drive
/// itself must already exist.
pub(crate) fn create_dirs(
    tree: &mut NodeTree,
    canonical: &str,
    now: u64,
) -> Result<NodeId, FsError> {
    let (token, _) = split_root_token(canonical);
    let mut current = tree
        .child_by_name(tree.root(), token)
        .ok_or_else(|| FsError::NotFound(format!("directory not found: {token}")))?;
    for segment in rooted_segments(canonical) {
        current = tree.create_or_reuse_folder(current, segment, now)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_drive() -> NodeTree {
        let mut tree = NodeTree::new(1);
        tree.create_or_reuse_folder(tree.root(), "c:", 1).unwrap();
        tree
    }

    #[test]
    fn lookup_walks_segment_by_segment() {
        let mut tree = tree_with_drive();
        let dir = create_dirs(&mut tree, "c:\\a\\b", 2).unwrap();
        assert_eq!(lookup(&tree, "c:\\a\\b"), Some(dir));
        assert!(lookup(&tree, "c:").is_some());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut tree = tree_with_drive();
        let dir = create_dirs(&mut tree, "c:\\Mixed\\Case", 2).unwrap();
        assert_eq!(lookup(&tree, "C:\\mixed\\CASE"), Some(dir));
    }

    #[test]
    fn missing_segment_is_none_not_an_error() {
        let tree = tree_with_drive();
        assert_eq!(lookup(&tree, "c:\\nope"), None);
        assert_eq!(lookup(&tree, "q:\\nope"), None);
    }

    #[test]
    fn create_dirs_requires_the_drive() {
        let mut tree = tree_with_drive();
        let err = create_dirs(&mut tree, "q:\\a", 2).unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[test]
    fn create_dirs_reuses_existing_folders() {
        let mut tree = tree_with_drive();
        let first = create_dirs(&mut tree, "c:\\a\\b", 2).unwrap();
        let again = create_dirs(&mut tree, "c:\\A\\b", 3).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn unc_share_token_is_one_tree_level() {
        let mut tree = NodeTree::new(1);
        tree.create_or_reuse_folder(tree.root(), "\\\\host\\share", 1)
            .unwrap();
        let dir = create_dirs(&mut tree, "\\\\host\\share\\data", 2).unwrap();
        assert_eq!(lookup(&tree, "\\\\HOST\\share\\DATA"), Some(dir));
    }
}
