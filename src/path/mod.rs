//! Path canonicalization and the typed descriptor value types.
//!
//! A raw string is tokenized, classified (mapped drive, UNC share, rooted,
//! relative), validated character by character, and reduced to a canonical
//! form with `.`/`..` segments resolved. The original text is preserved for
//! display; the canonical text drives equality and tree resolution.

pub mod builder;
pub mod chars;
pub mod descriptor;
pub mod filename;
pub mod root;
pub mod segments;

pub use builder::{
    canonicalize, is_valid_drive, is_valid_file_name, is_valid_relative_directory,
    is_valid_relative_file, is_valid_rooted_directory, is_valid_rooted_file, PathKind,
};
pub use descriptor::{
    Drive, FileName, FsTag, RelativeDirectory, RelativeFile, RootedDirectory, RootedFile,
};
