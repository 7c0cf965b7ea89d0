//! Strongly typed Windows-style paths and an in-memory file system for
//! exercising them in tests.
//!
//! The path layer turns raw strings into immutable descriptors — drives,
//! rooted and relative directories and files, bare filenames — that are
//! validated and canonicalized at construction, so any descriptor you can
//! hold is well formed. The engine layer, [`MemoryFs`], emulates a
//! case-insensitive drive-based file system entirely in memory: directories,
//! file streams, move/copy, timestamps, and JSON snapshots.
//!
//! ```
//! use winvfs::MemoryFs;
//!
//! # fn main() -> Result<(), winvfs::FsError> {
//! let mut fs = MemoryFs::with_drives(["c:"])?;
//! let file = fs.rooted_file("c:\\temp\\greeting.txt")?;
//! fs.create_directory(&file.parent())?;
//! fs.write_file(&file, b"hello")?;
//! assert_eq!(fs.read_to_string(&file)?, "hello");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod path;

mod memfs;
mod resolve;
mod snapshot;
mod stream;
mod tree;

pub use error::{CharContext, FsError, PathError};
pub use memfs::MemoryFs;
pub use path::{
    is_valid_drive, is_valid_file_name, is_valid_relative_directory, is_valid_relative_file,
    is_valid_rooted_directory, is_valid_rooted_file, Drive, FileName, RelativeDirectory,
    RelativeFile, RootedDirectory, RootedFile,
};
pub use snapshot::{DirectoryRecord, FileRecord, Snapshot};
pub use stream::{FileStream, StreamMode};
