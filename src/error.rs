use std::fmt;

use thiserror::Error;

/// Where an illegal character was found during path validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharContext {
    FileName,
    FolderSegment,
    HostName,
    ShareName,
}

impl fmt::Display for CharContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FileName => "filename",
            Self::FolderSegment => "folder segment",
            Self::HostName => "host name",
            Self::ShareName => "share name",
        };
        f.write_str(s)
    }
}

/// Failures raised while canonicalizing a path string into a descriptor.
/// A descriptor is never observed half-built: construction either yields a
/// fully canonical value or one of these.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid character '{ch}' in {context} of path: {path}")]
    InvalidCharacter {
        ch: char,
        context: CharContext,
        path: String,
    },
    #[error("invalid drive: {0}")]
    InvalidDrive(String),
    #[error("empty {context} in path: {path}")]
    EmptyComponent { context: CharContext, path: String },
    #[error("segment ends with whitespace or dot in path: {0}")]
    TrailingWhitespaceOrDot(String),
    #[error("rooted path supplied where a relative path was expected: {0}")]
    RootedInRelativeContext(String),
    #[error("path is not rooted: {0}")]
    NotRooted(String),
    #[error("path ascends above its root: {0}")]
    AscendsAboveRoot(String),
    #[error("canonical path is {length} characters, exceeding the maximum of 259: {path}")]
    PathTooLong { length: usize, path: String },
    #[error("paths are not on the same drive: {0}")]
    DriveMismatch(String),
}

impl PathError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCharacter { .. } => "PATH_INVALID_CHARACTER",
            Self::InvalidDrive(_) => "PATH_INVALID_DRIVE",
            Self::EmptyComponent { .. } => "PATH_EMPTY_COMPONENT",
            Self::TrailingWhitespaceOrDot(_) => "PATH_TRAILING_WHITESPACE_OR_DOT",
            Self::RootedInRelativeContext(_) => "PATH_ROOTED_IN_RELATIVE_CONTEXT",
            Self::NotRooted(_) => "PATH_NOT_ROOTED",
            Self::AscendsAboveRoot(_) => "PATH_ASCENDS_ABOVE_ROOT",
            Self::PathTooLong { .. } => "PATH_TOO_LONG",
            Self::DriveMismatch(_) => "PATH_DRIVE_MISMATCH",
        }
    }
}

/// Failures raised by operations on the in-memory file system. The tree is
/// left consistent on failure; recursive delete and copy are best-effort.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("not a file: {0}")]
    NotAFile(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("directory is not empty: {0}")]
    NotEmpty(String),
    #[error("node is in use by an open stream: {0}")]
    InUse(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("snapshot is not usable: {0}")]
    Snapshot(String),
    #[error(transparent)]
    Path(#[from] PathError),
}

impl FsError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "FS_NOT_FOUND",
            Self::NotADirectory(_) => "FS_NOT_DIRECTORY",
            Self::NotAFile(_) => "FS_NOT_FILE",
            Self::AlreadyExists(_) => "FS_ALREADY_EXISTS",
            Self::NotEmpty(_) => "FS_NOT_EMPTY",
            Self::InUse(_) => "FS_IN_USE",
            Self::InvalidOperation(_) => "FS_INVALID_OPERATION",
            Self::Snapshot(_) => "FS_SNAPSHOT",
            Self::Path(e) => e.code(),
        }
    }
}
