use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::PathError;
use crate::path::builder::{self, PathKind};
use crate::path::chars::SEPARATOR;

// ── Ownership tag ───────────────────────────────────────────────────────────

/// Identity of the `MemoryFs` instance a rooted descriptor was created
/// against. Descriptors built standalone via `from_string` carry no tag; two
/// rooted descriptors are equal only when their tags match as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FsTag(pub(crate) u64);

// ── Shared helpers ──────────────────────────────────────────────────────────

/// Split a canonical rooted string into its drive/share token and the rest.
/// The input is trusted to be canonical.
pub(crate) fn split_root_token(canonical: &str) -> (&str, &str) {
    if let Some(after) = canonical.strip_prefix("\\\\") {
        let host_len = after.find(SEPARATOR).unwrap_or(after.len());
        let share_part = after[host_len..].strip_prefix(SEPARATOR).unwrap_or("");
        let share_len = share_part.find(SEPARATOR).unwrap_or(share_part.len());
        let token_len = (2 + host_len + 1 + share_len).min(canonical.len());
        canonical.split_at(token_len)
    } else {
        canonical.split_at(2.min(canonical.len()))
    }
}

/// Segments of a canonical rooted string, drive token excluded.
pub(crate) fn rooted_segments(canonical: &str) -> Vec<&str> {
    let (_, rest) = split_root_token(canonical);
    rest.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

fn eq_canonical(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

fn hash_canonical<H: Hasher>(canonical: &str, state: &mut H) {
    for b in canonical.bytes() {
        state.write_u8(b.to_ascii_lowercase());
    }
}

fn relative_between(
    target: &str,
    base: &str,
    display: &str,
) -> Result<String, PathError> {
    let (target_token, _) = split_root_token(target);
    let (base_token, _) = split_root_token(base);
    if !eq_canonical(target_token, base_token) {
        return Err(PathError::DriveMismatch(display.to_string()));
    }

    let target_segments = rooted_segments(target);
    let base_segments = rooted_segments(base);

    let mut common = 0;
    while common < target_segments.len()
        && common < base_segments.len()
        && eq_canonical(target_segments[common], base_segments[common])
    {
        common += 1;
    }

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..base_segments.len() {
        parts.push("..");
    }
    parts.extend(&target_segments[common..]);
    Ok(parts.join("\\"))
}

macro_rules! common_accessors {
    () => {
        /// The path text exactly as supplied at construction.
        pub fn as_str(&self) -> &str {
            &self.original
        }

        /// The canonical text: dot segments resolved, redundant separators
        /// removed. Used for equality and as the key into the virtual tree.
        pub fn canonical(&self) -> &str {
            &self.canonical
        }
    };
}

// ── Drive ───────────────────────────────────────────────────────────────────

/// A bare drive: a mapped drive letter (`c:`) or a UNC share
/// (`\\host\share`).
#[derive(Debug, Clone)]
pub struct Drive {
    original: String,
    canonical: String,
    owner: Option<FsTag>,
}

impl Drive {
    pub fn from_string(raw: impl Into<String>) -> Result<Self, PathError> {
        let original = raw.into();
        let canonical = builder::canonicalize(&original, PathKind::Drive)?;
        Ok(Self {
            original,
            canonical,
            owner: None,
        })
    }

    common_accessors!();

    pub(crate) fn with_owner(mut self, tag: FsTag) -> Self {
        self.owner = Some(tag);
        self
    }

    pub(crate) fn owner(&self) -> Option<FsTag> {
        self.owner
    }

    /// The directory descriptor denoting this drive's root.
    pub fn root_directory(&self) -> RootedDirectory {
        RootedDirectory {
            original: self.canonical.clone(),
            canonical: self.canonical.clone(),
            owner: self.owner,
        }
    }

    /// Append a relative directory, yielding a rooted directory. An empty
    /// relative operand yields this drive's root.
    pub fn join(&self, relative: &RelativeDirectory) -> Result<RootedDirectory, PathError> {
        self.root_directory().join(relative)
    }

    /// Append a relative file, yielding a rooted file.
    pub fn join_file(&self, relative: &RelativeFile) -> Result<RootedFile, PathError> {
        self.root_directory().join_file(relative)
    }

    /// Place a filename directly under the drive root.
    pub fn with_file_name(&self, name: &FileName) -> Result<RootedFile, PathError> {
        self.root_directory().with_file_name(name)
    }
}

impl PartialEq for Drive {
    fn eq(&self, other: &Self) -> bool {
        eq_canonical(&self.canonical, &other.canonical) && self.owner == other.owner
    }
}

impl Eq for Drive {}

impl Hash for Drive {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_canonical(&self.canonical, state);
        self.owner.hash(state);
    }
}

impl fmt::Display for Drive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// ── RootedDirectory ─────────────────────────────────────────────────────────

/// A directory anchored to a concrete drive or share.
#[derive(Debug, Clone)]
pub struct RootedDirectory {
    original: String,
    canonical: String,
    owner: Option<FsTag>,
}

impl RootedDirectory {
    pub fn from_string(raw: impl Into<String>) -> Result<Self, PathError> {
        let original = raw.into();
        let canonical = builder::canonicalize(&original, PathKind::RootedDirectory)?;
        Ok(Self {
            original,
            canonical,
            owner: None,
        })
    }

    common_accessors!();

    /// Build from text that is already canonical. Internal shortcut for
    /// results of path arithmetic; the input must be canonical.
    pub(crate) fn from_canonical(canonical: String, owner: Option<FsTag>) -> Self {
        debug_assert!(builder::is_valid_rooted_directory(&canonical));
        Self {
            original: canonical.clone(),
            canonical,
            owner,
        }
    }

    pub(crate) fn with_owner(mut self, tag: FsTag) -> Self {
        self.owner = Some(tag);
        self
    }

    pub(crate) fn owner(&self) -> Option<FsTag> {
        self.owner
    }

    /// The drive or share this directory is anchored to.
    pub fn drive(&self) -> Drive {
        let (token, _) = split_root_token(&self.canonical);
        Drive {
            original: token.to_string(),
            canonical: token.to_string(),
            owner: self.owner,
        }
    }

    /// Whether this directory denotes its drive's root.
    pub fn is_drive_root(&self) -> bool {
        let (_, rest) = split_root_token(&self.canonical);
        rest.is_empty()
    }

    /// The directory one level up. A drive root has no parent.
    pub fn parent(&self) -> Result<RootedDirectory, PathError> {
        if self.is_drive_root() {
            return Err(PathError::AscendsAboveRoot(self.original.clone()));
        }
        let cut = self.canonical.rfind(SEPARATOR).unwrap_or(0);
        Ok(Self::from_canonical(
            self.canonical[..cut].to_string(),
            self.owner,
        ))
    }

    /// Append a relative directory. An empty relative operand is the
    /// identity; a leading-separator relative re-anchors at the drive root.
    pub fn join(&self, relative: &RelativeDirectory) -> Result<RootedDirectory, PathError> {
        if relative.is_empty() {
            return Ok(self.clone());
        }
        let combined = self.combine(relative.canonical());
        let canonical = builder::canonicalize(&combined, PathKind::RootedDirectory)?;
        Ok(Self::from_canonical(canonical, self.owner))
    }

    /// Append a relative file, yielding a rooted file.
    pub fn join_file(&self, relative: &RelativeFile) -> Result<RootedFile, PathError> {
        let combined = self.combine(relative.canonical());
        let canonical = builder::canonicalize(&combined, PathKind::RootedFile)?;
        Ok(RootedFile::from_canonical(canonical, self.owner))
    }

    /// Place a filename directly inside this directory.
    pub fn with_file_name(&self, name: &FileName) -> Result<RootedFile, PathError> {
        let combined = format!("{}{}{}", self.canonical, SEPARATOR, name.as_str());
        let canonical = builder::canonicalize(&combined, PathKind::RootedFile)?;
        Ok(RootedFile::from_canonical(canonical, self.owner))
    }

    /// The minimal relative path leading from `base` to this directory.
    /// Both operands must share the same drive or share.
    pub fn relative_from(&self, base: &RootedDirectory) -> Result<RelativeDirectory, PathError> {
        let display = format!("{} relative from {}", self.original, base.original);
        let canonical = relative_between(&self.canonical, &base.canonical, &display)?;
        Ok(RelativeDirectory {
            original: canonical.clone(),
            canonical,
        })
    }

    fn combine(&self, relative_canonical: &str) -> String {
        if relative_canonical.starts_with(SEPARATOR) {
            let (token, _) = split_root_token(&self.canonical);
            format!("{}{}", token, relative_canonical)
        } else {
            format!("{}{}{}", self.canonical, SEPARATOR, relative_canonical)
        }
    }
}

impl PartialEq for RootedDirectory {
    fn eq(&self, other: &Self) -> bool {
        eq_canonical(&self.canonical, &other.canonical) && self.owner == other.owner
    }
}

impl Eq for RootedDirectory {}

/// A drive and the directory denoting its root are the same location.
impl PartialEq<Drive> for RootedDirectory {
    fn eq(&self, other: &Drive) -> bool {
        eq_canonical(&self.canonical, &other.canonical) && self.owner == other.owner
    }
}

impl PartialEq<RootedDirectory> for Drive {
    fn eq(&self, other: &RootedDirectory) -> bool {
        other == self
    }
}

impl Hash for RootedDirectory {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_canonical(&self.canonical, state);
        self.owner.hash(state);
    }
}

impl fmt::Display for RootedDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// ── RootedFile ──────────────────────────────────────────────────────────────

/// A file anchored to a concrete drive or share.
#[derive(Debug, Clone)]
pub struct RootedFile {
    original: String,
    canonical: String,
    owner: Option<FsTag>,
}

impl RootedFile {
    pub fn from_string(raw: impl Into<String>) -> Result<Self, PathError> {
        let original = raw.into();
        let canonical = builder::canonicalize(&original, PathKind::RootedFile)?;
        Ok(Self {
            original,
            canonical,
            owner: None,
        })
    }

    common_accessors!();

    pub(crate) fn from_canonical(canonical: String, owner: Option<FsTag>) -> Self {
        debug_assert!(builder::is_valid_rooted_file(&canonical));
        Self {
            original: canonical.clone(),
            canonical,
            owner,
        }
    }

    pub(crate) fn with_owner(mut self, tag: FsTag) -> Self {
        self.owner = Some(tag);
        self
    }

    pub(crate) fn owner(&self) -> Option<FsTag> {
        self.owner
    }

    /// The directory containing this file. Always exists, since a canonical
    /// rooted file has at least its drive above it.
    pub fn parent(&self) -> RootedDirectory {
        let cut = self.canonical.rfind(SEPARATOR).unwrap_or(0);
        RootedDirectory::from_canonical(self.canonical[..cut].to_string(), self.owner)
    }

    /// The trailing filename component.
    pub fn file_name(&self) -> FileName {
        let cut = self.canonical.rfind(SEPARATOR).map_or(0, |p| p + 1);
        FileName {
            original: self.canonical[cut..].to_string(),
            canonical: self.canonical[cut..].to_string(),
        }
    }

    pub fn drive(&self) -> Drive {
        self.parent().drive()
    }

    /// The minimal relative path leading from `base` to this file.
    pub fn relative_from(&self, base: &RootedDirectory) -> Result<RelativeFile, PathError> {
        let display = format!("{} relative from {}", self.original, base.as_str());
        let canonical = relative_between(&self.canonical, base.canonical(), &display)?;
        Ok(RelativeFile {
            original: canonical.clone(),
            canonical,
        })
    }
}

impl PartialEq for RootedFile {
    fn eq(&self, other: &Self) -> bool {
        eq_canonical(&self.canonical, &other.canonical) && self.owner == other.owner
    }
}

impl Eq for RootedFile {}

impl Hash for RootedFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_canonical(&self.canonical, state);
        self.owner.hash(state);
    }
}

impl fmt::Display for RootedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// ── RelativeDirectory ───────────────────────────────────────────────────────

/// A directory with no drive anchor, interpreted against some rooted path
/// when combined. May legally begin with a `..` chain, or with a `\` meaning
/// "the current drive's root".
#[derive(Debug, Clone)]
pub struct RelativeDirectory {
    original: String,
    canonical: String,
}

impl RelativeDirectory {
    pub fn from_string(raw: impl Into<String>) -> Result<Self, PathError> {
        let original = raw.into();
        let canonical = builder::canonicalize(&original, PathKind::RelativeDirectory)?;
        Ok(Self { original, canonical })
    }

    /// The empty relative directory: the identity element of joins.
    pub fn empty() -> Self {
        Self {
            original: String::new(),
            canonical: String::new(),
        }
    }

    common_accessors!();

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// The directory one level up. Total for relative paths: the empty
    /// directory's parent is `..`, and a `..` chain ascends one further.
    pub fn parent(&self) -> Result<RelativeDirectory, PathError> {
        let combined = if self.canonical.is_empty() {
            "..".to_string()
        } else {
            format!("{}{}..", self.canonical, SEPARATOR)
        };
        let canonical = builder::canonicalize(&combined, PathKind::RelativeDirectory)?;
        Ok(Self {
            original: canonical.clone(),
            canonical,
        })
    }

    /// Append another relative directory. The empty directory is the identity
    /// on either side; a leading-separator operand replaces this one, since
    /// it re-anchors at the (eventual) drive root.
    pub fn join(&self, other: &RelativeDirectory) -> Result<RelativeDirectory, PathError> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() || other.canonical.starts_with(SEPARATOR) {
            return Ok(other.clone());
        }
        let combined = format!("{}{}{}", self.canonical, SEPARATOR, other.canonical);
        let canonical = builder::canonicalize(&combined, PathKind::RelativeDirectory)?;
        Ok(Self {
            original: canonical.clone(),
            canonical,
        })
    }

    /// Append a relative file.
    pub fn join_file(&self, file: &RelativeFile) -> Result<RelativeFile, PathError> {
        if self.is_empty() {
            return Ok(file.clone());
        }
        let combined = format!("{}{}{}", self.canonical, SEPARATOR, file.canonical());
        let canonical = builder::canonicalize(&combined, PathKind::RelativeFile)?;
        Ok(RelativeFile {
            original: canonical.clone(),
            canonical,
        })
    }

    /// Place a filename inside this directory.
    pub fn with_file_name(&self, name: &FileName) -> Result<RelativeFile, PathError> {
        let combined = if self.canonical.is_empty() {
            name.as_str().to_string()
        } else {
            format!("{}{}{}", self.canonical, SEPARATOR, name.as_str())
        };
        let canonical = builder::canonicalize(&combined, PathKind::RelativeFile)?;
        Ok(RelativeFile {
            original: canonical.clone(),
            canonical,
        })
    }
}

impl PartialEq for RelativeDirectory {
    fn eq(&self, other: &Self) -> bool {
        eq_canonical(&self.canonical, &other.canonical)
    }
}

impl Eq for RelativeDirectory {}

impl Hash for RelativeDirectory {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_canonical(&self.canonical, state);
    }
}

impl fmt::Display for RelativeDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// ── RelativeFile ────────────────────────────────────────────────────────────

/// A file with no drive anchor.
#[derive(Debug, Clone)]
pub struct RelativeFile {
    original: String,
    canonical: String,
}

impl RelativeFile {
    pub fn from_string(raw: impl Into<String>) -> Result<Self, PathError> {
        let original = raw.into();
        let canonical = builder::canonicalize(&original, PathKind::RelativeFile)?;
        Ok(Self { original, canonical })
    }

    common_accessors!();

    /// The directory part, empty when the file has no directory prefix.
    pub fn parent(&self) -> RelativeDirectory {
        match self.canonical.rfind(SEPARATOR) {
            Some(cut) => RelativeDirectory {
                original: self.canonical[..cut].to_string(),
                canonical: self.canonical[..cut].to_string(),
            },
            None => RelativeDirectory::empty(),
        }
    }

    pub fn file_name(&self) -> FileName {
        let cut = self.canonical.rfind(SEPARATOR).map_or(0, |p| p + 1);
        FileName {
            original: self.canonical[cut..].to_string(),
            canonical: self.canonical[cut..].to_string(),
        }
    }
}

impl PartialEq for RelativeFile {
    fn eq(&self, other: &Self) -> bool {
        eq_canonical(&self.canonical, &other.canonical)
    }
}

impl Eq for RelativeFile {}

impl Hash for RelativeFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_canonical(&self.canonical, state);
    }
}

impl fmt::Display for RelativeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// ── FileName ────────────────────────────────────────────────────────────────

/// A bare filename with no directory part.
#[derive(Debug, Clone)]
pub struct FileName {
    original: String,
    canonical: String,
}

impl FileName {
    pub fn from_string(raw: impl Into<String>) -> Result<Self, PathError> {
        let original = raw.into();
        let canonical = builder::canonicalize(&original, PathKind::FileName)?;
        Ok(Self { original, canonical })
    }

    common_accessors!();

    /// The part before the last dot; the whole name when there is no
    /// extension or the name starts with its only dot.
    pub fn stem(&self) -> &str {
        match self.canonical.rfind('.') {
            Some(pos) if pos > 0 => &self.canonical[..pos],
            _ => &self.canonical,
        }
    }

    /// The part after the last dot, if any.
    pub fn extension(&self) -> Option<&str> {
        match self.canonical.rfind('.') {
            Some(pos) if pos > 0 => Some(&self.canonical[pos + 1..]),
            _ => None,
        }
    }
}

impl PartialEq for FileName {
    fn eq(&self, other: &Self) -> bool {
        eq_canonical(&self.canonical, &other.canonical)
    }
}

impl Eq for FileName {}

impl Hash for FileName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_canonical(&self.canonical, state);
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
