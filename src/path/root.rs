use crate::error::{CharContext, PathError};
use crate::path::chars::{self, SEPARATOR};

// ── Root classification ─────────────────────────────────────────────────────

/// The anchor of a path string: a mapped drive, a UNC share, or nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root<'a> {
    /// No drive or share anchor. Not an error by itself.
    None,
    /// Mapped drive token, e.g. `c:`.
    Drive(&'a str),
    /// UNC share token, e.g. `\\host\share`.
    Share(&'a str),
}

impl<'a> Root<'a> {
    pub fn token(&self) -> &'a str {
        match self {
            Self::None => "",
            Self::Drive(t) | Self::Share(t) => t,
        }
    }

    pub fn is_rooted(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Classification result: the recognized root and the remainder of the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified<'a> {
    pub root: Root<'a>,
    pub rest: &'a str,
}

/// Determine whether `path` begins with a mapped drive (`x:`) or a UNC share
/// (`\\host\share`), extracting the root token and the remainder.
///
/// A drive is recognized only when the character at index 1 is `:` and the
/// character before it is an ASCII letter; any other `:` appearing before the
/// first separator is a malformed drive. A single leading separator is the
/// "current drive root" relative form and classifies as unrooted.
pub fn classify(path: &str) -> Result<Classified<'_>, PathError> {
    let bytes = path.as_bytes();

    if bytes.len() >= 2 && bytes[0] == b'\\' && bytes[1] == b'\\' {
        return classify_share(path);
    }

    // Portion before the first separator decides drive-ness.
    let head_end = path.find(SEPARATOR).unwrap_or(path.len());
    let head = &path[..head_end];

    if let Some(colon) = head.find(':') {
        if colon == 1 && bytes[0].is_ascii_alphabetic() {
            return Ok(Classified {
                root: Root::Drive(&path[..2]),
                rest: &path[2..],
            });
        }
        return Err(PathError::InvalidDrive(path.to_string()));
    }

    Ok(Classified {
        root: Root::None,
        rest: path,
    })
}

fn classify_share(path: &str) -> Result<Classified<'_>, PathError> {
    let after_slashes = &path[2..];

    let host_end = after_slashes.find(SEPARATOR).unwrap_or(after_slashes.len());
    let host = &after_slashes[..host_end];
    if host.is_empty() {
        return Err(PathError::EmptyComponent {
            context: CharContext::HostName,
            path: path.to_string(),
        });
    }
    chars::scan(host, CharContext::HostName, path)?;

    if host_end == after_slashes.len() {
        // `\\host` with no share half at all.
        return Err(PathError::EmptyComponent {
            context: CharContext::ShareName,
            path: path.to_string(),
        });
    }

    let after_host = &after_slashes[host_end + 1..];
    let share_end = after_host.find(SEPARATOR).unwrap_or(after_host.len());
    let share = &after_host[..share_end];
    if share.is_empty() {
        return Err(PathError::EmptyComponent {
            context: CharContext::ShareName,
            path: path.to_string(),
        });
    }
    chars::scan(share, CharContext::ShareName, path)?;

    let token_len = 2 + host.len() + 1 + share.len();
    Ok(Classified {
        root: Root::Share(&path[..token_len]),
        rest: &path[token_len..],
    })
}
