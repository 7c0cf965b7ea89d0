use crate::error::PathError;
use crate::path::chars::{MAX_PATH_LENGTH, SEPARATOR};
use crate::path::filename;
use crate::path::root::{self, Root};
use crate::path::segments;

// ── Path kinds ──────────────────────────────────────────────────────────────

/// The six descriptor kinds the builder can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    Drive,
    RootedDirectory,
    RootedFile,
    RelativeDirectory,
    RelativeFile,
    FileName,
}

// ── Canonicalization ────────────────────────────────────────────────────────

/// Run the full pipeline for `raw` against the target `kind`, producing the
/// canonical string or the first validation failure.
///
/// Error precedence is fixed: classifier errors, then `PathTooLong`, then
/// `AscendsAboveRoot`. A path that both ascends above its root and exceeds
/// the length limit reports `PathTooLong`.
pub fn canonicalize(raw: &str, kind: PathKind) -> Result<String, PathError> {
    match kind {
        PathKind::Drive => canonicalize_drive(raw),
        PathKind::RootedDirectory => canonicalize_anchored(raw, false),
        PathKind::RootedFile => canonicalize_anchored(raw, true),
        PathKind::RelativeDirectory => canonicalize_relative(raw, false),
        PathKind::RelativeFile => canonicalize_relative(raw, true),
        PathKind::FileName => canonicalize_file_name(raw),
    }
}

fn canonicalize_drive(raw: &str) -> Result<String, PathError> {
    let classified = root::classify(raw)?;
    match classified.root {
        Root::None => Err(PathError::NotRooted(raw.to_string())),
        // A bare drive is exactly the token; `c:\` denotes a directory.
        _ if !classified.rest.is_empty() => Err(PathError::InvalidDrive(raw.to_string())),
        root => Ok(root.token().to_string()),
    }
}

fn canonicalize_anchored(raw: &str, expects_file: bool) -> Result<String, PathError> {
    let classified = root::classify(raw)?;
    if !classified.root.is_rooted() {
        return Err(PathError::NotRooted(raw.to_string()));
    }
    let rest = classified.rest;
    if !rest.is_empty() && !rest.starts_with(SEPARATOR) {
        // Drive-relative forms like `c:foo` have no place in this grammar.
        return Err(PathError::InvalidDrive(raw.to_string()));
    }
    let body = rest.strip_prefix(SEPARATOR).unwrap_or("");

    let (middle, name) = if expects_file {
        let (middle, name) = split_file_name(body);
        filename::validate(name, raw)?;
        (middle, Some(name))
    } else {
        (body.strip_suffix(SEPARATOR).unwrap_or(body), None)
    };

    let resolved = segments::canonicalize_middle(middle, raw)?;

    let mut canonical = classified.root.token().to_string();
    for segment in &resolved {
        canonical.push(SEPARATOR);
        canonical.push_str(segment);
    }
    if let Some(name) = name {
        canonical.push(SEPARATOR);
        canonical.push_str(name);
    }

    check_length(&canonical)?;
    if resolved.first() == Some(&"..") {
        return Err(PathError::AscendsAboveRoot(raw.to_string()));
    }
    Ok(canonical)
}

fn canonicalize_relative(raw: &str, expects_file: bool) -> Result<String, PathError> {
    let classified = root::classify(raw)?;
    if classified.root.is_rooted() {
        return Err(PathError::RootedInRelativeContext(raw.to_string()));
    }

    let leading = raw.starts_with(SEPARATOR);
    let body = if leading { &raw[1..] } else { raw };

    let (middle, name) = if expects_file {
        let (middle, name) = split_file_name(body);
        filename::validate(name, raw)?;
        (middle, Some(name))
    } else {
        (body.strip_suffix(SEPARATOR).unwrap_or(body), None)
    };

    let resolved = segments::canonicalize_middle(middle, raw)?;

    let mut canonical = String::new();
    if leading {
        canonical.push(SEPARATOR);
    }
    canonical.push_str(&resolved.join(&SEPARATOR.to_string()));
    if let Some(name) = name {
        if !canonical.is_empty() && !canonical.ends_with(SEPARATOR) {
            canonical.push(SEPARATOR);
        }
        canonical.push_str(name);
    }

    check_length(&canonical)?;
    Ok(canonical)
}

fn canonicalize_file_name(raw: &str) -> Result<String, PathError> {
    filename::validate(raw, raw)?;
    check_length(raw)?;
    Ok(raw.to_string())
}

/// Split the tail after the last separator off as the filename. A body with
/// no separator is all filename.
fn split_file_name(body: &str) -> (&str, &str) {
    match body.rfind(SEPARATOR) {
        Some(pos) => (&body[..pos], &body[pos + 1..]),
        None => ("", body),
    }
}

fn check_length(canonical: &str) -> Result<(), PathError> {
    let length = canonical.chars().count();
    if length > MAX_PATH_LENGTH {
        return Err(PathError::PathTooLong {
            length,
            path: canonical.to_string(),
        });
    }
    Ok(())
}

// ── Predicates ──────────────────────────────────────────────────────────────

// Same pipeline, failure converted to a boolean. Used by call sites that need
// to classify a string without committing to a descriptor type.

pub fn is_valid_drive(raw: &str) -> bool {
    canonicalize(raw, PathKind::Drive).is_ok()
}

pub fn is_valid_rooted_directory(raw: &str) -> bool {
    canonicalize(raw, PathKind::RootedDirectory).is_ok()
}

pub fn is_valid_rooted_file(raw: &str) -> bool {
    canonicalize(raw, PathKind::RootedFile).is_ok()
}

pub fn is_valid_relative_directory(raw: &str) -> bool {
    canonicalize(raw, PathKind::RelativeDirectory).is_ok()
}

pub fn is_valid_relative_file(raw: &str) -> bool {
    canonicalize(raw, PathKind::RelativeFile).is_ok()
}

pub fn is_valid_file_name(raw: &str) -> bool {
    canonicalize(raw, PathKind::FileName).is_ok()
}
