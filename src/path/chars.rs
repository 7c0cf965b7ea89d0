use crate::error::{CharContext, PathError};

// ── Constants ───────────────────────────────────────────────────────────────

/// The path separator. `/` is not a separator here; it belongs to the
/// reserved set below.
pub const SEPARATOR: char = '\\';

/// Characters that may not appear in any name component.
const RESERVED: &[char] = &['"', '<', '>', '|', ':', '*', '?', '/', '\\'];

/// Maximum canonical path length. Checked after canonicalization, so a path
/// that is too long only in its original form is still valid.
pub const MAX_PATH_LENGTH: usize = 259;

// ── Character scanning ──────────────────────────────────────────────────────

/// Scan a name component for reserved or control characters, reporting the
/// first offender together with the context it occurred in. The same routine
/// serves filenames, folder segments, host names and share names; only the
/// reported context differs.
pub fn scan(text: &str, context: CharContext, full_path: &str) -> Result<(), PathError> {
    for ch in text.chars() {
        if RESERVED.contains(&ch) || (ch as u32) <= 0x1f {
            return Err(PathError::InvalidCharacter {
                ch,
                context,
                path: full_path.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_passes() {
        assert_eq!(scan("report.txt", CharContext::FileName, "report.txt"), Ok(()));
    }

    #[test]
    fn each_reserved_character_is_rejected() {
        for ch in ['"', '<', '>', '|', ':', '*', '?', '/', '\\'] {
            let name = format!("a{}b", ch);
            let err = scan(&name, CharContext::FolderSegment, &name).unwrap_err();
            match err {
                PathError::InvalidCharacter { ch: found, .. } => assert_eq!(found, ch),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn control_characters_are_rejected() {
        let name = "a\u{1}b";
        assert!(scan(name, CharContext::FileName, name).is_err());
    }

    #[test]
    fn first_offender_is_reported() {
        let err = scan("a*b?c", CharContext::FileName, "a*b?c").unwrap_err();
        match err {
            PathError::InvalidCharacter { ch, .. } => assert_eq!(ch, '*'),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn context_is_carried_through() {
        let err = scan("host:name", CharContext::HostName, "\\\\host:name\\share").unwrap_err();
        match err {
            PathError::InvalidCharacter { context, .. } => {
                assert_eq!(context, CharContext::HostName)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
