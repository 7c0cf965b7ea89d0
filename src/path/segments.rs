use std::collections::VecDeque;

use crate::error::{CharContext, PathError};
use crate::path::chars::{self, SEPARATOR};

// ── Folder-segment canonicalizer ────────────────────────────────────────────

/// Validate one folder segment. The navigation tokens `.` and `..` are legal
/// here and exempt from the trailing-dot rule.
pub fn validate_segment(segment: &str, full_path: &str) -> Result<(), PathError> {
    if segment.is_empty() {
        return Err(PathError::EmptyComponent {
            context: CharContext::FolderSegment,
            path: full_path.to_string(),
        });
    }
    if segment == "." || segment == ".." {
        return Ok(());
    }
    chars::scan(segment, CharContext::FolderSegment, full_path)?;
    if segment.ends_with(|c: char| c.is_whitespace() || c == '.') {
        return Err(PathError::TrailingWhitespaceOrDot(full_path.to_string()));
    }
    Ok(())
}

/// Split the middle portion of a path (no leading or trailing separator) into
/// validated, canonical segments: `.` segments removed, `..` collapsed
/// against preceding concrete segments in a single right-to-left pass.
/// Unconsumed ascends survive as a leading `..` chain; whether that chain is
/// legal is the builder's call, since only rooted paths forbid it.
pub fn canonicalize_middle<'a>(
    middle: &'a str,
    full_path: &str,
) -> Result<Vec<&'a str>, PathError> {
    if middle.is_empty() {
        return Ok(Vec::new());
    }

    let split: Vec<&str> = middle.split(SEPARATOR).collect();
    for segment in &split {
        validate_segment(segment, full_path)?;
    }

    let mut resolved: VecDeque<&str> = VecDeque::new();
    let mut pending_ascends: usize = 0;
    for segment in split.iter().rev() {
        if *segment == "." {
            continue;
        }
        if *segment == ".." {
            pending_ascends += 1;
            continue;
        }
        if pending_ascends > 0 {
            pending_ascends -= 1;
            continue;
        }
        resolved.push_front(segment);
    }
    for _ in 0..pending_ascends {
        resolved.push_front("..");
    }

    Ok(resolved.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(middle: &str) -> Vec<&str> {
        canonicalize_middle(middle, middle).unwrap()
    }

    #[test]
    fn plain_segments_pass_through() {
        assert_eq!(canon("a\\b\\c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_middle_yields_no_segments() {
        assert_eq!(canon(""), Vec::<&str>::new());
    }

    #[test]
    fn dot_segments_are_removed() {
        assert_eq!(canon("a\\.\\b\\."), vec!["a", "b"]);
        assert_eq!(canon("."), Vec::<&str>::new());
    }

    #[test]
    fn dotdot_consumes_preceding_segment() {
        assert_eq!(canon("a\\..\\b"), vec!["b"]);
        assert_eq!(canon("a\\b\\.."), vec!["a"]);
    }

    #[test]
    fn unconsumed_ascends_lead_the_result() {
        assert_eq!(canon("..\\a"), vec!["..", "a"]);
        assert_eq!(canon("a\\..\\..\\..\\b"), vec!["..", "..", "b"]);
    }

    #[test]
    fn dot_between_dotdots_does_not_absorb_an_ascend() {
        assert_eq!(canon("a\\.\\..\\b"), vec!["b"]);
    }

    #[test]
    fn double_separator_is_an_empty_segment() {
        let err = canonicalize_middle("a\\\\b", "a\\\\b").unwrap_err();
        assert!(matches!(
            err,
            PathError::EmptyComponent {
                context: CharContext::FolderSegment,
                ..
            }
        ));
    }

    #[test]
    fn segment_trailing_dot_is_rejected() {
        assert!(matches!(
            canonicalize_middle("a.\\b", "a.\\b"),
            Err(PathError::TrailingWhitespaceOrDot(_))
        ));
    }

    #[test]
    fn segment_trailing_space_is_rejected() {
        assert!(matches!(
            canonicalize_middle("a \\b", "a \\b"),
            Err(PathError::TrailingWhitespaceOrDot(_))
        ));
    }

    #[test]
    fn segment_with_illegal_character_is_rejected() {
        let err = canonicalize_middle("a\\b?c", "a\\b?c").unwrap_err();
        assert!(matches!(
            err,
            PathError::InvalidCharacter {
                ch: '?',
                context: CharContext::FolderSegment,
                ..
            }
        ));
    }

    #[test]
    fn validation_happens_before_collapsing() {
        // The bad segment would be consumed by the `..`, but validation still
        // sees it first.
        assert!(canonicalize_middle("b*d\\..\\a", "b*d\\..\\a").is_err());
    }
}
