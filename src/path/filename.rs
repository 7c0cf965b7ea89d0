use crate::error::{CharContext, PathError};
use crate::path::chars;

// ── Filename classifier ─────────────────────────────────────────────────────

/// Validate the trailing filename component of a path.
///
/// The navigation tokens `.` and `..` are directory syntax and must never
/// reach this stage; both end in a dot and are rejected here like any other
/// dot-terminated name.
pub fn validate(name: &str, full_path: &str) -> Result<(), PathError> {
    if name.is_empty() {
        return Err(PathError::EmptyComponent {
            context: CharContext::FileName,
            path: full_path.to_string(),
        });
    }
    chars::scan(name, CharContext::FileName, full_path)?;
    if name.ends_with(|c: char| c.is_whitespace() || c == '.') {
        return Err(PathError::TrailingWhitespaceOrDot(full_path.to_string()));
    }
    Ok(())
}
