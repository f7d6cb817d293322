//! UTF-8-safe string truncation.

/// Truncate a string to at most `max_chars` CHARACTERS (not bytes).
///
/// Respects UTF-8 character boundaries and never panics, even with
/// multi-byte characters.
#[inline]
#[must_use]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}
