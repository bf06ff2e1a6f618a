//! Character-indexed helpers over UTF-8 strings.
//!
//! Document coordinates count Unicode scalar values, not bytes.

/// Number of characters in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of the character at `char_idx`, or `s.len()` at the end.
///
/// Returns `None` when `char_idx` is past the end.
pub fn byte_index(s: &str, char_idx: usize) -> Option<usize> {
    if char_idx == 0 {
        return Some(0);
    }
    match s.char_indices().nth(char_idx) {
        Some((byte, _)) => Some(byte),
        None if char_len(s) == char_idx => Some(s.len()),
        None => None,
    }
}

/// The characters in `[start, end)`. Out-of-range bounds are clamped.
pub fn slice(s: &str, start: usize, end: usize) -> &str {
    let len = char_len(s);
    let start = start.min(len);
    let end = end.clamp(start, len);
    let from = byte_index(s, start).unwrap_or(s.len());
    let to = byte_index(s, end).unwrap_or(s.len());
    &s[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_index_multibyte() {
        let s = "héllo";
        assert_eq!(byte_index(s, 0), Some(0));
        assert_eq!(byte_index(s, 2), Some(3));
        assert_eq!(byte_index(s, 5), Some(6));
        assert_eq!(byte_index(s, 6), None);
    }

    #[test]
    fn test_slice_clamps() {
        assert_eq!(slice("abcdef", 2, 4), "cd");
        assert_eq!(slice("abc", 1, 10), "bc");
        assert_eq!(slice("abc", 5, 10), "");
        assert_eq!(slice("日本語", 1, 2), "本");
    }
}
