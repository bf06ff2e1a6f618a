//! TextOperation: the insert/remove primitive and its algebra.
//!
//! An operation replaces `to_remove` characters starting at `offset` with
//! `to_insert`. All coordinates are character offsets.
//!
//! ## Transform
//!
//! `a.transform(&b)` rewrites `a` so it can be applied after `b`, where both
//! were derived from the same document. The pair satisfies TP1:
//!
//! ```text
//! apply(apply(doc, b), a.transform(b)) == apply(apply(doc, a), b.transform(a))
//! ```
//!
//! ## Overlaps
//!
//! Overlapping ranges are merged: the union of both ranges is removed and both
//! insertions survive, the one starting further left placed first. A rewritten
//! operation never removes and re-inserts the other operation's text, with one
//! exception: when `self` removes a range strictly around the point where
//! `other` inserts, no single replace can keep `other`'s text in place.
//! [`TextOperation::transform_parts`] splits that case in two.
//!
//! ## Tie-break
//!
//! Operations are totally ordered by `(to_insert, to_remove, offset)`. When two
//! inserts hit the same point, or two ranges start and end together, the text
//! of the lower operation is placed first.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{CoreError, Result};
use crate::text::{byte_index, char_len, slice};

/// A single replace operation over a character sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextOperation {
    /// Character offset where the operation starts.
    pub offset: usize,
    /// Number of characters removed at `offset`.
    pub to_remove: usize,
    /// Text inserted at `offset` after removal.
    pub to_insert: String,
}

impl TextOperation {
    /// Create a replace operation.
    pub fn new(offset: usize, to_remove: usize, to_insert: impl Into<String>) -> Self {
        Self {
            offset,
            to_remove,
            to_insert: to_insert.into(),
        }
    }

    /// Create a pure insertion.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(offset, 0, text)
    }

    /// Create a pure removal.
    pub fn remove(offset: usize, count: usize) -> Self {
        Self::new(offset, count, String::new())
    }

    /// True if applying this operation changes nothing.
    pub fn is_noop(&self) -> bool {
        self.to_remove == 0 && self.to_insert.is_empty()
    }

    /// Number of characters inserted.
    pub fn inserted_len(&self) -> usize {
        char_len(&self.to_insert)
    }

    /// End of the removed range (exclusive).
    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.to_remove)
    }

    /// Length of a document of `len` characters after this operation.
    pub fn resulting_len(&self, len: usize) -> usize {
        len - self.to_remove + self.inserted_len()
    }

    /// Check the operation against a document of `len` characters.
    pub fn check(&self, len: usize) -> Result<()> {
        match self.offset.checked_add(self.to_remove) {
            Some(end) if end <= len => Ok(()),
            _ => Err(CoreError::OutOfRange {
                offset: self.offset,
                to_remove: self.to_remove,
                len,
            }),
        }
    }

    /// Apply to a document: `doc[..offset] ++ to_insert ++ doc[offset + to_remove..]`.
    pub fn apply(&self, doc: &str) -> Result<String> {
        let len = char_len(doc);
        self.check(len)?;

        let out_of_range = || CoreError::OutOfRange {
            offset: self.offset,
            to_remove: self.to_remove,
            len,
        };
        let start = byte_index(doc, self.offset).ok_or_else(out_of_range)?;
        let end = byte_index(doc, self.end()).ok_or_else(out_of_range)?;

        let mut out = String::with_capacity(doc.len() - (end - start) + self.to_insert.len());
        out.push_str(&doc[..start]);
        out.push_str(&self.to_insert);
        out.push_str(&doc[end..]);
        Ok(out)
    }

    /// Clamp coordinates into a document of `len` characters.
    pub fn clamp(&self, len: usize) -> Self {
        let offset = self.offset.min(len);
        Self {
            offset,
            to_remove: self.to_remove.min(len - offset),
            to_insert: self.to_insert.clone(),
        }
    }

    /// The operation that undoes `self` on `apply(doc, self)`.
    pub fn invert(&self, doc: &str) -> Result<Self> {
        self.check(char_len(doc))?;
        Ok(Self {
            offset: self.offset,
            to_remove: self.inserted_len(),
            to_insert: slice(doc, self.offset, self.end()).to_string(),
        })
    }

    /// A single operation equivalent to applying `self` and then `next`.
    ///
    /// `next` is relative to `apply(doc, self)`.
    pub fn compose(&self, next: &Self, doc: &str) -> Result<Self> {
        let mid = self.apply(doc)?;
        next.check(char_len(&mid))?;

        let inserted = self.inserted_len();
        let start = self.offset.min(next.offset);
        let end_mid = (self.offset + inserted).max(next.end());
        let end_doc = end_mid - inserted + self.to_remove;

        let region = slice(&mid, start, end_mid);
        let local = Self::new(next.offset - start, next.to_remove, next.to_insert.clone());
        Ok(Self {
            offset: start,
            to_remove: end_doc - start,
            to_insert: local.apply(region)?,
        })
    }

    /// The minimal single operation turning `old` into `new`.
    pub fn diff(old: &str, new: &str) -> Self {
        let old_chars: Vec<char> = old.chars().collect();
        let new_chars: Vec<char> = new.chars().collect();

        let prefix = old_chars
            .iter()
            .zip(&new_chars)
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = old_chars[prefix..]
            .iter()
            .rev()
            .zip(new_chars[prefix..].iter().rev())
            .take_while(|(a, b)| a == b)
            .count();

        Self {
            offset: prefix,
            to_remove: old_chars.len() - prefix - suffix,
            to_insert: new_chars[prefix..new_chars.len() - suffix].iter().collect(),
        }
    }

    /// Deterministic total order used to break ties between concurrent operations.
    pub fn tie_order(&self, other: &Self) -> Ordering {
        self.to_insert
            .as_bytes()
            .cmp(other.to_insert.as_bytes())
            .then(self.to_remove.cmp(&other.to_remove))
            .then(self.offset.cmp(&other.offset))
    }

    /// True if `next`, applied after `self`, overlaps or borders the text
    /// `self` inserted. Only such pairs compose without spanning untouched text.
    pub fn touches(&self, next: &Self) -> bool {
        next.offset <= self.offset + self.inserted_len() && next.end() >= self.offset
    }

    /// Rewrite `self` so it applies after `other`; both must share a base document.
    pub fn transform(&self, other: &Self) -> Self {
        let first = self.tie_order(other) == Ordering::Less;
        let inserted = other.inserted_len();
        let text = self.to_insert.clone();

        // Concurrent inserts at the same point.
        if self.to_remove == 0 && other.to_remove == 0 && self.offset == other.offset {
            if first {
                return self.clone();
            }
            return Self::new(self.offset + inserted, 0, text);
        }

        // Entirely before `other`.
        if self.end() <= other.offset {
            return self.clone();
        }

        // Entirely after `other`.
        if self.offset >= other.end() {
            return Self::new(self.offset - other.to_remove + inserted, self.to_remove, text);
        }

        let left = other.offset.saturating_sub(self.offset);
        let right = self.end().saturating_sub(other.end());

        // `other` sits strictly inside the removed range.
        if left > 0 && right > 0 {
            if inserted == 0 {
                return Self::new(self.offset, left + right, text);
            }
            let combined = if first {
                format!("{}{}", self.to_insert, other.to_insert)
            } else {
                format!("{}{}", other.to_insert, self.to_insert)
            };
            return Self::new(self.offset, left + inserted + right, combined);
        }

        // `self` sits strictly inside the range `other` removed.
        if self.offset > other.offset && self.end() < other.end() {
            let at = if first { other.offset } else { other.offset + inserted };
            return Self::new(at, 0, text);
        }

        match self.offset.cmp(&other.offset) {
            Ordering::Less => Self::new(self.offset, left, text),
            Ordering::Greater => Self::new(other.offset + inserted, right, text),
            Ordering::Equal => match self.end().cmp(&other.end()) {
                Ordering::Less => Self::new(other.offset, 0, text),
                Ordering::Greater => Self::new(other.offset + inserted, right, text),
                Ordering::Equal if first => Self::new(other.offset, 0, text),
                Ordering::Equal => Self::new(other.offset + inserted, 0, text),
            },
        }
    }

    /// [`transform`](Self::transform) as a sequence of operations, none of which
    /// removes text `other` inserted.
    ///
    /// Applied in order, the parts have the same effect as the single
    /// transformed operation. There are two parts only when `self` removes a
    /// range strictly around the point where `other` inserts text.
    pub fn transform_parts(&self, other: &Self) -> Vec<Self> {
        let left = other.offset.saturating_sub(self.offset);
        let right = self.end().saturating_sub(other.end());
        let inserted = other.inserted_len();
        if left == 0 || right == 0 || inserted == 0 {
            return vec![self.transform(other)];
        }

        if self.tie_order(other) == Ordering::Less {
            vec![
                Self::new(self.offset, left, self.to_insert.clone()),
                Self::remove(self.offset + self.inserted_len() + inserted, right),
            ]
        } else {
            vec![
                Self::remove(self.offset, left),
                Self::new(self.offset + inserted, right, self.to_insert.clone()),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converge(doc: &str, a: &TextOperation, b: &TextOperation) -> (String, String) {
        let left = a.transform(b).apply(&b.apply(doc).unwrap()).unwrap();
        let right = b.transform(a).apply(&a.apply(doc).unwrap()).unwrap();
        (left, right)
    }

    #[test]
    fn test_apply_insert_remove() {
        assert_eq!(TextOperation::insert(3, "d").apply("abc").unwrap(), "abcd");
        assert_eq!(TextOperation::remove(1, 1).apply("abc").unwrap(), "ac");
        assert_eq!(TextOperation::new(0, 3, "xyz").apply("abc").unwrap(), "xyz");
    }

    #[test]
    fn test_apply_out_of_range() {
        let err = TextOperation::insert(3, "d").apply("").unwrap_err();
        assert_eq!(
            err,
            CoreError::OutOfRange {
                offset: 3,
                to_remove: 0,
                len: 0
            }
        );
        assert!(TextOperation::remove(2, 5).apply("abc").is_err());
        assert!(TextOperation::remove(usize::MAX, 2).apply("abc").is_err());
    }

    #[test]
    fn test_apply_multibyte() {
        let op = TextOperation::new(1, 1, "ü");
        assert_eq!(op.apply("añb").unwrap(), "aüb");
    }

    #[test]
    fn test_same_point_inserts_converge() {
        let a = TextOperation::insert(0, "hello");
        let b = TextOperation::insert(0, "world");
        let (left, right) = converge("", &a, &b);
        assert_eq!(left, right);
        // "hello" sorts before "world"
        assert_eq!(left, "helloworld");
    }

    #[test]
    fn test_identical_inserts_converge() {
        let a = TextOperation::insert(1, "x");
        let (left, right) = converge("ab", &a, &a.clone());
        assert_eq!(left, right);
        assert_eq!(left, "axxb");
    }

    #[test]
    fn test_overlapping_removes_converge() {
        let a = TextOperation::remove(1, 3);
        let b = TextOperation::new(2, 3, "Z");
        let (left, right) = converge("abcdefg", &a, &b);
        assert_eq!(left, right);
        assert_eq!(left, "aZfg");
    }

    #[test]
    fn test_insert_inside_removed_range_survives() {
        let a = TextOperation::insert(3, "X");
        let b = TextOperation::remove(1, 4);
        let (left, right) = converge("abcdef", &a, &b);
        assert_eq!(left, right);
        assert_eq!(left, "aXf");
    }

    #[test]
    fn test_adjacent_ranges_do_not_merge() {
        let a = TextOperation::new(0, 2, "X");
        let b = TextOperation::new(2, 2, "Y");
        let (left, right) = converge("abcdef", &a, &b);
        assert_eq!(left, right);
        assert_eq!(left, "XYef");
    }

    #[test]
    fn test_partial_overlap_keeps_other_text_in_place() {
        // "abcdef": a removes "bcd", b replaces "def" with "XY"
        let a = TextOperation::remove(1, 3);
        let b = TextOperation::new(3, 3, "XY");
        assert_eq!(a.transform(&b), TextOperation::remove(1, 2));
        assert_eq!(b.transform(&a), TextOperation::new(1, 2, "XY"));
        let (left, right) = converge("abcdef", &a, &b);
        assert_eq!(left, right);
        assert_eq!(left, "aXY");
    }

    #[test]
    fn test_transform_parts_split_around_insertion() {
        let doc = "abcdef";
        let outer = TextOperation::new(1, 4, "Q");
        let inner = TextOperation::insert(3, "X");
        let after_inner = inner.apply(doc).unwrap();

        let parts = outer.transform_parts(&inner);
        assert_eq!(parts.len(), 2);
        let mut split = after_inner.clone();
        for part in &parts {
            split = part.apply(&split).unwrap();
        }
        assert_eq!(split, outer.transform(&inner).apply(&after_inner).unwrap());
        assert_eq!(split, "aQXf");
        assert!(parts.iter().all(|p| !p.to_insert.contains('X')));
    }

    #[test]
    fn test_transform_parts_single_when_no_containment() {
        let a = TextOperation::remove(1, 3);
        let b = TextOperation::new(3, 3, "XY");
        assert_eq!(a.transform_parts(&b), vec![a.transform(&b)]);
    }

    #[test]
    fn test_touches() {
        let typed = TextOperation::insert(2, "ab");
        assert!(typed.touches(&TextOperation::insert(4, "c")));
        assert!(typed.touches(&TextOperation::remove(0, 2)));
        assert!(!typed.touches(&TextOperation::insert(9, "z")));
        assert!(!typed.touches(&TextOperation::remove(0, 1)));
    }

    #[test]
    fn test_transform_after_shifts() {
        let a = TextOperation::insert(5, "!");
        let b = TextOperation::new(0, 2, "xyz");
        assert_eq!(a.transform(&b), TextOperation::insert(6, "!"));
    }

    #[test]
    fn test_invert_restores() {
        let doc = "hello world";
        let op = TextOperation::new(6, 5, "there");
        let after = op.apply(doc).unwrap();
        let inverse = op.invert(doc).unwrap();
        assert_eq!(inverse.apply(&after).unwrap(), doc);
    }

    #[test]
    fn test_compose_matches_sequential_apply() {
        let doc = "the quick fox";
        let a = TextOperation::insert(10, "brown ");
        let b = TextOperation::remove(0, 4);
        let composed = a.compose(&b, doc).unwrap();
        let expected = b.apply(&a.apply(doc).unwrap()).unwrap();
        assert_eq!(composed.apply(doc).unwrap(), expected);
    }

    #[test]
    fn test_compose_insert_then_delete_inserted() {
        let a = TextOperation::insert(1, "xyz");
        let b = TextOperation::remove(1, 3);
        let composed = a.compose(&b, "ab").unwrap();
        assert!(composed.is_noop());
    }

    #[test]
    fn test_diff() {
        assert_eq!(
            TextOperation::diff("hello world", "hello there world"),
            TextOperation::insert(6, "there ")
        );
        assert_eq!(TextOperation::diff("abc", "abc"), TextOperation::new(3, 0, ""));
        assert_eq!(TextOperation::diff("aaa", "aa"), TextOperation::remove(2, 1));
        assert_eq!(TextOperation::diff("", "new"), TextOperation::insert(0, "new"));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(TextOperation::remove(4, 10).clamp(6), TextOperation::remove(4, 2));
        assert_eq!(TextOperation::insert(9, "d").clamp(3), TextOperation::insert(3, "d"));
    }

    #[test]
    fn test_tie_order_total() {
        let a = TextOperation::insert(0, "a");
        let b = TextOperation::insert(1, "a");
        assert_eq!(a.tie_order(&b), Ordering::Less);
        assert_eq!(b.tie_order(&a), Ordering::Greater);
        assert_eq!(a.tie_order(&a), Ordering::Equal);
    }
}
