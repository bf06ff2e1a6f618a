//! Generators for property-based and randomized testing.

use proptest::prelude::*;
use rand::Rng;

use chainpad_core::text::char_len;
use chainpad_core::TextOperation;
use chainpad_sync::{Result, SyncEngine};

/// Characters used for generated text, including multi-byte ones.
const ALPHABET: &[char] = &['a', 'b', 'c', ' ', 'é', '中'];

/// Generate a short text over a small alphabet.
pub fn text(max_len: usize) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(ALPHABET), 0..=max_len)
        .prop_map(|chars| chars.into_iter().collect())
}

/// Generate an operation that is valid on `doc`.
pub fn operation_for(doc: &str) -> impl Strategy<Value = TextOperation> {
    let len = char_len(doc);
    (0..=len)
        .prop_flat_map(move |offset| (Just(offset), 0..=len - offset, text(4)))
        .prop_map(|(offset, to_remove, to_insert)| TextOperation::new(offset, to_remove, to_insert))
}

/// A document together with two operations valid on it.
pub fn concurrent_pair(
    max_len: usize,
) -> impl Strategy<Value = (String, TextOperation, TextOperation)> {
    text(max_len).prop_flat_map(|doc| {
        let a = operation_for(&doc);
        let b = operation_for(&doc);
        (Just(doc), a, b)
    })
}

/// A local edit with unscaled coordinates.
///
/// Coordinates are reduced into the document when the edit is applied, so an
/// edit generated up front is valid whatever the document looks like by then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert { at: usize, text: String },
    Remove { at: usize, count: usize },
}

impl Edit {
    /// Apply to an engine, reducing coordinates into its current document.
    pub fn apply(&self, engine: &SyncEngine) -> Result<()> {
        let len = char_len(&engine.document());
        match self {
            Edit::Insert { at, text } => engine.insert(at % (len + 1), text),
            Edit::Remove { at, count } => engine.remove(at % (len + 1), *count),
        }
    }

    /// Characters this edit can add to a document.
    pub fn inserted_len(&self) -> usize {
        match self {
            Edit::Insert { text, .. } => char_len(text),
            Edit::Remove { .. } => 0,
        }
    }
}

impl Arbitrary for Edit {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            3 => (any::<usize>(), text(5)).prop_map(|(at, text)| Edit::Insert { at, text }),
            1 => (any::<usize>(), 1usize..4).prop_map(|(at, count)| Edit::Remove { at, count }),
        ]
        .boxed()
    }
}

/// Draw a random edit.
pub fn random_edit<R: Rng>(rng: &mut R) -> Edit {
    if rng.gen_bool(0.7) {
        Edit::Insert {
            at: rng.gen(),
            text: random_text(rng, 1, 5),
        }
    } else {
        Edit::Remove {
            at: rng.gen(),
            count: rng.gen_range(1..4),
        }
    }
}

/// Draw an operation valid on `doc`.
pub fn random_operation<R: Rng>(rng: &mut R, doc: &str) -> TextOperation {
    let len = char_len(doc);
    let offset = rng.gen_range(0..=len);
    let to_remove = rng.gen_range(0..=len - offset);
    TextOperation::new(offset, to_remove, random_text(rng, 0, 4))
}

/// Draw a text of `min..=max` characters.
pub fn random_text<R: Rng>(rng: &mut R, min: usize, max: usize) -> String {
    let len = rng.gen_range(min..=max);
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect()
}
