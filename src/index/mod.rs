//! Index construction and the prefix-iterable structure over term text.
//!
//! The inverted index itself (`InvertedIndex`) lives in `crate::types`
//! alongside the rest of the data model; this module owns the one-pass
//! builder and the positional-prefix lookup structure it produces.

pub mod build;
pub mod prefix;

pub use build::{assign_internal_ids, build_index, is_word_start, WORD_START_BIT};
pub use prefix::PrefixIndex;
