//! Abbreviation-aware sentence segmentation.
//!
//! [`Segmenter`] splits a block of source-language text into sentences on
//! `.`, `!`, `?` followed by whitespace, or on newline runs.  Abbreviations
//! listed in an [`AbbreviationTable`] ("Dr.", "e.g.", "Inc." …) are hidden
//! behind marker tokens while splitting so their periods never end a sentence.
//!
//! ```
//! use bilingual_reader::text::Segmenter;
//!
//! let segmenter = Segmenter::default();
//! let sentences = segmenter.segment("Dr. Smith went home. He left at 5.");
//! assert_eq!(sentences, vec!["Dr. Smith went home.", "He left at 5."]);
//! ```

pub mod abbreviations;
pub mod segmenter;

pub use abbreviations::{AbbreviationTable, DEFAULT_ABBREVIATIONS};
pub use segmenter::Segmenter;
