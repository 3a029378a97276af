//! Sentence segmenter.
//!
//! Segmentation runs in three passes:
//!
//! ```text
//! text ──protect──▶ "\u{E000}0\u{E001} Smith went home. He left at 5."
//!      ──split────▶ ["\u{E000}0\u{E001} Smith went home.", "He left at 5."]
//!      ──restore──▶ ["Dr. Smith went home.", "He left at 5."]
//! ```
//!
//! Markers are built from Unicode private-use characters, so they never
//! contain whitespace or sentence punctuation.  An opening marker character
//! already present in the input is protected first, so restoring never
//! rewrites text the caller wrote.

use regex::Captures;

use super::abbreviations::AbbreviationTable;

const MARKER_OPEN: char = '\u{E000}';
const MARKER_CLOSE: char = '\u{E001}';

/// Splits text into sentences without breaking on known abbreviations.
///
/// `segment` is pure: the same input always yields the same output, and
/// every returned sentence segments back to itself.
#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    abbreviations: AbbreviationTable,
}

impl Segmenter {
    pub fn new(abbreviations: AbbreviationTable) -> Self {
        Self { abbreviations }
    }

    /// Split `text` into trimmed, non-empty sentences in reading order.
    ///
    /// Empty or whitespace-only input yields an empty vector.  Trailing text
    /// without terminal punctuation is returned as the last sentence.
    pub fn segment(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut protected: Vec<String> = Vec::new();
        let mut working = text.to_string();

        if working.contains(MARKER_OPEN) {
            protected.push(MARKER_OPEN.to_string());
            working = working.replace(MARKER_OPEN, &marker(0));
        }

        for pattern in self.abbreviations.patterns() {
            working = pattern
                .replace_all(&working, |caps: &Captures<'_>| {
                    let marker = marker(protected.len());
                    protected.push(caps[0].to_string());
                    marker
                })
                .into_owned();
        }

        split_sentences(&working)
            .into_iter()
            .map(|sentence| restore(sentence, &protected))
            .collect()
    }
}

fn marker(index: usize) -> String {
    format!("{MARKER_OPEN}{index}{MARKER_CLOSE}")
}

/// Split on `[.!?]` followed by whitespace, and on newlines.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (i, c) in text.char_indices() {
        let boundary =
            c == '\n' || (c.is_whitespace() && matches!(prev, Some('.') | Some('!') | Some('?')));

        if boundary {
            push_trimmed(&mut sentences, &text[start..i]);
            start = i + c.len_utf8();
        }
        prev = Some(c);
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }
}

/// Replace every marker in `sentence` with the text it protected.
fn restore(sentence: &str, protected: &[String]) -> String {
    let mut out = String::with_capacity(sentence.len());
    let mut rest = sentence;

    while let Some(open) = rest.find(MARKER_OPEN) {
        out.push_str(&rest[..open]);
        let after = &rest[open + MARKER_OPEN.len_utf8()..];

        let lookup = after.find(MARKER_CLOSE).and_then(|close| {
            after[..close]
                .parse::<usize>()
                .ok()
                .and_then(|index| protected.get(index))
                .map(|original| (original, close))
        });

        match lookup {
            Some((original, close)) => {
                out.push_str(original);
                rest = &after[close + MARKER_CLOSE.len_utf8()..];
            }
            None => {
                out.push(MARKER_OPEN);
                rest = after;
            }
        }
    }
    out.push_str(rest);

    out
}
