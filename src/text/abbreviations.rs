//! Immutable abbreviation tables used by the segmenter.

use regex::Regex;

/// English titles, Latin abbreviations and address/company suffixes.
///
/// Order matters: when two entries could match at the same place, the one
/// listed first is protected first.
pub const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Sr.", "Jr.", "etc.", "vs.", "e.g.", "i.e.", "Inc.",
    "Ltd.", "Co.", "St.", "Ave.", "Blvd.", "Rd.", "No.", "Vol.", "Rev.", "Gen.", "Col.", "Lt.",
    "Sgt.", "Capt.", "Maj.",
];

/// An ordered, immutable set of abbreviations with their compiled matchers.
///
/// Matching is case-insensitive and anchored to a word boundary when the
/// abbreviation starts with a letter or digit, so `"St."` protects
/// `"st. Louis"` but not the tail of `"first."`.
#[derive(Debug, Clone)]
pub struct AbbreviationTable {
    entries: Vec<String>,
    patterns: Vec<Regex>,
}

impl AbbreviationTable {
    /// Build a table from `entries`, preserving their order.
    ///
    /// Blank entries are ignored.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self {
            entries: Vec::new(),
            patterns: Vec::new(),
        };
        for entry in entries {
            table.push(entry.into());
        }
        table
    }

    /// The built-in English table ([`DEFAULT_ABBREVIATIONS`]).
    pub fn english() -> Self {
        Self::new(DEFAULT_ABBREVIATIONS.iter().copied())
    }

    /// Return a copy of this table with `extra` appended after the existing
    /// entries.  Duplicates (ignoring case) are skipped.
    pub fn with_extra<S: AsRef<str>>(mut self, extra: &[S]) -> Self {
        for entry in extra {
            let entry = entry.as_ref();
            let duplicate = self
                .entries
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(entry));
            if !duplicate {
                self.push(entry.to_string());
            }
        }
        self
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub(crate) fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    fn push(&mut self, entry: String) {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            return;
        }

        let anchor = if trimmed.starts_with(|c: char| c.is_alphanumeric()) {
            r"\b"
        } else {
            ""
        };
        let source = format!("(?i){anchor}{}", regex::escape(trimmed));

        match Regex::new(&source) {
            Ok(pattern) => {
                self.entries.push(trimmed.to_string());
                self.patterns.push(pattern);
            }
            Err(e) => {
                log::warn!("segmenter: skipping abbreviation {trimmed:?}: {e}");
            }
        }
    }
}

impl Default for AbbreviationTable {
    fn default() -> Self {
        Self::english()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_table_keeps_declared_order() {
        let table = AbbreviationTable::english();
        assert_eq!(table.entries().len(), DEFAULT_ABBREVIATIONS.len());
        assert_eq!(table.entries()[0], "Mr.");
        assert_eq!(table.entries().last().map(String::as_str), Some("Maj."));
    }

    #[test]
    fn blank_entries_are_ignored() {
        let table = AbbreviationTable::new(["", "  ", "approx."]);
        assert_eq!(table.entries(), ["approx."]);
    }

    #[test]
    fn with_extra_skips_case_insensitive_duplicates() {
        let table = AbbreviationTable::english().with_extra(&["DR.", "approx.", "Dept."]);
        assert_eq!(table.entries().len(), DEFAULT_ABBREVIATIONS.len() + 2);
        assert!(table.entries().iter().any(|e| e == "Dept."));
    }

    #[test]
    fn patterns_match_case_insensitively_at_word_start() {
        let table = AbbreviationTable::new(["St."]);
        let pattern = &table.patterns()[0];
        assert!(pattern.is_match("we met on st. Mark's day"));
        assert!(!pattern.is_match("she came first."));
    }

    #[test]
    fn dots_are_matched_literally() {
        let table = AbbreviationTable::new(["e.g."]);
        assert!(!table.patterns()[0].is_match("eAgB"));
        assert!(table.patterns()[0].is_match("E.G. this"));
    }
}
