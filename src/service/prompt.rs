//! System prompt for sentence translation.

/// Build the system instruction for translating `source` into `target`.
///
/// ```
/// use bilingual_reader::service::translation_instruction;
///
/// let prompt = translation_instruction("English", "French");
/// assert!(prompt.starts_with("You are an English to French translator."));
/// ```
pub fn translation_instruction(source: &str, target: &str) -> String {
    format!(
        "You are {article} {source} to {target} translator. \
         Translate the following {source} text to natural, fluent {target}. \
         Return only the translation, no explanations or notes.",
        article = indefinite_article(source),
    )
}

fn indefinite_article(word: &str) -> &'static str {
    match word.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_both_languages() {
        let prompt = translation_instruction("German", "Spanish");
        assert!(prompt.starts_with("You are a German to Spanish translator."));
        assert!(prompt.contains("natural, fluent Spanish"));
        assert!(prompt.ends_with("no explanations or notes."));
    }

    #[test]
    fn article_follows_vowel_sound() {
        assert_eq!(indefinite_article("Italian"), "an");
        assert_eq!(indefinite_article("Japanese"), "a");
        assert_eq!(indefinite_article(""), "a");
    }
}
