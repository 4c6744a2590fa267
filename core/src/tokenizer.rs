use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[\p{Alphabetic}\p{N}]+").expect("valid regex");
}

/// Tokenize text into lower-cased alphanumeric runs, in order of appearance.
///
/// Text is NFKC-normalized first so compatibility forms (full-width letters,
/// ligatures) index like their plain equivalents. There is no stemming and no
/// stop-word list: "running" and "run" are different tokens, and "the" is a
/// token like any other.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    WORD.find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Distinct tokens of `text`, sorted.
pub fn distinct_tokens(text: &str) -> BTreeSet<String> {
    tokenize(text).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation_and_lowercases() {
        assert_eq!(tokenize("AI-Makeup, tutorial!!"), vec!["ai", "makeup", "tutorial"]);
    }

    #[test]
    fn keeps_stop_words_and_does_not_stem() {
        assert_eq!(tokenize("The Running cats"), vec!["the", "running", "cats"]);
    }

    #[test]
    fn drops_empty_tokens() {
        assert!(tokenize("  -- !! ").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn distinct_tokens_dedups() {
        let t = distinct_tokens("cat CAT cat_dog");
        assert_eq!(t.into_iter().collect::<Vec<_>>(), vec!["cat", "dog"]);
    }
}
