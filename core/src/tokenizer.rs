use crate::config::{SearchConfig, StemmerConfig};
use crate::error::{Result, SearchError};
use regex::Regex;
use rust_stemmers::Stemmer;
use std::borrow::Cow;
use unicode_normalization::UnicodeNormalization;

/// Reduces an already-lowercased word to its root form.
pub trait Stem: Send + Sync {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str>;
}

impl Stem for Stemmer {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str> {
        Stemmer::stem(self, word)
    }
}

/// Leaves every word untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStem;

impl Stem for NoStem {
    fn stem<'a>(&self, word: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(word)
    }
}

/// Splits text on a word-boundary pattern, lowercases and stems each fragment.
///
/// Stop words are kept so that every token keeps its position in the stream;
/// callers drop them per position.
pub struct Tokenizer {
    split: Regex,
    stemmer: Box<dyn Stem>,
    normalize_unicode: bool,
}

impl Tokenizer {
    pub fn new(pattern: &str, stemmer: Box<dyn Stem>) -> Result<Self> {
        let split = Regex::new(pattern)
            .map_err(|e| SearchError::InvalidConfig(format!("word_split: {e}")))?;
        Ok(Self { split, stemmer, normalize_unicode: false })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        let stemmer: Box<dyn Stem> = match config.stemmer {
            StemmerConfig::Snowball(lang) => Box::new(Stemmer::create(lang.algorithm())),
            StemmerConfig::None => Box::new(NoStem),
        };
        let mut tokenizer = Self::new(&config.word_split, stemmer)?;
        tokenizer.normalize_unicode = config.normalize_unicode;
        Ok(tokenizer)
    }

    /// Tokenize text into stemmed words in document order. Index `i` of the
    /// result is the token's position.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text: Cow<'_, str> = if self.normalize_unicode {
            Cow::Owned(text.nfkc().collect())
        } else {
            Cow::Borrowed(text)
        };
        self.split
            .split(&text)
            .filter(|fragment| !fragment.is_empty())
            .map(|fragment| self.stem_lowercase(fragment))
            .collect()
    }

    /// Normalize a single, already-split word the same way `tokenize` does.
    pub fn normalize(&self, word: &str) -> String {
        if self.normalize_unicode {
            self.stem_lowercase(&word.nfkc().collect::<String>())
        } else {
            self.stem_lowercase(word)
        }
    }

    fn stem_lowercase(&self, fragment: &str) -> String {
        let lower = fragment.to_lowercase();
        self.stemmer.stem(&lower).into_owned()
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("split", &self.split.as_str())
            .field("normalize_unicode", &self.normalize_unicode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> Tokenizer {
        Tokenizer::from_config(&SearchConfig::default()).unwrap()
    }

    #[test]
    fn basic_tokenize() {
        let t = english().tokenize("Running, runner's run!");
        assert_eq!(t[0], "run");
        assert!(t.contains(&"runner".to_string()));
    }

    #[test]
    fn keeps_stop_words_and_positions() {
        let t = english().tokenize("This is a test");
        assert_eq!(t.len(), 4);
        assert_eq!(t[1], "is");
        assert_eq!(t[2], "a");
        assert_eq!(t[3], "test");
    }

    #[test]
    fn drops_empty_fragments() {
        let t = english().tokenize("  ...testing,,, things!  ");
        assert_eq!(t, vec!["test".to_string(), "thing".to_string()]);
    }

    #[test]
    fn custom_pattern_without_stemming() {
        let t = Tokenizer::new(r"[,;]", Box::new(NoStem)).unwrap();
        assert_eq!(t.tokenize("Foo Bar;Baz,,qux"), vec!["foo bar", "baz", "qux"]);
    }

    #[test]
    fn nfkc_folds_compatibility_forms() {
        let config = SearchConfig { stemmer: StemmerConfig::None, ..Default::default() };
        let t = Tokenizer::from_config(&config).unwrap().tokenize("ﬁles Ｔｅｓｔ");
        assert_eq!(t, vec!["files".to_string(), "test".to_string()]);
    }

    #[test]
    fn normalize_matches_tokenize() {
        let t = english();
        assert_eq!(t.normalize("Testing"), "test");
        assert_eq!(t.normalize("Things"), t.tokenize("things")[0]);
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        assert!(matches!(
            Tokenizer::new("[", Box::new(NoStem)),
            Err(SearchError::InvalidConfig(_))
        ));
    }
}
