use crate::error::{Result, SearchError};
use crate::scoring::ScoreKind;
use regex::Regex;
use rust_stemmers::Algorithm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const DEFAULT_STOP_WORDS: &[&str] = &["the", "of", "to", "and", "a", "in", "is", "it"];
pub const DEFAULT_WORD_SPLIT: &str = r"\W+";

pub const DEFAULT_MAX_MATCH_ROWS: u64 = 1_000_000;

/// Snowball languages available for stemming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    English,
    French,
    German,
    Spanish,
    Italian,
    Portuguese,
    Dutch,
    Swedish,
    Russian,
}

impl Language {
    pub fn algorithm(self) -> Algorithm {
        match self {
            Language::English => Algorithm::English,
            Language::French => Algorithm::French,
            Language::German => Algorithm::German,
            Language::Spanish => Algorithm::Spanish,
            Language::Italian => Algorithm::Italian,
            Language::Portuguese => Algorithm::Portuguese,
            Language::Dutch => Algorithm::Dutch,
            Language::Swedish => Algorithm::Swedish,
            Language::Russian => Algorithm::Russian,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemmerConfig {
    Snowball(Language),
    None,
}

impl Default for StemmerConfig {
    fn default() -> Self {
        StemmerConfig::Snowball(Language::English)
    }
}

/// What to do with a query word that has no term in the namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTermPolicy {
    /// Drop the word; it no longer constrains the match.
    #[default]
    Ignore,
    /// Any unknown word makes the whole query match nothing.
    RequireAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSpec {
    pub weight: f64,
    pub score: ScoreKind,
}

impl WeightSpec {
    pub fn new(weight: f64, score: ScoreKind) -> Self {
        Self { weight, score }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub stop_words: BTreeSet<String>,
    pub word_split: String,
    pub stemmer: StemmerConfig,
    pub normalize_unicode: bool,
    pub weights: Vec<WeightSpec>,
    pub unknown_terms: UnknownTermPolicy,
    /// Most rows one query may expand into; 0 means unbounded.
    pub max_match_rows: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            stop_words: DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect(),
            word_split: DEFAULT_WORD_SPLIT.to_string(),
            stemmer: StemmerConfig::default(),
            normalize_unicode: true,
            weights: vec![
                WeightSpec::new(1.0, ScoreKind::Frequency),
                WeightSpec::new(1.0, ScoreKind::Location),
                WeightSpec::new(1.0, ScoreKind::Distance),
            ],
            unknown_terms: UnknownTermPolicy::default(),
            max_match_rows: DEFAULT_MAX_MATCH_ROWS,
        }
    }
}

impl SearchConfig {
    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| SearchError::InvalidConfig(format!("{}: {e}", path.display())))?;
        let config: SearchConfig = serde_json::from_str(&raw)
            .map_err(|e| SearchError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Regex::new(&self.word_split)
            .map_err(|e| SearchError::InvalidConfig(format!("word_split: {e}")))?;
        if self.weights.is_empty() {
            return Err(SearchError::InvalidConfig("weights must not be empty".into()));
        }
        if let Some(w) = self.weights.iter().find(|w| !w.weight.is_finite()) {
            return Err(SearchError::InvalidConfig(format!(
                "weight for {:?} is not finite",
                w.score
            )));
        }
        Ok(())
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SearchConfig::default();
        config.validate().unwrap();
        assert_eq!(config.stop_words.len(), 8);
        assert!(config.is_stop_word("the"));
        assert!(!config.is_stop_word("test"));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SearchConfig = serde_json::from_str(
            r#"{"stemmer": "none", "unknown_terms": "require_all",
                "weights": [{"weight": 2.0, "score": "frequency"}]}"#,
        )
        .unwrap();
        assert_eq!(config.stemmer, StemmerConfig::None);
        assert_eq!(config.unknown_terms, UnknownTermPolicy::RequireAll);
        assert_eq!(config.weights, vec![WeightSpec::new(2.0, ScoreKind::Frequency)]);
        assert_eq!(config.word_split, DEFAULT_WORD_SPLIT);
        assert_eq!(config.max_match_rows, DEFAULT_MAX_MATCH_ROWS);
    }

    #[test]
    fn snowball_language_parses() {
        let config: SearchConfig = serde_json::from_str(r#"{"stemmer": {"snowball": "german"}}"#).unwrap();
        assert_eq!(config.stemmer, StemmerConfig::Snowball(Language::German));
    }

    #[test]
    fn rejects_bad_regex_and_empty_weights() {
        let mut config = SearchConfig { word_split: "(".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(SearchError::InvalidConfig(_))));
        config.word_split = DEFAULT_WORD_SPLIT.into();
        config.weights.clear();
        assert!(matches!(config.validate(), Err(SearchError::InvalidConfig(_))));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("search.json");
        fs::write(&path, r#"{"stop_words": ["foo"]}"#).unwrap();
        let config = SearchConfig::from_path(&path).unwrap();
        assert!(config.is_stop_word("foo"));
        assert!(!config.is_stop_word("the"));
    }
}
