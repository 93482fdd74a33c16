use ftsearch::{SearchConfig, Tokenizer};

#[test]
fn it_normalizes_and_stems() {
    let tokenizer = Tokenizer::from_config(&SearchConfig::default()).unwrap();
    let words = tokenizer.tokenize("Running Runners RUN! The café's menu.");
    assert!(words.contains(&"run".to_string()));
    assert!(words.contains(&"runner".to_string()));
    assert!(words.contains(&"menu".to_string()));
}

#[test]
fn it_keeps_stopwords_in_place() {
    let tokenizer = Tokenizer::from_config(&SearchConfig::default()).unwrap();
    let words = tokenizer.tokenize("The quick brown fox and the lazy dog");
    assert_eq!(words.len(), 8);
    assert_eq!(words[0], "the");
    assert_eq!(words[4], "and");
}
