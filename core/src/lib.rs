//! In-store full-text search.
//!
//! Text is split, lowercased and stemmed by the [`Tokenizer`]; every
//! non-stop-word token becomes a positional [`Posting`] in an [`IndexStore`].
//! A query matches documents that contain all of its known words, and the
//! match rows are ranked by a weighted sum of normalized frequency, location
//! and distance scores.
//!
//! ```no_run
//! use ftsearch::{MemoryStore, SearchConfig, SearchIndex, TextDocument};
//!
//! let index = SearchIndex::new(MemoryStore::new(), "articles", SearchConfig::default())?;
//! index.index(&TextDocument::new(1, "Rust", "Fearless concurrency in practice"))?;
//! for hit in index.search("concurrent rust")? {
//!     println!("{} {:.3}", hit.document_id, hit.score);
//! }
//! # Ok::<(), ftsearch::SearchError>(())
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod matcher;
pub mod persist;
pub mod ranking;
pub mod scoring;
pub mod store;
pub mod tokenizer;

pub type DocId = u64;
pub type TermId = u64;
pub type Position = u32;

pub use config::{SearchConfig, StemmerConfig, UnknownTermPolicy, WeightSpec};
pub use document::{Document, RecordDocument, TextDocument, TextExtractable};
pub use error::{Result, SearchError, StoreError};
pub use index::SearchIndex;
pub use matcher::{MatchRow, MatchSet};
pub use persist::SledStore;
pub use ranking::{Query, SearchHit, Weighted};
pub use scoring::{normalize_scores, ScoreKind, Scorer};
pub use store::{IndexStore, MemoryStore, Posting, Term};
pub use tokenizer::{NoStem, Stem, Tokenizer};
