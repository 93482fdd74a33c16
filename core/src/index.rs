use crate::config::SearchConfig;
use crate::document::Document;
use crate::error::{Result, SearchError};
use crate::matcher::{self, MatchSet};
use crate::ranking::{rank, Query, SearchHit, Weighted};
use crate::scoring::Scorer;
use crate::store::{IndexStore, Posting};
use crate::tokenizer::Tokenizer;
use crate::{DocId, Position, TermId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

const WRITE_STRIPES: usize = 64;

/// Full-text index over one namespace of a store.
///
/// Writes to the same document through one `SearchIndex` are serialized;
/// searches never block.
pub struct SearchIndex<S: IndexStore> {
    store: S,
    namespace: String,
    config: SearchConfig,
    tokenizer: Tokenizer,
    weights: Vec<Weighted>,
    write_locks: Box<[Mutex<()>]>,
}

impl<S: IndexStore> SearchIndex<S> {
    pub fn new(store: S, namespace: impl Into<String>, config: SearchConfig) -> Result<Self> {
        let namespace = namespace.into();
        if namespace.contains('\0') {
            return Err(SearchError::InvalidNamespace(namespace));
        }
        config.validate()?;
        let tokenizer = Tokenizer::from_config(&config)?;
        let weights = config
            .weights
            .iter()
            .map(|w| Weighted::new(w.weight, Arc::new(w.score)))
            .collect();
        Ok(Self {
            store,
            namespace,
            config,
            tokenizer,
            weights,
            write_locks: (0..WRITE_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    /// Replace the configured weight table with caller-supplied scorers.
    pub fn with_scorers(mut self, weights: Vec<(f64, Arc<dyn Scorer>)>) -> Result<Self> {
        if weights.is_empty() {
            return Err(SearchError::InvalidConfig("weights must not be empty".into()));
        }
        self.weights = weights.into_iter().map(|(w, s)| Weighted::new(w, s)).collect();
        Ok(self)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn write_lock(&self, document_id: DocId) -> &Mutex<()> {
        &self.write_locks[(document_id % WRITE_STRIPES as u64) as usize]
    }

    /// (Re)index a document, replacing whatever was indexed for it before.
    /// Returns the number of postings written.
    pub fn index<D: Document + ?Sized>(&self, doc: &D) -> Result<usize> {
        let document_id = doc.id();
        let source = doc
            .text_source()
            .ok_or(SearchError::UnsupportedDocument { document_id })?;

        let _guard = self.write_lock(document_id).lock();
        if self.store.has_postings(document_id, &self.namespace)? {
            self.remove_postings(document_id)?;
        }

        let tokens = self.tokenizer.tokenize(&source.extract_text());
        let mut term_ids: HashMap<&str, TermId> = HashMap::new();
        let mut postings = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            if self.config.is_stop_word(token) {
                continue;
            }
            let term_id = match term_ids.get(token.as_str()) {
                Some(&id) => id,
                None => {
                    let id = self.store.find_or_create_term(token, &self.namespace)?;
                    term_ids.insert(token, id);
                    id
                }
            };
            postings.push(Posting { term_id, document_id, position: position_of(document_id, i)? });
        }
        self.store.insert_postings(&self.namespace, &postings)?;

        tracing::debug!(
            namespace = self.namespace.as_str(),
            document_id,
            tokens = tokens.len(),
            postings = postings.len(),
            "indexed document"
        );
        Ok(postings.len())
    }

    /// Drop every posting of `document_id`. Returns how many were removed.
    pub fn remove(&self, document_id: DocId) -> Result<usize> {
        let _guard = self.write_lock(document_id).lock();
        self.remove_postings(document_id)
    }

    fn remove_postings(&self, document_id: DocId) -> Result<usize> {
        let removed = self.store.delete_postings(document_id, &self.namespace)?;
        tracing::debug!(namespace = self.namespace.as_str(), document_id, removed, "removed document");
        Ok(removed)
    }

    pub fn is_indexed<D: Document + ?Sized>(&self, doc: &D) -> Result<bool> {
        self.contains(doc.id())
    }

    pub fn contains(&self, document_id: DocId) -> Result<bool> {
        Ok(self.store.has_postings(document_id, &self.namespace)?)
    }

    /// Lowercase and stem the query words.
    pub fn query_terms(&self, query: Query) -> Vec<String> {
        match query {
            Query::Text(text) => self.tokenizer.tokenize(&text),
            Query::Terms(terms) => terms
                .iter()
                .filter(|t| !t.is_empty())
                .map(|t| self.tokenizer.normalize(t))
                .collect(),
        }
    }

    /// The raw join rows for a query, before any scoring.
    pub fn match_query(&self, query: impl Into<Query>) -> Result<MatchSet> {
        let terms = self.query_terms(query.into());
        matcher::match_terms(&self.store, &self.namespace, &self.config, &terms)
    }

    /// Documents containing every known query word, best first.
    pub fn search(&self, query: impl Into<Query>) -> Result<Vec<SearchHit>> {
        let matched = self.match_query(query)?;
        Ok(rank(&self.weights, &matched.rows))
    }

    /// Search with an untyped query; anything but a string or a list of
    /// strings is an `InvalidQuery`.
    pub fn search_value(&self, query: serde_json::Value) -> Result<Vec<SearchHit>> {
        self.search(Query::try_from(query)?)
    }
}

fn position_of(document_id: DocId, index: usize) -> Result<Position> {
    Position::try_from(index).map_err(|_| SearchError::DocumentTooLong { document_id })
}
