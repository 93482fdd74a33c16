//! Storage collaborator for the inverted index.
//!
//! The engine only needs a handful of operations over two record kinds:
//! [`Term`] rows, unique on `(word, namespace)`, and [`Posting`] rows, one per
//! occurrence of a term in a document. [`MemoryStore`] keeps them in process;
//! [`crate::persist::SledStore`] keeps them on disk.

use crate::error::StoreError;
use crate::{DocId, Position, TermId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub word: String,
    pub namespace: String,
}

/// One occurrence of a term at a token position within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Posting {
    pub term_id: TermId,
    pub document_id: DocId,
    pub position: Position,
}

pub trait IndexStore: Send + Sync {
    fn find_term(&self, word: &str, namespace: &str) -> StoreResult<Option<TermId>>;

    /// Returns the existing term id or creates one. Never creates a duplicate
    /// `(word, namespace)` row.
    fn find_or_create_term(&self, word: &str, namespace: &str) -> StoreResult<TermId>;

    fn term(&self, term_id: TermId) -> StoreResult<Option<Term>>;

    fn insert_postings(&self, namespace: &str, postings: &[Posting]) -> StoreResult<()>;

    /// Deletes every posting of `document_id` in `namespace`, returning how many went.
    fn delete_postings(&self, document_id: DocId, namespace: &str) -> StoreResult<usize>;

    fn has_postings(&self, document_id: DocId, namespace: &str) -> StoreResult<bool>;

    /// All postings of a term, sorted by `(document_id, position)`.
    fn postings_for_term(&self, term_id: TermId) -> StoreResult<Vec<Posting>>;

    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MemoryInner {
    next_term_id: TermId,
    terms: BTreeMap<(String, String), TermId>,
    term_records: BTreeMap<TermId, Term>,
    postings: BTreeMap<TermId, BTreeSet<(DocId, Position)>>,
    doc_postings: BTreeMap<(String, DocId), BTreeSet<(TermId, Position)>>,
}

/// In-process store. Clones share the same underlying index.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_terms(&self) -> usize {
        self.inner.read().term_records.len()
    }

    pub fn num_postings(&self) -> usize {
        self.inner.read().postings.values().map(BTreeSet::len).sum()
    }
}

impl IndexStore for MemoryStore {
    fn find_term(&self, word: &str, namespace: &str) -> StoreResult<Option<TermId>> {
        let inner = self.inner.read();
        Ok(inner.terms.get(&(namespace.to_string(), word.to_string())).copied())
    }

    fn find_or_create_term(&self, word: &str, namespace: &str) -> StoreResult<TermId> {
        let mut inner = self.inner.write();
        let key = (namespace.to_string(), word.to_string());
        if let Some(&id) = inner.terms.get(&key) {
            return Ok(id);
        }
        let id = inner.next_term_id;
        inner.next_term_id += 1;
        inner.terms.insert(key, id);
        inner
            .term_records
            .insert(id, Term { word: word.to_string(), namespace: namespace.to_string() });
        Ok(id)
    }

    fn term(&self, term_id: TermId) -> StoreResult<Option<Term>> {
        Ok(self.inner.read().term_records.get(&term_id).cloned())
    }

    fn insert_postings(&self, namespace: &str, postings: &[Posting]) -> StoreResult<()> {
        let mut inner = self.inner.write();
        for p in postings {
            inner.postings.entry(p.term_id).or_default().insert((p.document_id, p.position));
            inner
                .doc_postings
                .entry((namespace.to_string(), p.document_id))
                .or_default()
                .insert((p.term_id, p.position));
        }
        Ok(())
    }

    fn delete_postings(&self, document_id: DocId, namespace: &str) -> StoreResult<usize> {
        let mut inner = self.inner.write();
        let Some(entries) = inner.doc_postings.remove(&(namespace.to_string(), document_id)) else {
            return Ok(0);
        };
        for (term_id, position) in &entries {
            if let Some(list) = inner.postings.get_mut(term_id) {
                list.remove(&(document_id, *position));
            }
        }
        Ok(entries.len())
    }

    fn has_postings(&self, document_id: DocId, namespace: &str) -> StoreResult<bool> {
        let inner = self.inner.read();
        Ok(inner
            .doc_postings
            .get(&(namespace.to_string(), document_id))
            .is_some_and(|set| !set.is_empty()))
    }

    fn postings_for_term(&self, term_id: TermId) -> StoreResult<Vec<Posting>> {
        let inner = self.inner.read();
        Ok(inner
            .postings
            .get(&term_id)
            .map(|set| {
                set.iter()
                    .map(|&(document_id, position)| Posting { term_id, document_id, position })
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_are_deduplicated_per_namespace() {
        let store = MemoryStore::new();
        let a = store.find_or_create_term("test", "books").unwrap();
        let b = store.find_or_create_term("test", "books").unwrap();
        let c = store.find_or_create_term("test", "films").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.num_terms(), 2);
        assert_eq!(store.find_term("test", "films").unwrap(), Some(c));
        assert_eq!(store.find_term("nope", "films").unwrap(), None);
        assert_eq!(store.term(c).unwrap().unwrap().namespace, "films");
    }

    #[test]
    fn delete_is_scoped_to_namespace() {
        let store = MemoryStore::new();
        let books = store.find_or_create_term("rust", "books").unwrap();
        let films = store.find_or_create_term("rust", "films").unwrap();
        store
            .insert_postings("books", &[Posting { term_id: books, document_id: 1, position: 0 }])
            .unwrap();
        store
            .insert_postings("films", &[Posting { term_id: films, document_id: 1, position: 4 }])
            .unwrap();

        assert_eq!(store.delete_postings(1, "books").unwrap(), 1);
        assert!(!store.has_postings(1, "books").unwrap());
        assert!(store.has_postings(1, "films").unwrap());
        assert!(store.postings_for_term(books).unwrap().is_empty());
        assert_eq!(store.postings_for_term(films).unwrap().len(), 1);
        assert_eq!(store.delete_postings(1, "books").unwrap(), 0);
    }

    #[test]
    fn postings_come_back_sorted_by_document() {
        let store = MemoryStore::new();
        let t = store.find_or_create_term("x", "ns").unwrap();
        let rows = [(9, 2), (3, 7), (3, 1), (5, 0)];
        let postings: Vec<Posting> = rows
            .iter()
            .map(|&(document_id, position)| Posting { term_id: t, document_id, position })
            .collect();
        store.insert_postings("ns", &postings).unwrap();
        let got: Vec<(DocId, Position)> = store
            .postings_for_term(t)
            .unwrap()
            .into_iter()
            .map(|p| (p.document_id, p.position))
            .collect();
        assert_eq!(got, vec![(3, 1), (3, 7), (5, 0), (9, 2)]);
    }
}
