//! Durable [`IndexStore`] on top of sled.
//!
//! Layout (all integers big-endian so byte order equals numeric order):
//! - `terms`:        `namespace \0 word` -> term id
//! - `term_records`: term id -> bincode [`Term`]
//! - `postings`:     `term_id | doc_id | position` -> ()
//! - `doc_postings`: `namespace \0 doc_id | term_id | position` -> ()

use crate::error::StoreError;
use crate::store::{IndexStore, Posting, StoreResult, Term};
use crate::{DocId, Position, TermId};
use sled::{Batch, CompareAndSwapError, Db, IVec, Tree};
use std::path::Path;

const POSTING_KEY_LEN: usize = 8 + 8 + 4;

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    terms: Tree,
    term_records: Tree,
    postings: Tree,
    doc_postings: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// A store that is deleted when dropped.
    pub fn temporary() -> StoreResult<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        Ok(Self {
            terms: db.open_tree("terms")?,
            term_records: db.open_tree("term_records")?,
            postings: db.open_tree("postings")?,
            doc_postings: db.open_tree("doc_postings")?,
            db,
        })
    }

    pub fn num_terms(&self) -> usize {
        self.term_records.len()
    }

    /// Insert `key` unless another writer got there first, in which case
    /// the winner's id is returned.
    fn claim_term(&self, key: &[u8], word: &str, namespace: &str) -> StoreResult<TermId> {
        let id = self.db.generate_id()?;
        let swap = self
            .terms
            .compare_and_swap(key, None::<&[u8]>, Some(id.to_be_bytes().to_vec()))?;
        match swap {
            Ok(()) => {
                let record = Term { word: word.to_string(), namespace: namespace.to_string() };
                self.term_records.insert(id.to_be_bytes(), bincode::serialize(&record)?)?;
                Ok(id)
            }
            // someone else created it first
            Err(CompareAndSwapError { current: Some(existing), .. }) => read_u64(&existing),
            Err(CompareAndSwapError { current: None, .. }) => Err(StoreError::Corrupt(format!(
                "term {word:?} in {namespace:?} vanished during creation"
            ))),
        }
    }
}

fn term_key(namespace: &str, word: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(namespace.len() + 1 + word.len());
    key.extend_from_slice(namespace.as_bytes());
    key.push(0);
    key.extend_from_slice(word.as_bytes());
    key
}

fn posting_key(term_id: TermId, document_id: DocId, position: Position) -> Vec<u8> {
    let mut key = Vec::with_capacity(POSTING_KEY_LEN);
    key.extend_from_slice(&term_id.to_be_bytes());
    key.extend_from_slice(&document_id.to_be_bytes());
    key.extend_from_slice(&position.to_be_bytes());
    key
}

fn doc_prefix(namespace: &str, document_id: DocId) -> Vec<u8> {
    let mut key = Vec::with_capacity(namespace.len() + 1 + POSTING_KEY_LEN);
    key.extend_from_slice(namespace.as_bytes());
    key.push(0);
    key.extend_from_slice(&document_id.to_be_bytes());
    key
}

fn doc_key(namespace: &str, p: &Posting) -> Vec<u8> {
    let mut key = doc_prefix(namespace, p.document_id);
    key.extend_from_slice(&p.term_id.to_be_bytes());
    key.extend_from_slice(&p.position.to_be_bytes());
    key
}

fn read_u64(bytes: &[u8]) -> StoreResult<u64> {
    <[u8; 8]>::try_from(bytes)
        .map(u64::from_be_bytes)
        .map_err(|_| StoreError::Corrupt(format!("expected 8 bytes, got {}", bytes.len())))
}

fn read_u32(bytes: &[u8]) -> StoreResult<u32> {
    <[u8; 4]>::try_from(bytes)
        .map(u32::from_be_bytes)
        .map_err(|_| StoreError::Corrupt(format!("expected 4 bytes, got {}", bytes.len())))
}

impl IndexStore for SledStore {
    fn find_term(&self, word: &str, namespace: &str) -> StoreResult<Option<TermId>> {
        self.terms
            .get(term_key(namespace, word))?
            .map(|v| read_u64(&v))
            .transpose()
    }

    fn find_or_create_term(&self, word: &str, namespace: &str) -> StoreResult<TermId> {
        let key = term_key(namespace, word);
        if let Some(v) = self.terms.get(&key)? {
            return read_u64(&v);
        }
        self.claim_term(&key, word, namespace)
    }

    fn term(&self, term_id: TermId) -> StoreResult<Option<Term>> {
        match self.term_records.get(term_id.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    fn insert_postings(&self, namespace: &str, postings: &[Posting]) -> StoreResult<()> {
        let mut by_term = Batch::default();
        let mut by_doc = Batch::default();
        for p in postings {
            by_term.insert(posting_key(p.term_id, p.document_id, p.position), IVec::default());
            by_doc.insert(doc_key(namespace, p), IVec::default());
        }
        self.postings.apply_batch(by_term)?;
        self.doc_postings.apply_batch(by_doc)?;
        Ok(())
    }

    fn delete_postings(&self, document_id: DocId, namespace: &str) -> StoreResult<usize> {
        let prefix = doc_prefix(namespace, document_id);
        let mut by_term = Batch::default();
        let mut by_doc = Batch::default();
        let mut removed = 0;
        for entry in self.doc_postings.scan_prefix(&prefix) {
            let (key, _) = entry?;
            let suffix = &key[prefix.len()..];
            if suffix.len() != 12 {
                return Err(StoreError::Corrupt(format!("doc posting key of {} bytes", key.len())));
            }
            let term_id = read_u64(&suffix[..8])?;
            let position = read_u32(&suffix[8..])?;
            by_term.remove(posting_key(term_id, document_id, position));
            by_doc.remove(key);
            removed += 1;
        }
        self.postings.apply_batch(by_term)?;
        self.doc_postings.apply_batch(by_doc)?;
        Ok(removed)
    }

    fn has_postings(&self, document_id: DocId, namespace: &str) -> StoreResult<bool> {
        let first = self.doc_postings.scan_prefix(doc_prefix(namespace, document_id)).next();
        Ok(first.transpose()?.is_some())
    }

    fn postings_for_term(&self, term_id: TermId) -> StoreResult<Vec<Posting>> {
        let mut out = Vec::new();
        for entry in self.postings.scan_prefix(term_id.to_be_bytes()) {
            let (key, _) = entry?;
            if key.len() != POSTING_KEY_LEN {
                return Err(StoreError::Corrupt(format!("posting key of {} bytes", key.len())));
            }
            out.push(Posting {
                term_id,
                document_id: read_u64(&key[8..16])?,
                position: read_u32(&key[16..])?,
            });
        }
        Ok(out)
    }

    fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
