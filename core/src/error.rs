use crate::DocId;
use thiserror::Error;

/// Failures raised by a storage backend. The engine never retries these.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("corrupt index record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    /// The document has no text-extraction capability.
    #[error("document {document_id} does not expose any text to index")]
    UnsupportedDocument { document_id: DocId },
    /// The query was neither text nor a list of terms.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Namespaces become key prefixes and may not contain NUL.
    #[error("invalid namespace {0:?}")]
    InvalidNamespace(String),
    #[error("document {document_id} has more tokens than positions can address")]
    DocumentTooLong { document_id: DocId },
    /// The query would expand into more match rows than `max_match_rows`.
    #[error("query matches {rows} position combinations, the limit is {limit}")]
    QueryTooBroad { rows: u64, limit: u64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SearchError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SearchError::UnsupportedDocument { .. }
                | SearchError::InvalidQuery(_)
                | SearchError::InvalidNamespace(_)
                | SearchError::DocumentTooLong { .. }
                | SearchError::QueryTooBroad { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
