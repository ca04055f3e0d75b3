use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod document;
pub use document::*;

mod path;
pub use path::*;

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type ArcedStore = Arc<dyn DocumentStore>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached, or did not answer in time
    #[error("Store is unavailable: {0}")]
    Unavailable(String),
    /// A document read by the transaction changed before the transaction committed
    #[error("Transaction conflicted with a concurrent write")]
    Conflict,
    #[error("Invalid document path: {0}")]
    InvalidPath(String),
    /// A document could not be converted to or from its record type
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    /// An unknown or internal error happened within the store
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Represents a store of JSON documents addressable by path.
///
/// All writes go through a [Transaction]. Stores guarantee at least snapshot isolation
/// between the reads of a transaction and its commit: if any document the transaction
/// read (or found missing) was written by someone else before the commit,
/// the commit fails with [StoreError::Conflict] and nothing is applied.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Begins a new transaction.
    /// Dropping the transaction without committing discards everything buffered in it.
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;

    /// Reads a single document outside of any transaction.
    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>>;
}

/// An atomic read-modify-write unit against a [DocumentStore].
#[async_trait]
pub trait Transaction: Send {
    /// Reads a document and adds it to the read set validated on commit.
    /// Reads observe committed state, not writes buffered in this transaction.
    async fn get(&mut self, path: &DocumentPath) -> StoreResult<Option<Document>>;

    /// Buffers a write that replaces the document at `path` on commit.
    fn set(&mut self, path: DocumentPath, document: Document);

    /// Buffers a deletion of the document at `path`.
    fn delete(&mut self, path: DocumentPath);

    /// Applies every buffered write or none of them.
    /// Returns the commit timestamp, which is also the value of every server timestamp written.
    async fn commit(self: Box<Self>) -> StoreResult<DateTime<Utc>>;
}
