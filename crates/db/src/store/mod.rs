//! The document store contract and its implementations.
//!
//! The store offers atomicity for a single document only. Every successful
//! write returns a new revision token; writes to an existing document must
//! present the current token or fail with [`StoreError::Conflict`]. There
//! are no multi-document transactions. Cross-document rules are enforced by
//! the callers.

use std::future::Future;

use serde_json::Value;

use crate::indexes::WikiIndex;

pub mod collation;
pub mod couch;
pub mod memory;

pub use couch::CouchStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by a [`DocumentStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database, document or attachment does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The supplied revision token is stale, missing, or the target already exists.
    #[error("Document update conflict: {0}")]
    Conflict(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with an unexpected status.
    #[error("Store error ({status}): {reason}")]
    Backend {
        /// HTTP-equivalent status code.
        status: u16,
        /// Backend-supplied reason text.
        reason: String,
    },

    /// A document body could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store was configured with an unusable URL or option.
    #[error("Invalid store configuration: {0}")]
    Configuration(String),
}

// ---------------------------------------------------------------------------
// Index queries
// ---------------------------------------------------------------------------

/// How an index query aggregates its rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reduce {
    /// Return the emitted rows themselves.
    #[default]
    None,
    /// Return one row holding the number of matching rows.
    Count,
    /// Return one count per distinct key. With a level, array keys are
    /// truncated to their first `level` elements before grouping.
    Grouped { level: Option<usize> },
}

/// Parameters of a secondary-index query.
///
/// Ranges are inclusive. When `descending` is set the index is walked from
/// the highest key down, so `start_key` is the upper bound.
#[derive(Debug, Clone, Default)]
pub struct IndexQuery {
    pub key: Option<Value>,
    pub start_key: Option<Value>,
    pub end_key: Option<Value>,
    pub descending: bool,
    pub limit: Option<usize>,
    pub skip: usize,
    pub reduce: Reduce,
}

impl IndexQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match a single key exactly.
    pub fn key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn range(mut self, start: Value, end: Value) -> Self {
        self.start_key = Some(start);
        self.end_key = Some(end);
        self
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn reduce(mut self, reduce: Reduce) -> Self {
        self.reduce = reduce;
        self
    }
}

/// A single index row. Reduced rows carry no document id.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    pub id: Option<String>,
    pub key: Value,
    pub value: Value,
}

/// Result of an index query.
///
/// For unreduced queries `total_rows` is the size of the whole index, not of
/// the requested range, which is why listings count separately.
#[derive(Debug, Clone, Default)]
pub struct IndexResult {
    pub total_rows: usize,
    pub rows: Vec<IndexRow>,
}

impl IndexResult {
    /// The count carried by the first reduced row, or zero when nothing matched.
    pub fn first_count(&self) -> usize {
        self.rows
            .first()
            .and_then(|row| row.value.as_u64())
            .map(|n| n as usize)
            .unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Attachments and batch reads
// ---------------------------------------------------------------------------

/// Binary attachment content together with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentData {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// One entry of a batch read. `doc` is `None` when the id does not exist.
#[derive(Debug, Clone)]
pub struct MultiDocRow {
    pub id: String,
    pub rev: Option<String>,
    pub doc: Option<Value>,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Per-document atomic document store.
///
/// `db` names a database (one per wiki). Document bodies are JSON objects;
/// `get` returns them without the store's `_id`/`_rev` bookkeeping fields but
/// with `_attachments` metadata when the document has attachments.
pub trait DocumentStore: Send + Sync + 'static {
    /// Create or update a document. `rev` must be the current revision when
    /// the document exists and `None` when it does not.
    fn put(
        &self,
        db: &str,
        id: &str,
        doc: &Value,
        rev: Option<&str>,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Read the current revision of a document.
    fn get(
        &self,
        db: &str,
        id: &str,
    ) -> impl Future<Output = Result<(Value, String), StoreError>> + Send;

    /// Delete a document at its current revision.
    fn delete(
        &self,
        db: &str,
        id: &str,
        rev: &str,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Duplicate a document server-side under a new id.
    fn copy(
        &self,
        db: &str,
        from_id: &str,
        from_rev: &str,
        to_id: &str,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Query one of the wiki secondary indexes.
    fn query_index(
        &self,
        db: &str,
        index: WikiIndex,
        query: &IndexQuery,
    ) -> impl Future<Output = Result<IndexResult, StoreError>> + Send;

    /// Attach binary content to a document, returning the document's new revision.
    fn put_attachment(
        &self,
        db: &str,
        id: &str,
        rev: &str,
        name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Fetch an attachment, optionally pinned to a document revision.
    fn get_attachment(
        &self,
        db: &str,
        id: &str,
        rev: Option<&str>,
        name: &str,
    ) -> impl Future<Output = Result<AttachmentData, StoreError>> + Send;

    /// Remove an attachment, returning the document's new revision.
    fn delete_attachment(
        &self,
        db: &str,
        id: &str,
        rev: &str,
        name: &str,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Read several documents in one round trip, in the order requested.
    fn get_multiple(
        &self,
        db: &str,
        ids: &[String],
    ) -> impl Future<Output = Result<Vec<MultiDocRow>, StoreError>> + Send;

    /// Create an empty database.
    fn create_database(&self, db: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Drop a database and everything in it.
    fn delete_database(&self, db: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Install (or refresh) the [`WikiIndex`] definitions in a database.
    fn install_indexes(&self, db: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Remove the store's bookkeeping fields from a document body.
pub(crate) fn strip_meta(mut doc: Value) -> Value {
    if let Some(obj) = doc.as_object_mut() {
        obj.remove("_id");
        obj.remove("_rev");
    }
    doc
}
