pub mod firebase;

pub use firebase::FirebaseRtdb;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("document store returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("malformed document at {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Path-addressed hierarchical document store.
///
/// The store is the sole arbiter of consistency: writes to a single path are
/// atomic, but there are no transactions across paths. Callers that perform
/// multi-path sequences accept that a crash in between leaves partial state.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read. `None` when nothing exists at the path.
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replaces the value at the path. Writing `null` removes the node.
    async fn write(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Merges the given top-level fields into the node at the path.
    async fn update(&self, path: &str, fields: Value) -> Result<(), StoreError>;

    /// Appends a child under the parent path and returns its generated id.
    /// Generated ids sort chronologically within a parent.
    async fn push(&self, parent_path: &str, value: Value) -> Result<String, StoreError>;

    /// Returns the children of `path` whose `field` equals `value`, keyed by
    /// child id. With a limit, only the newest `limit` matches (by id order)
    /// are returned.
    async fn query_children_equal(
        &self,
        path: &str,
        field: &str,
        value: Value,
        limit: Option<usize>,
    ) -> Result<BTreeMap<String, Value>, StoreError>;
}
