//! Storage traits and error types
//!
//! This module defines the trait interface for graph store backends and
//! associated error types.

use crate::storage::{
    CrawlStats, CrawlStatus, DocumentNode, LinkRecord, NewNode, NodeSummary, SearchHit, TreeNode,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Ancestor resolution did not reach a root; the stored tree is corrupt
    #[error("Graph integrity violated at node {id}: {reason}")]
    GraphIntegrity { id: i64, reason: String },

    #[error("Unknown node status in store: {0}")]
    InvalidStatus(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for graph store implementations
///
/// Mutating methods take `&mut self`, so a store has a single writer at a
/// time. Queries on ids that do not exist return empty results rather than
/// errors; only [`GraphStore::get_path_to_root`] reports corruption.
pub trait GraphStore {
    // ===== Mutation =====

    /// Inserts or refreshes a document keyed by its canonical address
    ///
    /// On revisit, title, body, identity key, status and visit time are
    /// overwritten. Depth and parent are kept from the first visit. The
    /// lexical index entry is refreshed in the same transaction.
    ///
    /// # Returns
    ///
    /// The surrogate id of the node
    fn upsert_node(&mut self, node: &NewNode<'_>) -> StorageResult<i64>;

    /// Records a link between two documents
    ///
    /// A duplicate `(from_id, to_id)` pair is a no-op and keeps the first
    /// observed link text.
    ///
    /// # Returns
    ///
    /// `true` if a new edge was stored
    fn insert_edge(&mut self, from_id: i64, to_id: i64, link_text: &str) -> StorageResult<bool>;

    // ===== Tree Navigation =====

    /// Gets the tree parent of a node
    fn get_parent(&self, id: i64) -> StorageResult<Option<NodeSummary>>;

    /// Gets the tree children of a node, ordered by title
    fn get_children(&self, id: i64) -> StorageResult<Vec<NodeSummary>>;

    /// Gets the nodes sharing this node's parent, excluding itself, ordered by title
    fn get_siblings(&self, id: i64) -> StorageResult<Vec<NodeSummary>>;

    /// Gets the ancestor chain of a node, root first and ending at the node
    ///
    /// Fails with [`StorageError::GraphIntegrity`] when the chain loops or
    /// does not terminate within a fixed bound.
    fn get_path_to_root(&self, id: i64) -> StorageResult<Vec<NodeSummary>>;

    // ===== Links =====

    /// Gets all outgoing links of a node, ordered by destination title
    fn get_outgoing_links(&self, id: i64) -> StorageResult<Vec<LinkRecord>>;

    // ===== Lookup & Search =====

    /// Gets a full node record
    fn get_node(&self, id: i64) -> StorageResult<Option<DocumentNode>>;

    /// Finds the id of the node carrying an identity key
    fn find_id_by_identity_key(&self, identity_key: &str) -> StorageResult<Option<i64>>;

    /// Case-insensitive substring match on titles
    fn find_nodes_by_title(&self, substring: &str, limit: usize)
        -> StorageResult<Vec<NodeSummary>>;

    /// Ranked full-text search with highlighted snippets
    ///
    /// Tries a disjunctive query first, then a conjunctive one, then a title
    /// substring match when the index rejects the query.
    fn lexical_search(&self, query: &str, limit: usize) -> StorageResult<Vec<SearchHit>>;

    /// Gets the stored body of a node, or an empty string
    fn get_full_content(&self, id: i64) -> StorageResult<String>;

    // ===== Reporting =====

    /// Gets page, edge and depth totals
    fn get_stats(&self) -> StorageResult<CrawlStats>;

    /// Gets detailed crawl progress
    fn get_crawl_status(&self) -> StorageResult<CrawlStatus>;

    /// Gets the hierarchy outline down to `max_depth` levels below the roots
    fn get_tree(&self, max_depth: u32) -> StorageResult<Vec<TreeNode>>;
}
