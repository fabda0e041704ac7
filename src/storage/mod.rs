//! Storage module for the document graph
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Document node upserts with write-once parent and depth
//! - Link edge recording
//! - Tree navigation, lexical search and crawl statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteGraphStore;
pub use traits::{GraphStore, StorageError, StorageResult};

use crate::state::NodeStatus;

/// Input to [`GraphStore::upsert_node`]
#[derive(Debug, Clone, Copy)]
pub struct NewNode<'a> {
    /// Canonical address, the upsert key
    pub address: &'a str,
    pub identity_key: Option<&'a str>,
    pub title: &'a str,
    pub body: &'a str,
    /// BFS distance from the root; ignored when the node already exists
    pub depth: u32,
    /// Discovering parent; ignored when the node already has one
    pub parent_id: Option<i64>,
    pub status: NodeStatus,
}

/// A stored document with its full body
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    pub id: i64,
    pub address: String,
    pub identity_key: Option<String>,
    pub title: String,
    pub body: String,
    pub depth: u32,
    pub parent_id: Option<i64>,
    pub status: NodeStatus,
    pub visited_at: String,
}

/// A stored document without its body
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSummary {
    pub id: i64,
    pub address: String,
    pub title: String,
    pub depth: u32,
    pub parent_id: Option<i64>,
    pub status: NodeStatus,
}

/// An outgoing link joined to its destination document
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub to_id: i64,
    pub title: String,
    pub address: String,
    pub link_text: String,
}

/// One ranked lexical search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: i64,
    pub title: String,
    pub address: String,
    pub depth: u32,
    /// Highlighted excerpt with `<b>`/`</b>` match markers and `...` ellipses.
    /// Empty when the hit came from the title fallback.
    pub snippet: String,
}

/// Totals over the whole store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrawlStats {
    pub pages: u64,
    pub edges: u64,
    pub max_depth: u32,
}

/// Detailed crawl progress
#[derive(Debug, Clone, Default)]
pub struct CrawlStatus {
    pub total_pages: u64,
    pub total_edges: u64,
    /// Node count per depth, ascending by depth
    pub by_depth: Vec<(u32, u64)>,
    pub errors: u64,
    /// Most recently visited documents, newest first
    pub recent: Vec<NodeSummary>,
}

/// A document in the hierarchy outline
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: i64,
    pub title: String,
    pub address: String,
    pub depth: u32,
    pub children: Vec<TreeNode>,
}
