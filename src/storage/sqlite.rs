//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the GraphStore trait,
//! using an FTS5 external-content table for lexical search.

use crate::state::NodeStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{GraphStore, StorageError, StorageResult};
use crate::storage::{
    CrawlStats, CrawlStatus, DocumentNode, LinkRecord, NewNode, NodeSummary, SearchHit, TreeNode,
};
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Upper bound on ancestor hops before a chain is declared corrupt
const MAX_ANCESTRY: usize = 10_000;

/// Columns read into a [`NodeSummary`], in order
const SUMMARY_COLUMNS: &str = "id, url, title, depth, parent_id, status";

/// Words that carry no signal for lexical search
const STOP_WORDS: &[&str] = &[
    "what", "does", "do", "did", "is", "are", "was", "were", "the", "a", "an", "and", "or", "in",
    "on", "at", "to", "of", "for", "with", "by", "from", "that", "this", "it", "be", "have", "has",
    "say", "says", "about", "tell", "me", "us", "how", "why", "when", "where", "which", "who",
    "can", "carb",
];

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// A lexical query the full-text index rejected or failed to run
#[derive(Debug, Error)]
#[error("lexical query '{query}' failed: {source}")]
struct SearchQueryError {
    query: String,
    #[source]
    source: rusqlite::Error,
}

/// SQLite graph store
pub struct SqliteGraphStore {
    conn: Connection,
}

impl SqliteGraphStore {
    /// Opens or creates a store at the given path
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory store
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Closes the underlying connection, flushing pending writes
    pub fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, e)| StorageError::Sqlite(e))
    }

    fn summaries(&self, sql: &str, params: &[&dyn ToSql]) -> StorageResult<Vec<NodeSummary>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn summary(&self, id: i64) -> StorageResult<Option<NodeSummary>> {
        let sql = format!("SELECT {} FROM nodes WHERE id = ?1", SUMMARY_COLUMNS);
        let summary = self
            .conn
            .query_row(&sql, params![id], summary_from_row)
            .optional()?;
        Ok(summary)
    }

    fn fts_match(&self, expression: &str, limit: usize) -> Result<Vec<SearchHit>, SearchQueryError> {
        let run = || -> rusqlite::Result<Vec<SearchHit>> {
            let mut stmt = self.conn.prepare(
                "SELECT n.id, n.title, n.url, n.depth,
                        snippet(nodes_fts, 1, '<b>', '</b>', '...', 32)
                 FROM nodes_fts
                 JOIN nodes n ON n.id = nodes_fts.rowid
                 WHERE nodes_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
            )?;
            let hits = stmt
                .query_map(params![expression, limit as i64], |row| {
                    Ok(SearchHit {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        address: row.get(2)?,
                        depth: row.get(3)?,
                        snippet: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(hits)
        };

        run().map_err(|source| SearchQueryError {
            query: expression.to_string(),
            source,
        })
    }

    fn tree_level(&self, parent_id: Option<i64>) -> StorageResult<Vec<TreeNode>> {
        let map = |row: &Row<'_>| -> rusqlite::Result<TreeNode> {
            Ok(TreeNode {
                id: row.get(0)?,
                title: row.get(1)?,
                address: row.get(2)?,
                depth: row.get(3)?,
                children: Vec::new(),
            })
        };

        let nodes = match parent_id {
            Some(parent_id) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, title, url, depth FROM nodes
                     WHERE parent_id = ?1 ORDER BY title COLLATE NOCASE, id",
                )?;
                let rows = stmt
                    .query_map(params![parent_id], map)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, title, url, depth FROM nodes
                     WHERE parent_id IS NULL ORDER BY title COLLATE NOCASE, id",
                )?;
                let rows = stmt
                    .query_map([], map)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(nodes)
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl GraphStore for SqliteGraphStore {
    // ===== Mutation =====

    fn upsert_node(&mut self, node: &NewNode<'_>) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let tx = self.conn.transaction()?;

        // Depth is never updated; parent only fills a missing value and the
        // root (depth 0) never acquires one.
        let id: i64 = tx.query_row(
            "INSERT INTO nodes (url, identity_key, title, body, depth, parent_id, status, visited_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(url) DO UPDATE SET
                 identity_key = excluded.identity_key,
                 title = excluded.title,
                 body = excluded.body,
                 parent_id = COALESCE(
                     nodes.parent_id,
                     CASE WHEN nodes.depth = 0 OR excluded.parent_id = nodes.id
                          THEN NULL
                          ELSE excluded.parent_id
                     END
                 ),
                 status = excluded.status,
                 visited_at = excluded.visited_at
             RETURNING id",
            params![
                node.address,
                node.identity_key,
                node.title,
                node.body,
                node.depth,
                node.parent_id,
                node.status,
                now,
            ],
            |row| row.get(0),
        )?;

        tx.commit()?;
        Ok(id)
    }

    fn insert_edge(&mut self, from_id: i64, to_id: i64, link_text: &str) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO edges (from_id, to_id, link_text) VALUES (?1, ?2, ?3)",
            params![from_id, to_id, link_text],
        )?;
        Ok(inserted > 0)
    }

    // ===== Tree Navigation =====

    fn get_parent(&self, id: i64) -> StorageResult<Option<NodeSummary>> {
        let sql = format!(
            "SELECT {} FROM nodes WHERE id = (SELECT parent_id FROM nodes WHERE id = ?1)",
            SUMMARY_COLUMNS
        );
        let parent = self
            .conn
            .query_row(&sql, params![id], summary_from_row)
            .optional()?;
        Ok(parent)
    }

    fn get_children(&self, id: i64) -> StorageResult<Vec<NodeSummary>> {
        let sql = format!(
            "SELECT {} FROM nodes WHERE parent_id = ?1 ORDER BY title COLLATE NOCASE, id",
            SUMMARY_COLUMNS
        );
        self.summaries(&sql, params![id])
    }

    fn get_siblings(&self, id: i64) -> StorageResult<Vec<NodeSummary>> {
        let sql = format!(
            "SELECT {} FROM nodes
             WHERE parent_id = (SELECT parent_id FROM nodes WHERE id = ?1)
               AND id != ?1
             ORDER BY title COLLATE NOCASE, id",
            SUMMARY_COLUMNS
        );
        self.summaries(&sql, params![id])
    }

    fn get_path_to_root(&self, id: i64) -> StorageResult<Vec<NodeSummary>> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(id);

        while let Some(node_id) = current {
            if path.len() >= MAX_ANCESTRY {
                return Err(StorageError::GraphIntegrity {
                    id,
                    reason: format!("no root within {} ancestors", MAX_ANCESTRY),
                });
            }
            if !seen.insert(node_id) {
                return Err(StorageError::GraphIntegrity {
                    id,
                    reason: format!("parent chain revisits node {}", node_id),
                });
            }

            match self.summary(node_id)? {
                Some(summary) => {
                    current = summary.parent_id;
                    path.push(summary);
                }
                None if path.is_empty() => return Ok(Vec::new()),
                None => {
                    return Err(StorageError::GraphIntegrity {
                        id,
                        reason: format!("parent {} does not exist", node_id),
                    })
                }
            }
        }

        path.reverse();
        Ok(path)
    }

    // ===== Links =====

    fn get_outgoing_links(&self, id: i64) -> StorageResult<Vec<LinkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT n.id, n.title, n.url, e.link_text
             FROM edges e
             JOIN nodes n ON n.id = e.to_id
             WHERE e.from_id = ?1
             ORDER BY n.title COLLATE NOCASE, n.id",
        )?;

        let links = stmt
            .query_map(params![id], |row| {
                Ok(LinkRecord {
                    to_id: row.get(0)?,
                    title: row.get(1)?,
                    address: row.get(2)?,
                    link_text: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(links)
    }

    // ===== Lookup & Search =====

    fn get_node(&self, id: i64) -> StorageResult<Option<DocumentNode>> {
        let node = self
            .conn
            .query_row(
                "SELECT id, url, identity_key, title, body, depth, parent_id, status, visited_at
                 FROM nodes WHERE id = ?1",
                params![id],
                |row| {
                    Ok(DocumentNode {
                        id: row.get(0)?,
                        address: row.get(1)?,
                        identity_key: row.get(2)?,
                        title: row.get(3)?,
                        body: row.get(4)?,
                        depth: row.get(5)?,
                        parent_id: row.get(6)?,
                        status: row.get(7)?,
                        visited_at: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(node)
    }

    fn find_id_by_identity_key(&self, identity_key: &str) -> StorageResult<Option<i64>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM nodes WHERE identity_key = ?1 ORDER BY id LIMIT 1",
                params![identity_key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn find_nodes_by_title(
        &self,
        substring: &str,
        limit: usize,
    ) -> StorageResult<Vec<NodeSummary>> {
        let pattern = format!("%{}%", escape_like(substring));
        let limit = limit as i64;
        let sql = format!(
            "SELECT {} FROM nodes WHERE title LIKE ?1 ESCAPE '\\' ORDER BY depth, id LIMIT ?2",
            SUMMARY_COLUMNS
        );
        self.summaries(&sql, params![pattern, limit])
    }

    fn lexical_search(&self, query: &str, limit: usize) -> StorageResult<Vec<SearchHit>> {
        let terms = match_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let any_term = terms.join(" OR ");
        match self.fts_match(&any_term, limit) {
            Ok(hits) if !hits.is_empty() => return Ok(hits),
            Ok(_) => debug!("No hits for '{}', retrying with all terms required", any_term),
            Err(e) => debug!("{}; retrying with all terms required", e),
        }

        let all_terms = terms.join(" ");
        match self.fts_match(&all_terms, limit) {
            Ok(hits) => Ok(hits),
            Err(e) => {
                debug!("{}; falling back to title match", e);
                let hits = self
                    .find_nodes_by_title(query.trim(), limit)?
                    .into_iter()
                    .map(|node| SearchHit {
                        id: node.id,
                        title: node.title,
                        address: node.address,
                        depth: node.depth,
                        snippet: String::new(),
                    })
                    .collect();
                Ok(hits)
            }
        }
    }

    fn get_full_content(&self, id: i64) -> StorageResult<String> {
        let body = self
            .conn
            .query_row("SELECT body FROM nodes WHERE id = ?1", params![id], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(body.unwrap_or_default())
    }

    // ===== Reporting =====

    fn get_stats(&self) -> StorageResult<CrawlStats> {
        let max_depth: u32 =
            self.conn
                .query_row("SELECT COALESCE(MAX(depth), 0) FROM nodes", [], |row| {
                    row.get(0)
                })?;

        Ok(CrawlStats {
            pages: self.count("SELECT COUNT(*) FROM nodes")?,
            edges: self.count("SELECT COUNT(*) FROM edges")?,
            max_depth,
        })
    }

    fn get_crawl_status(&self) -> StorageResult<CrawlStatus> {
        let mut stmt = self
            .conn
            .prepare("SELECT depth, COUNT(*) FROM nodes GROUP BY depth ORDER BY depth")?;
        let by_depth = stmt
            .query_map([], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let recent_sql = format!(
            "SELECT {} FROM nodes ORDER BY visited_at DESC, id DESC LIMIT 10",
            SUMMARY_COLUMNS
        );

        Ok(CrawlStatus {
            total_pages: self.count("SELECT COUNT(*) FROM nodes")?,
            total_edges: self.count("SELECT COUNT(*) FROM edges")?,
            by_depth,
            errors: self.count("SELECT COUNT(*) FROM nodes WHERE status = 'error'")?,
            recent: self.summaries(&recent_sql, params![])?,
        })
    }

    fn get_tree(&self, max_depth: u32) -> StorageResult<Vec<TreeNode>> {
        // Breadth-first worklist of (node, parent slot, level); the level
        // bound keeps it finite even on a corrupt parent chain.
        let mut slots: Vec<(TreeNode, Option<usize>, u32)> = self
            .tree_level(None)?
            .into_iter()
            .map(|node| (node, None, 0))
            .collect();

        let mut cursor = 0;
        while cursor < slots.len() {
            let (id, level) = (slots[cursor].0.id, slots[cursor].2);
            if level < max_depth {
                for child in self.tree_level(Some(id))? {
                    slots.push((child, Some(cursor), level + 1));
                }
            }
            cursor += 1;
        }

        // Children always sit after their parent, so folding from the back
        // completes every child list before its owner is moved.
        let mut roots = Vec::new();
        while let Some((mut node, parent, _)) = slots.pop() {
            node.children.reverse();
            match parent {
                Some(slot) => slots[slot].0.children.push(node),
                None => roots.push(node),
            }
        }
        roots.reverse();

        Ok(roots)
    }
}

impl ToSql for NodeStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_db_string()))
    }
}

impl FromSql for NodeStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        NodeStatus::from_db_string(s)
            .ok_or_else(|| FromSqlError::Other(Box::new(StorageError::InvalidStatus(s.to_string()))))
    }
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<NodeSummary> {
    Ok(NodeSummary {
        id: row.get(0)?,
        address: row.get(1)?,
        title: row.get(2)?,
        depth: row.get(3)?,
        parent_id: row.get(4)?,
        status: row.get(5)?,
    })
}

/// Splits a free-text query into full-text search terms
///
/// Punctuation becomes whitespace, stop words and terms of two characters or
/// fewer are dropped. If nothing survives, the unfiltered words are used.
fn match_terms(query: &str) -> Vec<String> {
    let cleaned = NON_WORD.replace_all(query, " ");

    let terms: Vec<String> = cleaned
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .map(String::from)
        .collect();

    if terms.is_empty() {
        cleaned.split_whitespace().map(String::from).collect()
    } else {
        terms
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
