//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the breadth-first crawl loop, which:
//! - Takes one address at a time off the frontier
//! - Renders and extracts it, or records the failure
//! - Commits the node and its discovery edge to the graph store
//! - Enqueues the links it found, one level deeper
//! - Stops on an empty frontier, an exhausted budget, or a stop request

use crate::config::CrawlerConfig;
use crate::crawler::extractor::{extract_page, DiscoveredLink};
use crate::crawler::renderer::Renderer;
use crate::crawler::scheduler::{Admission, Dequeued, Frontier, FrontierItem, RequestPacer};
use crate::state::{ItemState, NodeStatus};
use crate::storage::{DocumentNode, GraphStore, NewNode, StorageResult};
use crate::url::{resolve, CrawlScope};
use crate::AtlasError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Limits on a single crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlBudget {
    /// Maximum number of nodes committed (including failed ones)
    pub max_pages: u32,

    /// Links are not followed from nodes at this depth
    pub max_depth: u32,

    /// Wall-clock limit for the run
    pub timeout: Duration,

    /// Delay held between successive fetches
    pub request_delay: Duration,
}

impl CrawlBudget {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_depth: config.max_depth,
            timeout: Duration::from_secs(config.timeout_secs),
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }
}

/// Why a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    FrontierExhausted,
    PageBudget,
    TimeBudget,
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::FrontierExhausted => "frontier exhausted",
            Self::PageBudget => "page budget reached",
            Self::TimeBudget => "time budget reached",
            Self::Cancelled => "stop requested",
        };
        f.write_str(text)
    }
}

/// Result of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Nodes committed during this run
    pub pages: u64,

    /// Edges added during this run
    pub edges: u64,

    /// Deepest committed node
    pub max_depth: u32,

    pub stop_reason: StopReason,
}

/// Breadth-first crawler over a renderer and a graph store
pub struct Crawler<'a, R, S> {
    renderer: &'a R,
    store: &'a mut S,
    scope: CrawlScope,
    budget: CrawlBudget,
    stop: Arc<AtomicBool>,
}

impl<'a, R, S> Crawler<'a, R, S>
where
    R: Renderer,
    S: GraphStore,
{
    pub fn new(renderer: &'a R, store: &'a mut S, scope: CrawlScope, budget: CrawlBudget) -> Self {
        Self {
            renderer,
            store,
            scope,
            budget,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares an externally owned stop flag
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Returns a flag that stops the run at the next dequeue when set
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Crawls breadth-first from `root_address`
    ///
    /// Render failures are stored as `error` nodes and never abort the run.
    /// Storage failures do. Everything committed before the run ends stays
    /// committed, so an interrupted run can simply be started again.
    pub async fn run(&mut self, root_address: &str) -> Result<CrawlSummary, AtlasError> {
        let start = Instant::now();
        let mut frontier = Frontier::new();
        let mut pacer = RequestPacer::new(self.budget.request_delay);
        let mut summary = CrawlSummary {
            pages: 0,
            edges: 0,
            max_depth: 0,
            stop_reason: StopReason::FrontierExhausted,
        };

        frontier.enqueue(root_address, 0, None, "")?;
        info!(
            "Starting crawl at {} (max {} pages, depth {}, {:?})",
            root_address, self.budget.max_pages, self.budget.max_depth, self.budget.timeout
        );

        let stop_reason = loop {
            if self.stop.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if summary.pages >= u64::from(self.budget.max_pages) {
                break StopReason::PageBudget;
            }
            if start.elapsed() >= self.budget.timeout {
                break StopReason::TimeBudget;
            }

            let mut item = match frontier.next() {
                Some(Dequeued::Fresh(item)) => item,
                Some(Dequeued::Duplicate { item, known_id }) => {
                    debug!("Skipping already visited {}", item.address());
                    summary.edges += self.record_link(item.parent_id, known_id, &item.anchor_text)?;
                    continue;
                }
                None => break StopReason::FrontierExhausted,
            };

            // A previous run may have stored this document under another spelling
            if let Some(stored) = self.stored_elsewhere(&item)? {
                if item.parent_id.is_none() {
                    debug!("Root {} is stored as {}", item.address(), stored.address);
                    item.identity.canonical_address = stored.address;
                } else {
                    debug!("Already stored as {}: {}", stored.address, item.address());
                    frontier.record_commit(&item.identity, stored.id);
                    summary.edges +=
                        self.record_link(item.parent_id, Some(stored.id), &item.anchor_text)?;
                    continue;
                }
            }

            pacer.wait_turn().await;
            self.visit(item, &mut frontier, &mut summary).await?;

            if summary.pages % 10 == 0 {
                let elapsed = start.elapsed().as_secs_f64();
                info!(
                    "Progress: {} pages committed, {} in frontier, {:.2} pages/sec",
                    summary.pages,
                    frontier.len(),
                    summary.pages as f64 / elapsed.max(f64::EPSILON)
                );
            }
        };
        summary.stop_reason = stop_reason;

        info!(
            "Crawl finished ({}): {} pages, {} edges, max depth {} in {:?}",
            summary.stop_reason,
            summary.pages,
            summary.edges,
            summary.max_depth,
            start.elapsed()
        );

        Ok(summary)
    }

    /// Renders, commits and expands one frontier item
    async fn visit(
        &mut self,
        mut item: FrontierItem,
        frontier: &mut Frontier,
        summary: &mut CrawlSummary,
    ) -> Result<(), AtlasError> {
        let document = match self.renderer.render(item.address()).await {
            Ok(document) => document,
            Err(e) => {
                warn!("{}", e);
                item.advance(ItemState::Failed);
                let id = self.store.upsert_node(&NewNode {
                    address: item.address(),
                    identity_key: item.identity.identity_key.as_deref(),
                    title: "",
                    body: "",
                    depth: item.depth,
                    parent_id: item.parent_id,
                    status: NodeStatus::Error,
                })?;
                frontier.record_commit(&item.identity, id);
                summary.pages += 1;
                summary.max_depth = summary.max_depth.max(item.depth);
                return Ok(());
            }
        };
        item.advance(ItemState::Fetched);

        let page = extract_page(&document, &self.scope);
        let id = self.store.upsert_node(&NewNode {
            address: item.address(),
            identity_key: item.identity.identity_key.as_deref(),
            title: &page.title,
            body: &page.body,
            depth: item.depth,
            parent_id: item.parent_id,
            status: NodeStatus::from_body(&page.body),
        })?;
        frontier.record_commit(&item.identity, id);
        summary.edges += self.record_link(item.parent_id, Some(id), &item.anchor_text)?;
        item.advance(ItemState::Committed);

        summary.pages += 1;
        summary.max_depth = summary.max_depth.max(item.depth);

        let queued = if item.depth < self.budget.max_depth {
            self.expand(id, item.depth + 1, &page.links, frontier, summary)?
        } else {
            self.link_known(id, &page.links, frontier, summary)?;
            0
        };

        info!(
            "[{}/{}] depth={} links={} queued={} {}",
            summary.pages,
            self.budget.max_pages,
            item.depth,
            page.links.len(),
            queued,
            page.title
        );

        Ok(())
    }

    /// Offers every link to the frontier; links to visited documents become
    /// graph edges. Returns the number of links queued.
    fn expand(
        &mut self,
        from_id: i64,
        depth: u32,
        links: &[DiscoveredLink],
        frontier: &mut Frontier,
        summary: &mut CrawlSummary,
    ) -> StorageResult<usize> {
        let mut queued = 0;

        for link in links {
            match frontier.enqueue(&link.address, depth, Some(from_id), &link.anchor_text) {
                Ok(Admission::Queued) => queued += 1,
                Ok(Admission::Visited(known_id)) => {
                    summary.edges += self.record_link(Some(from_id), known_id, &link.anchor_text)?;
                }
                Err(e) => debug!("Dropping link {}: {}", link.address, e),
            }
        }

        Ok(queued)
    }

    /// At the depth limit nothing is queued, but links to documents already
    /// committed are still recorded.
    fn link_known(
        &mut self,
        from_id: i64,
        links: &[DiscoveredLink],
        frontier: &Frontier,
        summary: &mut CrawlSummary,
    ) -> StorageResult<()> {
        for link in links {
            let Ok(identity) = resolve(&link.address) else {
                continue;
            };
            if frontier.is_visited(&identity) {
                let known_id = frontier.committed_id(&identity);
                summary.edges += self.record_link(Some(from_id), known_id, &link.anchor_text)?;
            }
        }
        Ok(())
    }

    /// Stored node sharing the item's identity key under a different address
    fn stored_elsewhere(&self, item: &FrontierItem) -> StorageResult<Option<DocumentNode>> {
        let Some(key) = item.identity.identity_key.as_deref() else {
            return Ok(None);
        };
        let Some(id) = self.store.find_id_by_identity_key(key)? else {
            return Ok(None);
        };
        Ok(self
            .store
            .get_node(id)?
            .filter(|node| node.address != item.address()))
    }

    /// Inserts an edge when both ends are known and distinct
    fn record_link(
        &mut self,
        from_id: Option<i64>,
        to_id: Option<i64>,
        link_text: &str,
    ) -> StorageResult<u64> {
        match (from_id, to_id) {
            (Some(from), Some(to)) if from != to => {
                Ok(u64::from(self.store.insert_edge(from, to, link_text)?))
            }
            _ => Ok(0),
        }
    }
}
