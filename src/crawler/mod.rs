//! Crawler module for building the document graph
//!
//! This module contains the core crawling logic, including:
//! - Rendering documents over HTTP
//! - Content and link extraction
//! - The deduplicating frontier and request pacing
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod renderer;
mod scheduler;

pub use coordinator::{CrawlBudget, CrawlSummary, Crawler, StopReason};
pub use extractor::{extract_page, DiscoveredLink, ExtractedPage};
pub use renderer::{build_http_client, HttpRenderer, RenderError, RenderedDocument, Renderer};
pub use scheduler::{Admission, Dequeued, Frontier, FrontierItem, RequestPacer};

use crate::config::Config;
use crate::storage::GraphStore;
use crate::url::CrawlScope;
use crate::AtlasError;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Runs a complete crawl from the configured root
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP renderer from the user agent settings
/// 2. Compile the crawl scope and budget
/// 3. Traverse breadth-first, committing into `store`
///
/// Setting `stop` ends the run at the next dequeue; committed work is kept.
pub async fn crawl<S: GraphStore>(
    config: &Config,
    store: &mut S,
    stop: Arc<AtomicBool>,
) -> Result<CrawlSummary, AtlasError> {
    let renderer = HttpRenderer::new(&config.user_agent)?;
    let scope = CrawlScope::from_config(&config.scope)?;
    let budget = CrawlBudget::from_config(&config.crawler);

    let mut crawler = Crawler::new(&renderer, store, scope, budget).with_stop_flag(stop);
    crawler.run(&config.crawler.root_url).await
}
