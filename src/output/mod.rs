//! Output module for crawl reports
//!
//! This module handles:
//! - Printing crawl statistics from the graph store
//! - Exporting the document hierarchy as markdown

mod markdown;
pub mod stats;

pub use markdown::{export_tree, format_tree_markdown};
pub use stats::{format_statistics, load_statistics, print_statistics};

use crate::crawler::CrawlSummary;

/// Formats the one-line result of a crawl run
pub fn format_crawl_summary(summary: &CrawlSummary) -> String {
    format!(
        "Crawl complete ({}): {} pages, {} links, max depth {}",
        summary.stop_reason, summary.pages, summary.edges, summary.max_depth
    )
}
