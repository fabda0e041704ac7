//! Crawl statistics display
//!
//! This module renders the graph store's crawl status for the terminal.

use crate::storage::{CrawlStatus, GraphStore, StorageResult};
use std::fmt::Write;

/// Loads the crawl status from a store
pub fn load_statistics<S: GraphStore + ?Sized>(store: &S) -> StorageResult<CrawlStatus> {
    store.get_crawl_status()
}

/// Formats crawl status as a plain-text report
pub fn format_statistics(status: &CrawlStatus) -> String {
    let mut out = String::new();
    write_statistics(&mut out, status).expect("writing to a String cannot fail");
    out
}

fn write_statistics(out: &mut String, status: &CrawlStatus) -> std::fmt::Result {
    writeln!(out, "=== Crawl Statistics ===\n")?;

    writeln!(out, "Overview:")?;
    writeln!(out, "  Total pages: {}", status.total_pages)?;
    writeln!(out, "  Total links: {}", status.total_edges)?;
    let error_rate = if status.total_pages > 0 {
        (status.errors as f64 / status.total_pages as f64) * 100.0
    } else {
        0.0
    };
    writeln!(out, "  Errors: {} ({:.1}%)", status.errors, error_rate)?;
    writeln!(out)?;

    if !status.by_depth.is_empty() {
        writeln!(out, "Pages by Depth:")?;
        for (depth, count) in &status.by_depth {
            writeln!(out, "  {:>3}: {}", depth, count)?;
        }
        writeln!(out)?;
    }

    if !status.recent.is_empty() {
        writeln!(out, "Recently Visited:")?;
        for node in &status.recent {
            let title = if node.title.is_empty() {
                "Untitled"
            } else {
                &node.title
            };
            writeln!(out, "  [{}] d{} {} ({})", node.status, node.depth, title, node.address)?;
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Prints crawl status to stdout
pub fn print_statistics(status: &CrawlStatus) {
    print!("{}", format_statistics(status));
}
