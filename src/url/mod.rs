//! URL handling module for Regatlas
//!
//! This module resolves page addresses into canonical identities and decides
//! which links belong to the crawled document tree.

mod identity;
mod scope;

pub use identity::{resolve, Identity};
pub use scope::{matches_wildcard, CrawlScope};
