//! Retrieval engine
//!
//! Turns a free-text question into a ranked list of context items for an
//! answer generator:
//! 1. Known acronyms are expanded in place
//! 2. The expanded query is run against the lexical index, over-fetching
//! 3. The best few candidates get a windowed excerpt of their full body
//!
//! The engine is read-only over the graph store.

mod acronyms;
mod excerpt;

pub use acronyms::AcronymTable;
pub use excerpt::{anchor_from_snippet, select_excerpt, ExcerptPolicy};

use crate::config::{AcronymEntry, RetrievalConfig};
use crate::storage::{GraphStore, StorageResult};
use crate::ConfigResult;
use tracing::debug;

/// One retrieved document, ready to be cited
#[derive(Debug, Clone, PartialEq)]
pub struct ContextItem {
    pub id: i64,
    pub title: String,
    pub address: String,

    /// Windowed body text for top candidates, the search snippet otherwise
    pub excerpt: String,
}

/// Query-to-context pipeline over a graph store
pub struct RetrievalEngine<'a, S: ?Sized> {
    store: &'a S,
    acronyms: AcronymTable,
    policy: ExcerptPolicy,
    candidate_limit: usize,
    result_limit: usize,
    excerpt_top_n: usize,
}

impl<'a, S> RetrievalEngine<'a, S>
where
    S: GraphStore + ?Sized,
{
    /// Creates an engine with the built-in acronyms plus `extra_acronyms`
    pub fn new(
        store: &'a S,
        config: &RetrievalConfig,
        extra_acronyms: &[AcronymEntry],
    ) -> ConfigResult<Self> {
        Ok(Self {
            store,
            acronyms: AcronymTable::new(extra_acronyms)?,
            policy: ExcerptPolicy::from(config),
            candidate_limit: config.candidate_limit,
            result_limit: config.result_limit,
            excerpt_top_n: config.excerpt_top_n,
        })
    }

    /// The store this engine reads from
    pub fn store(&self) -> &'a S {
        self.store
    }

    /// The query as it is sent to the lexical index
    pub fn expand_query(&self, query: &str) -> String {
        self.acronyms.expand(query)
    }

    /// Retrieves context items for `query`, in search rank order
    ///
    /// An empty result means nothing matched.
    pub fn retrieve(&self, query: &str) -> StorageResult<Vec<ContextItem>> {
        let expanded = self.expand_query(query);
        if expanded != query {
            debug!("Expanded query: {}", expanded);
        }

        let hits = self.store.lexical_search(&expanded, self.candidate_limit)?;
        debug!("{} candidates for {:?}", hits.len(), query);

        let mut items = Vec::with_capacity(hits.len().min(self.result_limit));
        for (rank, hit) in hits.into_iter().take(self.result_limit).enumerate() {
            let excerpt = if rank < self.excerpt_top_n {
                let body = self.store.get_full_content(hit.id)?;
                if body.is_empty() {
                    hit.snippet
                } else {
                    select_excerpt(&body, &hit.snippet, &self.policy)
                }
            } else {
                hit.snippet
            };

            items.push(ContextItem {
                id: hit.id,
                title: hit.title,
                address: hit.address,
                excerpt,
            });
        }

        Ok(items)
    }
}
