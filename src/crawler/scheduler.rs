//! Frontier and pacing for the breadth-first crawl
//!
//! This module handles:
//! - The FIFO frontier of discovered addresses
//! - Identity-based deduplication at enqueue and again at dequeue
//! - Remembering which node id each visited identity was committed as
//! - Holding a fixed delay between successive fetches

use crate::state::ItemState;
use crate::url::{resolve, Identity};
use crate::UrlError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// An address waiting on, or taken off, the frontier
#[derive(Debug, Clone)]
pub struct FrontierItem {
    /// Resolved identity of the address
    pub identity: Identity,

    /// BFS distance from the root
    pub depth: u32,

    /// Node that discovered this address; None for the root
    pub parent_id: Option<i64>,

    /// Anchor text observed on the discovering page
    pub anchor_text: String,

    state: ItemState,
}

impl FrontierItem {
    /// Canonical address of the item
    pub fn address(&self) -> &str {
        &self.identity.canonical_address
    }

    /// Current lifecycle state
    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Moves the item to its next lifecycle state
    ///
    /// Illegal transitions are ignored and leave the state unchanged.
    pub fn advance(&mut self, next: ItemState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            tracing::debug!(
                "Ignoring transition {} -> {} for {}",
                self.state,
                next,
                self.address()
            );
            false
        }
    }
}

/// Outcome of offering an address to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Added to the tail of the queue
    Queued,

    /// Already visited; carries the committed node id when known
    Visited(Option<i64>),
}

/// What came off the frontier
#[derive(Debug)]
pub enum Dequeued {
    /// Not visited before; now marked visited and ready to fetch
    Fresh(FrontierItem),

    /// Visited since it was enqueued; carries the committed node id when known
    Duplicate {
        item: FrontierItem,
        known_id: Option<i64>,
    },
}

/// FIFO frontier with identity and address visited sets
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<FrontierItem>,
    visited_keys: HashSet<String>,
    visited_addresses: HashSet<String>,
    /// Committed node ids by identity key and by canonical address
    committed: HashMap<String, i64>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers an address discovered at `depth`
    ///
    /// The address is resolved eagerly; it is queued unless its identity key
    /// or canonical address has already been visited.
    pub fn enqueue(
        &mut self,
        address: &str,
        depth: u32,
        parent_id: Option<i64>,
        anchor_text: &str,
    ) -> Result<Admission, UrlError> {
        let identity = resolve(address)?;

        if self.is_visited(&identity) {
            return Ok(Admission::Visited(self.committed_id(&identity)));
        }

        self.queue.push_back(FrontierItem {
            identity,
            depth,
            parent_id,
            anchor_text: anchor_text.to_string(),
            state: ItemState::Pending,
        });
        Ok(Admission::Queued)
    }

    /// Takes the next item off the head of the queue
    ///
    /// Items whose identity was visited after they were queued come back as
    /// [`Dequeued::Duplicate`]. Fresh items are marked visited before they
    /// are returned.
    pub fn next(&mut self) -> Option<Dequeued> {
        let item = self.queue.pop_front()?;

        if self.is_visited(&item.identity) {
            let known_id = self.committed_id(&item.identity);
            return Some(Dequeued::Duplicate { item, known_id });
        }

        if let Some(key) = &item.identity.identity_key {
            self.visited_keys.insert(key.clone());
        }
        self.visited_addresses
            .insert(item.identity.canonical_address.clone());

        Some(Dequeued::Fresh(item))
    }

    /// Records the node id an identity was stored as
    pub fn record_commit(&mut self, identity: &Identity, id: i64) {
        if let Some(key) = &identity.identity_key {
            self.committed.insert(key.clone(), id);
        }
        self.committed
            .insert(identity.canonical_address.clone(), id);
    }

    /// Returns true if the identity key or the canonical address was visited
    pub fn is_visited(&self, identity: &Identity) -> bool {
        identity
            .identity_key
            .as_ref()
            .is_some_and(|key| self.visited_keys.contains(key))
            || self.visited_addresses.contains(&identity.canonical_address)
    }

    /// Node id the identity was committed as, if it has been
    pub fn committed_id(&self, identity: &Identity) -> Option<i64> {
        identity
            .identity_key
            .as_ref()
            .and_then(|key| self.committed.get(key))
            .or_else(|| self.committed.get(&identity.canonical_address))
            .copied()
    }

    /// Number of items waiting
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Holds a minimum delay between successive fetches
#[derive(Debug)]
pub struct RequestPacer {
    delay: Duration,
    last_fetch: Option<Instant>,
}

impl RequestPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_fetch: None,
        }
    }

    /// Waits until the delay since the previous fetch has elapsed, then
    /// starts the clock for the next one
    pub async fn wait_turn(&mut self) {
        if let Some(last) = self.last_fetch {
            let ready_at = last + self.delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        self.last_fetch = Some(Instant::now());
    }
}
