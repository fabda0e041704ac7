//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `NodeStatus`: Outcome recorded on a stored document (ok, empty, error)
//! - `ItemState`: Lifecycle of a frontier item (pending, fetched, committed, failed)

mod item_state;
mod node_status;

// Re-export main types
pub use item_state::ItemState;
pub use node_status::NodeStatus;
