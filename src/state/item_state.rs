/// Lifecycle of one frontier item during a crawl
use std::fmt;

/// State of an item taken off the frontier
///
/// Items move `Pending -> Fetched -> Committed` on success. A render
/// failure moves `Pending -> Failed`; the failure is still committed to the
/// store as an error node, but no children are enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    // ===== Active States =====
    /// Waiting on the frontier
    Pending,

    /// Rendered and extracted, not yet persisted
    Fetched,

    // ===== Terminal States =====
    /// Node (and its discovery edge) persisted
    Committed,

    /// Render or fetch failed
    Failed,
}

impl ItemState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: ItemState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetched)
                | (Self::Pending, Self::Failed)
                | (Self::Fetched, Self::Committed)
                | (Self::Fetched, Self::Failed)
        )
    }

    /// Returns the lowercase name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetched => "fetched",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
