//! Query classification

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Which answering path a query takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Navigates the document hierarchy
    Relationship,

    /// Asks about what documents say
    Content,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relationship => write!(f, "relationship"),
            Self::Content => write!(f, "content"),
        }
    }
}

/// Labels free-text queries
pub trait QueryClassifier: Send + Sync {
    fn classify(&self, query: &str) -> QueryKind;
}

static RELATIONSHIP_PHRASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bparent\s+of\b|\bchildren?\s+of\b|\bsiblings?\s+of\b|\bpath\s+(?:from|to)\b|\bhierarchy\b|\bwhere\s+(?:does|is)\b|\bunder\s+which\b|\bbelongs?\s+to\b|\bstructure\s+of\b|\bshow\s+the\s+path\b|\boutgoing\s+links?\b|\blinks?\s+(?:from|to)\b|\brelated\s+to\b|\bsit\s+in\b",
    )
    .expect("valid regex")
});

/// Keyword classifier for structural phrasing
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternClassifier;

impl QueryClassifier for PatternClassifier {
    fn classify(&self, query: &str) -> QueryKind {
        if RELATIONSHIP_PHRASES.is_match(query) {
            QueryKind::Relationship
        } else {
            QueryKind::Content
        }
    }
}
