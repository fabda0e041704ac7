/// Status of a stored document node
use std::fmt;

/// Outcome of the most recent visit to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Content was extracted
    Ok,

    /// The page rendered but carried no usable content
    Empty,

    /// Fetching or rendering failed
    Error,
}

impl NodeStatus {
    /// Chooses `Ok` or `Empty` from an extracted body
    pub fn from_body(body: &str) -> Self {
        if body.trim().is_empty() {
            Self::Empty
        } else {
            Self::Ok
        }
    }

    /// Returns true if the visit failed
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Empty => "empty",
            Self::Error => "error",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(Self::Ok),
            "empty" => Some(Self::Empty),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
