//! Anchor-biased excerpt windows
//!
//! Full documents are often far larger than what should be handed to an
//! answer generator. A fixed-size window is cut from the body, placed so that
//! the text the search snippet matched lands in the final quarter of the
//! window. In tabular regulatory text the row label precedes the matched
//! value, so leading context matters more than trailing context.
//!
//! All positions and lengths are counted in characters.

use crate::config::RetrievalConfig;

/// Window placement constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExcerptPolicy {
    /// Excerpt length in characters
    pub window_size: usize,

    /// Fraction of the window placed before the anchor
    pub backward_bias: f64,

    /// Shortest snippet segment accepted as an anchor
    pub min_anchor_len: usize,

    /// Anchors are cut to this length before searching the body
    pub anchor_max_len: usize,

    /// Leading characters skipped when no anchor is found
    pub boilerplate_skip: usize,
}

impl Default for ExcerptPolicy {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for ExcerptPolicy {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            window_size: config.window_size,
            backward_bias: config.backward_bias,
            min_anchor_len: config.min_anchor_len,
            anchor_max_len: config.anchor_max_len,
            boilerplate_skip: config.boilerplate_skip,
        }
    }
}

impl ExcerptPolicy {
    /// Characters of context placed before the anchor
    fn lead(&self) -> usize {
        (self.window_size as f64 * self.backward_bias).floor() as usize
    }
}

/// Derives a literal search key from a highlighted snippet
///
/// Highlight markers are removed and the snippet is split on its `...`
/// ellipses. The longest segment wins if it has at least `min_len`
/// characters; it is cut to `max_len` characters.
pub fn anchor_from_snippet(snippet: &str, min_len: usize, max_len: usize) -> Option<String> {
    let plain = snippet.replace("<b>", "").replace("</b>", "");

    let mut best: Option<&str> = None;
    for segment in plain.split("...").map(str::trim) {
        let longer = best.map_or(true, |b| segment.chars().count() > b.chars().count());
        if !segment.is_empty() && longer {
            best = Some(segment);
        }
    }

    let best = best?;
    if best.chars().count() < min_len {
        return None;
    }
    Some(best.chars().take(max_len).collect())
}

/// Cuts the excerpt for `body`, positioned by the anchor found in `snippet`
///
/// Bodies no longer than the window come back unchanged; longer bodies
/// always yield exactly `window_size` characters.
///
/// # Example
///
/// ```
/// use regatlas::retrieval::{select_excerpt, ExcerptPolicy};
///
/// let policy = ExcerptPolicy::default();
/// assert_eq!(select_excerpt("short body", "", &policy), "short body");
/// ```
pub fn select_excerpt(body: &str, snippet: &str, policy: &ExcerptPolicy) -> String {
    let len = body.chars().count();
    let window = policy.window_size;
    if len <= window {
        return body.to_string();
    }
    let last_start = len - window;

    let anchor_pos = anchor_from_snippet(snippet, policy.min_anchor_len, policy.anchor_max_len)
        .and_then(|anchor| body.find(&anchor))
        .map(|byte_pos| body[..byte_pos].chars().count());

    let start = match anchor_pos {
        Some(pos) => pos.saturating_sub(policy.lead()).min(last_start),
        None => policy.boilerplate_skip.min(last_start),
    };

    body.chars().skip(start).take(window).collect()
}
