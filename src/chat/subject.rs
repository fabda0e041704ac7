//! Subject extraction for structural queries
//!
//! Rules are tried in order and the first match wins. Every rule captures
//! the subject in group 1. When no rule matches, the last three words of the
//! query are used.

use once_cell::sync::Lazy;
use regex::Regex;

static RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)(?:parent|children?|siblings?)\s+of\s+['"]?(.+?)['"]?\??$"#,
        // "path from root to X" names its destination last
        r#"(?i)path\s+from\s+\S+\s+to\s+['"]?(.+?)['"]?\??$"#,
        r#"(?i)path\s+to\s+['"]?(.+?)['"]?\??$"#,
        r#"(?i)path\s+from\s+['"]?(.+?)['"]?\??$"#,
        r#"(?i)(?:hierarchy|structure)\s+of\s+['"]?(.+?)['"]?\??$"#,
        r#"(?i)where\s+(?:does|is)\s+['"]?(.+?)['"]?\s+(?:sit|belong|live|fit|fall|go)"#,
        r#"(?i)what\s+(?:is|sits?)\s+above\s+['"]?(.+?)['"]?(?:\s+in\s+|\??$)"#,
        r#"(?i)what\s+(?:is|sits?)\s+below\s+['"]?(.+?)['"]?(?:\s+in\s+|\??$)"#,
        r#"(?i)['"]?(.+?)['"]?\s+sits?\s+(?:above|below|under)"#,
        r#"(?i)under\s+which.*?['"]?(.+?)['"]?\??$"#,
        r#"(?i)links?\s+(?:from|to)\s+['"]?(.+?)['"]?\??$"#,
        r#"(?i)what\s+links?\s+does\s+['"]?(.+?)['"]?\s+have"#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

static LEADING_ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:the|a|an)\s+").expect("valid regex"));

static IN_THE_QUALIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+in\s+the\b.*").expect("valid regex"));

/// Pulls the document name out of a structural query
///
/// # Example
///
/// ```
/// use regatlas::chat::extract_subject;
///
/// assert_eq!(extract_subject("children of Chapter 9"), "Chapter 9");
/// assert_eq!(
///     extract_subject("where does the Fleet Rule sit in the hierarchy?"),
///     "Fleet Rule"
/// );
/// ```
pub fn extract_subject(query: &str) -> String {
    let query = query.trim();
    let raw = RULES
        .iter()
        .find_map(|rule| rule.captures(query))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| last_words(query, 3));

    let subject = LEADING_ARTICLE.replace(&raw, "");
    IN_THE_QUALIFIER.replace(&subject, "").trim().to_string()
}

fn last_words(query: &str, n: usize) -> String {
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.len() >= n {
        words[words.len() - n..].join(" ")
    } else {
        query.to_string()
    }
}
