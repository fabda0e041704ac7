//! Page extraction
//!
//! Turns a rendered document into a title, a plain-text body and the list of
//! in-scope links worth following. Navigation chrome (menus, headers,
//! footers, scripts, hidden elements) is ignored for all three.

use crate::crawler::renderer::RenderedDocument;
use crate::url::{resolve, CrawlScope};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Selectors tried in order for the document title
const TITLE_SELECTORS: &[&str] = &[
    "h1.co_heading",
    ".co_title",
    "h1.document-title",
    ".documentTitle",
    "h1",
    "h2",
];

/// Selectors tried in order for the main content block
const CONTENT_SELECTORS: &[&str] = &[
    ".co_contentBlock",
    ".co_document",
    "article",
    "main",
    "[role=\"main\"]",
    ".content",
    "#content",
    ".regulation-text",
];

/// Elements whose text and links are never extracted
const STRIP_SELECTOR: &str = "nav, header, footer, script, style, noscript, \
     .co_breadcrumb, .co_toolbar, .co_navigation, .co_header, .co_footer, .co_sidebar, \
     [aria-hidden='true']";

/// A content block must exceed this many characters to be used
const MIN_CONTENT_CHARS: usize = 50;

/// Cap on the `<body>` fallback text (characters)
const BODY_FALLBACK_CHARS: usize = 5000;

const UNTITLED: &str = "Untitled";

static TITLE: Lazy<Vec<Selector>> = Lazy::new(|| compile(TITLE_SELECTORS));
static CONTENT: Lazy<Vec<Selector>> = Lazy::new(|| compile(CONTENT_SELECTORS));
static STRIP: Lazy<Selector> =
    Lazy::new(|| Selector::parse(STRIP_SELECTOR).expect("valid strip selector"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static HEAD_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

fn compile(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
}

/// A link found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Absolute address with the fragment removed
    pub address: String,

    /// Whitespace-collapsed anchor text, or the address when the anchor is empty
    pub anchor_text: String,
}

/// The normalized record extracted from a rendered document
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub title: String,
    pub body: String,
    pub links: Vec<DiscoveredLink>,
}

/// Extracts title, body text and followable links from a rendered document
///
/// Links are kept only when they resolve inside `scope`, carry an identity
/// key, and have anchor text that no skip pattern matches. Each address is
/// reported once, in document order.
///
/// # Example
///
/// ```
/// use regatlas::crawler::{extract_page, RenderedDocument};
/// use regatlas::url::CrawlScope;
///
/// let document = RenderedDocument {
///     address: "https://regs.example.gov/calregs/Browse?guid=IROOT".to_string(),
///     title_hint: None,
///     markup: r#"<html><body><h1>Division 3</h1>
///         <a href="/calregs/Browse?guid=ICH1">Chapter 1</a>
///         <a href="/calregs/Search">Search</a></body></html>"#
///         .to_string(),
/// };
/// let scope = CrawlScope::new("regs.example.gov", "/calregs/");
///
/// let page = extract_page(&document, &scope);
/// assert_eq!(page.title, "Division 3");
/// assert_eq!(page.links.len(), 1);
/// assert_eq!(page.links[0].anchor_text, "Chapter 1");
/// ```
pub fn extract_page(document: &RenderedDocument, scope: &CrawlScope) -> ExtractedPage {
    let html = Html::parse_document(&document.markup);

    let title = extract_title(&html, document.title_hint.as_deref());
    let body = extract_body(&html);
    let links = match Url::parse(&document.address) {
        Ok(base) => extract_links(&html, &base, scope),
        Err(_) => Vec::new(),
    };

    ExtractedPage { title, body, links }
}

fn extract_title(html: &Html, title_hint: Option<&str>) -> String {
    for selector in TITLE.iter() {
        if let Some(element) = visible(html, selector).next() {
            let text = clean_text(&element.text().collect::<String>());
            if !text.is_empty() {
                return text;
            }
        }
    }

    if let Some(hint) = title_hint.map(clean_text).filter(|t| !t.is_empty()) {
        return hint;
    }

    html.select(&HEAD_TITLE)
        .next()
        .map(|element| clean_text(&element.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn extract_body(html: &Html) -> String {
    for selector in CONTENT.iter() {
        if let Some(element) = visible(html, selector).next() {
            let text = visible_text(element);
            if text.chars().count() > MIN_CONTENT_CHARS {
                return text;
            }
        }
    }

    html.select(&BODY)
        .next()
        .map(|body| visible_text(body).chars().take(BODY_FALLBACK_CHARS).collect())
        .unwrap_or_default()
}

fn extract_links(html: &Html, base: &Url, scope: &CrawlScope) -> Vec<DiscoveredLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in visible(html, &ANCHOR) {
        let Some(mut url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base))
        else {
            continue;
        };

        if !scope.contains(&url) {
            continue;
        }

        url.set_fragment(None);
        let address = url.to_string();
        if seen.contains(&address) {
            continue;
        }

        // Links without an identity key lead to navigation, not documents
        match resolve(&address) {
            Ok(identity) if identity.has_key() => {}
            _ => continue,
        }
        seen.insert(address.clone());

        let text = clean_text(&element.text().collect::<String>());
        let anchor_text = if text.is_empty() { address.clone() } else { text };
        if scope.skips_anchor(&anchor_text) {
            continue;
        }

        links.push(DiscoveredLink {
            address,
            anchor_text,
        });
    }

    links
}

/// Resolves an href against the page address
///
/// Returns None for empty and fragment-only hrefs, special schemes, and
/// anything that does not resolve to an HTTP(S) URL.
fn resolve_link(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    base.join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}

/// Elements matching `selector` that are not inside stripped chrome
fn visible<'a, 'b>(
    html: &'a Html,
    selector: &'b Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'b
where
    'a: 'b,
{
    html.select(selector).filter(|element| !is_stripped(*element))
}

fn is_stripped(element: ElementRef<'_>) -> bool {
    STRIP.matches(&element)
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| STRIP.matches(&ancestor))
}

/// Whitespace-collapsed text of an element, skipping stripped descendants
fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| STRIP.matches(&ancestor));
        if !hidden {
            parts.push(&**text);
        }
    }

    clean_text(&parts.join(" "))
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
