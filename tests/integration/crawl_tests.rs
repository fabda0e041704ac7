//! Integration tests for the crawler
//!
//! Most tests run the full crawl cycle against an in-memory fixture site;
//! the last ones use wiremock to exercise the HTTP renderer end-to-end.

use async_trait::async_trait;
use regatlas::crawler::{
    CrawlBudget, Crawler, HttpRenderer, RenderError, RenderedDocument, Renderer, StopReason,
};
use regatlas::config::UserAgentConfig;
use regatlas::state::NodeStatus;
use regatlas::storage::{GraphStore, SqliteGraphStore};
use regatlas::url::CrawlScope;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &str = "https://regs.example.gov/calregs/Document/";

/// Serves fixed markup per address and records every request
struct FixtureRenderer {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl FixtureRenderer {
    fn new() -> Self {
        Self {
            pages: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Adds a document `key` titled `title` linking to `links` as (key, anchor text)
    fn page(mut self, key: &str, title: &str, links: &[(&str, &str)]) -> Self {
        self.pages
            .insert(format!("{SITE}{key}"), document_markup(title, links));
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for FixtureRenderer {
    async fn render(&self, address: &str) -> Result<RenderedDocument, RenderError> {
        self.requests.lock().unwrap().push(address.to_string());
        match self.pages.get(address) {
            Some(markup) => Ok(RenderedDocument {
                address: address.to_string(),
                title_hint: None,
                markup: markup.clone(),
            }),
            None => Err(RenderError::HttpStatus {
                address: address.to_string(),
                status: 404,
            }),
        }
    }
}

fn document_markup(title: &str, links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(key, text)| format!(r#"<li><a href="/calregs/Document/{key}">{text}</a></li>"#))
        .collect();

    format!(
        r#"<html><head><title>{title} | Regulations</title></head><body>
        <nav><a href="/calregs/Document/INAV">Home</a></nav>
        <div class="co_document">
          <h1>{title}</h1>
          <p>This part sets out the requirements that apply under {title} of the regulations.</p>
          <ul>{anchors}</ul>
        </div>
        </body></html>"#
    )
}

fn scope() -> CrawlScope {
    CrawlScope::new("regs.example.gov", "/calregs/")
}

fn budget(max_pages: u32, max_depth: u32) -> CrawlBudget {
    CrawlBudget {
        max_pages,
        max_depth,
        timeout: Duration::from_secs(60),
        request_delay: Duration::ZERO,
    }
}

/// root -> A, A -> B, A -> C, C -> B
fn four_node_site() -> FixtureRenderer {
    FixtureRenderer::new()
        .page("IROOT", "Title 13", &[("IA", "Division 3")])
        .page("IA", "Division 3", &[("IB", "Chapter 1"), ("IC", "Chapter 9")])
        .page("IB", "Chapter 1", &[])
        .page("IC", "Chapter 9", &[("IB", "See Chapter 1")])
}

fn id_of(store: &SqliteGraphStore, key: &str) -> i64 {
    store
        .find_id_by_identity_key(key)
        .unwrap()
        .unwrap_or_else(|| panic!("no node for {key}"))
}

#[tokio::test]
async fn test_four_node_fixture() {
    let renderer = four_node_site();
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    let summary = Crawler::new(&renderer, &mut store, scope(), budget(10, 6))
        .run(&format!("{SITE}IROOT"))
        .await
        .unwrap();

    assert_eq!(summary.pages, 4);
    assert_eq!(summary.edges, 4);
    assert_eq!(summary.max_depth, 2);
    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);

    let stats = store.get_stats().unwrap();
    assert_eq!((stats.pages, stats.edges, stats.max_depth), (4, 4, 2));

    let root = id_of(&store, "IROOT");
    let a = id_of(&store, "IA");
    let b = id_of(&store, "IB");
    let c = id_of(&store, "IC");

    let children: Vec<i64> = store.get_children(root).unwrap().iter().map(|n| n.id).collect();
    assert_eq!(children, vec![a]);

    // B is discovered by A first, so A stays its tree parent
    let node_b = store.get_node(b).unwrap().unwrap();
    assert_eq!(node_b.parent_id, Some(a));
    assert_eq!(node_b.depth, 2);
    assert_eq!(node_b.title, "Chapter 1");
    assert!(node_b.body.contains("requirements that apply under Chapter 1"));

    // C -> B is a graph edge only
    let links_c = store.get_outgoing_links(c).unwrap();
    assert_eq!(links_c.len(), 1);
    assert_eq!(links_c[0].to_id, b);
    assert_eq!(links_c[0].link_text, "See Chapter 1");

    // BFS order, each document fetched once, navigation never followed
    let requests = renderer.requests();
    assert_eq!(
        requests,
        ["IROOT", "IA", "IB", "IC"]
            .iter()
            .map(|k| format!("{SITE}{k}"))
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let renderer = four_node_site();
    let mut store = SqliteGraphStore::open_in_memory().unwrap();
    let root_address = format!("{SITE}IROOT");

    Crawler::new(&renderer, &mut store, scope(), budget(10, 6))
        .run(&root_address)
        .await
        .unwrap();
    let before: Vec<_> = ["IROOT", "IA", "IB", "IC"]
        .iter()
        .map(|k| store.get_node(id_of(&store, k)).unwrap().unwrap())
        .collect();

    let summary = Crawler::new(&renderer, &mut store, scope(), budget(10, 6))
        .run(&root_address)
        .await
        .unwrap();

    assert_eq!(summary.pages, 4);
    assert_eq!(summary.edges, 0);

    let stats = store.get_stats().unwrap();
    assert_eq!((stats.pages, stats.edges), (4, 4));

    for node in before {
        let after = store.get_node(node.id).unwrap().unwrap();
        assert_eq!(after.depth, node.depth);
        assert_eq!(after.parent_id, node.parent_id);
    }
}

#[tokio::test]
async fn test_identity_key_dedup_across_spellings() {
    let mut renderer = FixtureRenderer::new();
    renderer.pages.insert(
        "https://regs.example.gov/calregs/Browse?guid=IA".to_string(),
        document_markup("Division 3", &[]),
    );
    renderer.pages.insert(
        format!("{SITE}IROOT"),
        r#"<html><body><div class="co_document">
            <h1>Title 13</h1>
            <p>Motor vehicle regulations adopted by the state air resources board.</p>
            <a href="/calregs/Browse?guid=IA">Division 3 (browse)</a>
            <a href="/calregs/Document/IA#section">Division 3</a>
        </div></body></html>"#
            .to_string(),
    );
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    let summary = Crawler::new(&renderer, &mut store, scope(), budget(10, 6))
        .run(&format!("{SITE}IROOT"))
        .await
        .unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.edges, 1);
    assert_eq!(renderer.requests().len(), 2);

    let root = id_of(&store, "IROOT");
    let links = store.get_outgoing_links(root).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].link_text, "Division 3 (browse)");
}

fn root_linking_to(href: &str) -> String {
    format!(
        r#"<html><body><div class="co_document">
            <h1>Title 13</h1>
            <p>Motor vehicle regulations adopted by the state air resources board.</p>
            <a href="{href}">Division 3</a>
        </div></body></html>"#
    )
}

#[tokio::test]
async fn test_recrawl_under_other_spelling_reuses_stored_node() {
    let browse_a = "https://regs.example.gov/calregs/Browse?guid=IA";
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    let mut first = FixtureRenderer::new();
    first
        .pages
        .insert(format!("{SITE}IROOT"), root_linking_to("/calregs/Browse?guid=IA"));
    first
        .pages
        .insert(browse_a.to_string(), document_markup("Division 3", &[]));
    Crawler::new(&first, &mut store, scope(), budget(10, 6))
        .run(&format!("{SITE}IROOT"))
        .await
        .unwrap();
    assert_eq!(store.get_stats().unwrap().pages, 2);

    let mut second = FixtureRenderer::new().page("IA", "Division 3", &[]);
    second
        .pages
        .insert(format!("{SITE}IROOT"), root_linking_to("/calregs/Document/IA"));
    let summary = Crawler::new(&second, &mut store, scope(), budget(10, 6))
        .run(&format!("{SITE}IROOT"))
        .await
        .unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(store.get_stats().unwrap().pages, 2);
    assert_eq!(second.requests(), vec![format!("{SITE}IROOT")]);

    let a = store.get_node(id_of(&store, "IA")).unwrap().unwrap();
    assert_eq!(a.address, browse_a);
    let root = id_of(&store, "IROOT");
    let links = store.get_outgoing_links(root).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].to_id, a.id);
}

#[tokio::test]
async fn test_root_under_other_spelling_is_fetched_at_stored_address() {
    let renderer = four_node_site();
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    Crawler::new(&renderer, &mut store, scope(), budget(10, 6))
        .run(&format!("{SITE}IROOT"))
        .await
        .unwrap();

    let summary = Crawler::new(&renderer, &mut store, scope(), budget(10, 6))
        .run("https://regs.example.gov/calregs/Browse?guid=IROOT")
        .await
        .unwrap();

    assert_eq!(summary.pages, 4);
    assert_eq!(store.get_stats().unwrap().pages, 4);
    assert!(renderer
        .requests()
        .iter()
        .all(|address| address.starts_with(SITE)));
}

#[tokio::test]
async fn test_render_failure_becomes_error_node() {
    let renderer = FixtureRenderer::new()
        .page("IROOT", "Title 13", &[("IGONE", "Repealed Division"), ("IA", "Division 3")])
        .page("IA", "Division 3", &[]);
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    let summary = Crawler::new(&renderer, &mut store, scope(), budget(10, 6))
        .run(&format!("{SITE}IROOT"))
        .await
        .unwrap();

    // The failure neither aborts the run nor blocks the frontier
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.stop_reason, StopReason::FrontierExhausted);

    let root = id_of(&store, "IROOT");
    let gone = store.get_node(id_of(&store, "IGONE")).unwrap().unwrap();
    assert_eq!(gone.status, NodeStatus::Error);
    assert_eq!(gone.parent_id, Some(root));
    assert!(gone.body.is_empty());

    let linked: Vec<i64> = store
        .get_outgoing_links(root)
        .unwrap()
        .iter()
        .map(|l| l.to_id)
        .collect();
    assert_eq!(linked, vec![id_of(&store, "IA")]);
    assert_eq!(store.get_crawl_status().unwrap().errors, 1);
}

#[tokio::test]
async fn test_page_budget() {
    let renderer = four_node_site();
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    let summary = Crawler::new(&renderer, &mut store, scope(), budget(2, 6))
        .run(&format!("{SITE}IROOT"))
        .await
        .unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.stop_reason, StopReason::PageBudget);
    assert_eq!(store.get_stats().unwrap().pages, 2);
}

#[tokio::test]
async fn test_depth_limit() {
    let renderer = four_node_site();
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    let summary = Crawler::new(&renderer, &mut store, scope(), budget(10, 1))
        .run(&format!("{SITE}IROOT"))
        .await
        .unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.max_depth, 1);
    assert!(store.find_id_by_identity_key("IB").unwrap().is_none());
}

#[tokio::test]
async fn test_links_back_at_depth_limit_are_recorded() {
    let renderer = FixtureRenderer::new()
        .page("IROOT", "Title 13", &[("IA", "Division 3")])
        .page("IA", "Division 3", &[("IROOT", "Back to Title 13"), ("IB", "Chapter 1")]);
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    let summary = Crawler::new(&renderer, &mut store, scope(), budget(10, 1))
        .run(&format!("{SITE}IROOT"))
        .await
        .unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.edges, 2);

    let a = id_of(&store, "IA");
    let links = store.get_outgoing_links(a).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].link_text, "Back to Title 13");

    // Linking back never re-parents the root
    let root = store.get_node(id_of(&store, "IROOT")).unwrap().unwrap();
    assert_eq!(root.parent_id, None);
}

#[tokio::test]
async fn test_stop_flag_and_time_budget() {
    let renderer = four_node_site();
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    let summary = {
        let mut crawler = Crawler::new(&renderer, &mut store, scope(), budget(10, 6));
        crawler.stop_handle().store(true, Ordering::Relaxed);
        crawler.run(&format!("{SITE}IROOT")).await.unwrap()
    };
    assert_eq!(summary.pages, 0);
    assert_eq!(summary.stop_reason, StopReason::Cancelled);

    let expired = CrawlBudget {
        timeout: Duration::ZERO,
        ..budget(10, 6)
    };
    let summary = Crawler::new(&renderer, &mut store, scope(), expired)
        .run(&format!("{SITE}IROOT"))
        .await
        .unwrap();
    assert_eq!(summary.stop_reason, StopReason::TimeBudget);
    assert!(renderer.requests().is_empty());
}

#[tokio::test]
async fn test_invalid_root_is_an_error() {
    let renderer = four_node_site();
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    let result = Crawler::new(&renderer, &mut store, scope(), budget(10, 6))
        .run("ftp://regs.example.gov/calregs/Document/IROOT")
        .await;

    assert!(result.is_err());
}

fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
    }
}

fn html_response(title: &str, links: &[(&str, &str)]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(document_markup(title, links), "text/html")
}

#[tokio::test]
async fn test_http_renderer_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/calregs/Document/IROOT"))
        .respond_with(html_response(
            "Title 17",
            &[("IA", "Division 3"), ("IB", "Division 4"), ("IPDF", "Form 1")],
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calregs/Document/IA"))
        .respond_with(html_response("Division 3", &[("IROOT", "Title 17")]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calregs/Document/IB"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/calregs/Document/IPDF"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .mount(&mock_server)
        .await;

    let renderer = HttpRenderer::new(&test_user_agent()).unwrap();
    let mut store = SqliteGraphStore::open_in_memory().unwrap();

    let summary = Crawler::new(
        &renderer,
        &mut store,
        CrawlScope::new("127.0.0.1", "/calregs/"),
        budget(10, 3),
    )
    .run(&format!("{base_url}/calregs/Document/IROOT"))
    .await
    .unwrap();

    assert_eq!(summary.pages, 4);

    let a = store.get_node(id_of(&store, "IA")).unwrap().unwrap();
    assert_eq!(a.status, NodeStatus::Ok);
    assert_eq!(a.title, "Division 3");

    for key in ["IB", "IPDF"] {
        let node = store.get_node(id_of(&store, key)).unwrap().unwrap();
        assert_eq!(node.status, NodeStatus::Error, "{key}");
    }

    // root -> A, plus A -> root as a graph edge; failed documents get none
    let status = store.get_crawl_status().unwrap();
    assert_eq!(status.errors, 2);
    assert_eq!(status.total_edges, 2);
}

#[tokio::test]
async fn test_http_renderer_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/form.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .mount(&mock_server)
        .await;

    let renderer = HttpRenderer::new(&test_user_agent()).unwrap();

    let err = renderer
        .render(&format!("{}/missing", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::HttpStatus { status: 404, .. }));

    let err = renderer
        .render(&format!("{}/form.pdf", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::ContentMismatch { .. }));
}
