//! Integration tests for retrieval and query routing

use async_trait::async_trait;
use regatlas::chat::{
    AnswerGenerator, QueryClassifier, QueryKind, QueryRouter,
};
use regatlas::config::RetrievalConfig;
use regatlas::retrieval::{select_excerpt, ContextItem, ExcerptPolicy, RetrievalEngine};
use regatlas::state::NodeStatus;
use regatlas::storage::{GraphStore, NewNode, SqliteGraphStore};
use regatlas::AtlasError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Records calls instead of generating text
#[derive(Default)]
struct CountingGenerator {
    calls: AtomicUsize,
    last_titles: Mutex<Vec<String>>,
}

#[async_trait]
impl AnswerGenerator for CountingGenerator {
    async fn generate(&self, query: &str, context: &[ContextItem]) -> Result<String, AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_titles.lock().unwrap() = context.iter().map(|c| c.title.clone()).collect();
        Ok(format!("generated answer for {query}"))
    }
}

struct AlwaysContent;

impl QueryClassifier for AlwaysContent {
    fn classify(&self, _query: &str) -> QueryKind {
        QueryKind::Content
    }
}

fn add(
    store: &mut SqliteGraphStore,
    address: &str,
    title: &str,
    body: &str,
    depth: u32,
    parent_id: Option<i64>,
) -> i64 {
    store
        .upsert_node(&NewNode {
            address,
            identity_key: None,
            title,
            body,
            depth,
            parent_id,
            status: NodeStatus::from_body(body),
        })
        .unwrap()
}

/// Chapter 9 with two children, inserted out of title order
fn regulations_store() -> SqliteGraphStore {
    let mut store = SqliteGraphStore::open_in_memory().unwrap();
    let chapter = add(
        &mut store,
        "https://regs.example.gov/c9",
        "Chapter 9",
        "Off-road vehicles and engines pollution control devices.",
        0,
        None,
    );
    add(
        &mut store,
        "https://regs.example.gov/c9/s2",
        "Section 2",
        "Idling of off-road diesel vehicles is limited to five consecutive minutes.",
        1,
        Some(chapter),
    );
    add(
        &mut store,
        "https://regs.example.gov/c9/a1",
        "Article 1",
        "Small off-road engines must meet the exhaust emission standards in this article.",
        1,
        Some(chapter),
    );
    store
}

#[test]
fn test_excerpt_window_example() {
    let anchor = "Footnote 4 applies to engines above 750 horsepower";
    let body = format!(
        "{}{}{}",
        "a".repeat(15_000),
        anchor,
        "z".repeat(5_000 - anchor.len())
    );
    let snippet = format!("...rated <b>power</b>...{anchor}...");

    let excerpt = select_excerpt(&body, &snippet, &ExcerptPolicy::default());

    assert_eq!(excerpt.chars().count(), 8000);
    assert_eq!(excerpt, &body[9000..17000]);
}

#[test]
fn test_excerpt_boundedness_through_search() {
    let mut store = SqliteGraphStore::open_in_memory().unwrap();
    let phrase = "Footnote 4 applies to engines above 750 horsepower";
    let body = format!(
        "{}{}{}",
        "Emission data row without relevance. ".repeat(406),
        phrase,
        " Remaining rows are listed in the appendix.".repeat(120)
    );
    add(&mut store, "https://regs.example.gov/t1", "Table 1", &body, 1, None);
    add(
        &mut store,
        "https://regs.example.gov/t2",
        "Table 2",
        "Horsepower ratings for small engines.",
        1,
        None,
    );

    let engine = RetrievalEngine::new(&store, &RetrievalConfig::default(), &[]).unwrap();
    let items = engine.retrieve("footnote horsepower").unwrap();

    let table_1 = items
        .iter()
        .find(|item| item.title == "Table 1")
        .expect("Table 1 retrieved");
    assert_eq!(table_1.excerpt.chars().count(), 8000);

    // The match sits in the final quarter of the window
    let at = table_1.excerpt.find("Footnote").expect("anchor kept");
    assert!(at >= 5000, "anchor at {at}");

    let table_2 = items.iter().find(|item| item.title == "Table 2").unwrap();
    assert_eq!(table_2.excerpt, "Horsepower ratings for small engines.");
}

#[test]
fn test_acronym_expansion_is_additive() {
    let store = SqliteGraphStore::open_in_memory().unwrap();
    let engine = RetrievalEngine::new(&store, &RetrievalConfig::default(), &[]).unwrap();

    for query in ["ZEV", "CARB rules for TRU fleets", "PM and NOx limits"] {
        let expanded = engine.expand_query(query);
        for token in query.split_whitespace() {
            assert!(expanded.contains(token), "{query:?} lost {token:?}");
        }
        assert!(expanded.len() > query.len());
    }

    assert_eq!(engine.expand_query("idling limits"), "idling limits");
}

#[tokio::test]
async fn test_children_query_skips_generator() {
    let store = regulations_store();
    let generator = CountingGenerator::default();
    let engine = RetrievalEngine::new(&store, &RetrievalConfig::default(), &[]).unwrap();
    let router = QueryRouter::new(engine, &generator);

    let answer = router.ask("children of Chapter 9").await.unwrap();

    assert_eq!(answer.path, QueryKind::Relationship);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert!(answer.sources.is_empty());

    let article = answer.text.find("Article 1").expect("Article 1 listed");
    let section = answer.text.find("Section 2").expect("Section 2 listed");
    assert!(article < section);
    assert!(answer.text.contains("(2 total)"));
}

#[tokio::test]
async fn test_content_query_uses_generator() {
    let store = regulations_store();
    let generator = CountingGenerator::default();
    let engine = RetrievalEngine::new(&store, &RetrievalConfig::default(), &[]).unwrap();
    let router = QueryRouter::new(engine, &generator);

    let answer = router
        .ask("How long may off-road diesel vehicles idle?")
        .await
        .unwrap();

    assert_eq!(answer.path, QueryKind::Content);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(answer.text, "generated answer for How long may off-road diesel vehicles idle?");
    assert!(!answer.sources.is_empty());
    assert_eq!(
        *generator.last_titles.lock().unwrap(),
        answer.sources.iter().map(|s| s.title.clone()).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_unknown_subject_falls_back_to_content() {
    let store = regulations_store();
    let generator = CountingGenerator::default();
    let engine = RetrievalEngine::new(&store, &RetrievalConfig::default(), &[]).unwrap();
    let router = QueryRouter::new(engine, &generator);

    let answer = router.ask("children of Subchapter 12").await.unwrap();

    assert_eq!(answer.path, QueryKind::Content);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_custom_classifier() {
    let store = regulations_store();
    let generator = CountingGenerator::default();
    let engine = RetrievalEngine::new(&store, &RetrievalConfig::default(), &[]).unwrap();
    let router = QueryRouter::new(engine, &generator).with_classifier(Box::new(AlwaysContent));

    let answer = router.ask("children of Chapter 9").await.unwrap();

    assert_eq!(answer.path, QueryKind::Content);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_structural_queries_on_store() {
    let store = regulations_store();
    let chapter = store.find_nodes_by_title("Chapter 9", 3).unwrap();
    assert_eq!(chapter.len(), 1);

    let children: Vec<String> = store
        .get_children(chapter[0].id)
        .unwrap()
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(children, vec!["Article 1", "Section 2"]);
}
