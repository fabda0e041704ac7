//! Integration tests for the graph store
//!
//! These run against an on-disk SQLite database to cover persistence as well
//! as the write-once and idempotence rules.

use regatlas::state::NodeStatus;
use regatlas::storage::{GraphStore, NewNode, SqliteGraphStore};
use tempfile::TempDir;

fn open_store() -> (TempDir, SqliteGraphStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteGraphStore::open(&dir.path().join("atlas.db")).unwrap();
    (dir, store)
}

fn node<'a>(address: &'a str, title: &'a str, depth: u32, parent_id: Option<i64>) -> NewNode<'a> {
    NewNode {
        address,
        identity_key: None,
        title,
        body: "Requirements for certification of new motor vehicle engines.",
        depth,
        parent_id,
        status: NodeStatus::Ok,
    }
}

/// Title 13 > Division 3 > {Chapter 1, Chapter 9 > Article 2}
fn build_hierarchy(store: &mut SqliteGraphStore) -> [i64; 5] {
    let title = store
        .upsert_node(&node("https://regs.example.gov/t13", "Title 13", 0, None))
        .unwrap();
    let division = store
        .upsert_node(&node("https://regs.example.gov/d3", "Division 3", 1, Some(title)))
        .unwrap();
    let ch9 = store
        .upsert_node(&node("https://regs.example.gov/c9", "Chapter 9", 2, Some(division)))
        .unwrap();
    let ch1 = store
        .upsert_node(&node("https://regs.example.gov/c1", "Chapter 1", 2, Some(division)))
        .unwrap();
    let art2 = store
        .upsert_node(&node("https://regs.example.gov/a2", "Article 2", 3, Some(ch9)))
        .unwrap();
    [title, division, ch1, ch9, art2]
}

#[test]
fn test_parent_is_write_once() {
    let (_dir, mut store) = open_store();
    let p1 = store
        .upsert_node(&node("https://regs.example.gov/p1", "Article 1", 1, None))
        .unwrap();
    let p2 = store
        .upsert_node(&node("https://regs.example.gov/p2", "Article 2", 1, None))
        .unwrap();

    let n = store
        .upsert_node(&node("https://regs.example.gov/n", "Section 1", 2, Some(p1)))
        .unwrap();
    let again = store
        .upsert_node(&node("https://regs.example.gov/n", "Section 1 (amended)", 5, Some(p2)))
        .unwrap();

    assert_eq!(n, again);
    let stored = store.get_node(n).unwrap().unwrap();
    assert_eq!(stored.parent_id, Some(p1));
    assert_eq!(stored.depth, 2);
    assert_eq!(stored.title, "Section 1 (amended)");
}

#[test]
fn test_missing_parent_is_filled_but_root_stays_root() {
    let (_dir, mut store) = open_store();
    let root = store
        .upsert_node(&node("https://regs.example.gov/root", "Title 17", 0, None))
        .unwrap();
    let orphan = store
        .upsert_node(&node("https://regs.example.gov/orphan", "Chapter 1", 1, None))
        .unwrap();

    store
        .upsert_node(&node("https://regs.example.gov/orphan", "Chapter 1", 1, Some(root)))
        .unwrap();
    store
        .upsert_node(&node("https://regs.example.gov/root", "Title 17", 0, Some(orphan)))
        .unwrap();

    assert_eq!(store.get_node(orphan).unwrap().unwrap().parent_id, Some(root));
    assert_eq!(store.get_node(root).unwrap().unwrap().parent_id, None);
}

#[test]
fn test_edge_idempotence() {
    let (_dir, mut store) = open_store();
    let [title, division, ..] = build_hierarchy(&mut store);

    assert!(store.insert_edge(title, division, "Division 3").unwrap());
    assert!(!store.insert_edge(title, division, "Division 3. Air Resources Board").unwrap());

    let links = store.get_outgoing_links(title).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].link_text, "Division 3");
    assert_eq!(store.get_stats().unwrap().edges, 1);
}

#[test]
fn test_tree_navigation() {
    let (_dir, mut store) = open_store();
    let [title, division, ch1, ch9, art2] = build_hierarchy(&mut store);

    let children: Vec<String> = store
        .get_children(division)
        .unwrap()
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(children, vec!["Chapter 1", "Chapter 9"]);

    let siblings = store.get_siblings(ch9).unwrap();
    assert_eq!(siblings.len(), 1);
    assert_eq!(siblings[0].id, ch1);

    assert_eq!(store.get_parent(art2).unwrap().unwrap().id, ch9);
    assert!(store.get_parent(title).unwrap().is_none());
    assert!(store.get_children(art2).unwrap().is_empty());
}

#[test]
fn test_path_to_root_is_depth_decreasing() {
    let (_dir, mut store) = open_store();
    let [title, division, _, ch9, art2] = build_hierarchy(&mut store);

    let path = store.get_path_to_root(art2).unwrap();
    let ids: Vec<i64> = path.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![title, division, ch9, art2]);

    // Read from the node towards the root, depth strictly decreases
    for pair in path.windows(2) {
        assert!(pair[0].depth < pair[1].depth);
    }
    assert!(path[0].parent_id.is_none());

    assert!(store.get_path_to_root(9999).unwrap().is_empty());
}

#[test]
fn test_structurally_absent_ids_are_empty() {
    let (_dir, store) = open_store();

    assert!(store.get_parent(42).unwrap().is_none());
    assert!(store.get_children(42).unwrap().is_empty());
    assert!(store.get_siblings(42).unwrap().is_empty());
    assert!(store.get_outgoing_links(42).unwrap().is_empty());
    assert!(store.get_node(42).unwrap().is_none());
    assert_eq!(store.get_full_content(42).unwrap(), "");
}

#[test]
fn test_tree_depth_bound() {
    let (_dir, mut store) = open_store();
    let [title, ..] = build_hierarchy(&mut store);

    let full = store.get_tree(10).unwrap();
    assert_eq!(full.len(), 1);
    assert_eq!(full[0].id, title);
    let chapters: Vec<&str> = full[0].children[0]
        .children
        .iter()
        .map(|n| n.title.as_str())
        .collect();
    assert_eq!(chapters, vec!["Chapter 1", "Chapter 9"]);
    assert_eq!(full[0].children[0].children[1].children[0].title, "Article 2");

    let shallow = store.get_tree(1).unwrap();
    assert_eq!(shallow[0].children.len(), 1);
    assert!(shallow[0].children[0].children.is_empty());
}

#[test]
fn test_lexical_index_follows_updates() {
    let (_dir, mut store) = open_store();
    let mut draft = node("https://regs.example.gov/s1", "Section 2480", 1, None);
    draft.body = "Idling of commercial vehicles is limited to five minutes.";
    let id = store.upsert_node(&draft).unwrap();

    assert_eq!(store.lexical_search("idling", 5).unwrap()[0].id, id);

    draft.body = "Repealed. See section 2485 for school bus requirements.";
    store.upsert_node(&draft).unwrap();

    assert!(store.lexical_search("idling", 5).unwrap().is_empty());
    let hits = store.lexical_search("school bus", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].snippet.contains("<b>"));
}

#[test]
fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atlas.db");

    let ids = {
        let mut store = SqliteGraphStore::open(&path).unwrap();
        let ids = build_hierarchy(&mut store);
        store.insert_edge(ids[0], ids[1], "Division 3").unwrap();
        store.close().unwrap();
        ids
    };

    let store = SqliteGraphStore::open(&path).unwrap();
    let stats = store.get_stats().unwrap();
    assert_eq!((stats.pages, stats.edges, stats.max_depth), (5, 1, 3));
    assert_eq!(store.get_path_to_root(ids[4]).unwrap().len(), 4);
    assert_eq!(store.lexical_search("certification", 10).unwrap().len(), 5);
}

#[test]
fn test_crawl_status() {
    let (_dir, mut store) = open_store();
    build_hierarchy(&mut store);
    let mut failed = node("https://regs.example.gov/gone", "", 1, None);
    failed.body = "";
    failed.status = NodeStatus::Error;
    store.upsert_node(&failed).unwrap();

    let status = store.get_crawl_status().unwrap();
    assert_eq!(status.total_pages, 6);
    assert_eq!(status.errors, 1);
    assert_eq!(status.by_depth, vec![(0, 1), (1, 2), (2, 2), (3, 1)]);
    assert_eq!(status.recent.len(), 6);
}
