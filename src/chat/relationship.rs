//! Structural answers from the document hierarchy
//!
//! These are answered from the graph store alone, without an answer
//! generator.

use super::subject::extract_subject;
use crate::storage::{GraphStore, LinkRecord, NodeSummary, StorageResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

const MAX_CHILDREN_SHOWN: usize = 20;
const MAX_SIBLINGS_SHOWN: usize = 15;
const MAX_LINKS_SHOWN: usize = 15;
const TITLE_MATCH_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationKind {
    Parent,
    Children,
    Siblings,
    Path,
    Links,
}

/// Checked in order; the first keyword found picks the relation
static RELATION_KEYWORDS: Lazy<Vec<(RelationKind, Regex)>> = Lazy::new(|| {
    [
        (RelationKind::Parent, r"\bparent\b"),
        (RelationKind::Children, r"\bchildren?\b"),
        (RelationKind::Siblings, r"\bsiblings?\b"),
        (
            RelationKind::Path,
            r"\bpath\b|\bhierarchy\b|\bwhere\b|\bsits?\b|\bbelong\b|\babove\b|\bbelow\b",
        ),
        (RelationKind::Links, r"\blinks?\b"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("valid regex")))
    .collect()
});

/// What was found around the subject document
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// None when the subject is a root
    Parent(Option<NodeSummary>),
    Children(Vec<NodeSummary>),
    Siblings(Vec<NodeSummary>),
    /// Root first, ending at the subject
    Path(Vec<NodeSummary>),
    Links(Vec<LinkRecord>),
    /// No specific relation was asked for
    Context {
        parent: Option<NodeSummary>,
        child_count: usize,
    },
}

/// A hierarchy answer for one subject document
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralAnswer {
    /// Subject text extracted from the query
    pub subject: String,

    /// First document whose title matched the subject
    pub focus: NodeSummary,

    /// How many documents matched the subject (capped)
    pub match_count: usize,

    pub relation: Relation,
}

/// Answers a structural query, or returns `None` when no document title
/// matches its subject
pub fn answer_relationship<S>(query: &str, store: &S) -> StorageResult<Option<StructuralAnswer>>
where
    S: GraphStore + ?Sized,
{
    let subject = extract_subject(query);
    let matches = store.find_nodes_by_title(&subject, TITLE_MATCH_LIMIT)?;
    let match_count = matches.len();
    let Some(focus) = matches.into_iter().next() else {
        return Ok(None);
    };

    let lowered = query.to_lowercase();
    let kind = RELATION_KEYWORDS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&lowered))
        .map(|(kind, _)| *kind);

    let relation = match kind {
        Some(RelationKind::Parent) => Relation::Parent(store.get_parent(focus.id)?),
        Some(RelationKind::Children) => Relation::Children(store.get_children(focus.id)?),
        Some(RelationKind::Siblings) => Relation::Siblings(store.get_siblings(focus.id)?),
        Some(RelationKind::Path) => Relation::Path(store.get_path_to_root(focus.id)?),
        Some(RelationKind::Links) => Relation::Links(store.get_outgoing_links(focus.id)?),
        None => Relation::Context {
            parent: store.get_parent(focus.id)?,
            child_count: store.get_children(focus.id)?.len(),
        },
    };

    Ok(Some(StructuralAnswer {
        subject,
        focus,
        match_count,
        relation,
    }))
}

impl StructuralAnswer {
    /// Renders the answer as markdown
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        self.write_markdown(&mut out)
            .expect("writing to a String cannot fail");
        out
    }

    fn write_markdown(&self, out: &mut String) -> std::fmt::Result {
        let title = display_title(&self.focus.title);
        self.write_relation(out, title)?;

        if self.match_count > 1 {
            write!(
                out,
                "\n\n_Note: Found {} documents matching '{}'. Showing results for the first match: '{}'._",
                self.match_count, self.subject, title
            )?;
        }

        Ok(())
    }

    fn write_relation(&self, out: &mut String, title: &str) -> std::fmt::Result {
        match &self.relation {
            Relation::Parent(Some(parent)) => {
                writeln!(out, "**Parent of '{}':**", title)?;
                write_node(out, parent, "")?;
            }
            Relation::Parent(None) => {
                write!(out, "**'{}'** has no parent. It is a root node.", title)?;
            }
            Relation::Children(children) if children.is_empty() => {
                write!(out, "**'{}'** has no children indexed yet.", title)?;
            }
            Relation::Children(children) => {
                writeln!(out, "**Children of '{}' ({} total):**", title, children.len())?;
                for child in children.iter().take(MAX_CHILDREN_SHOWN) {
                    write_node(out, child, "  ")?;
                }
                if children.len() > MAX_CHILDREN_SHOWN {
                    writeln!(out, "  _(and {} more)_", children.len() - MAX_CHILDREN_SHOWN)?;
                }
            }
            Relation::Siblings(siblings) if siblings.is_empty() => {
                write!(out, "No siblings found for **'{}'**.", title)?;
            }
            Relation::Siblings(siblings) => {
                writeln!(out, "**Siblings of '{}' ({} total):**", title, siblings.len())?;
                for sibling in siblings.iter().take(MAX_SIBLINGS_SHOWN) {
                    write_node(out, sibling, "  ")?;
                }
            }
            Relation::Path(path) if path.is_empty() => {
                write!(out, "Could not determine path for **'{}'**.", title)?;
            }
            Relation::Path(path) => {
                writeln!(out, "**Path from root to '{}':**", title)?;
                for (level, node) in path.iter().enumerate() {
                    writeln!(
                        out,
                        "{}- **{}**",
                        "  ".repeat(level),
                        display_title(&node.title)
                    )?;
                }
            }
            Relation::Links(links) if links.is_empty() => {
                write!(out, "No outgoing links indexed for **'{}'**.", title)?;
            }
            Relation::Links(links) => {
                writeln!(out, "**Links from '{}' ({} total):**", title, links.len())?;
                for link in links.iter().take(MAX_LINKS_SHOWN) {
                    let label = [&link.link_text, &link.title, &link.address]
                        .into_iter()
                        .find(|s| !s.is_empty())
                        .map_or("", |s| s.as_str());
                    writeln!(out, "  - {}", label)?;
                }
            }
            Relation::Context {
                parent,
                child_count,
            } => {
                writeln!(out, "**'{}'** hierarchy context:", title)?;
                if let Some(parent) = parent {
                    writeln!(out, "  Parent: **{}**", display_title(&parent.title))?;
                }
                writeln!(out, "  Children: {}", child_count)?;
                writeln!(out, "  Depth: {}", self.focus.depth)?;
                writeln!(out, "  URL: {}", self.focus.address)?;
            }
        }
        Ok(())
    }
}

fn write_node(out: &mut String, node: &NodeSummary, indent: &str) -> std::fmt::Result {
    writeln!(out, "{}- **{}**", indent, display_title(&node.title))?;
    writeln!(out, "{}  {}", indent, node.address)
}

fn display_title(title: &str) -> &str {
    if title.is_empty() {
        "Untitled"
    } else {
        title
    }
}
