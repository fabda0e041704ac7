//! Markdown hierarchy export
//!
//! This module writes the document hierarchy as a nested markdown outline,
//! one linked list item per document.

use crate::storage::{GraphStore, TreeNode};
use crate::AtlasError;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the hierarchy down to `max_depth` levels as a markdown outline
///
/// # Returns
///
/// * `Ok(usize)` - Number of documents written
/// * `Err(AtlasError)` - The store query or the file write failed
pub fn export_tree<S: GraphStore + ?Sized>(
    store: &S,
    max_depth: u32,
    output_path: &Path,
) -> Result<usize, AtlasError> {
    let roots = store.get_tree(max_depth)?;
    let (markdown, count) = format_tree_markdown(&roots);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(count)
}

/// Formats a forest as a markdown outline
///
/// Returns the outline and the number of documents in it. Walks with an
/// explicit stack so deep hierarchies cannot exhaust the call stack.
pub fn format_tree_markdown(roots: &[TreeNode]) -> (String, usize) {
    let mut md = String::from("# Document Hierarchy\n\n");
    let mut count = 0;

    let mut stack: Vec<(&TreeNode, usize)> = roots.iter().rev().map(|node| (node, 0)).collect();
    while let Some((node, level)) = stack.pop() {
        let title = if node.title.is_empty() {
            "Untitled"
        } else {
            &node.title
        };
        md.push_str(&format!(
            "{}- [{}]({})\n",
            "  ".repeat(level),
            escape_brackets(title),
            node.address
        ));
        count += 1;

        stack.extend(node.children.iter().rev().map(|child| (child, level + 1)));
    }

    if count == 0 {
        md.push_str("_No documents crawled yet._\n");
    }

    (md, count)
}

fn escape_brackets(title: &str) -> String {
    title.replace('[', "\\[").replace(']', "\\]")
}
