//! AST linearization
//!
//! Flattens a parsed tree into `NodeRow`s via a pre-order walk. Each
//! emitted node gets a 1-based ordinal dense within the file; its
//! parent ordinal is the top of a stack of enclosing emitted nodes, so
//! `parent_ordinal < ordinal` always holds and the file root is ordinal
//! 1 with no parent. Rows are plain values keyed by `(file_id,
//! ordinal)`; nothing from the parser outlives the walk.

use tree_sitter::{Node, Tree};

use super::kinds::kind_label;
use crate::types::NodeRow;

/// Result of linearizing one file.
#[derive(Debug, Default)]
pub struct Linearized {
    pub rows: Vec<NodeRow>,
    pub pkg_name: String,
    /// Position-tagged message when the tree contains syntax errors
    pub parse_error: Option<String>,
}

pub fn linearize(file_id: i64, rel_path: &str, source: &[u8], tree: &Tree) -> Linearized {
    let mut out = Linearized {
        rows: Vec::with_capacity(256),
        ..Default::default()
    };
    // Stack of ordinals of emitted ancestors; a parallel stack records
    // whether the node under the cursor produced a row.
    let mut parents: Vec<i32> = Vec::with_capacity(64);
    let mut emitted: Vec<bool> = Vec::with_capacity(64);
    let mut ord: i32 = 0;

    let mut cursor = tree.walk();
    'walk: loop {
        let node = cursor.node();

        if node.kind() == "package_clause" {
            if let Some(ident) = node.named_child(0) {
                out.pkg_name = text_of(&ident, source);
            }
        }

        let produced = match kind_label(&node) {
            Some(label) => {
                ord += 1;
                out.rows.push(make_row(file_id, ord, parents.last().copied(), label, &node, source));
                parents.push(ord);
                true
            }
            None => false,
        };
        emitted.push(produced);

        if cursor.goto_first_child() {
            continue 'walk;
        }
        loop {
            if emitted.pop() == Some(true) {
                parents.pop();
            }
            if cursor.goto_next_sibling() {
                continue 'walk;
            }
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    if tree.root_node().has_error() {
        let (line, col) = first_error_position(tree.root_node());
        out.parse_error = Some(format!("{}:{}:{}: syntax error", rel_path, line, col));
    }
    out
}

fn make_row(
    file_id: i64,
    ordinal: i32,
    parent_ordinal: Option<i32>,
    label: &'static str,
    node: &Node,
    source: &[u8],
) -> NodeRow {
    let sp = node.start_position();
    let ep = node.end_position();
    NodeRow {
        file_id,
        ordinal,
        parent_ordinal,
        kind: label.to_string(),
        node_text: node_text(label, node, source),
        pos: node.start_byte() as i32 + 1,
        end: node.end_byte() as i32 + 1,
        start_line: sp.row as i32 + 1,
        start_col: sp.column as i32 + 1,
        end_line: ep.row as i32 + 1,
        end_col: ep.column as i32 + 1,
        start_offset: node.start_byte() as i32,
        end_offset: node.end_byte() as i32,
    }
}

/// Identifiers keep their name, literals their raw lexeme (quotes
/// included), import specs the quoted import path. Everything else is
/// left empty to keep the table compact.
fn node_text(label: &str, node: &Node, source: &[u8]) -> String {
    match label {
        "*ast.Ident" | "*ast.BasicLit" => text_of(node, source),
        "*ast.ImportSpec" => node
            .child_by_field_name("path")
            .map(|p| text_of(&p, source))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn text_of(node: &Node, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_string()
}

fn first_error_position(node: Node) -> (usize, usize) {
    if let Some(err) = find_error_node(node) {
        let p = err.start_position();
        (p.row + 1, p.column + 1)
    } else {
        (1, 1)
    }
}

fn find_error_node(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(find_error_node)
}
