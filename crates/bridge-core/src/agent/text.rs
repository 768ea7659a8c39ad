use std::collections::HashSet;

use crate::world::{DescriptionGraph, NodeId};

/// Flattens a description graph into one line of text.
///
/// Every node is visited at most once per call, so shared or cyclic references terminate and
/// contribute their text exactly once. The visited set lives only for this call.
pub fn collect_text(graph: &DescriptionGraph) -> String {
    let Some(root) = graph.root else {
        return String::new();
    };
    let mut visited = HashSet::new();
    let mut out = String::new();
    collect_into(graph, root, &mut visited, &mut out);
    out.trim().to_string()
}

fn collect_into(
    graph: &DescriptionGraph,
    id: NodeId,
    visited: &mut HashSet<NodeId>,
    out: &mut String,
) {
    if !visited.insert(id) {
        return;
    }
    let Some(node) = graph.node(id) else {
        return;
    };
    if let Some(text) = node.text.as_deref() {
        out.push_str(text);
    }
    for child in &node.children {
        collect_into(graph, *child, visited, out);
    }
    if node.row && !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}

/// Substitutes `#1#`, `#2#`, ... and joins the lines with single spaces.
///
/// Only the joined result is trimmed; interior spacing of each line is kept as localized.
pub fn render_template<S: AsRef<str>>(lines: &[S], vars: &[&str]) -> String {
    let rendered: Vec<String> = lines
        .iter()
        .map(|line| {
            let mut line = line.as_ref().to_string();
            for (i, var) in vars.iter().enumerate() {
                line = line.replace(&format!("#{}#", i + 1), var);
            }
            line
        })
        .collect();
    rendered.join(" ").trim().to_string()
}
