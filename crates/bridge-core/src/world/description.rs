use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct NodeId(pub usize);

/// One UI node of a card's description box.
///
/// The engine builds these as nested rows of text widgets. Nodes may be shared between parents
/// and may point back at an ancestor, so consumers must not assume a tree.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DescNode {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Row containers end a visual line.
    #[serde(default)]
    pub row: bool,
}

/// Arena of description nodes plus the entry point of the box.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DescriptionGraph {
    #[serde(default)]
    pub root: Option<NodeId>,
    #[serde(default)]
    pub nodes: Vec<DescNode>,
}

impl DescriptionGraph {
    pub fn node(&self, id: NodeId) -> Option<&DescNode> {
        self.nodes.get(id.0)
    }

    pub fn push(&mut self, node: DescNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(child);
        }
    }

    /// Builds the common shape: a root column holding one row per line, each row one text node.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut graph = Self::default();
        let root = graph.push(DescNode::default());
        graph.root = Some(root);
        for line in lines {
            let text = graph.push(DescNode {
                text: Some(line.as_ref().to_string()),
                ..DescNode::default()
            });
            let row = graph.push(DescNode {
                text: None,
                children: vec![text],
                row: true,
            });
            graph.link(root, row);
        }
        graph
    }
}
