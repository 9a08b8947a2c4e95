//! Text rendering of the composed tree.

use termtree::Tree;

use crate::domain::NodeView;
use crate::infrastructure::traits::RenderAdapter;

/// Renders each composed root as a `termtree` block.
///
/// Children of collapsed nodes are hidden unless `show_collapsed` is set;
/// a hidden subtree is marked with its child count.
#[derive(Debug, Clone, Copy, Default)]
pub struct TermTreeRenderer {
    show_collapsed: bool,
    with_types: bool,
}

impl TermTreeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_collapsed(mut self, show: bool) -> Self {
        self.show_collapsed = show;
        self
    }

    pub fn with_types(mut self, show: bool) -> Self {
        self.with_types = show;
        self
    }

    fn label(&self, node: &NodeView, hidden: usize) -> String {
        let mut label = node.label.clone();
        if self.with_types {
            label.push_str(&format!(" [{}]", node.node_type()));
        }
        if hidden > 0 {
            label.push_str(&format!(" (+{})", hidden));
        }
        label
    }

    fn to_tree(&self, node: &NodeView) -> Tree<String> {
        let visible = self.show_collapsed || node.expanded;
        let hidden = if visible { 0 } else { node.children.len() };
        let mut tree = Tree::new(self.label(node, hidden));
        if visible {
            for child in &node.children {
                tree.push(self.to_tree(child));
            }
        }
        tree
    }
}

impl RenderAdapter for TermTreeRenderer {
    fn render(&self, roots: &[NodeView]) -> String {
        roots
            .iter()
            .map(|root| self.to_tree(root).to_string())
            .collect()
    }
}
