//! Text rendering of a decision tree for terminal display.

use std::collections::HashSet;

use termtree::Tree as TextTree;
use tracing::instrument;

use crate::domain::entities::{Node, Tree};

pub trait TreeRender {
    fn to_tree_string(&self) -> TextTree<String>;
}

fn node_text(node: &Node) -> String {
    match node.organism() {
        Some(organism) if !organism.is_empty() => {
            format!("{} [{}] => {}", node.label, node.id, organism)
        }
        Some(_) => format!("{} [{}] => (no organism)", node.label, node.id),
        None => format!("{} [{}]", node.label, node.id),
    }
}

impl TreeRender for Tree {
    /// Renders everything reachable from root.
    ///
    /// A node already expanded elsewhere is shown once and marked on later
    /// references; back-edges into the current path are marked as cycles.
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> TextTree<String> {
        let Some(root) = self.root() else {
            return TextTree::new("Empty tree (no root)".to_string());
        };

        fn build(
            tree: &Tree,
            node: &Node,
            on_path: &mut Vec<String>,
            expanded: &mut HashSet<String>,
        ) -> TextTree<String> {
            let mut text = TextTree::new(node_text(node));
            expanded.insert(node.id.clone());
            on_path.push(node.id.clone());

            for option in node.options() {
                let prefix = if option.label.is_empty() {
                    "(no label)".to_string()
                } else {
                    option.label.clone()
                };
                let target = option.next_id.as_str();
                let leaf = if target.is_empty() {
                    Some(format!("{prefix} -> (unset)"))
                } else if on_path.iter().any(|p| p == target) {
                    Some(format!("{prefix} -> {target} (cycle)"))
                } else if expanded.contains(target) {
                    Some(format!("{prefix} -> {target} (see above)"))
                } else {
                    None
                };

                match (leaf, tree.get(target)) {
                    (Some(line), _) => {
                        text.push(TextTree::new(line));
                    }
                    (None, None) => {
                        text.push(TextTree::new(format!("{prefix} -> {target} (missing)")));
                    }
                    (None, Some(child)) => {
                        let mut sub = build(tree, child, on_path, expanded);
                        sub.root = format!("{prefix} -> {}", sub.root);
                        text.push(sub);
                    }
                }
            }

            on_path.pop();
            text
        }

        let mut on_path = Vec::new();
        let mut expanded = HashSet::new();
        build(self, root, &mut on_path, &mut expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{DecisionOption, ROOT_ID};

    #[test]
    fn renders_labels_and_markers() {
        let tree = Tree::from_nodes([
            Node::decision(
                ROOT_ID,
                "Catalase",
                "Bubbles?",
                vec![
                    DecisionOption::new("Yes", "staph"),
                    DecisionOption::new("No", ROOT_ID),
                    DecisionOption::new("Maybe", ""),
                ],
            ),
            Node::result("staph", "Staphylococcus", "S. aureus"),
        ]);

        let text = tree.to_tree_string().to_string();

        assert!(text.contains("Catalase [root]"));
        assert!(text.contains("Yes -> Staphylococcus [staph] => S. aureus"));
        assert!(text.contains("No -> root (cycle)"));
        assert!(text.contains("Maybe -> (unset)"));
    }

    #[test]
    fn marks_shared_and_missing_targets() {
        let tree = Tree::from_nodes([
            Node::decision(
                ROOT_ID,
                "Start",
                "Shape?",
                vec![
                    DecisionOption::new("Cocci", "staph"),
                    DecisionOption::new("Clusters", "staph"),
                    DecisionOption::new("Rods", "ghost"),
                ],
            ),
            Node::result("staph", "Staphylococcus", "S. aureus"),
        ]);

        let text = tree.to_tree_string().to_string();

        assert!(text.contains("Cocci -> Staphylococcus [staph]"));
        assert!(text.contains("Clusters -> staph (see above)"));
        assert!(text.contains("Rods -> ghost (missing)"));
    }
}
