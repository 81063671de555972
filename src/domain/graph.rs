//! Graph algorithms over a decision tree.
//!
//! | Operation        | Algorithm                           |
//! |------------------|-------------------------------------|
//! | Reachability     | BFS from root                       |
//! | Cycle detection  | DFS with on-path set                |
//! | Steps remaining  | memoized recursion, in-progress guard |
//! | Graph view       | flat node/edge lists for layout     |

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Write as _;

use serde::Serialize;
use tracing::{instrument, trace};

use crate::domain::entities::{NodeType, Tree, ROOT_ID};
use crate::domain::error::{DomainError, DomainResult};

/// Ids reachable from root by following non-empty option targets.
///
/// Missing targets are recorded but treated as leaves, so one dangling
/// reference does not abort the scan. Empty when the tree has no root.
#[instrument(level = "debug", skip(tree))]
pub fn reachable(tree: &Tree) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    if !tree.has_root() {
        return seen;
    }

    let mut queue = VecDeque::new();
    queue.push_back(ROOT_ID.to_string());

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id.clone()) {
            continue;
        }
        let Some(node) = tree.get(&id) else {
            continue;
        };
        for target in node.targets() {
            if !seen.contains(target) {
                queue.push_back(target.to_string());
            }
        }
    }

    trace!("reachable: {} of {} nodes", seen.len(), tree.len());
    seen
}

/// Ids implicated in at least one cycle reachable from root.
///
/// When the DFS meets an id that is still on the active path, every id on the
/// path from that id down to the current node is flagged.
#[instrument(level = "debug", skip(tree))]
pub fn find_cycles(tree: &Tree) -> BTreeSet<String> {
    let mut search = CycleSearch {
        tree,
        path: Vec::new(),
        on_path: HashSet::new(),
        visited: HashSet::new(),
        cyclic: BTreeSet::new(),
    };
    if tree.has_root() {
        search.visit(ROOT_ID);
    }
    search.cyclic
}

struct CycleSearch<'a> {
    tree: &'a Tree,
    path: Vec<&'a str>,
    on_path: HashSet<&'a str>,
    visited: HashSet<&'a str>,
    cyclic: BTreeSet<String>,
}

impl<'a> CycleSearch<'a> {
    fn visit(&mut self, id: &'a str) {
        if self.on_path.contains(id) {
            if let Some(start) = self.path.iter().position(|p| *p == id) {
                self.cyclic
                    .extend(self.path[start..].iter().map(|p| p.to_string()));
            }
            return;
        }
        if self.visited.contains(id) {
            return;
        }
        let Some(node) = self.tree.get(id) else {
            return;
        };

        self.path.push(id);
        self.on_path.insert(id);
        for target in node.targets() {
            self.visit(target);
        }
        self.on_path.remove(id);
        self.path.pop();
        self.visited.insert(id);
    }
}

/// Shortest and longest number of decision hops to a terminal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Steps {
    pub min: usize,
    pub max: usize,
}

impl Steps {
    pub const ZERO: Steps = Steps { min: 0, max: 0 };
}

/// Memoized steps-remaining calculation bound to one tree snapshot.
///
/// The cache lives as long as the calculator; build a new one whenever the
/// tree changes.
pub struct StepsCalculator<'a> {
    tree: &'a Tree,
    cache: HashMap<String, Steps>,
    in_progress: HashSet<String>,
}

impl<'a> StepsCalculator<'a> {
    pub fn new(tree: &'a Tree) -> Self {
        Self {
            tree,
            cache: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// `{min, max}` for `id`.
    ///
    /// Result nodes, missing nodes, empty targets and decisions without options
    /// count as `{0, 0}`. Re-entering a node that is still being computed
    /// yields [`DomainError::CycleDetected`].
    pub fn steps(&mut self, id: &str) -> DomainResult<Steps> {
        if let Some(steps) = self.cache.get(id) {
            return Ok(*steps);
        }
        let tree = self.tree;
        let node = match tree.get(id) {
            Some(node) if node.node_type() == NodeType::Decision => node,
            _ => {
                self.cache.insert(id.to_string(), Steps::ZERO);
                return Ok(Steps::ZERO);
            }
        };
        if !self.in_progress.insert(id.to_string()) {
            return Err(DomainError::CycleDetected(id.to_string()));
        }

        let mut acc: Option<Steps> = None;
        for option in node.options() {
            let child = match self.steps(&option.next_id) {
                Ok(child) => child,
                Err(e) => {
                    self.in_progress.remove(id);
                    return Err(e);
                }
            };
            acc = Some(match acc {
                None => Steps {
                    min: child.min + 1,
                    max: child.max + 1,
                },
                Some(a) => Steps {
                    min: a.min.min(child.min + 1),
                    max: a.max.max(child.max + 1),
                },
            });
        }
        self.in_progress.remove(id);

        let steps = acc.unwrap_or(Steps::ZERO);
        self.cache.insert(id.to_string(), steps);
        Ok(steps)
    }

    /// Worst-case path length from root, reusing cached entries.
    pub fn max_steps(&mut self) -> DomainResult<usize> {
        if !self.tree.has_root() {
            return Err(DomainError::MissingRoot);
        }
        Ok(self.steps(ROOT_ID)?.max)
    }
}

/// Convenience wrapper computing steps for a single node.
pub fn steps_remaining(tree: &Tree, id: &str) -> DomainResult<Steps> {
    StepsCalculator::new(tree).steps(id)
}

/// Worst-case path length from root; the progress bar denominator.
pub fn max_steps(tree: &Tree) -> DomainResult<usize> {
    StepsCalculator::new(tree).max_steps()
}

/// Node entry handed to an external layout engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
}

/// Edge entry handed to an external layout engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Flat node and edge lists; the layout engine returns positions for these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphView {
    /// Builds the view. Edges with an empty or missing target are left out.
    pub fn from_tree(tree: &Tree) -> Self {
        let nodes = tree
            .nodes()
            .map(|n| GraphNode {
                id: n.id.clone(),
                node_type: n.node_type(),
                label: n.label.clone(),
            })
            .collect();

        let mut edges = Vec::new();
        for (source, node) in tree.iter() {
            for (i, option) in node.options().iter().enumerate() {
                if option.next_id.is_empty() || !tree.contains(&option.next_id) {
                    continue;
                }
                edges.push(GraphEdge {
                    id: format!("{}-{}-{}", source, option.next_id, i),
                    source: source.clone(),
                    target: option.next_id.clone(),
                    label: option.label.clone(),
                });
            }
        }

        Self { nodes, edges }
    }

    /// Graphviz DOT rendering, top-to-bottom like the flow chart.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph decision_tree {\n  rankdir=TB;\n");
        for node in &self.nodes {
            let shape = match node.node_type {
                NodeType::Decision => "box",
                NodeType::Result => "ellipse",
            };
            let _ = writeln!(
                out,
                "  \"{}\" [label=\"{}\", shape={}];",
                dot_escape(&node.id),
                dot_escape(&node.label),
                shape
            );
        }
        for edge in &self.edges {
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [label=\"{}\"];",
                dot_escape(&edge.source),
                dot_escape(&edge.target),
                dot_escape(&edge.label)
            );
        }
        out.push_str("}\n");
        out
    }
}

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{DecisionOption, Node};

    fn diamond() -> Tree {
        Tree::from_nodes([
            Node::decision(
                ROOT_ID,
                "Root",
                "?",
                vec![DecisionOption::new("a", "a"), DecisionOption::new("b", "b")],
            ),
            Node::decision("a", "A", "?", vec![DecisionOption::new("x", "x")]),
            Node::decision(
                "b",
                "B",
                "?",
                vec![DecisionOption::new("x", "x"), DecisionOption::new("a", "a")],
            ),
            Node::result("x", "X", "Xus"),
        ])
    }

    #[test]
    fn shared_subtree_is_memoized_once() {
        let tree = diamond();
        let mut calc = StepsCalculator::new(&tree);

        assert_eq!(calc.steps("a").unwrap(), Steps { min: 1, max: 1 });
        assert_eq!(calc.steps("b").unwrap(), Steps { min: 1, max: 2 });
        assert_eq!(calc.steps(ROOT_ID).unwrap(), Steps { min: 2, max: 3 });
        assert_eq!(calc.cache.len(), 4);
    }

    #[test]
    fn diamond_has_no_cycle() {
        assert!(find_cycles(&diamond()).is_empty());
    }

    #[test]
    fn dot_output_contains_edges() {
        let dot = GraphView::from_tree(&diamond()).to_dot();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("\"root\" -> \"a\" [label=\"a\"];"));
        assert!(dot.contains("shape=ellipse"));
    }
}
