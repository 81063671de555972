//! Structural validation of a decision tree.
//!
//! Errors block "valid" status; warnings are advisory. Nothing here fails:
//! every problem is reported as data.

use std::collections::HashSet;
use std::fmt;

use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::domain::entities::{NodeType, Tree};
use crate::domain::graph::{find_cycles, reachable};

/// One structural finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    MissingRoot,
    EmptyTarget { node: String, option: usize },
    MissingTarget { node: String, target: String },
    Cycle { nodes: Vec<String> },
    EmptyDecision { node: String },
    DuplicateTarget { node: String, target: String },
    Unreachable { node: String },
}

impl Issue {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Issue::MissingRoot
                | Issue::EmptyTarget { .. }
                | Issue::MissingTarget { .. }
                | Issue::Cycle { .. }
        )
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingRoot => {
                write!(f, "No root node. The tree must have a node with id \"root\".")
            }
            Issue::EmptyTarget { node, option } => {
                write!(f, "Node \"{node}\" has an option (#{option}) with no nextId set.")
            }
            Issue::MissingTarget { node, target } => {
                write!(f, "Node \"{node}\" references missing node \"{target}\".")
            }
            Issue::Cycle { nodes } => write!(
                f,
                "Cycle detected through nodes: {}.",
                nodes.iter().map(|n| format!("\"{n}\"")).join(", ")
            ),
            Issue::EmptyDecision { node } => write!(f, "Decision node \"{node}\" has no options."),
            Issue::DuplicateTarget { node, target } => write!(
                f,
                "Node \"{node}\" has more than one option leading to \"{target}\"."
            ),
            Issue::Unreachable { node } => write!(f, "Node \"{node}\" is unreachable from root."),
        }
    }
}

/// Ordered errors and warnings for one tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    /// True only when there are neither errors nor warnings.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn push(&mut self, issue: Issue) {
        if issue.is_error() {
            self.errors.push(issue);
        } else {
            self.warnings.push(issue);
        }
    }
}

/// Runs the full validation pass.
#[instrument(level = "debug", skip(tree))]
pub fn validate(tree: &Tree) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !tree.has_root() {
        report.push(Issue::MissingRoot);
        return report;
    }

    let reachable = reachable(tree);

    for (id, node) in tree.iter() {
        for (i, option) in node.options().iter().enumerate() {
            if option.next_id.is_empty() {
                report.push(Issue::EmptyTarget {
                    node: id.clone(),
                    option: i,
                });
            } else if !tree.contains(&option.next_id) {
                report.push(Issue::MissingTarget {
                    node: id.clone(),
                    target: option.next_id.clone(),
                });
            }
        }

        if node.node_type() == NodeType::Decision && node.options().is_empty() {
            report.push(Issue::EmptyDecision { node: id.clone() });
        }

        let mut seen = HashSet::new();
        if let Some(dup) = node.targets().find(|t| !seen.insert(*t)) {
            report.push(Issue::DuplicateTarget {
                node: id.clone(),
                target: dup.to_string(),
            });
        }

        if !reachable.contains(id) {
            report.push(Issue::Unreachable { node: id.clone() });
        }
    }

    let cyclic = find_cycles(tree);
    if !cyclic.is_empty() {
        report.push(Issue::Cycle {
            nodes: cyclic.into_iter().collect(),
        });
    }

    debug!(
        "validate: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );
    report
}
