//! Wizard traversal: a walk from root following chosen options.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::entities::{Node, Tree, TreeKey, ROOT_ID};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::graph::steps_remaining;

/// Shareable wizard position: tree identity plus option indices chosen from root.
///
/// Text form is `<treeKey>:<i>,<j>,...`, e.g. `pos:0,2,1` or `neg:` at root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub tree: TreeKey,
    pub choices: Vec<usize>,
}

impl Position {
    pub fn root(tree: TreeKey) -> Self {
        Self {
            tree,
            choices: Vec::new(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tree, self.choices.iter().join(","))
    }
}

impl FromStr for Position {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| DomainError::InvalidPosition {
            code: s.to_string(),
            reason: reason.to_string(),
        };

        let (key, list) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' separator"))?;
        let tree: TreeKey = key.parse().map_err(|_| invalid("unknown tree key"))?;

        let choices = if list.trim().is_empty() {
            Vec::new()
        } else {
            list.split(',')
                .map(|c| c.trim().parse::<usize>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid("choices must be non-negative integers"))?
        };

        Ok(Self { tree, choices })
    }
}

/// Ordered history of visited nodes from root to the current node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    history: Vec<String>,
    choices: Vec<usize>,
}

impl Walk {
    /// Starts at root; fails when the tree has none.
    pub fn start(tree: &Tree) -> DomainResult<Self> {
        if !tree.has_root() {
            return Err(DomainError::MissingRoot);
        }
        Ok(Self {
            history: vec![ROOT_ID.to_string()],
            choices: Vec::new(),
        })
    }

    /// Rebuilds a walk by re-resolving each stored choice against `tree`.
    ///
    /// Stops at the first choice that no longer resolves and keeps the prefix.
    #[instrument(level = "debug", skip(tree))]
    pub fn replay(tree: &Tree, choices: &[usize]) -> DomainResult<Self> {
        let mut walk = Self::start(tree)?;
        for (step, &choice) in choices.iter().enumerate() {
            if !walk.choose(tree, choice) {
                debug!(
                    "replay: choice {} at step {} no longer resolves, stopping",
                    choice, step
                );
                break;
            }
        }
        Ok(walk)
    }

    pub fn current_id(&self) -> &str {
        self.history.last().map(String::as_str).unwrap_or(ROOT_ID)
    }

    pub fn current<'t>(&self, tree: &'t Tree) -> Option<&'t Node> {
        tree.get(self.current_id())
    }

    /// Visited node ids, root first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn choices(&self) -> &[usize] {
        &self.choices
    }

    pub fn steps_done(&self) -> usize {
        self.history.len() - 1
    }

    /// Follows option `index` of the current node.
    ///
    /// Returns `false` and leaves the walk unchanged when the current node is
    /// not a decision, the index is out of range or the target does not exist.
    pub fn choose(&mut self, tree: &Tree, index: usize) -> bool {
        let Some(node) = self.current(tree) else {
            return false;
        };
        let Some(option) = node.options().get(index) else {
            return false;
        };
        if option.next_id.is_empty() || !tree.contains(&option.next_id) {
            return false;
        }
        self.history.push(option.next_id.clone());
        self.choices.push(index);
        true
    }

    /// Pops the last step; no-op at root.
    pub fn back(&mut self) -> bool {
        if self.history.len() <= 1 {
            return false;
        }
        self.history.pop();
        self.choices.pop();
        true
    }

    /// Truncates to the breadcrumb at `index` (0 = root).
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.history.len() {
            return false;
        }
        self.history.truncate(index + 1);
        self.choices.truncate(index);
        true
    }

    pub fn reset(&mut self) {
        self.history.truncate(1);
        self.choices.clear();
    }

    pub fn position(&self, tree: TreeKey) -> Position {
        Position {
            tree,
            choices: self.choices.clone(),
        }
    }

    /// Progress display for the current node.
    pub fn progress(&self, tree: &Tree) -> DomainResult<Progress> {
        let done = self.steps_done();
        match self.current(tree) {
            Some(node) if node.is_result() => Ok(Progress::Complete { steps_done: done }),
            _ => {
                let steps = steps_remaining(tree, self.current_id())?;
                Ok(Progress::Running {
                    steps_done: done,
                    min_remaining: steps.min,
                    max_remaining: steps.max,
                })
            }
        }
    }
}

/// Progress bar state of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Progress {
    Complete {
        steps_done: usize,
    },
    Running {
        steps_done: usize,
        min_remaining: usize,
        max_remaining: usize,
    },
}

impl Progress {
    /// Optimistic completion: done / (done + min remaining), capped at 100.
    pub fn percent(&self) -> u8 {
        match *self {
            Progress::Complete { .. } => 100,
            Progress::Running {
                steps_done,
                min_remaining,
                ..
            } => {
                let total = (steps_done + min_remaining).max(1) as f64;
                let pct = (steps_done as f64 / total * 100.0).round();
                pct.min(100.0) as u8
            }
        }
    }

    pub fn remaining_text(&self) -> String {
        match *self {
            Progress::Complete { .. } => "Organism identified".to_string(),
            Progress::Running {
                min_remaining: min,
                max_remaining: max,
                ..
            } => {
                if min == max {
                    format!("{} test{} remaining", min, if min == 1 { "" } else { "s" })
                } else {
                    format!("{min}-{max} tests remaining")
                }
            }
        }
    }
}
