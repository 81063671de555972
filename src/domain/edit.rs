//! Tree mutations.
//!
//! Every operation takes the current tree by reference and returns a new
//! snapshot; a failed operation leaves the caller's tree untouched.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::entities::{DecisionOption, Node, NodeKind, NodeType, Tree, ROOT_ID};
use crate::domain::error::{DomainError, DomainResult};

/// Partial node update; `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePatch {
    #[serde(rename = "type")]
    pub node_type: Option<NodeType>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub question: Option<String>,
    pub options: Option<Vec<DecisionOption>>,
    pub organism: Option<String>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        self == &NodePatch::default()
    }
}

impl From<&Node> for NodePatch {
    /// Full patch carrying only the fields of the node's own variant.
    fn from(node: &Node) -> Self {
        let mut patch = NodePatch {
            node_type: Some(node.node_type()),
            label: Some(node.label.clone()),
            description: Some(node.description.clone()),
            ..NodePatch::default()
        };
        match &node.kind {
            NodeKind::Decision { question, options } => {
                patch.question = Some(question.clone());
                patch.options = Some(options.clone());
            }
            NodeKind::Result { organism } => patch.organism = Some(organism.clone()),
        }
        patch
    }
}

/// Direction for [`move_option`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

fn invalid_id_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("static pattern"))
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_node_id(raw: &str) -> String {
    invalid_id_chars().replace_all(raw.trim(), "_").into_owned()
}

pub fn validate_node_id(id: &str) -> DomainResult<()> {
    if id.is_empty() {
        return Err(DomainError::InvalidNodeId {
            id: id.to_string(),
            reason: "ID cannot be empty".to_string(),
        });
    }
    if invalid_id_chars().is_match(id) {
        return Err(DomainError::InvalidNodeId {
            id: id.to_string(),
            reason: "only letters, digits and '_' are allowed".to_string(),
        });
    }
    Ok(())
}

fn fresh_id(tree: &Tree) -> String {
    loop {
        let candidate = format!("node_{}", &Uuid::new_v4().simple().to_string()[..8]);
        if !tree.contains(&candidate) {
            return candidate;
        }
    }
}

/// Inserts a blank result node under a fresh id.
#[instrument(level = "debug", skip(tree))]
pub fn add_node(tree: &Tree) -> (Tree, String) {
    let id = fresh_id(tree);
    let mut next = tree.clone();
    next.insert(Node::result(id.clone(), "New Node", ""));
    debug!("add_node: {}", id);
    (next, id)
}

/// Shallow-merges `patch` into node `id`.
///
/// Switching type resets the variant payload (question and options, or
/// organism) before the remaining fields are applied.
#[instrument(level = "debug", skip(tree))]
pub fn update_node(tree: &Tree, id: &str, patch: &NodePatch) -> DomainResult<Tree> {
    let mut node = tree
        .get(id)
        .cloned()
        .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))?;

    if let Some(node_type) = patch.node_type {
        if node_type != node.node_type() {
            node.kind = match node_type {
                NodeType::Decision => NodeKind::Decision {
                    question: String::new(),
                    options: Vec::new(),
                },
                NodeType::Result => NodeKind::Result {
                    organism: String::new(),
                },
            };
        }
    }
    if let Some(label) = &patch.label {
        node.label = label.clone();
    }
    if let Some(description) = &patch.description {
        node.description = description.clone();
    }

    let not_applicable = |field: &'static str, node_type: NodeType| DomainError::FieldNotApplicable {
        id: id.to_string(),
        field,
        node_type: node_type.as_str(),
    };

    match &mut node.kind {
        NodeKind::Decision { question, options } => {
            if patch.organism.is_some() {
                return Err(not_applicable("organism", NodeType::Decision));
            }
            if let Some(q) = &patch.question {
                *question = q.clone();
            }
            if let Some(o) = &patch.options {
                *options = o.clone();
            }
        }
        NodeKind::Result { organism } => {
            if patch.question.is_some() {
                return Err(not_applicable("question", NodeType::Result));
            }
            if patch.options.is_some() {
                return Err(not_applicable("options", NodeType::Result));
            }
            if let Some(o) = &patch.organism {
                *organism = o.clone();
            }
        }
    }

    let mut next = tree.clone();
    next.insert(node);
    Ok(next)
}

/// Removes node `id`; every option that pointed at it is cleared, not removed.
#[instrument(level = "debug", skip(tree))]
pub fn delete_node(tree: &Tree, id: &str) -> DomainResult<Tree> {
    if id == ROOT_ID {
        return Err(DomainError::CannotDeleteRoot);
    }
    if !tree.contains(id) {
        return Err(DomainError::NodeNotFound(id.to_string()));
    }

    let mut next = tree.clone();
    next.remove(id);
    for node in next.nodes_mut() {
        if let Some(options) = node.options_mut() {
            for option in options.iter_mut().filter(|o| o.next_id == id) {
                option.next_id.clear();
            }
        }
    }
    Ok(next)
}

/// Renames `old_id` to `new_id`, rewriting the key, the embedded id and every
/// reference in one snapshot.
///
/// A collision with an existing id is an error and the tree stays unchanged.
#[instrument(level = "debug", skip(tree))]
pub fn rename_node(tree: &Tree, old_id: &str, new_id: &str) -> DomainResult<Tree> {
    if old_id == new_id {
        return Ok(tree.clone());
    }
    if old_id == ROOT_ID {
        return Err(DomainError::CannotRenameRoot);
    }
    validate_node_id(new_id)?;
    if !tree.contains(old_id) {
        return Err(DomainError::NodeNotFound(old_id.to_string()));
    }
    if tree.contains(new_id) {
        return Err(DomainError::NodeExists(new_id.to_string()));
    }

    let renamed = tree.nodes().cloned().map(|mut node| {
        if node.id == old_id {
            node.id = new_id.to_string();
        }
        if let Some(options) = node.options_mut() {
            for option in options.iter_mut().filter(|o| o.next_id == old_id) {
                option.next_id = new_id.to_string();
            }
        }
        node
    });
    Ok(Tree::from_nodes(renamed))
}

/// Replaces node `id` with `node`, renaming first when the ids differ.
///
/// The type may change freely; fields of the previous variant are dropped.
#[instrument(level = "debug", skip(tree, node))]
pub fn replace_node(tree: &Tree, id: &str, node: &Node) -> DomainResult<Tree> {
    if !tree.contains(id) {
        return Err(DomainError::NodeNotFound(id.to_string()));
    }
    let renamed = rename_node(tree, id, &node.id)?;
    update_node(&renamed, &node.id, &NodePatch::from(node))
}

/// Ids of nodes holding at least one option that targets `id`.
pub fn references_to(tree: &Tree, id: &str) -> Vec<String> {
    tree.nodes()
        .filter(|n| n.targets().any(|t| t == id))
        .map(|n| n.id.clone())
        .collect()
}

fn with_options<F>(tree: &Tree, id: &str, f: F) -> DomainResult<Tree>
where
    F: FnOnce(&mut Vec<DecisionOption>) -> DomainResult<()>,
{
    let mut next = tree.clone();
    let node = next
        .get_mut(id)
        .ok_or_else(|| DomainError::NodeNotFound(id.to_string()))?;
    let options = node.options_mut().ok_or_else(|| DomainError::FieldNotApplicable {
        id: id.to_string(),
        field: "options",
        node_type: NodeType::Result.as_str(),
    })?;
    f(options)?;
    Ok(next)
}

/// Appends a blank option; returns the new tree and the option index.
pub fn add_option(tree: &Tree, id: &str) -> DomainResult<(Tree, usize)> {
    let mut index = 0;
    let next = with_options(tree, id, |options| {
        options.push(DecisionOption::default());
        index = options.len() - 1;
        Ok(())
    })?;
    Ok((next, index))
}

/// Updates label and/or target of option `index`.
pub fn set_option(
    tree: &Tree,
    id: &str,
    index: usize,
    label: Option<&str>,
    next_id: Option<&str>,
) -> DomainResult<Tree> {
    with_options(tree, id, |options| {
        let option = options
            .get_mut(index)
            .ok_or_else(|| DomainError::OptionOutOfRange {
                id: id.to_string(),
                index,
            })?;
        if let Some(label) = label {
            option.label = label.to_string();
        }
        if let Some(next_id) = next_id {
            option.next_id = next_id.to_string();
        }
        Ok(())
    })
}

pub fn remove_option(tree: &Tree, id: &str, index: usize) -> DomainResult<Tree> {
    with_options(tree, id, |options| {
        if index >= options.len() {
            return Err(DomainError::OptionOutOfRange {
                id: id.to_string(),
                index,
            });
        }
        options.remove(index);
        Ok(())
    })
}

/// Swaps option `index` with its neighbour; moving past either end is a no-op.
pub fn move_option(
    tree: &Tree,
    id: &str,
    index: usize,
    direction: MoveDirection,
) -> DomainResult<Tree> {
    with_options(tree, id, |options| {
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1),
        };
        if let Some(target) = target {
            if index < options.len() && target < options.len() {
                options.swap(index, target);
            }
        }
        Ok(())
    })
}
