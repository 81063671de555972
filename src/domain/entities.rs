//! Domain entities: core data structures

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Reserved id of the mandatory entry-point node.
pub const ROOT_ID: &str = "root";

/// Labelled outgoing edge of a decision node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecisionOption {
    #[serde(default)]
    pub label: String,
    /// Target node id; empty while unset, may dangle while editing
    #[serde(rename = "nextId", default)]
    pub next_id: String,
}

impl DecisionOption {
    pub fn new(label: impl Into<String>, next_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            next_id: next_id.into(),
        }
    }
}

/// Variant payload of a node. Serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    /// Asks a question and branches
    Decision {
        #[serde(default)]
        question: String,
        #[serde(default)]
        options: Vec<DecisionOption>,
    },
    /// Terminal, names an organism
    Result {
        #[serde(default)]
        organism: String,
    },
}

/// Discriminant of [`NodeKind`] without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Decision,
    Result,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Decision => "decision",
            NodeType::Result => "result",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decision" | "test" => Ok(NodeType::Decision),
            "result" | "organism" => Ok(NodeType::Result),
            other => Err(format!("unknown node type: {other}")),
        }
    }
}

/// One vertex of a decision tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn decision(
        id: impl Into<String>,
        label: impl Into<String>,
        question: impl Into<String>,
        options: Vec<DecisionOption>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            kind: NodeKind::Decision {
                question: question.into(),
                options,
            },
        }
    }

    pub fn result(
        id: impl Into<String>,
        label: impl Into<String>,
        organism: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            kind: NodeKind::Result {
                organism: organism.into(),
            },
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Decision { .. } => NodeType::Decision,
            NodeKind::Result { .. } => NodeType::Result,
        }
    }

    pub fn is_result(&self) -> bool {
        matches!(self.kind, NodeKind::Result { .. })
    }

    /// Options of a decision node; empty for results.
    pub fn options(&self) -> &[DecisionOption] {
        match &self.kind {
            NodeKind::Decision { options, .. } => options,
            NodeKind::Result { .. } => &[],
        }
    }

    pub fn options_mut(&mut self) -> Option<&mut Vec<DecisionOption>> {
        match &mut self.kind {
            NodeKind::Decision { options, .. } => Some(options),
            NodeKind::Result { .. } => None,
        }
    }

    pub fn question(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Decision { question, .. } => Some(question),
            NodeKind::Result { .. } => None,
        }
    }

    pub fn organism(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Result { organism } => Some(organism),
            NodeKind::Decision { .. } => None,
        }
    }

    /// Non-empty option targets, in option order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.options()
            .iter()
            .map(|o| o.next_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Mapping node id -> node, rooted at [`ROOT_ID`].
///
/// Ordered by id so that every derived listing (validation, export, graph view)
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree {
    nodes: BTreeMap<String, Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree holding a single blank root question, used when no tree file exists yet.
    pub fn starter() -> Self {
        Self::from_nodes([Node::decision(ROOT_ID, "Start", "", Vec::new())])
    }

    /// Builds a tree keyed by each node's embedded id.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(ROOT_ID)
    }

    pub fn has_root(&self) -> bool {
        self.nodes.contains_key(ROOT_ID)
    }

    /// Inserts under the node's embedded id, returning any node it replaced.
    pub fn insert(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id.clone(), node)
    }

    pub fn remove(&mut self, id: &str) -> Option<Node> {
        self.nodes.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.nodes.iter()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Identity of one of the two classification contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TreeKey {
    #[serde(rename = "pos", alias = "positive")]
    Positive,
    #[serde(rename = "neg", alias = "negative")]
    Negative,
}

impl TreeKey {
    pub const ALL: [TreeKey; 2] = [TreeKey::Positive, TreeKey::Negative];

    /// Short key used in position codes and the session store.
    pub fn as_str(&self) -> &'static str {
        match self {
            TreeKey::Positive => "pos",
            TreeKey::Negative => "neg",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TreeKey::Positive => "Gram Positive",
            TreeKey::Negative => "Gram Negative",
        }
    }
}

impl fmt::Display for TreeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TreeKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pos" | "positive" | "gram-positive" => Ok(TreeKey::Positive),
            "neg" | "negative" | "gram-negative" => Ok(TreeKey::Negative),
            other => Err(DomainError::InvalidPosition {
                code: other.to_string(),
                reason: "unknown tree key (expected pos or neg)".to_string(),
            }),
        }
    }
}

/// Both trees of an editing session; the unit captured by undo snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    pub positive: Tree,
    pub negative: Tree,
}

impl Workspace {
    pub fn new(positive: Tree, negative: Tree) -> Self {
        Self { positive, negative }
    }

    pub fn tree(&self, key: TreeKey) -> &Tree {
        match key {
            TreeKey::Positive => &self.positive,
            TreeKey::Negative => &self.negative,
        }
    }

    pub fn tree_mut(&mut self, key: TreeKey) -> &mut Tree {
        match key {
            TreeKey::Positive => &mut self.positive,
            TreeKey::Negative => &mut self.negative,
        }
    }

    pub fn replace(&mut self, key: TreeKey, tree: Tree) -> Tree {
        std::mem::replace(self.tree_mut(key), tree)
    }
}
