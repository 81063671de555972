//! Export/import of a tree as a JSON object keyed by node id.

use std::collections::BTreeMap;

use tracing::instrument;

use crate::domain::entities::{Node, Tree};
use crate::domain::error::{DomainError, DomainResult};

/// Serializes `tree`; a tree without root cannot be exported.
#[instrument(level = "debug", skip(tree))]
pub fn export_tree(tree: &Tree) -> DomainResult<String> {
    if !tree.has_root() {
        return Err(DomainError::MissingRoot);
    }
    let mut out = serde_json::to_string_pretty(tree).map_err(|e| DomainError::InvalidExport {
        message: e.to_string(),
    })?;
    out.push('\n');
    Ok(out)
}

/// Parses an export. Every key must equal the embedded id of its node.
///
/// A missing root is accepted here; validation reports it.
#[instrument(level = "debug", skip(content))]
pub fn import_tree(content: &str) -> DomainResult<Tree> {
    let raw: BTreeMap<String, Node> =
        serde_json::from_str(content).map_err(|e| DomainError::InvalidExport {
            message: e.to_string(),
        })?;

    if let Some((key, node)) = raw.iter().find(|(key, node)| **key != node.id) {
        return Err(DomainError::IdMismatch {
            key: key.clone(),
            id: node.id.clone(),
        });
    }
    Ok(Tree::from_nodes(raw.into_values()))
}
