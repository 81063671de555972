//! Editor service
//!
//! Loads and saves the two tree files and hosts the in-memory editing session
//! with selection tracking and whole-workspace undo/redo.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::edit::{self, MoveDirection, NodePatch};
use crate::domain::{
    export_tree, import_tree, validate, DomainError, DomainResult, GraphView, History, Node, Tree,
    TreeKey, ValidationReport, Workspace, ROOT_ID,
};
use crate::infrastructure::traits::FileSystem;

/// Locations of the two tree files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePaths {
    pub positive: PathBuf,
    pub negative: PathBuf,
}

impl TreePaths {
    pub fn get(&self, key: TreeKey) -> &Path {
        match key {
            TreeKey::Positive => &self.positive,
            TreeKey::Negative => &self.negative,
        }
    }
}

/// Service for loading, importing and saving trees.
pub struct EditorService {
    fs: Arc<dyn FileSystem>,
    paths: TreePaths,
    history_limit: usize,
}

impl EditorService {
    pub fn new(fs: Arc<dyn FileSystem>, paths: TreePaths, history_limit: usize) -> Self {
        Self {
            fs,
            paths,
            history_limit,
        }
    }

    pub fn paths(&self) -> &TreePaths {
        &self.paths
    }

    /// Load one tree; a missing file yields the starter tree.
    #[instrument(level = "debug", skip(self))]
    pub fn load_tree(&self, key: TreeKey) -> ApplicationResult<Tree> {
        let path = self.paths.get(key);
        if !self.fs.exists(path) {
            warn!(
                "tree file {} not found, starting from a blank root",
                path.display()
            );
            return Ok(Tree::starter());
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read tree file", path)?;
        let tree = import_tree(&content).map_err(|source| ApplicationError::InvalidTreeFile {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("load_tree: {} nodes from {}", tree.len(), path.display());
        Ok(tree)
    }

    pub fn load_workspace(&self) -> ApplicationResult<Workspace> {
        Ok(Workspace::new(
            self.load_tree(TreeKey::Positive)?,
            self.load_tree(TreeKey::Negative)?,
        ))
    }

    /// Load both trees into a fresh session with `active` selected.
    pub fn open_session(&self, active: TreeKey) -> ApplicationResult<EditSession> {
        let workspace = self.load_workspace()?;
        Ok(EditSession::new(workspace, active, self.history_limit))
    }

    /// Write one tree in export format. Fails without touching the file when
    /// the tree has no root.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn save_tree(&self, key: TreeKey, tree: &Tree) -> ApplicationResult<PathBuf> {
        let content = export_tree(tree)?;
        let path = self.paths.get(key);
        self.fs
            .ensure_parent(path)
            .with_path_context("create directory for", path)?;
        self.fs
            .write(path, &content)
            .with_path_context("write tree file", path)?;
        info!("saved {} tree to {}", key, path.display());
        Ok(path.to_path_buf())
    }

    /// Save both trees of the session and mark it clean.
    ///
    /// Both trees are exported before anything is written, so a tree without
    /// root blocks the whole save.
    pub fn save_session(&self, session: &mut EditSession) -> ApplicationResult<()> {
        for key in TreeKey::ALL {
            export_tree(session.workspace().tree(key))?;
        }
        for key in TreeKey::ALL {
            self.save_tree(key, session.workspace().tree(key))?;
        }
        session.mark_saved();
        Ok(())
    }

    /// Replace the tree file for `key` with an export read from `source`.
    #[instrument(level = "debug", skip(self))]
    pub fn import_file(&self, key: TreeKey, source: &Path) -> ApplicationResult<Tree> {
        let content = self
            .fs
            .read_to_string(source)
            .with_path_context("read export", source)?;
        let tree = import_tree(&content).map_err(|e| ApplicationError::InvalidTreeFile {
            path: source.to_path_buf(),
            source: e,
        })?;
        self.save_tree(key, &tree)?;
        Ok(tree)
    }
}

/// In-memory editing session over both trees.
#[derive(Debug, Clone)]
pub struct EditSession {
    workspace: Workspace,
    active: TreeKey,
    selected: String,
    history: History<Workspace>,
    /// Workspace as last loaded or written
    saved: Workspace,
}

impl EditSession {
    pub fn new(workspace: Workspace, active: TreeKey, history_limit: usize) -> Self {
        Self {
            saved: workspace.clone(),
            workspace,
            active,
            selected: ROOT_ID.to_string(),
            history: History::new(history_limit),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn active(&self) -> TreeKey {
        self.active
    }

    /// The active tree.
    pub fn tree(&self) -> &Tree {
        self.workspace.tree(self.active)
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.tree().get(&self.selected)
    }

    /// Whether the workspace differs from what was last saved.
    pub fn is_dirty(&self) -> bool {
        self.workspace != self.saved
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn mark_saved(&mut self) {
        self.saved = self.workspace.clone();
    }

    pub fn select(&mut self, id: &str) -> DomainResult<()> {
        if !self.tree().contains(id) {
            return Err(DomainError::NodeNotFound(id.to_string()));
        }
        self.selected = id.to_string();
        Ok(())
    }

    /// Switch the active tree; selection returns to root.
    pub fn switch_tree(&mut self, key: TreeKey) {
        self.active = key;
        self.selected = ROOT_ID.to_string();
    }

    /// Apply a tree transformation as one undoable step.
    ///
    /// Failed or no-op transformations leave history untouched.
    fn apply<F>(&mut self, f: F) -> DomainResult<()>
    where
        F: FnOnce(&Tree) -> DomainResult<Tree>,
    {
        let next = f(self.tree())?;
        if &next == self.tree() {
            return Ok(());
        }
        let before = self.workspace.clone();
        self.workspace.replace(self.active, next);
        self.history.record(before);
        Ok(())
    }

    /// Add a blank result node and select it.
    pub fn add_node(&mut self) -> String {
        let (next, id) = edit::add_node(self.tree());
        let before = self.workspace.clone();
        self.workspace.replace(self.active, next);
        self.history.record(before);
        self.selected = id.clone();
        id
    }

    pub fn update_node(&mut self, id: &str, patch: &NodePatch) -> DomainResult<()> {
        self.apply(|tree| edit::update_node(tree, id, patch))
    }

    /// Delete a node; returns the ids whose options were cleared.
    pub fn delete_node(&mut self, id: &str) -> DomainResult<Vec<String>> {
        let referencing = edit::references_to(self.tree(), id);
        self.apply(|tree| edit::delete_node(tree, id))?;
        if self.selected == id {
            self.selected = ROOT_ID.to_string();
        }
        Ok(referencing)
    }

    pub fn rename_node(&mut self, old_id: &str, new_id: &str) -> DomainResult<()> {
        self.apply(|tree| edit::rename_node(tree, old_id, new_id))?;
        if self.selected == old_id {
            self.selected = new_id.to_string();
        }
        Ok(())
    }

    /// Replace a node wholesale (e.g. after editing it as JSON) as one step.
    pub fn replace_node(&mut self, id: &str, node: &Node) -> DomainResult<()> {
        self.apply(|tree| edit::replace_node(tree, id, node))?;
        if self.selected == id {
            self.selected = node.id.clone();
        }
        Ok(())
    }

    pub fn add_option(&mut self, id: &str) -> DomainResult<usize> {
        let mut index = 0;
        self.apply(|tree| {
            let (next, i) = edit::add_option(tree, id)?;
            index = i;
            Ok(next)
        })?;
        Ok(index)
    }

    pub fn set_option(
        &mut self,
        id: &str,
        index: usize,
        label: Option<&str>,
        next_id: Option<&str>,
    ) -> DomainResult<()> {
        self.apply(|tree| edit::set_option(tree, id, index, label, next_id))
    }

    pub fn remove_option(&mut self, id: &str, index: usize) -> DomainResult<()> {
        self.apply(|tree| edit::remove_option(tree, id, index))
    }

    pub fn move_option(
        &mut self,
        id: &str,
        index: usize,
        direction: MoveDirection,
    ) -> DomainResult<()> {
        self.apply(|tree| edit::move_option(tree, id, index, direction))
    }

    /// Replace the active tree wholesale (e.g. after an import) as one step.
    pub fn replace_tree(&mut self, tree: Tree) {
        if &tree == self.tree() {
            return;
        }
        let before = self.workspace.clone();
        self.workspace.replace(self.active, tree);
        self.history.record(before);
        self.fix_selection();
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.workspace.clone()) {
            Some(previous) => {
                self.workspace = previous;
                self.fix_selection();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.workspace.clone()) {
            Some(next) => {
                self.workspace = next;
                self.fix_selection();
                true
            }
            None => false,
        }
    }

    fn fix_selection(&mut self) {
        if !self.tree().contains(&self.selected) {
            self.selected = ROOT_ID.to_string();
        }
    }

    pub fn validate(&self) -> ValidationReport {
        validate(self.tree())
    }

    pub fn graph_view(&self) -> GraphView {
        GraphView::from_tree(self.tree())
    }
}
