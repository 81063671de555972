//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::services::{EditorService, SessionStore, TreePaths, WizardService};
use crate::config::Settings;
use crate::infrastructure::traits::{
    CommandEditor, Editor, FileSystem, RealFileSystem, Selector, SkimSelector,
};

/// Container holding settings, I/O boundaries and service factories.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Directory relative tree paths resolve against
    pub project_dir: PathBuf,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Interactive picker
    pub selector: Arc<dyn Selector>,

    /// External editor
    pub editor: Arc<dyn Editor>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings, project_dir: &Path) -> Self {
        let editor = Arc::new(CommandEditor::new(settings.editor.clone()));
        Self::with_deps(
            settings,
            project_dir,
            Arc::new(RealFileSystem),
            Arc::new(SkimSelector),
            editor,
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        project_dir: &Path,
        fs: Arc<dyn FileSystem>,
        selector: Arc<dyn Selector>,
        editor: Arc<dyn Editor>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            project_dir: project_dir.to_path_buf(),
            fs,
            selector,
            editor,
        }
    }

    pub fn tree_paths(&self) -> TreePaths {
        self.settings.tree_paths(&self.project_dir)
    }

    pub fn editor_service(&self) -> EditorService {
        EditorService::new(
            Arc::clone(&self.fs),
            self.tree_paths(),
            self.settings.history_limit,
        )
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::in_dir(Arc::clone(&self.fs), &self.settings.data_dir)
    }

    pub fn wizard_service(&self) -> WizardService {
        WizardService::new(self.session_store())
    }
}
