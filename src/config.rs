//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/bactree/bactree.toml`
//! 3. Local config: `<project_dir>/.bactree.toml`
//! 4. Environment variables: `BACTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::TreePaths;
use crate::application::ApplicationError;
use crate::domain::TreeKey;
use crate::util::path::{expand_env_vars, resolve_against};

/// Tree file locations; relative paths resolve against the project directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TreeFiles {
    pub positive: PathBuf,
    pub negative: PathBuf,
}

impl Default for TreeFiles {
    fn default() -> Self {
        Self {
            positive: PathBuf::from("gram_positive.json"),
            negative: PathBuf::from("gram_negative.json"),
        }
    }
}

/// Raw tree file config for intermediate parsing (`None` = not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawTreeFiles {
    pub positive: Option<PathBuf>,
    pub negative: Option<PathBuf>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub editor: Option<String>,
    pub history_limit: Option<usize>,
    pub default_tree: Option<TreeKey>,
    pub trees: RawTreeFiles,
}

/// Unified configuration for bactree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory for persisted wizard sessions (default: ~/.bactree)
    pub data_dir: PathBuf,
    /// Editor command (default: $EDITOR or "vim")
    pub editor: String,
    /// Undo snapshots kept by an editing session
    pub history_limit: usize,
    /// Tree used when a command gets no `--tree`
    pub default_tree: TreeKey,
    /// Tree file locations
    pub trees: TreeFiles,
}

impl Default for Settings {
    fn default() -> Self {
        // Try $EDITOR, fall back to vim
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".into());

        Self {
            data_dir: dirs_default_data_dir(),
            editor,
            history_limit: crate::domain::history::DEFAULT_CAPACITY,
            default_tree: TreeKey::Positive,
            trees: TreeFiles::default(),
        }
    }
}

/// Get the default data directory (~/.bactree).
fn dirs_default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".bactree"))
        .unwrap_or_else(|| PathBuf::from("~/.bactree"))
}

/// Get the XDG config directory for bactree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "bactree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("bactree.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".bactree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Tree file paths with relative entries resolved against `project_dir`.
    pub fn tree_paths(&self, project_dir: &Path) -> TreePaths {
        TreePaths {
            positive: resolve_against(project_dir, &self.trees.positive),
            negative: resolve_against(project_dir, &self.trees.negative),
        }
    }

    /// Expand shell variables and tilde in path-like fields.
    ///
    /// Handles `~`, `$VAR`, and `${VAR}` syntax.
    fn expand_paths(&mut self) {
        let expand = |p: &Path| PathBuf::from(expand_env_vars(p.to_string_lossy().as_ref()));
        self.data_dir = expand(&self.data_dir);
        self.trees.positive = expand(&self.trees.positive);
        self.trees.negative = expand(&self.trees.negative);

        // Expand editor (may contain path like ~/bin/myeditor)
        self.editor = expand_env_vars(&self.editor);
    }

    /// Merge overlay config onto self (base): overlay wins where specified.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            editor: overlay
                .editor
                .clone()
                .unwrap_or_else(|| self.editor.clone()),
            history_limit: overlay.history_limit.unwrap_or(self.history_limit),
            default_tree: overlay.default_tree.unwrap_or(self.default_tree),
            trees: TreeFiles {
                positive: overlay
                    .trees
                    .positive
                    .clone()
                    .unwrap_or_else(|| self.trees.positive.clone()),
                negative: overlay
                    .trees
                    .negative
                    .clone()
                    .unwrap_or_else(|| self.trees.negative.clone()),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for local config
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/bactree/bactree.toml`
    /// 3. Local config: `<project_dir>/.bactree.toml`
    /// 4. Environment variables: `BACTREE_*` prefix
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Project config
        if let Some(dir) = project_dir {
            let local_path = project_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        // Expand ~ and $VAR in path-like fields
        current.expand_paths();

        current.check()?;
        Ok(current)
    }

    /// Apply BACTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let builder = Config::builder().add_source(
            Environment::with_prefix("BACTREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("editor") {
            settings.editor = val;
        }
        if let Ok(val) = config.get_int("history_limit") {
            settings.history_limit = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("BACTREE_HISTORY_LIMIT out of range: {val}"),
            })?;
        }
        if let Ok(val) = config.get_string("default_tree") {
            settings.default_tree = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("BACTREE_DEFAULT_TREE: {e}"),
            })?;
        }
        if let Ok(val) = config.get_string("trees.positive") {
            settings.trees.positive = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("trees.negative") {
            settings.trees.negative = PathBuf::from(val);
        }

        Ok(settings)
    }

    fn check(&self) -> Result<(), ApplicationError> {
        if self.history_limit == 0 {
            return Err(ApplicationError::Config {
                message: "history_limit must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# bactree configuration
#
# Locations (by precedence, lowest to highest):
#   Global:  ~/.config/bactree/bactree.toml
#   Project: <project_dir>/.bactree.toml
#   Env:     BACTREE_* environment variables (BACTREE_TREES__POSITIVE=...)

# Directory for persisted wizard positions
# data_dir = "~/.bactree"

# Editor for editing nodes
# editor = "vim"

# Undo snapshots kept by an editing session
# history_limit = 50

# Tree used when no --tree is given: "pos" or "neg"
# default_tree = "pos"

[trees]
# Tree files, relative to the project directory unless absolute
# positive = "gram_positive.json"
# negative = "gram_negative.json"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
