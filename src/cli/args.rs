//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::TreeKey;

/// Gram-stain identification decision trees: edit, validate and walk them
#[derive(Parser, Debug)]
#[command(name = "bactree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Project directory holding the tree files (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the tree as an indented outline
    Show {
        /// Tree to use: pos | neg (default: config `default_tree`)
        #[arg(short, long)]
        tree: Option<TreeKey>,
    },

    /// Check a tree for structural errors and warnings
    Validate {
        #[arg(short, long)]
        tree: Option<TreeKey>,
    },

    /// Show min/max steps remaining
    Steps {
        #[arg(short, long)]
        tree: Option<TreeKey>,
        /// Single node id (default: every reachable node)
        node: Option<String>,
    },

    /// Emit nodes and edges for a layout engine
    Graph {
        #[arg(short, long)]
        tree: Option<TreeKey>,
        #[arg(long, value_enum, default_value_t = GraphFormat::Json)]
        format: GraphFormat,
    },

    /// Export a tree as JSON
    Export {
        #[arg(short, long)]
        tree: Option<TreeKey>,
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Replace a tree file with an exported JSON file
    Import {
        /// Export file to read
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(short, long)]
        tree: Option<TreeKey>,
    },

    /// Interactive editing session (type `help` for commands)
    Edit {
        #[arg(short, long)]
        tree: Option<TreeKey>,
    },

    /// Walk a tree step by step
    Wizard {
        #[command(subcommand)]
        command: WizardCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum WizardCommands {
    /// Start or continue a walk
    Run {
        #[arg(short, long)]
        tree: Option<TreeKey>,
        /// Continue from the saved position
        #[arg(short, long, conflicts_with = "code")]
        resume: bool,
        /// Open a shared position, e.g. `pos:0,2`
        #[arg(long)]
        code: Option<String>,
    },

    /// Print the saved position as a shareable code
    Share {
        #[arg(short, long)]
        tree: Option<TreeKey>,
    },

    /// Forget the saved position
    Reset {
        #[arg(short, long)]
        tree: Option<TreeKey>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Json,
    Dot,
}
