//! Domain layer: decision-tree model and its derived computations
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod codec;
pub mod edit;
pub mod entities;
pub mod error;
pub mod graph;
pub mod history;
pub mod render;
pub mod validation;
pub mod wizard;

pub use codec::{export_tree, import_tree};
pub use edit::{MoveDirection, NodePatch};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use graph::{GraphView, Steps, StepsCalculator};
pub use history::History;
pub use validation::{validate, Issue, ValidationReport};
pub use wizard::{Position, Progress, Walk};
