//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Selector, etc.)
//! but are themselves concrete structs, not traits.

mod editor;
mod session;
mod wizard;

pub use editor::{EditSession, EditorService, TreePaths};
pub use session::{SavedPosition, SessionStore, SESSION_FILE};
pub use wizard::{WizardAction, WizardService};
