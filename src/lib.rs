//! bactree: Gram-stain identification decision trees.
//!
//! Layers, innermost first: `domain` (tree model and algorithms), `application`
//! (services), `infrastructure` (I/O boundaries and wiring), `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
