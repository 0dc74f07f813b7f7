//! Tooling & Integration Layer
//!
//! The `blockfs` command line and the text rendering it uses.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands};
