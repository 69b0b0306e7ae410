//! Command-line interface for dealmemo
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions and parsing structures (clap)
//! - `run`: Main entry point and command dispatch
//! - `commands`: Command implementations
//! - `inputs`: Request, attachment and document loading
//! - `output`: Event rendering and atomic document writes

pub mod args;
mod commands;
mod inputs;
mod output;
mod run;

#[cfg(test)]
mod tests;

pub use args::{Cli, Commands, EventFormat, build_cli};
pub use run::run;
