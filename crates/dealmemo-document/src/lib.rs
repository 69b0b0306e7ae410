//! Memorandum data model and merge engine.
//!
//! A [`Document`] is the evolving credit memorandum. Phases produce
//! [`DocumentPatch`]es; [`merge`] folds each one in with the
//! present-and-non-empty-wins rule, recursing into sub-records.

pub mod checks;
mod fingerprint;
pub mod lenient;
mod merge;
mod model;
pub mod patch;

pub use checks::{ModelIssue, check_model};
pub use fingerprint::emit_jcs;
pub use merge::{dedupe_scenarios, merge};
pub use model::*;
pub use patch::{DocumentPatch, FinancialModelPatch, Overlay, PatchField, Presence, TermSheetPatch};
