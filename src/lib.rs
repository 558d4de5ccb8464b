//! Seed Patcher: deterministic text-patch pipeline
//!
//! Applies an ordered, declarative set of literal and regex replacements to a
//! text file (typically a SQL seed file) and reports how often every rule
//! matched. The text is treated as opaque; nothing is parsed.
//!
//! # Architecture
//!
//! - [`config`] loads [`PatchSet`]s from TOML and applies them in memory,
//!   producing a [`PatchReport`] with one [`RuleOutcome`] per rule.
//! - [`document`] reads the input once and writes the output atomically.
//! - [`safety`] keeps the output away from the input unless an in-place run
//!   is requested, in which case the original is snapshotted first.
//! - [`pipeline`] ties them together and enforces the zero-match policy.
//!
//! # Guarantees
//!
//! - Same patch sets and same input always produce the same output
//! - Every regex is compiled before any rule runs
//! - Any failure aborts before the first write
//! - Rules that match zero times are reported, never silently ignored
//! - Stamps and `skip_if_present` markers make reruns no-ops
//!
//! # Example
//!
//! ```
//! use seed_patcher::{apply_patch_set, PatchRule, PatchSet};
//!
//! let set = PatchSet::new(
//!     "columns",
//!     vec![PatchRule::literal("drop-id", "(id, x)", "(x)")],
//! );
//! let report = apply_patch_set(&set, "INSERT INTO t (id, x)").unwrap();
//! assert_eq!(report.text, "INSERT INTO t (x)");
//! ```

pub mod cache;
pub mod config;
pub mod document;
pub mod pipeline;
pub mod safety;

// Re-exports
pub use config::{
    apply_patch_set, apply_patch_sets, load_from_path, load_from_str, load_patch_sets,
    ApplicationError, ConfigError, PatchReport, PatchRule, PatchSet, RuleKind, RuleOutcome,
    RuleReport,
};
pub use document::{Document, DocumentError};
pub use pipeline::{run, PipelineError, RunOptions, RunReport};
pub use safety::{ResolvedTarget, SafetyError, Target};
