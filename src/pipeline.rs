//! End-to-end run: load the document, apply every patch set in memory, then
//! snapshot and write once.
//!
//! Nothing is written unless every set applied cleanly and the zero-match
//! policy is satisfied.

use crate::config::applicator::{apply_patch_sets, ApplicationError, PatchReport};
use crate::config::schema::PatchSet;
use crate::document::{write_atomic, Document, DocumentError};
use crate::safety::{SafetyError, Target};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Application(#[from] ApplicationError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("no patch sets given")]
    NoPatchSets,

    #[error("strict mode: {} rule(s) matched zero times: {}", .rules.len(), .rules.join(", "))]
    ZeroMatches { rules: Vec<String> },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Apply in memory and report, but write nothing.
    pub dry_run: bool,
    /// Treat any zero-match rule as fatal.
    pub strict: bool,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub snapshot: Option<PathBuf>,
    /// Text as loaded, kept for diffing.
    pub original: String,
    pub patch: PatchReport,
    pub written: bool,
}

impl RunReport {
    pub fn changed(&self) -> bool {
        self.original != self.patch.text
    }
}

/// Run `sets` against `target.input` and persist the result.
pub fn run(
    target: &Target,
    sets: &[PatchSet],
    options: RunOptions,
) -> Result<RunReport, PipelineError> {
    if sets.is_empty() {
        return Err(PipelineError::NoPatchSets);
    }

    let document = Document::load(&target.input)?;
    let resolved = target.resolve()?;

    let patch = apply_patch_sets(sets, &document.text)?;

    let zero: Vec<String> = patch
        .no_match()
        .map(|r| format!("{}/{}", r.set, r.rule_id))
        .collect();
    if options.strict && !zero.is_empty() {
        return Err(PipelineError::ZeroMatches { rules: zero });
    }

    let mut report = RunReport {
        input: resolved.input.clone(),
        output: resolved.output.clone(),
        snapshot: resolved.snapshot.clone(),
        original: document.text.clone(),
        patch,
        written: false,
    };

    if options.dry_run {
        tracing::info!(input = %report.input.display(), "dry run, nothing written");
        return Ok(report);
    }

    if resolved.is_in_place() && !report.changed() {
        tracing::info!(input = %report.input.display(), "no changes, input left untouched");
        report.snapshot = None;
        return Ok(report);
    }

    resolved.check_snapshot()?;
    if let Some(snapshot) = &resolved.snapshot {
        document.snapshot(snapshot)?;
    }
    write_atomic(&resolved.output, &report.patch.text)?;
    report.written = true;

    tracing::info!(
        output = %report.output.display(),
        replacements = report.patch.replacements(),
        "patched document written"
    );
    Ok(report)
}
