use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where the patched text goes.
///
/// By default the output is a sibling `<input>.patched`, so the original stays
/// available for review. Overwriting the input requires `in_place`, which
/// always snapshots the original first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub in_place: bool,
    pub snapshot: Option<PathBuf>,
}

/// A target whose paths have been checked against each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub input: PathBuf,
    pub output: PathBuf,
    pub snapshot: Option<PathBuf>,
    /// The snapshot path was chosen by the caller rather than defaulted.
    pub snapshot_explicit: bool,
}

impl ResolvedTarget {
    pub fn is_in_place(&self) -> bool {
        same_path(&self.input, &self.output)
    }

    /// A defaulted snapshot never replaces an existing file: it may hold the
    /// only copy of an earlier baseline.
    pub fn check_snapshot(&self) -> Result<(), SafetyError> {
        match &self.snapshot {
            Some(snapshot) if !self.snapshot_explicit && snapshot.exists() => {
                Err(SafetyError::SnapshotExists(snapshot.clone()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SafetyError {
    #[error("Output {0} is the input file; pass in-place explicitly to overwrite it")]
    OutputIsInput(PathBuf),

    #[error("Snapshot path {snapshot} would overwrite {target}")]
    SnapshotIsTarget { snapshot: PathBuf, target: PathBuf },

    #[error("Output path given together with in-place: {0}")]
    ConflictingOutput(PathBuf),

    #[error("Snapshot {0} already exists; choose a snapshot path explicitly to replace it")]
    SnapshotExists(PathBuf),
}

impl Target {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn in_place(mut self) -> Self {
        self.in_place = true;
        self
    }

    pub fn snapshot(mut self, snapshot: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(snapshot.into());
        self
    }

    pub fn resolve(&self) -> Result<ResolvedTarget, SafetyError> {
        let (output, snapshot) = if self.in_place {
            if let Some(output) = &self.output {
                if !same_path(output, &self.input) {
                    return Err(SafetyError::ConflictingOutput(output.clone()));
                }
            }
            let snapshot = self
                .snapshot
                .clone()
                .unwrap_or_else(|| with_suffix(&self.input, ".orig"));
            (self.input.clone(), Some(snapshot))
        } else {
            let output = self
                .output
                .clone()
                .unwrap_or_else(|| with_suffix(&self.input, ".patched"));
            if same_path(&output, &self.input) {
                return Err(SafetyError::OutputIsInput(output));
            }
            (output, self.snapshot.clone())
        };

        if let Some(snapshot) = &snapshot {
            for target in [&self.input, &output] {
                if same_path(snapshot, target) {
                    return Err(SafetyError::SnapshotIsTarget {
                        snapshot: snapshot.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(ResolvedTarget {
            input: self.input.clone(),
            output,
            snapshot,
            snapshot_explicit: self.snapshot.is_some(),
        })
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Compare two paths that may not exist yet.
///
/// Existing paths are canonicalized; for a missing file the parent is
/// canonicalized and the file name re-attached.
fn same_path(a: &Path, b: &Path) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), path.file_name()) {
        (Ok(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}
