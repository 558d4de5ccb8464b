pub mod applicator;
pub mod loader;
pub mod schema;
pub mod version;

pub use applicator::{
    apply_patch_set, apply_patch_sets, ApplicationError, PatchReport, RuleOutcome, RuleReport,
};
pub use loader::{
    discover_patch_files, load_from_path, load_from_str, load_patch_sets, ConfigError,
};
pub use schema::{
    Metadata, PatchRule, PatchSet, RuleKind, ValidationError, ValidationIssue,
};
pub use version::{Stamp, VersionError};
