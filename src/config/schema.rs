use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// Comment prefix used for stamp lines when a set does not configure one.
pub const DEFAULT_COMMENT_PREFIX: &str = "--";

/// Version assumed for sets that do not declare one.
pub const DEFAULT_SET_VERSION: &str = "0.0.0";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchSet {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<PatchRule>,
}

impl PatchSet {
    pub fn new(name: impl Into<String>, rules: Vec<PatchRule>) -> Self {
        Self {
            meta: Metadata {
                name: name.into(),
                ..Metadata::default()
            },
            rules,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        if let Some(version) = &self.meta.version {
            if let Err(e) = semver::Version::parse(version.trim()) {
                issues.push(ValidationIssue::InvalidMeta {
                    field: "version",
                    message: format!("'{version}' is not a semver version: {e}"),
                });
            }
        }

        if let Err(message) = self.meta.baseline_hash() {
            issues.push(ValidationIssue::InvalidMeta {
                field: "baseline_hash",
                message,
            });
        }

        if self.meta.stamp && self.meta.name.trim().is_empty() {
            issues.push(ValidationIssue::InvalidMeta {
                field: "name",
                message: "stamped patch sets need a name".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
            } else if !seen.insert(rule.id.as_str()) {
                issues.push(ValidationIssue::DuplicateId {
                    rule_id: rule.id.clone(),
                });
            }

            if rule.pattern.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: Some(rule.id.clone()),
                    field: "pattern",
                });
            }

            if rule.max_occurrences == Some(0) {
                issues.push(ValidationIssue::InvalidCombo {
                    rule_id: Some(rule.id.clone()),
                    message: "max_occurrences must be at least 1".to_string(),
                });
            }

            if matches!(rule.after.as_deref(), Some("")) {
                issues.push(ValidationIssue::MissingField {
                    rule_id: Some(rule.id.clone()),
                    field: "after",
                });
            }

            if matches!(rule.skip_if_present.as_deref(), Some("")) {
                issues.push(ValidationIssue::MissingField {
                    rule_id: Some(rule.id.clone()),
                    field: "skip_if_present",
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Rules that would compound if the set were run twice without a guard.
    ///
    /// A literal rule whose replacement still contains its pattern matches
    /// again on every rerun. Regex rules are not inspected.
    pub fn lint(&self) -> Vec<String> {
        if self.meta.stamp {
            return Vec::new();
        }
        self.rules
            .iter()
            .filter(|rule| {
                rule.kind == RuleKind::LiteralReplace
                    && rule.skip_if_present.is_none()
                    && !rule.pattern.is_empty()
                    && rule.replacement.contains(rule.pattern.as_str())
            })
            .map(|rule| {
                format!(
                    "rule '{}' re-matches its own replacement; add skip_if_present or enable meta.stamp",
                    rule.id
                )
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// xxh3-64 of the text this set was written against, in hex.
    #[serde(default)]
    pub baseline_hash: Option<String>,
    #[serde(default)]
    pub stamp: bool,
    #[serde(default)]
    pub comment_prefix: Option<String>,
}

impl Metadata {
    pub fn version(&self) -> &str {
        self.version
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_SET_VERSION)
    }

    pub fn comment_prefix(&self) -> &str {
        self.comment_prefix
            .as_deref()
            .unwrap_or(DEFAULT_COMMENT_PREFIX)
    }

    pub fn baseline_hash(&self) -> Result<Option<u64>, String> {
        let Some(raw) = &self.baseline_hash else {
            return Ok(None);
        };
        let digits = raw.trim().trim_start_matches("0x");
        u64::from_str_radix(digits, 16)
            .map(Some)
            .map_err(|_| format!("invalid hash value: {raw}"))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PatchRule {
    pub id: String,
    pub kind: RuleKind,
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    /// Replace only the first N matches. Absent means every match.
    #[serde(default)]
    pub max_occurrences: Option<usize>,
    /// Restrict the rule to the text following the first occurrence of this anchor.
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub skip_if_present: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl PatchRule {
    pub fn literal(
        id: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self::new(id, RuleKind::LiteralReplace, pattern, replacement)
    }

    pub fn regex(
        id: impl Into<String>,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self::new(id, RuleKind::RegexReplace, pattern, replacement)
    }

    fn new(
        id: impl Into<String>,
        kind: RuleKind,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            pattern: pattern.into(),
            replacement: replacement.into(),
            max_occurrences: None,
            after: None,
            skip_if_present: None,
            required: false,
            description: None,
        }
    }

    pub fn max_occurrences(mut self, limit: usize) -> Self {
        self.max_occurrences = Some(limit);
        self
    }

    pub fn after(mut self, anchor: impl Into<String>) -> Self {
        self.after = Some(anchor.into());
        self
    }

    pub fn skip_if_present(mut self, marker: impl Into<String>) -> Self {
        self.skip_if_present = Some(marker.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    #[serde(alias = "literal")]
    LiteralReplace,
    #[serde(alias = "regex")]
    RegexReplace,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::LiteralReplace => write!(f, "literal-replace"),
            RuleKind::RegexReplace => write!(f, "regex-replace"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
    InvalidCombo {
        rule_id: Option<String>,
        message: String,
    },
    InvalidMeta {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "patch set contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is used more than once")
            }
            ValidationIssue::InvalidCombo { rule_id, message } => match rule_id {
                Some(id) => write!(f, "rule '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid rule configuration: {message}"),
            },
            ValidationIssue::InvalidMeta { field, message } => {
                write!(f, "invalid meta.{field}: {message}")
            }
        }
    }
}
