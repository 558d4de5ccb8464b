//! Patch applicator - applies patch sets to text in memory
//!
//! This module provides the pure half of the pipeline:
//! - Compiles every regex up front, so a bad pattern aborts before any rule runs
//! - Skips whole sets whose stamp shows they were already applied
//! - Checks the baseline hash of each set against the text it receives
//! - Applies rules in order, reporting a match count for every rule

use crate::cache;
use crate::config::schema::{PatchRule, PatchSet, RuleKind};
use crate::config::version::{applied_stamp, restamp, Stamp, VersionError};
use regex::Regex;
use std::fmt;
use xxhash_rust::xxh3::xxh3_64;

/// Minimum Jaro-Winkler similarity for a line to be offered as a drift hint.
const HINT_THRESHOLD: f64 = 0.85;

/// Result of applying a single rule
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RuleOutcome should be checked for zero matches"]
pub enum RuleOutcome {
    /// Rule replaced `count` occurrences
    Applied { count: usize },
    /// Rule was skipped by its guard marker or the set stamp
    AlreadyApplied { reason: String },
    /// Rule matched nothing in the current text
    NoMatch { hint: Option<String> },
}

impl RuleOutcome {
    pub fn is_no_match(&self) -> bool {
        matches!(self, RuleOutcome::NoMatch { .. })
    }

    pub fn count(&self) -> usize {
        match self {
            RuleOutcome::Applied { count } => *count,
            _ => 0,
        }
    }
}

impl fmt::Display for RuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOutcome::Applied { count: 1 } => write!(f, "applied 1 replacement"),
            RuleOutcome::Applied { count } => write!(f, "applied {count} replacements"),
            RuleOutcome::AlreadyApplied { reason } => write!(f, "already applied ({reason})"),
            RuleOutcome::NoMatch { hint: None } => write!(f, "matched zero times"),
            RuleOutcome::NoMatch { hint: Some(hint) } => {
                write!(f, "matched zero times; {hint}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleReport {
    pub set: String,
    pub rule_id: String,
    pub outcome: RuleOutcome,
}

/// Patched text plus one report per rule, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub text: String,
    pub rules: Vec<RuleReport>,
}

impl PatchReport {
    pub fn no_match(&self) -> impl Iterator<Item = &RuleReport> {
        self.rules.iter().filter(|r| r.outcome.is_no_match())
    }

    pub fn replacements(&self) -> usize {
        self.rules.iter().map(|r| r.outcome.count()).sum()
    }
}

/// Errors that abort application before any output exists
#[derive(Debug)]
pub enum ApplicationError {
    /// Patch set has no rules
    EmptyPatchSet { set: String },
    /// A regex rule failed to compile
    RegexCompile {
        set: String,
        rule_id: String,
        source: regex::Error,
    },
    /// Input is not the baseline the set was written against
    BaselineMismatch {
        set: String,
        expected: u64,
        found: u64,
    },
    /// `meta.baseline_hash` is not a hex number
    InvalidBaseline { set: String, message: String },
    /// A rule marked `required` matched zero times
    RequiredRuleNoMatch { set: String, rule_id: String },
    /// Stamp version comparison failed
    Version(VersionError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::EmptyPatchSet { set } => {
                write!(f, "patch set '{set}' contains no rules")
            }
            ApplicationError::RegexCompile {
                set,
                rule_id,
                source,
            } => write!(f, "rule '{set}/{rule_id}' has an invalid regex: {source}"),
            ApplicationError::BaselineMismatch {
                set,
                expected,
                found,
            } => write!(
                f,
                "patch set '{set}' expects baseline {expected:#018x}, input hashes to {found:#018x}"
            ),
            ApplicationError::InvalidBaseline { set, message } => {
                write!(f, "patch set '{set}': {message}")
            }
            ApplicationError::RequiredRuleNoMatch { set, rule_id } => {
                write!(f, "required rule '{set}/{rule_id}' matched zero times")
            }
            ApplicationError::Version(e) => write!(f, "version error: {}", e),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::RegexCompile { source, .. } => Some(source),
            ApplicationError::Version(e) => Some(e),
            _ => None,
        }
    }
}

impl From<VersionError> for ApplicationError {
    fn from(e: VersionError) -> Self {
        ApplicationError::Version(e)
    }
}

struct CompiledRule<'a> {
    rule: &'a PatchRule,
    regex: Option<Regex>,
}

/// Apply one patch set to `text`.
pub fn apply_patch_set(set: &PatchSet, text: &str) -> Result<PatchReport, ApplicationError> {
    apply_patch_sets(std::slice::from_ref(set), text)
}

/// Apply several patch sets in order to the same text.
///
/// Every regex of every set is compiled before the first rule runs.
pub fn apply_patch_sets(
    sets: &[PatchSet],
    text: &str,
) -> Result<PatchReport, ApplicationError> {
    let compiled = sets
        .iter()
        .map(|set| compile_rules(set).map(|rules| (set, rules)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut text = text.to_string();
    let mut reports = Vec::new();
    for (set, rules) in &compiled {
        text = apply_compiled_set(set, rules, text, &mut reports)?;
    }

    Ok(PatchReport {
        text,
        rules: reports,
    })
}

fn compile_rules(set: &PatchSet) -> Result<Vec<CompiledRule<'_>>, ApplicationError> {
    if set.rules.is_empty() {
        return Err(ApplicationError::EmptyPatchSet {
            set: set.meta.name.clone(),
        });
    }

    set.rules
        .iter()
        .map(|rule| {
            let regex = match rule.kind {
                RuleKind::LiteralReplace => None,
                RuleKind::RegexReplace => Some(cache::get_or_compile(&rule.pattern).map_err(
                    |source| ApplicationError::RegexCompile {
                        set: set.meta.name.clone(),
                        rule_id: rule.id.clone(),
                        source,
                    },
                )?),
            };
            Ok(CompiledRule { rule, regex })
        })
        .collect()
}

fn apply_compiled_set(
    set: &PatchSet,
    rules: &[CompiledRule<'_>],
    text: String,
    reports: &mut Vec<RuleReport>,
) -> Result<String, ApplicationError> {
    let meta = &set.meta;
    let report = |rule: &PatchRule, outcome: RuleOutcome| RuleReport {
        set: meta.name.clone(),
        rule_id: rule.id.clone(),
        outcome,
    };

    if meta.stamp {
        if let Some(stamp) =
            applied_stamp(&text, meta.comment_prefix(), &meta.name, meta.version())?
        {
            tracing::info!(set = %meta.name, stamp = %stamp.version, "patch set already applied");
            for compiled in rules {
                reports.push(report(
                    compiled.rule,
                    RuleOutcome::AlreadyApplied {
                        reason: format!("stamped {}@{}", stamp.name, stamp.version),
                    },
                ));
            }
            return Ok(text);
        }
    }

    let expected = meta
        .baseline_hash()
        .map_err(|message| ApplicationError::InvalidBaseline {
            set: meta.name.clone(),
            message,
        })?;
    if let Some(expected) = expected {
        let found = xxh3_64(text.as_bytes());
        if found != expected {
            return Err(ApplicationError::BaselineMismatch {
                set: meta.name.clone(),
                expected,
                found,
            });
        }
    }

    let mut text = text;
    for compiled in rules {
        let rule = compiled.rule;
        let (patched, outcome) = apply_rule(compiled, &text);
        match &outcome {
            RuleOutcome::Applied { count } => {
                tracing::debug!(set = %meta.name, rule = %rule.id, count, "rule applied");
            }
            RuleOutcome::AlreadyApplied { reason } => {
                tracing::debug!(set = %meta.name, rule = %rule.id, %reason, "rule already applied");
            }
            RuleOutcome::NoMatch { hint } => {
                if rule.required {
                    return Err(ApplicationError::RequiredRuleNoMatch {
                        set: meta.name.clone(),
                        rule_id: rule.id.clone(),
                    });
                }
                tracing::warn!(
                    set = %meta.name,
                    rule = %rule.id,
                    hint = hint.as_deref().unwrap_or("none"),
                    "rule matched zero times"
                );
            }
        }
        text = patched;
        reports.push(report(rule, outcome));
    }

    if meta.stamp {
        let stamp = Stamp::new(meta.name.clone(), meta.version());
        text = restamp(&text, meta.comment_prefix(), &stamp);
    }

    Ok(text)
}

fn apply_rule(compiled: &CompiledRule<'_>, text: &str) -> (String, RuleOutcome) {
    let rule = compiled.rule;

    if let Some(marker) = &rule.skip_if_present {
        if text.contains(marker.as_str()) {
            return (
                text.to_string(),
                RuleOutcome::AlreadyApplied {
                    reason: format!("marker {marker:?} present"),
                },
            );
        }
    }

    let split = match &rule.after {
        Some(anchor) => match text.find(anchor.as_str()) {
            Some(idx) => idx + anchor.len(),
            None => {
                return (
                    text.to_string(),
                    RuleOutcome::NoMatch {
                        hint: Some(format!("anchor {anchor:?} not found")),
                    },
                );
            }
        },
        None => 0,
    };
    let (head, scope) = text.split_at(split);

    let limit = rule.max_occurrences.unwrap_or(usize::MAX);
    let (patched, count) = match &compiled.regex {
        Some(re) => replace_regex(re, scope, &rule.replacement, limit),
        None => replace_literal(scope, &rule.pattern, &rule.replacement, limit),
    };

    if count == 0 {
        return (
            text.to_string(),
            RuleOutcome::NoMatch {
                hint: closest_line(scope, rule),
            },
        );
    }

    (format!("{head}{patched}"), RuleOutcome::Applied { count })
}

fn replace_literal(text: &str, pattern: &str, replacement: &str, limit: usize) -> (String, usize) {
    let count = text.matches(pattern).take(limit).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    (text.replacen(pattern, replacement, count), count)
}

fn replace_regex(re: &Regex, text: &str, replacement: &str, limit: usize) -> (String, usize) {
    let count = re.find_iter(text).take(limit).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    (re.replacen(text, count, replacement).into_owned(), count)
}

/// Most similar line to a literal pattern, to spot drift in the input.
fn closest_line(scope: &str, rule: &PatchRule) -> Option<String> {
    if rule.kind != RuleKind::LiteralReplace {
        return None;
    }
    let needle = rule.pattern.lines().map(str::trim).find(|l| !l.is_empty())?;

    scope
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| (strsim::jaro_winkler(needle, line), line))
        .filter(|(score, _)| *score >= HINT_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, line)| format!("closest line: {line}"))
}
