//! Structural Rules
//!
//! Typed form of the declarative rule catalogs. A catalog maps a usage key to
//! a [`RuleDefinition`]: an optional target path selecting the context
//! elements plus an ordered list of [`Constraint`]s that must all hold.
//!
//! Catalog JSON is parsed and syntax-checked once at load time (see
//! [`catalog`]); evaluation never sees a malformed entry.

pub mod catalog;

pub use catalog::RuleCatalog;

use std::collections::BTreeSet;

use crate::diagnostics::{DocReference, Severity};
use crate::xpath;

/// One named structural requirement
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    /// Key used by validators to look the rule up
    pub usage: String,
    /// Path from the document root to the context elements
    pub target_path: Option<String>,
    /// Conjunctive constraints, evaluated in order
    pub constraints: Vec<Constraint>,
}

/// A cardinality requirement over the nodes matched by one or more paths
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    /// Minimum match count; only checked when greater than zero
    pub min: usize,
    /// Maximum match count; `None` is unbounded
    pub max: Option<usize>,
    /// Paths relative to the context element, counted together
    pub paths: Vec<String>,
    pub severity: Severity,
    pub message: Option<String>,
    pub details: Option<String>,
    pub doc_ref: Option<DocReference>,
    pub filter: Option<Filter>,
    /// Variable name (without `$`) and the path defining its value
    pub variables: Vec<(String, String)>,
}

impl Constraint {
    /// Constraint over `paths` with default bounds and severity
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            min: 0,
            max: None,
            paths: paths.into_iter().map(Into::into).collect(),
            severity: Severity::Error,
            message: None,
            details: None,
            doc_ref: None,
            filter: None,
            variables: Vec::new(),
        }
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn variable(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.variables.push((name.into(), path.into()));
        self
    }

    /// Human-readable list of the counted paths with placeholders and
    /// predicates stripped, e.g. `AltIdentifier, or EditEIDR-URN`
    pub fn target_list(&self) -> String {
        let last = self.paths.len().saturating_sub(1);
        let mut list = String::new();
        for (i, path) in self.paths.iter().enumerate() {
            let head = path.split('[').next().unwrap_or_default();
            if i > 0 {
                list.push_str(if i == last { ", or " } else { ", " });
            }
            list.push_str(head);
        }
        xpath::strip_placeholders(&list)
    }

    /// Predicate text of the last path, used when describing a missing match
    pub fn criteria(&self) -> Option<&str> {
        self.paths.last().and_then(|p| p.split('[').nth(1))
    }
}

/// Value filter applied to matches before counting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub values: BTreeSet<String>,
    /// Keep values *not* in the set
    pub negated: bool,
}

impl Filter {
    pub fn new<I, S>(values: I, negated: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
            negated,
        }
    }

    /// Whether a match with this value is kept
    pub fn accepts(&self, value: &str) -> bool {
        self.values.contains(value) != self.negated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_list() {
        let c = Constraint::new(["{avail}EpisodeMetadata/{avail}AltIdentifier"]);
        assert_eq!(c.target_list(), "EpisodeMetadata/AltIdentifier");

        let c = Constraint::new([
            "{manifest}A[@x='1']",
            "{manifest}B",
            "{md}C",
        ]);
        assert_eq!(c.target_list(), "A, B, or C");
    }

    #[test]
    fn test_criteria_from_last_path() {
        let c = Constraint::new(["{avail}X", "../{avail}Term[@termName='SuppressionLiftDate']"]);
        assert_eq!(c.criteria(), Some("@termName='SuppressionLiftDate']"));
        assert_eq!(Constraint::new(["{avail}X"]).criteria(), None);
    }

    #[test]
    fn test_filter_accepts() {
        let keep = Filter::new(["A", "B"], false);
        assert!(keep.accepts("A"));
        assert!(!keep.accepts("C"));

        let drop = Filter::new(["A", "B"], true);
        assert!(!drop.accepts("A"));
        assert!(drop.accepts("C"));
    }

    #[test]
    fn test_target_list_strips_every_family() {
        let c = Constraint::new(["{manifest}Audio/{md}Channels[.={$X}]", "{avail}Term"]);
        assert_eq!(c.target_list(), "Audio/Channels, or Term");
    }
}
