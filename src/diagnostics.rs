//! Diagnostics
//!
//! Findings produced by structural validation and by translation steps.
//! The severity decides both presentation and pass/fail: only findings above
//! [`Severity::Warning`] fail a check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MddfError;

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Notice,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Notice,
        Severity::Warning,
        Severity::Error,
        Severity::Fatal,
    ];

    /// Whether a finding at this level fails the check it belongs to
    pub fn is_failure(&self) -> bool {
        *self > Severity::Warning
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Notice => "Notice",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = MddfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| MddfError::configuration("severity", format!("unknown severity '{}'", s)))
    }
}

// =============================================================================
// Categories and references
// =============================================================================

/// What produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Structural constraint checks
    Structure,
    /// Translation steps
    Translation,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structure => write!(f, "structure"),
            Self::Translation => write!(f, "translation"),
        }
    }
}

/// Pointer into the documentation of a requirement, written `STANDARD:section`
/// in rule catalogs (e.g. `AVAIL:avail00n`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocReference {
    pub standard: String,
    pub section: String,
}

impl DocReference {
    /// Parse `STANDARD:section`; anything else yields `None`
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split(':');
        let standard = parts.next()?.trim();
        let section = parts.next()?.trim();
        if standard.is_empty() || section.is_empty() {
            return None;
        }
        Some(Self {
            standard: standard.to_string(),
            section: section.to_string(),
        })
    }
}

impl fmt::Display for DocReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.standard, self.section)
    }
}

/// Where in the document a finding applies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Qualified name of the element
    pub element: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "<{}> line {}", self.element, line),
            None => write!(f, "<{}>", self.element),
        }
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    /// Human-readable message
    pub message: String,
    /// Longer explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_ref: Option<DocReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn new(severity: Severity, category: Category, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            details: None,
            doc_ref: None,
            location: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_doc_ref(mut self, doc_ref: Option<DocReference>) -> Self {
        self.doc_ref = doc_ref;
        self
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.category, self.severity, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        if let Some(details) = &self.details {
            write!(f, "\n  - {}", details)?;
        }
        if let Some(doc_ref) = &self.doc_ref {
            write!(f, "\n  - see {}", doc_ref)?;
        }
        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Ordered collection of findings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Diagnostic) {
        self.items.push(item);
    }

    /// Record a translation notice
    pub fn notice(&mut self, message: impl Into<String>) -> &mut Diagnostic {
        self.items
            .push(Diagnostic::new(Severity::Notice, Category::Translation, message));
        let last = self.items.len() - 1;
        &mut self.items[last]
    }

    /// Whether any finding fails its check
    pub fn has_failures(&self) -> bool {
        self.items.iter().any(|i| i.severity.is_failure())
    }

    /// Number of findings at exactly `severity`
    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|i| i.severity == severity).count()
    }

    pub fn at_level(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |i| i.severity == severity)
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(items);
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if !self.is_empty() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s), {} notice(s)\n",
                self.count(Severity::Fatal) + self.count(Severity::Error),
                self.count(Severity::Warning),
                self.count(Severity::Notice)
            ));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_threshold() {
        assert!(Severity::Fatal.is_failure());
        assert!(Severity::Error.is_failure());
        assert!(!Severity::Warning.is_failure());
        assert!(!Severity::Notice.is_failure());
        assert!(!Severity::Debug.is_failure());
    }

    #[test]
    fn test_severity_parsing() {
        assert_eq!("Error".parse::<Severity>().unwrap(), Severity::Error);
        assert_eq!("notice".parse::<Severity>().unwrap(), Severity::Notice);
        assert!(matches!(
            "Critical".parse::<Severity>(),
            Err(MddfError::Configuration { ref reason, .. }) if reason == "unknown severity 'Critical'"
        ));
    }

    #[test]
    fn test_doc_reference() {
        let r = DocReference::parse("AVAIL:avail00n").unwrap();
        assert_eq!(r.standard, "AVAIL");
        assert_eq!(r.section, "avail00n");
        assert!(DocReference::parse("AVAIL").is_none());
        assert!(DocReference::parse("").is_none());
    }

    #[test]
    fn test_diagnostics_collection() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::new(Severity::Error, Category::Structure, "missing"));
        diags.notice("Removing 2 People elements");

        assert_eq!(diags.count(Severity::Error), 1);
        assert_eq!(diags.count(Severity::Notice), 1);
        assert!(diags.has_failures());
        assert!(diags.format_all().contains("1 error(s)"));
    }
}
