//! Validation Engine
//!
//! Applies whole rule definitions: selects the context elements through the
//! rule's target path, then evaluates every constraint at every context.

use crate::config::ValidationConfig;
use crate::diagnostics::Diagnostics;
use crate::document::{Document, NodeId};
use crate::error::{MddfError, Result};
use crate::rules::{RuleCatalog, RuleDefinition};

use super::evaluator::ConstraintEvaluator;

/// Outcome of validating a document against one or more rules
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// False if any finding is above warning level
    pub passed: bool,
    pub diagnostics: Diagnostics,
}

impl ValidationResult {
    fn absorb(&mut self, other: ValidationResult) {
        self.passed &= other.passed;
        self.diagnostics.merge(other.diagnostics);
    }
}

/// Structural validation front end. Stateless between calls.
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    strict_variables: bool,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            strict_variables: config.strict_variables,
        }
    }

    pub fn strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;
        self
    }

    fn evaluator<'a>(&self, doc: &'a Document) -> ConstraintEvaluator<'a> {
        ConstraintEvaluator::new(doc).strict_variables(self.strict_variables)
    }

    /// Validate the elements selected by the rule's target path.
    ///
    /// A target path matching nothing passes trivially.
    pub fn validate(&self, doc: &Document, rule: &RuleDefinition) -> Result<ValidationResult> {
        let target = rule
            .target_path
            .as_deref()
            .ok_or_else(|| MddfError::MissingTargetPath(rule.usage.clone()))?;

        let mut evaluator = self.evaluator(doc);
        let contexts = evaluator.resolver_mut().select_elements(doc, doc.root(), target)?;
        tracing::debug!(usage = %rule.usage, contexts = contexts.len(), "Validating rule");

        Ok(Self::run(&mut evaluator, rule, &contexts))
    }

    /// Validate a rule against caller-chosen context elements
    pub fn validate_nodes(&self, doc: &Document, rule: &RuleDefinition, nodes: &[NodeId]) -> ValidationResult {
        let mut evaluator = self.evaluator(doc);
        Self::run(&mut evaluator, rule, nodes)
    }

    /// Look a rule up by usage key and validate it
    pub fn validate_usage(&self, doc: &Document, catalog: &RuleCatalog, usage: &str) -> Result<ValidationResult> {
        let rule = catalog
            .get(usage)
            .ok_or_else(|| MddfError::UnknownUsage(usage.to_string()))?;
        self.validate(doc, rule)
    }

    /// Validate every rule in the catalog that has a target path
    pub fn validate_all(&self, doc: &Document, catalog: &RuleCatalog) -> Result<ValidationResult> {
        let mut result = ValidationResult {
            passed: true,
            diagnostics: Diagnostics::new(),
        };
        for rule in catalog.iter() {
            if rule.target_path.is_none() {
                tracing::debug!(usage = %rule.usage, "Skipping rule without targetPath");
                continue;
            }
            result.absorb(self.validate(doc, rule)?);
        }
        Ok(result)
    }

    fn run(evaluator: &mut ConstraintEvaluator<'_>, rule: &RuleDefinition, contexts: &[NodeId]) -> ValidationResult {
        let mut result = ValidationResult {
            passed: true,
            diagnostics: Diagnostics::new(),
        };
        for &context in contexts {
            for constraint in &rule.constraints {
                let outcome = evaluator.evaluate(context, constraint);
                result.passed &= outcome.passed;
                result.diagnostics.merge(outcome.diagnostics);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::document::Element;
    use crate::namespace::SchemaFamily;

    const CATALOG: &str = r#"{
        "POEST": {
            "targetPath": ".//{avail}LicenseType[.='POEST']",
            "constraint": [{
                "min": "1", "max": "1",
                "xpath": "../{avail}Term[@termName='SuppressionLiftDate']",
                "severity": "Error",
                "msg": "One SuppressionLiftDate is required for LicenseType 'POEST'"
            }]
        },
        "WorkType-Episode": {
            "constraint": [{
                "min": "1", "max": "2",
                "xpath": ["{avail}EpisodeMetadata/{avail}AltIdentifier", "{avail}EpisodeMetadata/{avail}EditEIDR-URN"]
            }]
        }
    }"#;

    fn el(name: &str) -> Element {
        Element::qualified("avails", SchemaFamily::Avails.namespace_uri("2.2"), name)
    }

    fn transaction(license: &str, with_term: bool) -> Element {
        let t = el("Transaction").child(el("LicenseType").text(license));
        if with_term {
            t.child(el("Term").attr("termName", "SuppressionLiftDate").child(el("Event").text("2021-01-01")))
        } else {
            t
        }
    }

    fn doc(transactions: Vec<Element>) -> Document {
        Document::new(
            el("AvailList")
                .declare("avails", SchemaFamily::Avails.namespace_uri("2.2"))
                .child(el("Avail").children(transactions)),
        )
    }

    #[test]
    fn test_validate_usage() {
        let catalog = RuleCatalog::from_json_str(CATALOG).unwrap();
        let engine = ValidationEngine::new();

        let good = doc(vec![transaction("POEST", true), transaction("EST", false)]);
        let result = engine.validate_usage(&good, &catalog, "POEST").unwrap();
        assert!(result.passed);
        assert!(result.diagnostics.is_empty());

        let bad = doc(vec![transaction("POEST", true), transaction("POEST", false)]);
        let result = engine.validate_usage(&bad, &catalog, "POEST").unwrap();
        assert!(!result.passed);
        assert_eq!(result.diagnostics.count(Severity::Error), 1);
        let d = &result.diagnostics.all()[0];
        assert_eq!(d.location.as_ref().map(|l| l.element.as_str()), Some("avails:LicenseType"));
    }

    #[test]
    fn test_missing_target_path() {
        let catalog = RuleCatalog::from_json_str(CATALOG).unwrap();
        let engine = ValidationEngine::new();
        let d = doc(vec![]);
        assert!(matches!(
            engine.validate_usage(&d, &catalog, "WorkType-Episode"),
            Err(MddfError::MissingTargetPath(_))
        ));
        assert!(matches!(
            engine.validate_usage(&d, &catalog, "Nope"),
            Err(MddfError::UnknownUsage(_))
        ));
    }

    #[test]
    fn test_validate_nodes() {
        let catalog = RuleCatalog::from_json_str(CATALOG).unwrap();
        let rule = catalog.get("WorkType-Episode").unwrap();
        let d = Document::new(
            el("Asset")
                .declare("avails", SchemaFamily::Avails.namespace_uri("2.2"))
                .child(el("EpisodeMetadata").child(el("AltIdentifier")).child(el("EditEIDR-URN")).child(el("AltIdentifier"))),
        );
        let result = ValidationEngine::new().validate_nodes(&d, rule, &[d.root()]);
        assert!(!result.passed);
        assert_eq!(
            result.diagnostics.all()[0].details.as_deref(),
            Some("Asset permits maximum of 2 EpisodeMetadata/AltIdentifier, or EpisodeMetadata/EditEIDR-URN elements")
        );
    }

    #[test]
    fn test_validation_is_deterministic() {
        let catalog = RuleCatalog::from_json_str(CATALOG).unwrap();
        let engine = ValidationEngine::new();
        let d = doc(vec![transaction("POEST", false), transaction("POEST", false)]);
        let before = d.clone();
        let first = engine.validate_all(&d, &catalog).unwrap();
        let second = engine.validate_all(&d, &catalog).unwrap();
        assert_eq!(first.diagnostics, second.diagnostics);
        assert_eq!(first.diagnostics.count(Severity::Error), 2);
        assert_eq!(d, before);
    }
}
