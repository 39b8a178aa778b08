//! Structural Validation Tests
//!
//! Runs rule catalogs against whole documents through the public engine.

mod common;

use common::{avail_list, avails, defective_manifest, good_manifest, md_at};
use mddf_structure::{Document, RuleCatalog, SchemaFamily, Severity, ValidationEngine};

fn catalog() -> RuleCatalog {
    RuleCatalog::from_json_str(include_str!("fixtures/transaction_rules.json")).unwrap()
}

fn transaction_with_terms(names: &[&str]) -> Document {
    let e = |name: &str| avails("2.2", name);
    let transaction = names.iter().fold(e("Transaction").at_line(7), |t, name| {
        t.child(e("Term").attr("termName", *name).child(e("Text").text("x")))
    });
    avail_list("2.2", "2.4", vec![e("Avail").child(transaction)])
}

fn messages(diagnostics: &mddf_structure::Diagnostics, severity: Severity) -> Vec<String> {
    diagnostics.at_level(severity).map(|d| d.message.clone()).collect()
}

// =============================================================================
// Cardinality
// =============================================================================

#[test]
fn test_cardinality_boundaries() {
    let engine = ValidationEngine::new();
    let catalog = catalog();

    for (terms, expected) in [
        (vec![], Some("Invalid Transaction structure: missing elements")),
        (vec!["A"], None),
        (vec!["A", "C"], None),
        (vec!["A", "C", "D"], Some("Invalid Transaction structure: too many child elements")),
    ] {
        let doc = transaction_with_terms(&terms);
        let result = engine.validate_usage(&doc, &catalog, "Term-Count").unwrap();
        let errors = messages(&result.diagnostics, Severity::Error);

        match expected {
            Some(message) => {
                assert!(!result.passed, "{} terms should fail", terms.len());
                assert_eq!(errors, vec![message]);
            }
            None => {
                assert!(result.passed, "{} terms should pass", terms.len());
                assert!(result.diagnostics.is_empty());
            }
        }
    }
}

#[test]
fn test_violation_details_and_location() {
    let doc = transaction_with_terms(&["A", "B", "C"]);
    let result = ValidationEngine::new()
        .validate_usage(&doc, &catalog(), "Term-Count")
        .unwrap();

    let finding = &result.diagnostics.all()[0];
    assert_eq!(finding.details.as_deref(), Some("Transaction permits maximum of 2 Term elements"));
    assert_eq!(finding.doc_ref.as_ref().map(|r| r.to_string()).as_deref(), Some("AVAIL:terms"));

    let location = finding.location.as_ref().unwrap();
    assert_eq!(location.element, "avails:Transaction");
    assert_eq!(location.line, Some(7));
}

// =============================================================================
// Filters and variables
// =============================================================================

#[test]
fn test_filter_counts_only_listed_values() {
    let engine = ValidationEngine::new();
    let catalog = catalog();

    // {A, C} against {A, B}: one kept, one dropped
    let result = engine
        .validate_usage(&transaction_with_terms(&["A", "C"]), &catalog, "Term-Names")
        .unwrap();
    assert!(result.passed);
    assert!(result.diagnostics.is_empty());

    let result = engine
        .validate_usage(&transaction_with_terms(&["A", "B", "C", "D"]), &catalog, "Term-Names")
        .unwrap();
    assert!(!result.passed);
    assert_eq!(
        messages(&result.diagnostics, Severity::Error),
        vec!["Exactly one Term named A or B is required"]
    );
    assert_eq!(
        messages(&result.diagnostics, Severity::Warning),
        vec!["At most one Term outside of A and B"]
    );
}

#[test]
fn test_warnings_do_not_fail_validation() {
    let result = ValidationEngine::new()
        .validate_usage(&transaction_with_terms(&["A", "X", "Y"]), &catalog(), "Term-Names")
        .unwrap();
    assert!(result.passed);
    assert_eq!(result.diagnostics.count(Severity::Warning), 1);
}

#[test]
fn test_variable_binds_per_context() {
    let e = |name: &str| avails("2.2", name);
    let avail = |licensor: &str, contributor: &str| {
        e("Avail")
            .child(e("Licensor").child(md_at("2.4", "DisplayName").text(licensor)))
            .child(e("Asset").child(e("Contributor").text(contributor)))
    };
    let doc = avail_list(
        "2.2",
        "2.4",
        vec![avail("Studio A", "Studio A"), avail("Studio B", "Studio C")],
    );

    let result = ValidationEngine::new()
        .validate_usage(&doc, &catalog(), "Licensor-Match")
        .unwrap();
    assert!(result.passed);
    assert_eq!(
        messages(&result.diagnostics, Severity::Warning),
        vec!["Licensor is not credited on the Asset"]
    );
}

#[test]
fn test_unresolved_variable_skips_constraint() {
    let e = |name: &str| avails("2.2", name);
    let doc = avail_list("2.2", "2.4", vec![e("Avail").child(e("Asset"))]);

    // No Licensor, so the constraint does not apply to this Avail
    let lenient = ValidationEngine::new()
        .validate_usage(&doc, &catalog(), "Licensor-Match")
        .unwrap();
    assert!(lenient.passed);
    assert!(lenient.diagnostics.is_empty());

    let strict = ValidationEngine::new()
        .strict_variables(true)
        .validate_usage(&doc, &catalog(), "Licensor-Match")
        .unwrap();
    assert!(strict.passed);
    assert_eq!(
        messages(&strict.diagnostics, Severity::Warning),
        vec!["Unresolved variable $LICENSOR"]
    );
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_validation_is_deterministic() {
    let doc = defective_manifest();
    let catalog = RuleCatalog::builtin(SchemaFamily::Manifest, "1.6").unwrap();
    let engine = ValidationEngine::new();

    let first = engine.validate_all(&doc, &catalog).unwrap();
    for _ in 0..5 {
        let again = engine.validate_all(&doc, &catalog).unwrap();
        assert_eq!(again.passed, first.passed);
        assert_eq!(again.diagnostics.all(), first.diagnostics.all());
    }
}

// =============================================================================
// Built-in manifest catalog
// =============================================================================

#[test]
fn test_well_formed_manifest_is_clean() {
    let catalog = RuleCatalog::builtin(SchemaFamily::Manifest, "1.6").unwrap();
    let result = ValidationEngine::new().validate_all(&good_manifest(), &catalog).unwrap();

    assert!(result.passed);
    for severity in [Severity::Error, Severity::Warning, Severity::Notice] {
        assert_eq!(result.diagnostics.count(severity), 0, "unexpected {}: {}", severity, result.diagnostics);
    }
}

#[test]
fn test_defective_manifest_reports_two_errors() {
    let catalog = RuleCatalog::builtin(SchemaFamily::Manifest, "1.6").unwrap();
    let result = ValidationEngine::new().validate_all(&defective_manifest(), &catalog).unwrap();

    assert!(!result.passed);
    assert_eq!(result.diagnostics.count(Severity::Error), 2, "{}", result.diagnostics);

    let errors: Vec<_> = result.diagnostics.at_level(Severity::Error).collect();
    let channel = errors
        .iter()
        .find(|d| d.message == "ChannelMapping is not valid for multi-channel Audio")
        .unwrap();
    assert_eq!(channel.location.as_ref().and_then(|l| l.line), Some(12));

    let experience = errors
        .iter()
        .find(|d| d.message == "Experience does not reference any content")
        .unwrap();
    assert_eq!(experience.location.as_ref().and_then(|l| l.line), Some(57));
}

#[test]
fn test_catalog_from_directory_merges_sources() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("transaction.json"),
        include_str!("fixtures/transaction_rules.json"),
    )
    .unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(
        dir.path().join("nested/extra.json"),
        r#"{"Extra": {"targetPath": "/{avail}AvailList", "constraint": [{"min": 1, "xpath": "{avail}Avail"}]}}"#,
    )
    .unwrap();

    let catalog = RuleCatalog::from_directory(dir.path()).unwrap();
    assert_eq!(catalog.len(), 4);
    assert!(catalog.get("Extra").is_some());

    let result = ValidationEngine::new()
        .validate_usage(&transaction_with_terms(&["A"]), &catalog, "Extra")
        .unwrap();
    assert!(result.passed);
}
