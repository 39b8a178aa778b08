//! MDDF Structure Engine
//!
//! Structural validation and multi-version translation of MDDF Avails and
//! Media Manifest documents.
//!
//! ## Features
//!
//! - **Declarative Constraints**: cardinality and co-occurrence rules loaded from
//!   JSON rule catalogs, not hard-coded per schema version
//! - **Namespace Templates**: catalog paths use `{avail}`, `{manifest}`, `{md}` and
//!   `{mdmec}` placeholders bound to the document's actual schema versions
//! - **Version Translation**: declared step and route tables over a format graph,
//!   with a notice for everything a downgrade drops
//!
//! ## Architecture
//!
//! ```text
//! Document ──► ValidationEngine ──► ConstraintEvaluator ──► PathResolver
//!    │              ▲
//!    │          RuleCatalog (rules/<family>/structure_v<version>.json)
//!    │
//!    └──────► TranslationPlanner ──► FormatGraph ──► TransformStep*
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use mddf_structure::{FormatId, RuleCatalog, SchemaFamily, TranslationPlanner, ValidationEngine};
//! # fn demo(doc: &mddf_structure::Document) -> mddf_structure::Result<()> {
//! let catalog = RuleCatalog::builtin(SchemaFamily::Avails, "2.2")?;
//! let result = ValidationEngine::new().validate_usage(doc, &catalog, "POEST")?;
//! println!("{}", result.diagnostics);
//!
//! let translated = TranslationPlanner::default().translate(doc, FormatId::Avails2_2, FormatId::Avails2_3)?;
//! # let _ = translated;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod format;
pub mod namespace;
pub mod rules;
pub mod translate;
pub mod validation;
pub mod xpath;

pub use config::EngineConfig;
pub use diagnostics::{Category, Diagnostic, Diagnostics, DocReference, Severity, SourceLocation};
pub use document::{Document, Element, NodeId};
pub use error::{MddfError, Result};
pub use format::{Encoding, FormatGraph, FormatId, FormatVersion, TranslationPlan};
pub use namespace::{NamespaceContext, SchemaFamily};
pub use rules::{Constraint, Filter, RuleCatalog, RuleDefinition};
pub use translate::{TransformStep, Translation, TranslationPlanner};
pub use validation::{ConstraintEvaluator, EvalResult, ValidationEngine, ValidationResult};
pub use xpath::{PathResolver, Resolved};
