//! Structural Validation
//!
//! Evaluates rule definitions from a [`crate::rules::RuleCatalog`] against a
//! document. Validation never mutates the document and never fails on a
//! structural violation; violations are reported as diagnostics.

mod engine;
mod evaluator;

pub use engine::{ValidationEngine, ValidationResult};
pub use evaluator::{ConstraintEvaluator, EvalResult};
