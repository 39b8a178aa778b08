//! Constraint Evaluation
//!
//! Checks one [`Constraint`] against one context element: resolve variables,
//! evaluate each path, filter, count, and compare against the bounds.

use crate::diagnostics::{Category, Diagnostic, Diagnostics, Severity, SourceLocation};
use crate::document::{Document, NodeId};
use crate::error::MddfError;
use crate::rules::Constraint;
use crate::xpath::{Match, PathResolver, Resolved, VariableMap};

/// Outcome of evaluating one constraint at one context element
#[derive(Debug, Clone, Default)]
pub struct EvalResult {
    pub passed: bool,
    pub diagnostics: Diagnostics,
}

/// Evaluates constraints against a single document.
///
/// Owns the path cache for the duration of one validation call.
pub struct ConstraintEvaluator<'a> {
    doc: &'a Document,
    resolver: PathResolver,
    strict_variables: bool,
}

impl<'a> ConstraintEvaluator<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            resolver: PathResolver::for_document(doc),
            strict_variables: false,
        }
    }

    /// Report unresolved variables as warnings
    pub fn strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;
        self
    }

    pub fn resolver_mut(&mut self) -> &mut PathResolver {
        &mut self.resolver
    }

    fn location(&self, context: NodeId) -> SourceLocation {
        SourceLocation {
            element: self.doc.qualified_name(context),
            line: self.doc.line(context),
        }
    }

    fn evaluation_error(&self, context: NodeId, constraint: &Constraint, error: MddfError) -> Diagnostic {
        Diagnostic::new(
            Severity::Error,
            Category::Structure,
            format!("Unable to evaluate {} structure constraint", self.doc.name(context)),
        )
        .with_details(error.to_string())
        .with_doc_ref(constraint.doc_ref.clone())
        .at(self.location(context))
    }

    /// Evaluate `constraint` with `context` as the context element
    pub fn evaluate(&mut self, context: NodeId, constraint: &Constraint) -> EvalResult {
        let mut result = EvalResult {
            passed: true,
            diagnostics: Diagnostics::new(),
        };

        let variables = self.resolve_variables(context, constraint, &mut result);

        let mut count = 0;
        let mut unresolved = None;
        for path in &constraint.paths {
            match self.resolver.resolve(path, Some(&variables)) {
                Ok(Resolved::Query(query)) => {
                    let matches = query.evaluate(self.doc, context);
                    count += match &constraint.filter {
                        Some(filter) => matches
                            .iter()
                            .filter(|m| filter.accepts(&m.value(self.doc)))
                            .count(),
                        None => matches.len(),
                    };
                }
                Ok(Resolved::Unresolvable { variable }) => {
                    tracing::debug!(path = %path, variable = %variable, "Skipping path with unresolved variable");
                    unresolved.get_or_insert(variable);
                }
                Err(e) => {
                    result.passed = false;
                    result.diagnostics.push(self.evaluation_error(context, constraint, e));
                }
            }
        }

        // A constraint depending on an unset variable is not applicable here
        match unresolved {
            Some(variable) => tracing::debug!(
                element = %self.doc.name(context),
                variable = %variable,
                "Skipping constraint bounds"
            ),
            None => self.check_bounds(context, constraint, count, &mut result),
        }
        result
    }

    fn resolve_variables(&mut self, context: NodeId, constraint: &Constraint, result: &mut EvalResult) -> VariableMap {
        let mut variables = VariableMap::new();

        for (name, path) in &constraint.variables {
            let value = match self.resolver.resolve(path, None) {
                Ok(Resolved::Query(query)) => query.evaluate_first(self.doc, context).map(|m| match m {
                    Match::Attribute { .. } => m.value(self.doc),
                    Match::Element(id) => self.doc.normalized_text(id),
                }),
                Ok(Resolved::Unresolvable { .. }) => None,
                Err(e) => {
                    result.passed = false;
                    result.diagnostics.push(self.evaluation_error(context, constraint, e));
                    None
                }
            };
            tracing::debug!(variable = %name, value = ?value, element = %self.doc.name(context), "Resolved variable");

            if value.is_none() && self.strict_variables {
                result.diagnostics.push(
                    Diagnostic::new(Severity::Warning, Category::Structure, format!("Unresolved variable ${}", name))
                        .with_details(format!("{} matched nothing", path))
                        .at(self.location(context)),
                );
            }
            variables.insert(name.clone(), value);
        }

        variables
    }

    fn check_bounds(&self, context: NodeId, constraint: &Constraint, count: usize, result: &mut EvalResult) {
        let element = self.doc.name(context);

        if constraint.min > 0 && count < constraint.min {
            let message = constraint
                .message
                .clone()
                .unwrap_or_else(|| format!("Invalid {} structure: missing elements", element));
            let details = constraint.details.clone().unwrap_or_else(|| {
                let mut details = format!(
                    "{} requires minimum of {} {} elements",
                    element,
                    constraint.min,
                    constraint.target_list()
                );
                if let Some(criteria) = constraint.criteria() {
                    details.push_str(&format!(" matching the criteria [{}", criteria));
                }
                details
            });
            self.report(context, constraint, message, details, result);
        }

        if let Some(max) = constraint.max {
            if count > max {
                let message = constraint
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Invalid {} structure: too many child elements", element));
                let details = constraint.details.clone().unwrap_or_else(|| {
                    format!("{} permits maximum of {} {} elements", element, max, constraint.target_list())
                });
                self.report(context, constraint, message, details, result);
            }
        }
    }

    fn report(&self, context: NodeId, constraint: &Constraint, message: String, details: String, result: &mut EvalResult) {
        result.diagnostics.push(
            Diagnostic::new(constraint.severity, Category::Structure, message)
                .with_details(details)
                .with_doc_ref(constraint.doc_ref.clone())
                .at(self.location(context)),
        );
        if constraint.severity.is_failure() {
            result.passed = false;
        }
    }
}
