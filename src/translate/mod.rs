//! Document Translation
//!
//! Rewrites a document from one format version to another by applying the
//! [`TransformStep`]s of a [`TranslationPlan`] to a clone of the input.
//!
//! Each step is a plain function over a [`StepContext`]. Steps run their
//! structural edits with paths bound to the *source* namespaces and finish
//! with a namespace remap to the target version.

pub mod avails;
mod edits;

use std::fmt;

use crate::diagnostics::Diagnostics;
use crate::document::Document;
use crate::error::{MddfError, Result};
use crate::format::{FormatGraph, FormatId, FormatVersion, TranslationPlan};
use crate::xpath::PathResolver;

/// Transform function of a step
pub type StepFn = fn(&mut StepContext<'_>) -> Result<()>;

/// One declared edge of the format graph
pub struct TransformStep {
    pub name: &'static str,
    pub source: FormatId,
    pub target: FormatId,
    pub apply: StepFn,
}

impl TransformStep {
    /// Apply the step to `doc` in place
    pub fn run(&self, doc: &mut Document, diagnostics: &mut Diagnostics) -> Result<()> {
        let mut ctx = StepContext {
            resolver: PathResolver::new(self.source.info().namespaces()),
            doc,
            diagnostics,
            source: self.source.info(),
            target: self.target.info(),
        };
        (self.apply)(&mut ctx)
    }
}

impl fmt::Debug for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformStep")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target)
            .finish()
    }
}

/// Mutable state handed to a step; edit helpers live in `edits`
pub struct StepContext<'a> {
    pub doc: &'a mut Document,
    pub diagnostics: &'a mut Diagnostics,
    pub source: &'static FormatVersion,
    pub target: &'static FormatVersion,
    resolver: PathResolver,
}

// =============================================================================
// Planner
// =============================================================================

/// A translated document with the findings of the steps that produced it
#[derive(Debug, Clone)]
pub struct Translation {
    pub document: Document,
    pub source: FormatId,
    /// Requested format (may be tabular; the document is then at its XML basis)
    pub target: FormatId,
    /// Names of the applied steps, in order
    pub steps: Vec<&'static str>,
    pub diagnostics: Diagnostics,
}

/// Plans and executes translations over an immutable [`FormatGraph`]
pub struct TranslationPlanner {
    graph: FormatGraph,
}

impl Default for TranslationPlanner {
    fn default() -> Self {
        Self::new(FormatGraph::standard())
    }
}

impl TranslationPlanner {
    pub fn new(graph: FormatGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &FormatGraph {
        &self.graph
    }

    pub fn plan(&self, source: FormatId, target: FormatId) -> Result<TranslationPlan> {
        self.graph.find_plan(source, target)
    }

    pub fn supported_targets(&self, source: FormatId) -> Vec<&'static FormatVersion> {
        self.graph.supported_targets(source)
    }

    /// Translate a copy of `doc` from `source` to `target`.
    ///
    /// Stops at the first failing step.
    pub fn translate(&self, doc: &Document, source: FormatId, target: FormatId) -> Result<Translation> {
        let plan = self.graph.find_plan(source, target)?;
        tracing::info!(%source, %target, plan = %plan.describe(), "Translating document");

        let mut document = doc.clone();
        let mut diagnostics = Diagnostics::new();
        for step in &plan.steps {
            step.run(&mut document, &mut diagnostics).map_err(|source| MddfError::StepFailed {
                step: step.name.to_string(),
                from: step.source.to_string(),
                to: step.target.to_string(),
                source: Box::new(source),
            })?;
        }

        tracing::info!(%source, %target, notices = diagnostics.len(), "Translation complete");
        Ok(Translation {
            document,
            source,
            target,
            steps: plan.steps.iter().map(|s| s.name).collect(),
            diagnostics,
        })
    }

    /// Translate, identifying the source format from the root namespace
    pub fn translate_detected(&self, doc: &Document, target: FormatId) -> Result<Translation> {
        let source = FormatVersion::identify(doc)?;
        self.translate(doc, source.id, target)
    }
}
