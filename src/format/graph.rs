//! Format Graph
//!
//! Directed graph of formats whose edges are the declared translation steps.
//! Multi-hop translations are only performed along declared routes; graph
//! reachability is used as a quick rejection test, never to invent a route.

use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};

use super::{FormatId, FormatVersion};
use crate::error::{MddfError, Result};
use crate::translate::{avails, TransformStep};

/// A declared multi-hop translation through intermediate formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub source: FormatId,
    pub target: FormatId,
    /// Intermediate formats, in order
    pub via: &'static [FormatId],
}

/// Ordered steps turning a document of `source` format into `target`
#[derive(Debug, Clone)]
pub struct TranslationPlan {
    pub source: FormatId,
    /// Requested format; tabular for spreadsheet exports
    pub target: FormatId,
    /// Format of the document the steps produce
    pub xml_target: FormatId,
    pub steps: Vec<&'static TransformStep>,
}

impl TranslationPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Step names joined with ` -> `
    pub fn describe(&self) -> String {
        if self.steps.is_empty() {
            return "identity".to_string();
        }
        self.steps.iter().map(|s| s.name).collect::<Vec<_>>().join(" -> ")
    }
}

/// Immutable format graph, built once from static step and route tables
pub struct FormatGraph {
    graph: DiGraph<FormatId, usize>,
    nodes: HashMap<FormatId, NodeIndex>,
    steps: &'static [TransformStep],
    routes: &'static [Route],
}

impl FormatGraph {
    pub fn new(steps: &'static [TransformStep], routes: &'static [Route]) -> Self {
        let mut graph = DiGraph::with_capacity(FormatId::ALL.len(), steps.len());
        let mut nodes = HashMap::with_capacity(FormatId::ALL.len());
        for id in FormatId::ALL {
            nodes.insert(id, graph.add_node(id));
        }
        for (index, step) in steps.iter().enumerate() {
            graph.add_edge(nodes[&step.source], nodes[&step.target], index);
        }
        Self {
            graph,
            nodes,
            steps,
            routes,
        }
    }

    /// Graph of the built-in Avails steps and routes
    pub fn standard() -> Self {
        Self::new(avails::STEPS, avails::ROUTES)
    }

    pub fn steps(&self) -> &'static [TransformStep] {
        self.steps
    }

    pub fn routes(&self) -> &'static [Route] {
        self.routes
    }

    fn edge(&self, source: FormatId, target: FormatId) -> Option<&'static TransformStep> {
        let edge = self.graph.find_edge(self.nodes[&source], self.nodes[&target])?;
        let steps = self.steps;
        Some(&steps[self.graph[edge]])
    }

    fn route(&self, source: FormatId, target: FormatId) -> Option<&'static Route> {
        let routes = self.routes;
        routes.iter().find(|r| r.source == source && r.target == target)
    }

    /// Plan a translation.
    ///
    /// Identical formats give an empty plan, tabular ones included. Other
    /// tabular targets are planned to their XML basis.
    pub fn find_plan(&self, source: FormatId, target: FormatId) -> Result<TranslationPlan> {
        if source == target {
            return Ok(TranslationPlan {
                source,
                target,
                xml_target: target.info().xml_basis.unwrap_or(target),
                steps: Vec::new(),
            });
        }

        let unsupported = || MddfError::UnsupportedTranslation {
            from: source.to_string(),
            to: target.to_string(),
        };

        let xml_target = match target.info().xml_basis {
            Some(basis) => basis,
            None if target.info().is_tabular() => return Err(unsupported()),
            None => target,
        };
        if source.info().is_tabular() {
            return Err(unsupported());
        }

        let steps = self.xml_steps(source, xml_target).ok_or_else(unsupported)?;
        tracing::debug!(%source, %target, steps = steps.len(), "Selected translation plan");
        Ok(TranslationPlan {
            source,
            target,
            xml_target,
            steps,
        })
    }

    fn xml_steps(&self, source: FormatId, target: FormatId) -> Option<Vec<&'static TransformStep>> {
        if source == target {
            return Some(Vec::new());
        }
        if !has_path_connecting(&self.graph, self.nodes[&source], self.nodes[&target], None) {
            return None;
        }
        if let Some(step) = self.edge(source, target) {
            return Some(vec![step]);
        }

        let route = self.route(source, target)?;
        let mut hops = vec![source];
        hops.extend_from_slice(route.via);
        hops.push(target);
        hops.windows(2).map(|pair| self.edge(pair[0], pair[1])).collect()
    }

    /// Formats a document in `source` format can be translated to, in
    /// registry order
    pub fn supported_targets(&self, source: FormatId) -> Vec<&'static FormatVersion> {
        if source.info().is_tabular() {
            return Vec::new();
        }

        let mut targets: BTreeSet<FormatId> = self
            .graph
            .neighbors(self.nodes[&source])
            .map(|n| self.graph[n])
            .collect();
        targets.extend(self.routes.iter().filter(|r| r.source == source).map(|r| r.target));

        let tabular: Vec<FormatId> = FormatVersion::all()
            .iter()
            .filter(|f| matches!(f.xml_basis, Some(basis) if basis == source || targets.contains(&basis)))
            .map(|f| f.id)
            .collect();
        targets.extend(tabular);
        targets.remove(&source);

        targets.into_iter().map(|id| id.info()).collect()
    }
}
