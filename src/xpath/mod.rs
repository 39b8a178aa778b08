//! Path Resolution
//!
//! Compiles namespace-templated path expressions into queries against a
//! [`Document`]. Expressions use `{family}` placeholders instead of prefixes
//! and `{$name}` references to constraint variables:
//!
//! ```text
//! ../..//{manifest}Experience[@ExperienceID={$CID}]/{manifest}PictureGroupID
//! ```
//!
//! Only a restricted XPath 1.0 subset is supported: child, descendant (`//`),
//! self (`.`), parent (`..`) and attribute (`@`) steps, name and wildcard
//! tests, and predicates built from comparisons, `and`, `or`, `not()`,
//! `count()` and positions.
//!
//! A [`PathResolver`] caches compiled queries by their fully substituted text.
//! Create one per validation or translation call.

mod eval;
mod parser;

use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::OnceLock;

use crate::document::{Document, NodeId};
use crate::error::{MddfError, Result};
use crate::namespace::{NamespaceContext, SchemaFamily};

use eval::Item;
use parser::{Axis, LocationPath};

/// Variable bindings for one context node. `None` marks a variable whose
/// defining path matched nothing.
pub type VariableMap = BTreeMap<String, Option<String>>;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z]\w*)\}").expect("placeholder pattern is valid"))
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\$(\w+)\}").expect("variable pattern is valid"))
}

/// Names of all `{$name}` references in an expression, in order of appearance
pub fn referenced_variables(expression: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in variable_pattern().captures_iter(expression) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Replace `{family}` placeholders with `prefix:`
pub fn substitute_placeholders(expression: &str) -> Result<String> {
    let mut unknown = None;
    let substituted = placeholder_pattern().replace_all(expression, |caps: &Captures| {
        match SchemaFamily::from_placeholder(&caps[1]) {
            Some(family) => format!("{}:", family.prefix()),
            None => {
                unknown.get_or_insert_with(|| caps[1].to_string());
                String::new()
            }
        }
    });
    match unknown {
        Some(name) => Err(MddfError::UnknownNamespace(format!("{{{}}}", name))),
        None => Ok(substituted.into_owned()),
    }
}

/// Drop `{family}` placeholders, leaving `{$name}` references in place
pub(crate) fn strip_placeholders(expression: &str) -> String {
    placeholder_pattern().replace_all(expression, "").into_owned()
}

/// Quote a value as an XPath string literal
fn quote(expression: &str, value: &str) -> Result<String> {
    if !value.contains('\'') {
        Ok(format!("'{}'", value))
    } else if !value.contains('"') {
        Ok(format!("\"{}\"", value))
    } else {
        Err(MddfError::path_syntax(
            expression,
            0,
            format!("variable value {:?} contains both quote characters", value),
        ))
    }
}

/// Check an expression for syntax and placeholder errors without a document.
/// Variable references are replaced by empty literals.
pub fn check_syntax(expression: &str) -> Result<()> {
    let substituted = substitute_placeholders(expression)?;
    let substituted = variable_pattern().replace_all(&substituted, "''");
    parser::parse(&substituted, &NamespaceContext::placeholder_bindings()).map(|_| ())
}

// =============================================================================
// Compiled queries
// =============================================================================

/// A query node: either an element or one attribute of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Match {
    Element(NodeId),
    Attribute { owner: NodeId, index: usize },
}

impl Match {
    /// Element, or the element owning the attribute
    pub fn node(&self) -> NodeId {
        match self {
            Self::Element(id) => *id,
            Self::Attribute { owner, .. } => *owner,
        }
    }

    /// Element string-value or attribute value
    pub fn value(&self, doc: &Document) -> String {
        eval::item_value(doc, self.as_item())
    }

    fn as_item(&self) -> Item {
        match *self {
            Self::Element(id) => Item::Element(id),
            Self::Attribute { owner, index } => Item::Attribute(owner, index),
        }
    }
}

/// A compiled, executable path expression
#[derive(Debug, Clone)]
pub struct CompiledPath {
    expression: String,
    path: LocationPath,
    selects_attributes: bool,
}

impl CompiledPath {
    /// The fully substituted expression text
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether the query yields attributes (`.../@name`) rather than elements
    pub fn selects_attributes(&self) -> bool {
        self.selects_attributes
    }

    /// Evaluate against a context element
    pub fn evaluate(&self, doc: &Document, context: NodeId) -> Vec<Match> {
        eval::select(doc, Item::Element(context), &self.path)
            .into_iter()
            .filter_map(|item| match (item, self.selects_attributes) {
                (Item::Attribute(owner, index), true) => Some(Match::Attribute { owner, index }),
                (Item::Element(id), false) => Some(Match::Element(id)),
                _ => None,
            })
            .collect()
    }

    /// First match, if any
    pub fn evaluate_first(&self, doc: &Document, context: NodeId) -> Option<Match> {
        self.evaluate(doc, context).into_iter().next()
    }
}

/// Outcome of resolving a templated expression
#[derive(Debug, Clone)]
pub enum Resolved {
    Query(Rc<CompiledPath>),
    /// The expression references a variable with no value
    Unresolvable { variable: String },
}

// =============================================================================
// Resolver
// =============================================================================

/// Compiles templated expressions against one namespace context, caching the
/// compiled form by substituted text
#[derive(Debug)]
pub struct PathResolver {
    namespaces: NamespaceContext,
    cache: HashMap<String, Rc<CompiledPath>>,
}

impl PathResolver {
    pub fn new(namespaces: NamespaceContext) -> Self {
        Self {
            namespaces,
            cache: HashMap::new(),
        }
    }

    /// Resolver bound to the namespaces a document declares
    pub fn for_document(doc: &Document) -> Self {
        Self::new(NamespaceContext::from_document(doc))
    }

    pub fn namespaces(&self) -> &NamespaceContext {
        &self.namespaces
    }

    /// Number of compiled queries held in the cache
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Substitute placeholders and variables, then compile.
    ///
    /// Returns [`Resolved::Unresolvable`] when a referenced variable is unset
    /// or bound to `None`.
    pub fn resolve(&mut self, expression: &str, variables: Option<&VariableMap>) -> Result<Resolved> {
        let mut substituted = substitute_placeholders(expression)?;

        for name in referenced_variables(&substituted) {
            let value = variables.and_then(|vars| vars.get(&name)).and_then(|v| v.as_deref());
            let Some(value) = value else {
                return Ok(Resolved::Unresolvable { variable: name });
            };
            let literal = quote(expression, value)?;
            substituted = substituted.replace(&format!("{{${}}}", name), &literal);
        }

        self.compile(&substituted).map(Resolved::Query)
    }

    /// Compile an already substituted expression, using the cache
    pub fn compile(&mut self, expression: &str) -> Result<Rc<CompiledPath>> {
        if let Some(compiled) = self.cache.get(expression) {
            return Ok(Rc::clone(compiled));
        }

        let path = parser::parse(expression, &self.namespaces)?;
        let selects_attributes = path
            .steps
            .last()
            .map(|step| step.axis == Axis::Attribute)
            .unwrap_or(false);
        let compiled = Rc::new(CompiledPath {
            expression: expression.to_string(),
            path,
            selects_attributes,
        });
        self.cache.insert(expression.to_string(), Rc::clone(&compiled));
        Ok(compiled)
    }

    /// Resolve and evaluate a variable-free expression in one go
    pub fn select(&mut self, doc: &Document, context: NodeId, expression: &str) -> Result<Vec<Match>> {
        match self.resolve(expression, None)? {
            Resolved::Query(query) => Ok(query.evaluate(doc, context)),
            Resolved::Unresolvable { variable } => Err(MddfError::path_syntax(
                expression,
                0,
                format!("variable ${} is not bound", variable),
            )),
        }
    }

    /// Like [`select`](Self::select), keeping only element matches
    pub fn select_elements(&mut self, doc: &Document, context: NodeId, expression: &str) -> Result<Vec<NodeId>> {
        Ok(self
            .select(doc, context, expression)?
            .into_iter()
            .filter_map(|m| match m {
                Match::Element(id) => Some(id),
                Match::Attribute { .. } => None,
            })
            .collect())
    }
}
