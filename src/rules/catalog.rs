//! Rule Catalog Loading
//!
//! Reads rule catalogs from JSON text, files, directories, or the catalogs
//! embedded in the binary under `rules/`. Every entry is converted to the
//! typed form and every path is syntax-checked before the catalog is returned.

use include_dir::{include_dir, Dir};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{Constraint, Filter, RuleDefinition};
use crate::diagnostics::{DocReference, Severity};
use crate::error::{MddfError, Result};
use crate::namespace::SchemaFamily;
use crate::xpath;

/// Catalogs shipped with the crate, `<family>/structure_v<version>.json`
static BUILTIN_RULES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/rules");

// =============================================================================
// Raw JSON form
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(rename = "targetPath", default)]
    target_path: Option<String>,
    #[serde(default)]
    constraint: Vec<RawConstraint>,
}

#[derive(Debug, Deserialize)]
struct RawConstraint {
    #[serde(default)]
    min: Option<Count>,
    #[serde(default)]
    max: Option<Count>,
    #[serde(default)]
    xpath: Option<OneOrMany>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(rename = "docRef", default)]
    doc_ref: Option<String>,
    #[serde(default)]
    filter: Option<RawFilter>,
    /// `$NAME` variable definitions plus anything unrecognised
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawFilter {
    values: Vec<String>,
    #[serde(default)]
    negated: Option<Flag>,
}

/// Integers may be written as numbers or numeric strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Count {
    fn value(&self, usage: &str, field: &str) -> Result<i64> {
        match self {
            Count::Number(n) => Ok(*n),
            Count::Text(text) => text.trim().parse::<i64>().map_err(|_| {
                MddfError::configuration(usage, format!("'{}' is not an integer: {:?}", field, text))
            }),
        }
    }
}

impl Flag {
    fn value(&self, usage: &str) -> Result<bool> {
        match self {
            Flag::Bool(b) => Ok(*b),
            Flag::Text(text) => match text.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(MddfError::configuration(
                    usage,
                    format!("filter 'negated' must be true or false, got {:?}", other),
                )),
            },
        }
    }
}

// =============================================================================
// Conversion
// =============================================================================

fn convert_rule(usage: &str, raw: RawRule) -> Result<RuleDefinition> {
    if let Some(target) = &raw.target_path {
        check_path(usage, target)?;
        // Variables bind per context node, so none exist yet when the target is selected
        if let Some(name) = xpath::referenced_variables(target).first() {
            return Err(MddfError::configuration(
                usage,
                format!("targetPath must not reference variable ${}", name),
            ));
        }
    }
    if raw.constraint.is_empty() {
        return Err(MddfError::configuration(usage, "rule has no constraints"));
    }

    let constraints = raw
        .constraint
        .into_iter()
        .enumerate()
        .map(|(index, c)| convert_constraint(usage, index, c))
        .collect::<Result<Vec<_>>>()?;

    Ok(RuleDefinition {
        usage: usage.to_string(),
        target_path: raw.target_path,
        constraints,
    })
}

fn convert_constraint(usage: &str, index: usize, raw: RawConstraint) -> Result<Constraint> {
    let fail = |reason: String| MddfError::configuration(usage, format!("constraint {}: {}", index, reason));

    let paths = match raw.xpath {
        Some(OneOrMany::One(path)) => vec![path],
        Some(OneOrMany::Many(paths)) => paths,
        None => Vec::new(),
    };
    if paths.is_empty() {
        return Err(fail("'xpath' is required".to_string()));
    }

    let min = match &raw.min {
        Some(count) => count.value(usage, "min")?,
        None => 0,
    };
    if min < 0 {
        return Err(fail(format!("'min' must not be negative, got {}", min)));
    }
    // -1 is the conventional spelling of "unbounded"
    let max = match &raw.max {
        Some(count) => match count.value(usage, "max")? {
            -1 => None,
            n if n < 0 => return Err(fail(format!("'max' must not be negative, got {}", n))),
            n => Some(n as usize),
        },
        None => None,
    };
    if let Some(max) = max {
        if (min as usize) > max {
            return Err(fail(format!("'min' {} exceeds 'max' {}", min, max)));
        }
    }

    let severity = match &raw.severity {
        // Re-tag with the usage key of this rule
        Some(text) => text.parse::<Severity>().map_err(|e| match e {
            MddfError::Configuration { reason, .. } => fail(reason),
            other => other,
        })?,
        None => Severity::Error,
    };

    let doc_ref = match raw.doc_ref.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(text) => Some(
            DocReference::parse(text)
                .ok_or_else(|| fail(format!("'docRef' must be STANDARD:section, got {:?}", text)))?,
        ),
    };

    let filter = match raw.filter {
        Some(f) => {
            let negated = match &f.negated {
                Some(flag) => flag.value(usage)?,
                None => false,
            };
            Some(Filter::new(f.values, negated))
        }
        None => None,
    };

    let mut variables = Vec::new();
    for (key, value) in raw.extra {
        let Some(name) = key.strip_prefix('$') else {
            tracing::warn!(usage, key = %key, "Ignoring unrecognised constraint field");
            continue;
        };
        let path = value
            .as_str()
            .ok_or_else(|| fail(format!("variable {} must be a path string", key)))?;
        check_path(usage, path)?;
        variables.push((name.to_string(), path.to_string()));
    }

    for path in &paths {
        check_path(usage, path)?;
        for referenced in xpath::referenced_variables(path) {
            if !variables.iter().any(|(name, _)| *name == referenced) {
                return Err(fail(format!("path {:?} references undeclared variable ${}", path, referenced)));
            }
        }
    }
    for (name, _) in &variables {
        let used = paths
            .iter()
            .any(|p| xpath::referenced_variables(p).iter().any(|r| r == name));
        if !used {
            tracing::warn!(usage, variable = %name, "Variable is declared but never referenced");
        }
    }

    Ok(Constraint {
        min: min as usize,
        max,
        paths,
        severity,
        message: raw.msg.filter(|m| !m.is_empty()),
        details: raw.details.filter(|d| !d.is_empty()),
        doc_ref,
        filter,
        variables,
    })
}

fn check_path(usage: &str, path: &str) -> Result<()> {
    xpath::check_syntax(path).map_err(|e| MddfError::configuration(usage, e.to_string()))
}

fn parse_version(version: &str) -> Vec<u32> {
    version.split('.').filter_map(|p| p.parse().ok()).collect()
}

// =============================================================================
// Catalog
// =============================================================================

/// Immutable set of rule definitions keyed by usage
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<RuleDefinition>,
    by_usage: HashMap<String, usize>,
}

impl RuleCatalog {
    /// Parse a catalog from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawRule> = serde_json::from_str(json)?;
        let mut catalog = Self::default();
        for (usage, rule) in raw {
            catalog.insert(convert_rule(&usage, rule)?)?;
        }
        Ok(catalog)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&content)?;
        tracing::debug!(path = %path.display(), rules = catalog.len(), "Loaded rule catalog");
        Ok(catalog)
    }

    /// Load and merge every `*.json` file under `dir`, in path order.
    /// A usage key defined by more than one file is rejected.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let mut files: Vec<_> = WalkDir::new(dir.as_ref())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        files.sort();

        let mut catalog = Self::default();
        for file in files {
            catalog.merge(Self::from_file(&file)?)?;
        }
        Ok(catalog)
    }

    /// Built-in catalog for a schema family and version.
    ///
    /// Uses the catalog for the highest version not newer than `version`.
    pub fn builtin(family: SchemaFamily, version: &str) -> Result<Self> {
        let wanted = parse_version(version);
        let dir = BUILTIN_RULES
            .get_dir(family.schema_dir())
            .ok_or_else(|| MddfError::UnknownFormat(format!("no built-in rules for {}", family)))?;

        let best = dir
            .files()
            .filter_map(|file| {
                let stem = file.path().file_stem()?.to_str()?;
                let v = stem.strip_prefix("structure_v")?;
                Some((parse_version(v), file))
            })
            .filter(|(v, _)| *v <= wanted)
            .max_by(|(a, _), (b, _)| a.cmp(b));

        let (_, file) = best.ok_or_else(|| {
            MddfError::UnknownFormat(format!("no built-in rules for {} {}", family, version))
        })?;
        let content = file
            .contents_utf8()
            .ok_or_else(|| MddfError::configuration(file.path().display().to_string(), "catalog is not UTF-8"))?;
        tracing::debug!(catalog = %file.path().display(), %family, version, "Using built-in rule catalog");
        Self::from_json_str(content)
    }

    fn insert(&mut self, rule: RuleDefinition) -> Result<()> {
        if self.by_usage.contains_key(&rule.usage) {
            return Err(MddfError::configuration(&rule.usage, "usage key is defined more than once"));
        }
        self.by_usage.insert(rule.usage.clone(), self.rules.len());
        self.rules.push(rule);
        Ok(())
    }

    /// Add every rule of `other`; duplicate usage keys are an error
    pub fn merge(&mut self, other: RuleCatalog) -> Result<()> {
        for rule in other.rules {
            self.insert(rule)?;
        }
        Ok(())
    }

    pub fn get(&self, usage: &str) -> Option<&RuleDefinition> {
        self.by_usage.get(usage).map(|&i| &self.rules[i])
    }

    /// Rules in load order (sorted by usage key within each source)
    pub fn iter(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.iter()
    }

    pub fn usages(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.usage.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
