//! Schema families and namespace bindings
//!
//! Every MDDF schema lives under `http://www.movielabs.com/schema/<dir>/v<version>/<dir>`.
//! Path expressions in rule catalogs never name a prefix directly; they use a
//! family placeholder such as `{avail}` which is bound to whatever namespace
//! version the document under test actually uses.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use crate::document::Document;

/// Common prefix of all MDDF namespace URIs
pub const NAMESPACE_BASE: &str = "http://www.movielabs.com/schema/";

/// XML Schema instance namespace, home of `schemaLocation`
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// A top-level schema kind with its own version line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaFamily {
    Avails,
    Manifest,
    /// Common metadata shared by all document families
    Md,
    /// Media Entertainment Core metadata
    Mdmec,
}

impl SchemaFamily {
    pub const ALL: [SchemaFamily; 4] = [
        SchemaFamily::Avails,
        SchemaFamily::Manifest,
        SchemaFamily::Md,
        SchemaFamily::Mdmec,
    ];

    /// Placeholder name used inside `{...}` in path expressions
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Avails => "avail",
            Self::Manifest => "manifest",
            Self::Md => "md",
            Self::Mdmec => "mdmec",
        }
    }

    /// Prefix substituted for the placeholder
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Avails => "avails",
            Self::Manifest => "manifest",
            Self::Md => "md",
            Self::Mdmec => "mdmec",
        }
    }

    /// Directory segment of the namespace URI
    pub fn schema_dir(&self) -> &'static str {
        self.prefix()
    }

    pub fn from_placeholder(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.placeholder() == name)
    }

    pub fn from_prefix(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.prefix() == name)
    }

    /// Namespace URI for a version, e.g. `.../schema/avails/v2.2/avails`
    pub fn namespace_uri(&self, version: &str) -> String {
        format!("{}{}/v{}/{}", NAMESPACE_BASE, self.schema_dir(), version, self.schema_dir())
    }

    /// XSD file name used in `schemaLocation` hints, e.g. `avails-v2.2.xsd`
    pub fn schema_file(&self, version: &str) -> String {
        format!("{}-v{}.xsd", self.schema_dir(), version)
    }

    /// Split an MDDF namespace URI into family and version
    pub fn parse_namespace_uri(uri: &str) -> Option<(SchemaFamily, String)> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^https?://www\.movielabs\.com/schema/(avails|manifest|md|mdmec)/v([0-9]+(?:\.[0-9]+)*)(?:/[A-Za-z]+)?/?$")
                .expect("namespace pattern is valid")
        });
        let caps = pattern.captures(uri.trim())?;
        let family = Self::from_prefix(caps.get(1)?.as_str())?;
        Some((family, caps.get(2)?.as_str().to_string()))
    }
}

impl fmt::Display for SchemaFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

// =============================================================================
// Namespace context
// =============================================================================

/// Prefix to URI bindings used when compiling path expressions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    bindings: BTreeMap<String, String>,
}

impl NamespaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.insert(prefix, uri);
        self
    }

    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    /// Bind the canonical prefix of `family` to its namespace at `version`
    pub fn bind_family(self, family: SchemaFamily, version: &str) -> Self {
        self.bind(family.prefix(), family.namespace_uri(version))
    }

    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(|s| s.as_str())
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Version bound to a family, if any
    pub fn family_version(&self, family: SchemaFamily) -> Option<String> {
        self.resolve(family.prefix())
            .and_then(SchemaFamily::parse_namespace_uri)
            .filter(|(f, _)| *f == family)
            .map(|(_, version)| version)
    }

    /// Derive bindings from a document.
    ///
    /// Every declared prefix is bound as written. In addition each MDDF
    /// namespace found on a declaration or element is bound under its family's
    /// canonical prefix, so catalogs work regardless of the prefixes a
    /// producer chose. The first occurrence in document order wins.
    ///
    /// Families the document never mentions are bound to their unversioned
    /// base URI, which no element carries, so paths naming them match nothing.
    pub fn from_document(doc: &Document) -> Self {
        let mut ctx = Self::new();
        let mut ids = vec![doc.root()];
        ids.extend(doc.descendants(doc.root()));

        for &id in &ids {
            for decl in doc.namespace_decls(id) {
                if let Some(prefix) = &decl.prefix {
                    ctx.bindings.entry(prefix.clone()).or_insert_with(|| decl.uri.clone());
                }
                ctx.bind_canonical(&decl.uri);
            }
            if let Some(uri) = doc.namespace(id) {
                ctx.bind_canonical(uri);
            }
        }
        for family in SchemaFamily::ALL {
            ctx.bindings
                .entry(family.prefix().to_string())
                .or_insert_with(|| format!("{}{}", NAMESPACE_BASE, family.schema_dir()));
        }
        ctx
    }

    fn bind_canonical(&mut self, uri: &str) {
        if let Some((family, _)) = SchemaFamily::parse_namespace_uri(uri) {
            // A producer prefix may shadow a canonical one; canonical bindings
            // only ever hold MDDF URIs of the matching family.
            let keep = self
                .bindings
                .get(family.prefix())
                .and_then(|existing| SchemaFamily::parse_namespace_uri(existing))
                .map(|(existing, _)| existing == family)
                .unwrap_or(false);
            if !keep {
                self.bindings.insert(family.prefix().to_string(), uri.to_string());
            }
        }
    }

    /// Bindings for syntax-checking catalog paths before any document is known
    pub fn placeholder_bindings() -> Self {
        SchemaFamily::ALL
            .iter()
            .fold(Self::new(), |ctx, family| ctx.bind(family.prefix(), family.namespace_uri("0")))
    }
}
