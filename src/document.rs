//! Document Tree
//!
//! Namespace-aware element tree handed to the engine by the external XML
//! parser. Nodes live in an arena owned by the [`Document`] and carry parent
//! links so that path expressions can walk upwards (`..`).
//!
//! Parsers and tests build an owned [`Element`] tree and convert it with
//! [`Document::new`]. Only the translator mutates documents, and only its own
//! clone; detached nodes stay in the arena but are unreachable from the root.

use std::fmt;

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single attribute. Names keep their prefix (e.g. `xsi:schemaLocation`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// A namespace declaration (`xmlns:prefix="uri"`, or the default namespace
/// when `prefix` is `None`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    pub prefix: Option<String>,
    pub uri: String,
}

// =============================================================================
// Owned builder form
// =============================================================================

/// Owned element tree, the exchange format with parsers and serializers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local name
    pub name: String,
    /// Namespace URI
    pub namespace: Option<String>,
    /// Prefix used in the source document
    pub prefix: Option<String>,
    pub attributes: Vec<Attribute>,
    /// Namespace declarations made on this element
    pub namespaces: Vec<NamespaceDecl>,
    pub text: String,
    pub children: Vec<Element>,
    /// Source line (1-indexed), when the parser tracks locations
    pub line: Option<u32>,
}

impl Element {
    /// Element without a namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            prefix: None,
            attributes: Vec::new(),
            namespaces: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            line: None,
        }
    }

    /// Namespace-qualified element
    pub fn qualified(prefix: impl Into<String>, uri: impl Into<String>, name: impl Into<String>) -> Self {
        let mut el = Self::new(name);
        el.prefix = Some(prefix.into());
        el.namespace = Some(uri.into());
        el
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Declare `xmlns:prefix="uri"` on this element
    pub fn declare(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.push(NamespaceDecl {
            prefix: Some(prefix.into()),
            uri: uri.into(),
        });
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

// =============================================================================
// Arena document
// =============================================================================

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    namespace: Option<String>,
    prefix: Option<String>,
    attributes: Vec<Attribute>,
    namespaces: Vec<NamespaceDecl>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    line: Option<u32>,
}

/// Arena-backed document tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Document {
    /// Build a document from an owned element tree
    pub fn new(root: Element) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.push(root, None);
        doc
    }

    fn push(&mut self, el: Element, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            name: el.name,
            namespace: el.namespace,
            prefix: el.prefix,
            attributes: el.attributes,
            namespaces: el.namespaces,
            text: el.text,
            children: Vec::with_capacity(el.children.len()),
            parent,
            line: el.line,
        });
        for child in el.children {
            let child_id = self.push(child, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    /// Root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Local name
    pub fn name(&self, id: NodeId) -> &str {
        &self.node(id).name
    }

    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        self.node(id).namespace.as_deref()
    }

    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.node(id).prefix.as_deref()
    }

    /// `prefix:name`, or the bare name when unprefixed
    pub fn qualified_name(&self, id: NodeId) -> String {
        match self.prefix(id) {
            Some(prefix) => format!("{}:{}", prefix, self.name(id)),
            None => self.name(id).to_string(),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        &self.node(id).attributes
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn namespace_decls(&self, id: NodeId) -> &[NamespaceDecl] {
        &self.node(id).namespaces
    }

    /// Text directly held by the element
    pub fn text(&self, id: NodeId) -> &str {
        &self.node(id).text
    }

    /// Own text with whitespace collapsed and trimmed
    pub fn normalized_text(&self, id: NodeId) -> String {
        self.text(id).split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// XPath string-value: concatenation of all descendant text in document order
    pub fn string_value(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        out.push_str(&self.node(id).text);
        for &child in &self.node(id).children {
            self.collect_text(child, out);
        }
    }

    pub fn line(&self, id: NodeId) -> Option<u32> {
        self.node(id).line
    }

    /// Whether the node is still reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// All descendants in document order, excluding `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        result
    }

    /// Child elements with the given namespace and local name
    pub fn child_elements<'a>(
        &'a self,
        id: NodeId,
        namespace: Option<&'a str>,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.name(c) == name && self.namespace(c) == namespace)
    }

    pub fn first_child(&self, id: NodeId, namespace: Option<&str>, name: &str) -> Option<NodeId> {
        self.child_elements(id, namespace, name).next()
    }

    pub fn child_text(&self, id: NodeId, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.first_child(id, namespace, name).map(|c| self.text(c))
    }

    /// Position of `child` among the children of `parent`
    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|&c| c == child)
    }

    // ========== Mutation ==========

    /// Detach a node from its parent. The root cannot be detached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.node(id).parent else {
            return false;
        };
        self.node_mut(parent).children.retain(|&c| c != id);
        self.node_mut(id).parent = None;
        true
    }

    /// Insert a new subtree at `index` among the children of `parent`
    pub fn insert_child(&mut self, parent: NodeId, index: usize, el: Element) -> NodeId {
        let id = self.push(el, Some(parent));
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, id);
        id
    }

    pub fn append_child(&mut self, parent: NodeId, el: Element) -> NodeId {
        let index = self.children(parent).len();
        self.insert_child(parent, index, el)
    }

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        self.node_mut(id).name = name.into();
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.node_mut(id).text = text.into();
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attributes = &mut self.node_mut(id).attributes;
        match attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Remove an attribute, returning whether it was present
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let attributes = &mut self.node_mut(id).attributes;
        let before = attributes.len();
        attributes.retain(|a| a.name != name);
        attributes.len() != before
    }

    /// Keep only the attributes for which `keep` returns true; returns the number removed
    pub fn retain_attributes(&mut self, id: NodeId, keep: impl Fn(&Attribute) -> bool) -> usize {
        let attributes = &mut self.node_mut(id).attributes;
        let before = attributes.len();
        attributes.retain(|a| keep(a));
        before - attributes.len()
    }

    /// Rewrite namespace URIs on every reachable element and declaration.
    ///
    /// `remap` returns the replacement for a URI, or `None` to keep it.
    /// Returns the number of URIs changed.
    pub fn rewrite_namespaces(&mut self, remap: impl Fn(&str) -> Option<String>) -> usize {
        let mut changed = 0;
        let mut ids = vec![self.root];
        ids.extend(self.descendants(self.root));
        for id in ids {
            let node = self.node_mut(id);
            if let Some(new_uri) = node.namespace.as_deref().and_then(&remap) {
                node.namespace = Some(new_uri);
                changed += 1;
            }
            for decl in &mut node.namespaces {
                if let Some(new_uri) = remap(&decl.uri) {
                    decl.uri = new_uri;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Namespace URI bound to `prefix` at `id`, searching enclosing elements
    pub fn lookup_prefix(&self, id: NodeId, prefix: &str) -> Option<&str> {
        let mut current = Some(id);
        while let Some(node) = current {
            let decl = self
                .namespace_decls(node)
                .iter()
                .find(|d| d.prefix.as_deref() == Some(prefix));
            if let Some(decl) = decl {
                return Some(&decl.uri);
            }
            current = self.parent(node);
        }
        None
    }

    /// Rewrite the values of every reachable attribute whose prefix is bound
    /// to `namespace` and whose local name is `local_name`
    pub fn rewrite_attribute_values(
        &mut self,
        namespace: &str,
        local_name: &str,
        rewrite: impl Fn(&str) -> Option<String>,
    ) -> usize {
        let mut changed = 0;
        let mut ids = vec![self.root];
        ids.extend(self.descendants(self.root));
        for id in ids {
            let matching: Vec<usize> = self
                .attributes(id)
                .iter()
                .enumerate()
                .filter(|(_, attr)| match attr.name.split_once(':') {
                    Some((prefix, local)) => local == local_name && self.lookup_prefix(id, prefix) == Some(namespace),
                    None => false,
                })
                .map(|(index, _)| index)
                .collect();
            for index in matching {
                let attr = &mut self.node_mut(id).attributes[index];
                if let Some(value) = rewrite(&attr.value) {
                    attr.value = value;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Copy a subtree back into owned form
    pub fn to_element(&self, id: NodeId) -> Element {
        let node = self.node(id);
        Element {
            name: node.name.clone(),
            namespace: node.namespace.clone(),
            prefix: node.prefix.clone(),
            attributes: node.attributes.clone(),
            namespaces: node.namespaces.clone(),
            text: node.text.clone(),
            children: node.children.iter().map(|&c| self.to_element(c)).collect(),
            line: node.line,
        }
    }
}

/// Structural equality over the reachable tree; detached arena slots are ignored.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.to_element(self.root) == other.to_element(other.root)
    }
}

impl Eq for Document {}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://www.movielabs.com/schema/avails/v2.2/avails";

    fn sample() -> Document {
        Document::new(
            Element::qualified("avails", NS, "Transaction")
                .declare("avails", NS)
                .child(Element::qualified("avails", NS, "Start").text("2020-01-01"))
                .child(Element::qualified("avails", NS, "End").text("2021-01-01"))
                .child(
                    Element::qualified("avails", NS, "Term")
                        .attr("termName", "Tier")
                        .child(Element::qualified("avails", NS, "Text").text("  A   B ")),
                ),
        )
    }

    #[test]
    fn test_navigation() {
        let doc = sample();
        let root = doc.root();
        assert_eq!(doc.children(root).len(), 3);
        let end = doc.first_child(root, Some(NS), "End").unwrap();
        assert_eq!(doc.text(end), "2021-01-01");
        assert_eq!(doc.parent(end), Some(root));
        assert_eq!(doc.index_of(root, end), Some(1));
        assert_eq!(doc.qualified_name(end), "avails:End");
    }

    #[test]
    fn test_text_values() {
        let doc = sample();
        let term = doc.first_child(doc.root(), Some(NS), "Term").unwrap();
        let text = doc.children(term)[0];
        assert_eq!(doc.normalized_text(text), "A B");
        assert_eq!(doc.string_value(term), "  A   B ");
        assert_eq!(doc.attribute(term, "termName"), Some("Tier"));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = sample();
        let names: Vec<_> = doc
            .descendants(doc.root())
            .into_iter()
            .map(|id| doc.name(id).to_string())
            .collect();
        assert_eq!(names, vec!["Start", "End", "Term", "Text"]);
    }

    #[test]
    fn test_detach_and_insert() {
        let mut doc = sample();
        let root = doc.root();
        let start = doc.first_child(root, Some(NS), "Start").unwrap();
        assert!(doc.detach(start));
        assert!(!doc.is_attached(start));
        assert!(!doc.detach(root));

        let inserted = doc.insert_child(root, 1, Element::qualified("avails", NS, "AllowedLanguage").text("fr"));
        assert_eq!(doc.index_of(root, inserted), Some(1));
        assert_eq!(doc.children(root).len(), 3);
    }

    #[test]
    fn test_equality_ignores_detached_nodes() {
        let mut a = sample();
        let b = sample();
        assert_eq!(a, b);

        let extra = a.append_child(a.root(), Element::new("Extra"));
        assert_ne!(a, b);
        a.detach(extra);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rewrite_namespaces() {
        let mut doc = sample();
        let target = "http://www.movielabs.com/schema/avails/v2.3/avails";
        let changed = doc.rewrite_namespaces(|uri| (uri == NS).then(|| target.to_string()));
        // 5 elements + 1 declaration
        assert_eq!(changed, 6);
        assert_eq!(doc.namespace(doc.root()), Some(target));
        assert_eq!(doc.namespace_decls(doc.root())[0].uri, target);
    }

    #[test]
    fn test_attribute_edits() {
        let mut doc = sample();
        let root = doc.root();
        doc.set_attribute(root, "updateNum", "2");
        assert_eq!(doc.attribute(root, "updateNum"), Some("2"));
        doc.set_attribute(root, "updateNum", "3");
        assert_eq!(doc.attributes(root).len(), 1);
        assert!(doc.remove_attribute(root, "updateNum"));
        assert!(!doc.remove_attribute(root, "updateNum"));

        doc.set_attribute(root, "workflow", "Create");
        doc.set_attribute(root, "xsi:schemaLocation", "x.xsd");
        assert_eq!(doc.retain_attributes(root, |a| a.name.starts_with("xsi:")), 1);
        assert_eq!(doc.attribute(root, "xsi:schemaLocation"), Some("x.xsd"));

        let start = doc.children(root)[0];
        doc.set_text(start, "2022-02-02");
        assert_eq!(doc.text(start), "2022-02-02");
    }

    #[test]
    fn test_prefix_lookup_is_scoped() {
        let doc = Document::new(
            Element::qualified("avails", NS, "AvailList")
                .declare("avails", NS)
                .declare("x", "urn:outer")
                .child(
                    Element::qualified("avails", NS, "Avail")
                        .declare("x", "urn:inner")
                        .attr("x:hint", "a")
                        .child(Element::qualified("avails", NS, "Asset").attr("x:hint", "b")),
                )
                .attr("x:hint", "c"),
        );
        let root = doc.root();
        let avail = doc.children(root)[0];
        let asset = doc.children(avail)[0];
        assert_eq!(doc.lookup_prefix(asset, "x"), Some("urn:inner"));
        assert_eq!(doc.lookup_prefix(root, "x"), Some("urn:outer"));
        assert_eq!(doc.lookup_prefix(asset, "y"), None);

        let mut doc = doc;
        let changed = doc.rewrite_attribute_values("urn:inner", "hint", |v| Some(v.to_uppercase()));
        assert_eq!(changed, 2);
        assert_eq!(doc.attribute(asset, "x:hint"), Some("B"));
        assert_eq!(doc.attribute(root, "x:hint"), Some("c"));
    }
}
