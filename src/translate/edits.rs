//! Edit helpers shared by translation steps
//!
//! Every helper that removes or alters content records a translation notice
//! describing what was dropped.

use super::StepContext;
use crate::document::{Element, NodeId};
use crate::error::{MddfError, Result};
use crate::namespace::{SchemaFamily, XSI_NAMESPACE};

impl StepContext<'_> {
    /// Elements matching a path evaluated from the root
    pub fn select(&mut self, path: &str) -> Result<Vec<NodeId>> {
        let root = self.doc.root();
        self.resolver.select_elements(self.doc, root, path)
    }

    /// Namespace URI of a family in the source format
    pub fn source_namespace(&self, family: SchemaFamily) -> Option<String> {
        self.source.family_version(family).map(|v| family.namespace_uri(v))
    }

    /// Rewrite namespace URIs and `schemaLocation` hints of every family whose
    /// version differs between source and target. Returns the number of
    /// rewritten URIs.
    pub fn remap(&mut self) -> usize {
        let mut changed = 0;
        for family in SchemaFamily::ALL {
            let (Some(from), Some(to)) = (self.source.family_version(family), self.target.family_version(family)) else {
                continue;
            };
            if from == to {
                continue;
            }

            changed += self.doc.rewrite_namespaces(|uri| match SchemaFamily::parse_namespace_uri(uri) {
                Some((f, v)) if f == family && v == from => Some(family.namespace_uri(to)),
                _ => None,
            });

            let (old_uri, new_uri) = (family.namespace_uri(from), family.namespace_uri(to));
            let (old_file, new_file) = (family.schema_file(from), family.schema_file(to));
            self.doc.rewrite_attribute_values(XSI_NAMESPACE, "schemaLocation", |value| {
                if value.contains(&old_uri) || value.contains(&old_file) {
                    Some(value.replace(&old_uri, &new_uri).replace(&old_file, &new_file))
                } else {
                    None
                }
            });
        }
        tracing::debug!(from = %self.source.id, to = %self.target.id, changed, "Remapped namespaces");
        changed
    }

    /// Detach every element matching `path`
    pub fn prune(&mut self, path: &str, label: &str) -> Result<usize> {
        let hits = self.select(path)?;
        for &id in &hits {
            self.doc.detach(id);
        }
        if !hits.is_empty() {
            self.diagnostics
                .notice(format!("Removing {} {} elements", hits.len(), label));
        }
        Ok(hits.len())
    }

    /// Remove attribute `name` from every element matching `path`
    pub fn strip_attribute(&mut self, path: &str, name: &str, label: &str) -> Result<usize> {
        let hits = self.select(path)?;
        let removed = hits
            .into_iter()
            .filter(|&id| self.doc.remove_attribute(id, name))
            .count();
        if removed > 0 {
            self.diagnostics.notice(format!(
                "Removing @{} attribute from {} {} elements.",
                name, removed, label
            ));
        }
        Ok(removed)
    }

    /// Rename every element matching `path`
    pub fn rename(&mut self, path: &str, name: &str) -> Result<usize> {
        let hits = self.select(path)?;
        for &id in &hits {
            self.doc.set_name(id, name);
        }
        Ok(hits.len())
    }

    /// Insert `el` as the sibling directly following the first child of
    /// `parent` named by `anchors`, trying anchors in order
    pub fn insert_after(&mut self, parent: NodeId, anchors: &[&str], el: Element) -> Result<NodeId> {
        let namespace = self.doc.namespace(parent).map(str::to_string);
        let anchor = anchors
            .iter()
            .find_map(|name| self.doc.first_child(parent, namespace.as_deref(), name))
            .ok_or_else(|| MddfError::MissingAnchor {
                element: self.doc.name(parent).to_string(),
                anchors: anchors.join(", "),
            })?;
        let index = self.doc.index_of(parent, anchor).unwrap_or_default() + 1;
        Ok(self.doc.insert_child(parent, index, el))
    }

    /// Keep only the first `child` element under each element of `scope` that
    /// has several, then drop the `qualifier` attribute from the survivors
    pub fn dedupe(&mut self, scope: &str, child: &str, qualifier: &str) -> Result<usize> {
        let namespace = self.source_namespace(SchemaFamily::Avails);
        let parents = self.select(&format!("{}//*[count({{avail}}{}) > 1]", scope, child))?;

        let mut removed = 0;
        for parent in parents {
            let extras: Vec<NodeId> = self
                .doc
                .child_elements(parent, namespace.as_deref(), child)
                .skip(1)
                .collect();
            for id in extras {
                self.doc.detach(id);
                removed += 1;
            }
        }
        if removed > 0 {
            self.diagnostics
                .notice(format!("Removing {} {} elements (max allowed exceeded)", removed, child))
                .details = Some(format!("Only 1 {} allowed per Asset", child));
        }

        self.strip_attribute(&format!("//{{avail}}{}[@{}]", child, qualifier), qualifier, child)?;
        Ok(removed)
    }
}
