//! Format Registry
//!
//! Every MDDF format the translator knows about, keyed by [`FormatId`].
//! XML formats carry the md/mdmec versions their schema imports; tabular
//! (spreadsheet) formats name the XML format they are generated from.

mod graph;

pub use graph::{FormatGraph, Route, TranslationPlan};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::document::Document;
use crate::error::{MddfError, Result};
use crate::namespace::{NamespaceContext, SchemaFamily};

/// Physical encoding of a format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    Xml,
    Xlsx,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml => write!(f, "xml"),
            Self::Xlsx => write!(f, "xlsx"),
        }
    }
}

/// Registered format identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatId {
    Avails2_1,
    Avails2_2,
    Avails2_2_1,
    Avails2_2_2,
    Avails2_3,
    AvailsXlsx1_7,
    AvailsXlsx1_7_2,
    AvailsXlsx1_7_3,
    Manifest1_4,
    Manifest1_5,
    Manifest1_6,
    Manifest1_7,
    Manifest1_8,
}

impl FormatId {
    pub const ALL: [FormatId; 13] = [
        FormatId::Avails2_1,
        FormatId::Avails2_2,
        FormatId::Avails2_2_1,
        FormatId::Avails2_2_2,
        FormatId::Avails2_3,
        FormatId::AvailsXlsx1_7,
        FormatId::AvailsXlsx1_7_2,
        FormatId::AvailsXlsx1_7_3,
        FormatId::Manifest1_4,
        FormatId::Manifest1_5,
        FormatId::Manifest1_6,
        FormatId::Manifest1_7,
        FormatId::Manifest1_8,
    ];

    /// Canonical name, e.g. `AVAILS_2_2_1` or `AVAILS_XLSX_1_7_2`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avails2_1 => "AVAILS_2_1",
            Self::Avails2_2 => "AVAILS_2_2",
            Self::Avails2_2_1 => "AVAILS_2_2_1",
            Self::Avails2_2_2 => "AVAILS_2_2_2",
            Self::Avails2_3 => "AVAILS_2_3",
            Self::AvailsXlsx1_7 => "AVAILS_XLSX_1_7",
            Self::AvailsXlsx1_7_2 => "AVAILS_XLSX_1_7_2",
            Self::AvailsXlsx1_7_3 => "AVAILS_XLSX_1_7_3",
            Self::Manifest1_4 => "MANIFEST_1_4",
            Self::Manifest1_5 => "MANIFEST_1_5",
            Self::Manifest1_6 => "MANIFEST_1_6",
            Self::Manifest1_7 => "MANIFEST_1_7",
            Self::Manifest1_8 => "MANIFEST_1_8",
        }
    }

    /// Registry entry for this id
    pub fn info(&self) -> &'static FormatVersion {
        // FORMATS is declared in FormatId::ALL order
        &FORMATS[*self as usize]
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FormatId {
    type Err = MddfError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace(['.', '-'], "_");
        Self::ALL
            .iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(&wanted))
            .copied()
            .ok_or_else(|| MddfError::UnknownFormat(s.to_string()))
    }
}

/// A registered format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatVersion {
    pub id: FormatId,
    pub family: SchemaFamily,
    pub version: &'static str,
    pub encoding: Encoding,
    /// Common metadata version imported by the schema
    pub md_version: Option<&'static str>,
    pub mdmec_version: Option<&'static str>,
    /// XML format a tabular format is generated from; `None` for XML formats
    /// and for tabular formats that are no longer producible
    pub xml_basis: Option<FormatId>,
}

const fn xml(id: FormatId, family: SchemaFamily, version: &'static str, md: &'static str) -> FormatVersion {
    FormatVersion {
        id,
        family,
        version,
        encoding: Encoding::Xml,
        md_version: Some(md),
        mdmec_version: Some(md),
        xml_basis: None,
    }
}

const fn xlsx(id: FormatId, version: &'static str, basis: Option<FormatId>) -> FormatVersion {
    FormatVersion {
        id,
        family: SchemaFamily::Avails,
        version,
        encoding: Encoding::Xlsx,
        md_version: None,
        mdmec_version: None,
        xml_basis: basis,
    }
}

static FORMATS: [FormatVersion; 13] = [
    xml(FormatId::Avails2_1, SchemaFamily::Avails, "2.1", "2.3"),
    xml(FormatId::Avails2_2, SchemaFamily::Avails, "2.2", "2.4"),
    xml(FormatId::Avails2_2_1, SchemaFamily::Avails, "2.2.1", "2.5"),
    xml(FormatId::Avails2_2_2, SchemaFamily::Avails, "2.2.2", "2.6"),
    xml(FormatId::Avails2_3, SchemaFamily::Avails, "2.3", "2.7"),
    xlsx(FormatId::AvailsXlsx1_7, "1.7", None),
    xlsx(FormatId::AvailsXlsx1_7_2, "1.7.2", Some(FormatId::Avails2_2_2)),
    xlsx(FormatId::AvailsXlsx1_7_3, "1.7.3", Some(FormatId::Avails2_3)),
    xml(FormatId::Manifest1_4, SchemaFamily::Manifest, "1.4", "2.3"),
    xml(FormatId::Manifest1_5, SchemaFamily::Manifest, "1.5", "2.4"),
    xml(FormatId::Manifest1_6, SchemaFamily::Manifest, "1.6", "2.5"),
    xml(FormatId::Manifest1_7, SchemaFamily::Manifest, "1.7", "2.6"),
    xml(FormatId::Manifest1_8, SchemaFamily::Manifest, "1.8", "2.7"),
];

impl FormatVersion {
    pub fn all() -> &'static [FormatVersion] {
        &FORMATS
    }

    pub fn is_tabular(&self) -> bool {
        self.encoding == Encoding::Xlsx
    }

    /// Version of `family` referenced by this format, if any
    pub fn family_version(&self, family: SchemaFamily) -> Option<&'static str> {
        match family {
            f if f == self.family && self.encoding == Encoding::Xml => Some(self.version),
            SchemaFamily::Md => self.md_version,
            SchemaFamily::Mdmec => self.mdmec_version,
            _ => None,
        }
    }

    /// Canonical prefix bindings for documents in this format
    pub fn namespaces(&self) -> NamespaceContext {
        SchemaFamily::ALL.iter().fold(NamespaceContext::new(), |ctx, &family| {
            match self.family_version(family) {
                Some(version) => ctx.bind_family(family, version),
                None => ctx,
            }
        })
    }

    /// Identify the XML format of a document from its root namespace
    pub fn identify(doc: &Document) -> Result<&'static FormatVersion> {
        let uri = doc
            .namespace(doc.root())
            .ok_or_else(|| MddfError::UnknownFormat(format!("<{}> has no namespace", doc.name(doc.root()))))?;
        let (family, version) = SchemaFamily::parse_namespace_uri(uri)
            .ok_or_else(|| MddfError::UnknownFormat(uri.to_string()))?;
        FORMATS
            .iter()
            .find(|f| f.encoding == Encoding::Xml && f.family == family && f.version == version)
            .ok_or_else(|| MddfError::UnknownFormat(format!("{} {}", family, version)))
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} v{}", self.family, self.encoding, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Element;

    #[test]
    fn test_registry_order_matches_ids() {
        for id in FormatId::ALL {
            assert_eq!(id.info().id, id);
        }
    }

    #[test]
    fn test_parse_format_id() {
        assert_eq!("AVAILS_2_2_1".parse::<FormatId>().unwrap(), FormatId::Avails2_2_1);
        assert_eq!("avails-2.3".parse::<FormatId>().unwrap(), FormatId::Avails2_3);
        assert_eq!("avails_xlsx_1.7.2".parse::<FormatId>().unwrap(), FormatId::AvailsXlsx1_7_2);
        assert!(matches!("AVAILS_9".parse::<FormatId>(), Err(MddfError::UnknownFormat(_))));
    }

    #[test]
    fn test_identify() {
        let uri = SchemaFamily::Avails.namespace_uri("2.2.2");
        let doc = Document::new(Element::qualified("avails", uri, "AvailList"));
        assert_eq!(FormatVersion::identify(&doc).unwrap().id, FormatId::Avails2_2_2);

        let doc = Document::new(Element::new("AvailList"));
        assert!(FormatVersion::identify(&doc).is_err());
    }

    #[test]
    fn test_namespaces() {
        let ctx = FormatId::Avails2_2_1.info().namespaces();
        assert_eq!(ctx.family_version(SchemaFamily::Avails).as_deref(), Some("2.2.1"));
        assert_eq!(ctx.family_version(SchemaFamily::Md).as_deref(), Some("2.5"));
        assert_eq!(ctx.resolve("manifest"), None);
    }
}
