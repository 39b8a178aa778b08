//! Avails translation steps and routes
//!
//! Each function implements one declared edge between Avails XML versions.
//! Remap-only edges differ solely in namespace versions.

use super::{StepContext, TransformStep};
use crate::document::Element;
use crate::error::{MddfError, Result};
use crate::format::{FormatId, Route};
use crate::namespace::SchemaFamily;

/// Declared Avails edges
pub static STEPS: &[TransformStep] = &[
    TransformStep {
        name: "avails-2.1-to-2.2",
        source: FormatId::Avails2_1,
        target: FormatId::Avails2_2,
        apply: v2_1_to_v2_2,
    },
    TransformStep {
        name: "avails-2.2-to-2.2.1",
        source: FormatId::Avails2_2,
        target: FormatId::Avails2_2_1,
        apply: remap_only,
    },
    TransformStep {
        name: "avails-2.2-to-2.2.2",
        source: FormatId::Avails2_2,
        target: FormatId::Avails2_2_2,
        apply: remap_only,
    },
    TransformStep {
        name: "avails-2.2-to-2.3",
        source: FormatId::Avails2_2,
        target: FormatId::Avails2_3,
        apply: remap_only,
    },
    TransformStep {
        name: "avails-2.2.2-to-2.3",
        source: FormatId::Avails2_2_2,
        target: FormatId::Avails2_3,
        apply: remap_only,
    },
    TransformStep {
        name: "avails-2.2.1-to-2.2",
        source: FormatId::Avails2_2_1,
        target: FormatId::Avails2_2,
        apply: v2_2_1_to_v2_2,
    },
    TransformStep {
        name: "avails-2.2.2-to-2.2.1",
        source: FormatId::Avails2_2_2,
        target: FormatId::Avails2_2_1,
        apply: v2_2_2_to_v2_2_1,
    },
    TransformStep {
        name: "avails-2.3-to-2.2.2",
        source: FormatId::Avails2_3,
        target: FormatId::Avails2_2_2,
        apply: v2_3_to_v2_2_2,
    },
];

/// Declared multi-hop Avails translations
pub static ROUTES: &[Route] = &[
    Route {
        source: FormatId::Avails2_3,
        target: FormatId::Avails2_2_1,
        via: &[FormatId::Avails2_2_2],
    },
    Route {
        source: FormatId::Avails2_3,
        target: FormatId::Avails2_2,
        via: &[FormatId::Avails2_2_2, FormatId::Avails2_2_1],
    },
    Route {
        source: FormatId::Avails2_2_2,
        target: FormatId::Avails2_2,
        via: &[FormatId::Avails2_2_1],
    },
    Route {
        source: FormatId::Avails2_2_1,
        target: FormatId::Avails2_2_2,
        via: &[FormatId::Avails2_2],
    },
    Route {
        source: FormatId::Avails2_2_1,
        target: FormatId::Avails2_3,
        via: &[FormatId::Avails2_2],
    },
    Route {
        source: FormatId::Avails2_1,
        target: FormatId::Avails2_2_1,
        via: &[FormatId::Avails2_2],
    },
    Route {
        source: FormatId::Avails2_1,
        target: FormatId::Avails2_2_2,
        via: &[FormatId::Avails2_2],
    },
    Route {
        source: FormatId::Avails2_1,
        target: FormatId::Avails2_3,
        via: &[FormatId::Avails2_2],
    },
];

const TRANSACTION: &str = "/{avail}AvailList/{avail}Avail/{avail}Transaction";

/// Terms introduced in 2.3 with no 2.2.2 equivalent
const TERMS_NEW_IN_2_3: [&str; 7] = [
    "ContractStatus",
    "TitleStatus",
    "Download",
    "Exclusive",
    "ExclusiveAttributes",
    "BrandingRights",
    "BrandingRightsAttributes",
];

fn remap_only(ctx: &mut StepContext<'_>) -> Result<()> {
    ctx.remap();
    Ok(())
}

/// `StoreLanguage` became `AssetLanguage`; the `HoldbackExclusionLanguage`
/// Term became a Transaction-level `AllowedLanguage`
fn v2_1_to_v2_2(ctx: &mut StepContext<'_>) -> Result<()> {
    ctx.rename("//{avail}StoreLanguage", "AssetLanguage")?;

    let terms = ctx.select("//{avail}Transaction/{avail}Term[@termName='HoldbackExclusionLanguage']")?;
    let avails_ns = ctx.source_namespace(SchemaFamily::Avails);
    for &term in &terms {
        let transaction = ctx
            .doc
            .parent(term)
            .ok_or_else(|| MddfError::untranslatable("Term", "HoldbackExclusionLanguage Term has no Transaction"))?;
        let language = ctx
            .doc
            .child_text(term, avails_ns.as_deref(), "Language")
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| MddfError::untranslatable("Term", "HoldbackExclusionLanguage Term has no Language"))?;

        let mut allowed = Element::new("AllowedLanguage").text(language);
        allowed.namespace = ctx.doc.namespace(term).map(str::to_string);
        allowed.prefix = ctx.doc.prefix(term).map(str::to_string);

        ctx.doc.detach(term);
        ctx.insert_after(transaction, &["End", "EndCondition"], allowed)?;
    }
    if !terms.is_empty() {
        ctx.diagnostics.notice(format!(
            "Replacing {} HoldbackExclusionLanguage Terms with AllowedLanguage",
            terms.len()
        ));
    }

    ctx.remap();
    Ok(())
}

fn v2_2_1_to_v2_2(ctx: &mut StepContext<'_>) -> Result<()> {
    ctx.strip_attribute(&format!("{}/{{avail}}AssetLanguage[@asset]", TRANSACTION), "asset", "AssetLanguage")?;
    ctx.strip_attribute(
        &format!("{}/{{avail}}AssetLanguage[@descriptive]", TRANSACTION),
        "descriptive",
        "AssetLanguage",
    )?;
    ctx.strip_attribute(&format!("{}/{{avail}}AllowedLanguage[@asset]", TRANSACTION), "asset", "AllowedLanguage")?;
    ctx.remap();
    Ok(())
}

fn v2_2_2_to_v2_2_1(ctx: &mut StepContext<'_>) -> Result<()> {
    ctx.prune("//{avail}People", "People")?;
    ctx.prune("//{avail}GroupingEntity", "GroupingEntity")?;
    ctx.prune("//{avail}Transaction/{avail}Duration", "Transaction/Duration")?;

    for attr in ["updateNum", "updateDeliveryFlow", "workflow"] {
        ctx.strip_attribute(&format!("/{{avail}}AvailList/{{avail}}Avail[@{}]", attr), attr, "Avail")?;
    }
    ctx.strip_attribute(&format!("{}/*[@lag]", TRANSACTION), "lag", "StartCondition and EndCondition")?;
    for attr in ["assetProvided", "metadataProvided"] {
        ctx.strip_attribute(
            &format!("{}/{{avail}}AssetLanguage[@{}]", TRANSACTION, attr),
            attr,
            "AssetLanguage",
        )?;
    }

    let assets = "/{avail}AvailList/{avail}Avail/{avail}Asset";
    for prefix in ["", "Season", "Series"] {
        ctx.dedupe(assets, &format!("{}TitleInternalAlias", prefix), "region")?;
        ctx.dedupe(assets, &format!("{}TitleDisplayUnlimited", prefix), "language")?;
    }

    ctx.remap();
    Ok(())
}

fn v2_3_to_v2_2_2(ctx: &mut StepContext<'_>) -> Result<()> {
    ctx.prune("//{avail}Licensee", "Licensee")?;
    ctx.rename("//{avail}Transaction/{avail}WindowDuration", "Duration")?;

    let names = TERMS_NEW_IN_2_3
        .iter()
        .map(|t| format!(".='{}'", t))
        .collect::<Vec<_>>()
        .join(" or ");
    let terms = ctx.select(&format!("//{{avail}}Term[@termName[{}]]", names))?;
    for &term in &terms {
        ctx.doc.detach(term);
    }
    if !terms.is_empty() {
        ctx.diagnostics
            .notice(format!("Removing {} unsupported Terms", terms.len()));
    }

    ctx.remap();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::document::Document;
    use crate::translate::TranslationPlanner;

    fn ns(version: &str) -> String {
        SchemaFamily::Avails.namespace_uri(version)
    }

    fn el(version: &str, name: &str) -> Element {
        Element::qualified("avails", ns(version), name)
    }

    fn avail_list(version: &str, avail: Element) -> Document {
        Document::new(el(version, "AvailList").declare("avails", ns(version)).child(avail))
    }

    #[test]
    fn test_holdback_term_becomes_allowed_language() {
        let e = |n: &str| el("2.1", n);
        let doc = avail_list(
            "2.1",
            e("Avail").child(
                e("Transaction")
                    .child(e("StoreLanguage").text("en"))
                    .child(e("Start").text("2020-01-01"))
                    .child(e("Term").attr("termName", "HoldbackExclusionLanguage").child(e("Language").text("fr")))
                    .child(e("End").text("2021-01-01"))
                    .child(e("Term").attr("termName", "Tier").child(e("Text").text("A"))),
            ),
        );

        let out = TranslationPlanner::default()
            .translate(&doc, FormatId::Avails2_1, FormatId::Avails2_2)
            .unwrap();
        let d = &out.document;
        let transaction = d.descendants(d.root())[1];
        let names: Vec<_> = d.children(transaction).iter().map(|&c| d.name(c).to_string()).collect();
        assert_eq!(names, vec!["AssetLanguage", "Start", "End", "AllowedLanguage", "Term"]);

        let allowed = d.children(transaction)[3];
        assert_eq!(d.text(allowed), "fr");
        assert_eq!(d.namespace(allowed), Some(ns("2.2").as_str()));
    }

    #[test]
    fn test_holdback_without_anchor_fails() {
        let e = |n: &str| el("2.1", n);
        let doc = avail_list(
            "2.1",
            e("Avail").child(
                e("Transaction")
                    .child(e("Start").text("2020-01-01"))
                    .child(e("Term").attr("termName", "HoldbackExclusionLanguage").child(e("Language").text("fr"))),
            ),
        );
        let err = TranslationPlanner::default()
            .translate(&doc, FormatId::Avails2_1, FormatId::Avails2_2)
            .unwrap_err();
        match err {
            MddfError::StepFailed { step, source, .. } => {
                assert_eq!(step, "avails-2.1-to-2.2");
                assert!(matches!(*source, MddfError::MissingAnchor { ref element, .. } if element == "Transaction"));
            }
            other => panic!("expected StepFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_v2_3_removes_new_terms() {
        let e = |n: &str| el("2.3", n);
        let doc = avail_list(
            "2.3",
            e("Avail").child(e("Licensee").child(e("DisplayName").text("X"))).child(
                e("Transaction")
                    .child(e("WindowDuration").text("P30D"))
                    .child(e("Term").attr("termName", "Exclusive").child(e("Boolean").text("true")))
                    .child(e("Term").attr("termName", "BrandingRights").child(e("Boolean").text("false")))
                    .child(e("Term").attr("termName", "Tier").child(e("Text").text("A"))),
            ),
        );
        let out = TranslationPlanner::default()
            .translate(&doc, FormatId::Avails2_3, FormatId::Avails2_2_2)
            .unwrap();

        let d = &out.document;
        let names: Vec<_> = d.descendants(d.root()).iter().map(|&c| d.name(c).to_string()).collect();
        assert!(names.contains(&"Duration".to_string()));
        assert!(!names.contains(&"Licensee".to_string()));
        assert_eq!(names.iter().filter(|n| *n == "Term").count(), 1);

        let notices: Vec<_> = out.diagnostics.at_level(Severity::Notice).map(|n| n.message.clone()).collect();
        assert_eq!(notices, vec!["Removing 1 Licensee elements", "Removing 2 unsupported Terms"]);
    }

    #[test]
    fn test_v2_2_1_strips_language_attributes() {
        let e = |n: &str| el("2.2.1", n);
        let doc = avail_list(
            "2.2.1",
            e("Avail").child(
                e("Transaction")
                    .child(e("AssetLanguage").attr("asset", "subtitle").attr("descriptive", "true").text("en"))
                    .child(e("AllowedLanguage").attr("asset", "audio").text("de")),
            ),
        );
        let out = TranslationPlanner::default()
            .translate(&doc, FormatId::Avails2_2_1, FormatId::Avails2_2)
            .unwrap();
        assert_eq!(out.diagnostics.count(Severity::Notice), 3);
        let d = &out.document;
        assert!(d.descendants(d.root()).iter().all(|&id| d.attributes(id).is_empty()));
    }
}
