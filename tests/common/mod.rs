//! Shared document builders for integration tests

#![allow(dead_code)]

use mddf_structure::{Document, Element, FormatId, SchemaFamily};

pub fn avails(version: &str, name: &str) -> Element {
    Element::qualified("avails", SchemaFamily::Avails.namespace_uri(version), name)
}

pub fn manifest(name: &str) -> Element {
    Element::qualified("manifest", SchemaFamily::Manifest.namespace_uri("1.6"), name)
}

pub fn md(name: &str) -> Element {
    md_at("2.5", name)
}

pub fn md_at(version: &str, name: &str) -> Element {
    Element::qualified("md", SchemaFamily::Md.namespace_uri(version), name)
}

/// `AvailList` root with declarations and a `schemaLocation` hint for `version`
pub fn avail_list(version: &str, md_version: &str, avails_children: Vec<Element>) -> Document {
    Document::new(
        avails(version, "AvailList")
            .declare("avails", SchemaFamily::Avails.namespace_uri(version))
            .declare("md", SchemaFamily::Md.namespace_uri(md_version))
            .declare("xsi", "http://www.w3.org/2001/XMLSchema-instance")
            .attr(
                "xsi:schemaLocation",
                format!(
                    "{} {}",
                    SchemaFamily::Avails.namespace_uri(version),
                    SchemaFamily::Avails.schema_file(version)
                ),
            )
            .children(avails_children),
    )
}

/// Smallest document whose root carries the namespace of an XML format
pub fn minimal_document(id: FormatId) -> Document {
    let info = id.info();
    let (root, child) = match info.family {
        SchemaFamily::Manifest => ("MediaManifest", "Inventory"),
        _ => ("AvailList", "Avail"),
    };
    let uri = info.family.namespace_uri(info.version);
    let prefix = info.family.prefix();
    Document::new(
        Element::qualified(prefix, uri.clone(), root)
            .declare(prefix, uri.clone())
            .child(Element::qualified(prefix, uri, child).attr("id", "1").text("content")),
    )
}

/// Avails 2.3 document exercising every edit of the 2.3 -> 2.2.1 route
pub fn rich_avails_2_3() -> Document {
    let e = |name: &str| avails("2.3", name);
    let metadata = e("Metadata")
        .child(e("TitleDisplayUnlimited").attr("language", "en").text("Title"))
        .child(e("TitleDisplayUnlimited").attr("language", "fr").text("Titre"))
        .child(e("TitleInternalAlias").attr("region", "US").text("Alias US"))
        .child(e("TitleInternalAlias").attr("region", "CA").text("Alias CA"));

    avail_list(
        "2.3",
        "2.7",
        vec![e("Avail")
            .attr("updateNum", "4")
            .attr("workflow", "Create")
            .child(e("Licensor").child(md_at("2.7", "DisplayName").text("Studio")))
            .child(e("Licensee").child(md_at("2.7", "DisplayName").text("Retailer")))
            .child(
                e("Asset")
                    .child(e("WorkType").text("Movie"))
                    .child(metadata)
                    .child(e("People").child(md_at("2.7", "Name").text("Someone"))),
            )
            .child(
                e("Transaction")
                    .child(e("LicenseType").text("EST"))
                    .child(e("StartCondition").attr("lag", "P1D").text("Immediate"))
                    .child(e("End").text("2030-01-01"))
                    .child(e("WindowDuration").text("P30D"))
                    .child(e("AssetLanguage").attr("assetProvided", "true").text("en"))
                    .child(e("Term").attr("termName", "ContractStatus").child(e("Text").text("Signed")))
                    .child(e("Term").attr("termName", "Tier").child(e("Text").text("A"))),
            )],
    )
}

/// Manifest 1.6 sample with every rule of the 1.5 catalog satisfied
pub fn good_manifest() -> Document {
    Document::new(
        manifest("MediaManifest")
            .declare("manifest", SchemaFamily::Manifest.namespace_uri("1.6"))
            .declare("md", SchemaFamily::Md.namespace_uri("2.5"))
            .child(
                manifest("Inventory")
                    .child(
                        manifest("Audio").attr("AudioTrackID", "md:audtrackid:a1").children([
                            md("Channels").text("6"),
                            md("Encoding").child(md("ChannelMapping").text("5.1")),
                        ]),
                    )
                    .child(
                        manifest("Audio").attr("AudioTrackID", "md:audtrackid:a2").children([
                            md("Channels").text("1"),
                            md("Encoding").child(md("ChannelMapping").text("Mono")),
                        ]),
                    ),
            )
            .child(
                manifest("Presentations").child(
                    manifest("Presentation").attr("PresentationID", "md:presentationid:p1").child(
                        manifest("TrackMetadata")
                            .child(manifest("VideoTrackReference").child(manifest("VideoTrackID").text("md:vidtrackid:v1"))),
                    ),
                ),
            )
            .child(
                manifest("PictureGroups")
                    .child(manifest("PictureGroup").attr("PictureGroupID", "md:picturegroupid:g1")),
            )
            .child(
                manifest("Experiences").child(
                    manifest("Experience")
                        .attr("ExperienceID", "md:experienceid:e1")
                        .at_line(40)
                        .child(manifest("ContentID").text("md:cid:c1"))
                        .child(
                            manifest("Audiovisual")
                                .child(manifest("PresentationID").text("md:presentationid:p1")),
                        )
                        .child(manifest("PictureGroupID").text("md:picturegroupid:g1")),
                ),
            ),
    )
}

/// Manifest 1.6 sample with exactly two structural errors: an Experience
/// without content and a six channel track mapped as `Left`
pub fn defective_manifest() -> Document {
    Document::new(
        manifest("MediaManifest")
            .declare("manifest", SchemaFamily::Manifest.namespace_uri("1.6"))
            .declare("md", SchemaFamily::Md.namespace_uri("2.5"))
            .child(
                manifest("Inventory").child(
                    manifest("Audio").attr("AudioTrackID", "md:audtrackid:a1").children([
                        md("Channels").text("6").at_line(12),
                        md("Encoding").child(md("ChannelMapping").text("Left")),
                    ]),
                ),
            )
            .child(
                manifest("Experiences")
                    .child(
                        manifest("Experience")
                            .attr("ExperienceID", "md:experienceid:e1")
                            .child(manifest("ContentID").text("md:cid:c1")),
                    )
                    .child(
                        manifest("Experience")
                            .attr("ExperienceID", "md:experienceid:e2")
                            .at_line(57)
                            .child(manifest("Region").child(md("country").text("US"))),
                    ),
            ),
    )
}
