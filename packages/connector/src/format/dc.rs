//! Simple Dublin Core (`oai_dc`) built from index fields.

use crate::error::Result;
use crate::index::{fields, Document};
use crate::query::escape_query_chars;
use crate::xml::XmlWriter;

use super::header::record_identifier;
use super::{Format, FormatContext, MetadataFormat};

const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Index field to Dublin Core element mapping, in output order.
const FIELD_MAP: &[(&str, &str)] = &[
    (fields::MD_CREATOR, "dc:creator"),
    (fields::MD_SUBJECT, "dc:subject"),
    (fields::MD_DESCRIPTION, "dc:description"),
    (fields::MD_PUBLISHER, "dc:publisher"),
    (fields::MD_YEARPUBLISH, "dc:date"),
    (fields::DOCSTRCT, "dc:type"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct OaiDcFormat;

impl OaiDcFormat {
    /// Title of the anchor this document belongs to, if it is a volume.
    fn anchor_title(doc: &Document, ctx: &FormatContext<'_>) -> Result<Option<String>> {
        let Some(parent) = doc.get_strings(fields::IDDOC_PARENT).into_iter().next() else {
            return Ok(None);
        };
        ctx.anchors.get_or_fetch(&parent, || {
            let base = format!("{}:{}", fields::IDDOC, escape_query_chars(&parent));
            let anchor = ctx
                .gateway
                .first_doc(&base, ctx.filter, &[fields::MD_TITLE])?;
            Ok(anchor.and_then(|a| a.get_str(fields::MD_TITLE).map(str::to_string)))
        })
    }
}

impl Format for OaiDcFormat {
    fn metadata_format(&self) -> MetadataFormat {
        MetadataFormat::OaiDc
    }

    fn render(
        &self,
        doc: &Document,
        version: Option<&str>,
        ctx: &FormatContext<'_>,
    ) -> Result<String> {
        let format = self.metadata_format();
        let schema_location = format!("{} {}", format.namespace(), format.schema());
        let mut w = XmlWriter::new();
        w.open(
            "oai_dc:dc",
            &[
                ("xmlns:oai_dc", format.namespace()),
                ("xmlns:dc", DC_NAMESPACE),
                ("xmlns:xsi", XSI_NAMESPACE),
                ("xsi:schemaLocation", schema_location.as_str()),
            ],
        );

        let title = doc.get_str(fields::MD_TITLE).unwrap_or_default();
        match Self::anchor_title(doc, ctx)? {
            Some(anchor) if !title.is_empty() => {
                w.leaf("dc:title", &[], &format!("{anchor}; {title}"))
            }
            Some(anchor) => w.leaf("dc:title", &[], &anchor),
            None => w.leaf("dc:title", &[], title),
        };

        for (field, element) in FIELD_MAP {
            for value in doc.get_strings(field) {
                w.leaf(element, &[], &value);
            }
        }

        let identifier = record_identifier(doc);
        w.leaf(
            "dc:identifier",
            &[],
            &format!("{}{identifier}", ctx.config.resolvers.pi_resolver_url),
        );
        for urn in doc.get_strings(fields::URN) {
            w.leaf("dc:identifier", &[], &urn);
        }

        match version {
            Some(language) => {
                w.leaf("dc:language", &[], language);
            }
            None => {
                for language in doc.get_strings(fields::MD_LANGUAGE) {
                    w.leaf("dc:language", &[], &language);
                }
            }
        }

        for rights in doc
            .get_strings(fields::MD_RIGHTS)
            .into_iter()
            .chain(doc.get_strings(fields::ACCESSCONDITION))
        {
            w.leaf("dc:rights", &[], &rights);
        }

        Ok(w.finish())
    }
}
