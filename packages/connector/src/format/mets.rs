//! METS records, served from the document resolver.

use roxmltree::Document as XmlDocument;

use crate::error::{ConnectorError, Result};
use crate::index::{fields, Document};
use crate::xml::XmlWriter;

use super::header::record_identifier;
use super::{Format, FormatContext, MetadataFormat};

pub const METS_NAMESPACE: &str = "http://www.loc.gov/METS/";

#[derive(Debug, Default, Clone, Copy)]
pub struct MetsFormat;

impl MetsFormat {
    /// Whether the record was indexed from a METS file.
    #[must_use]
    pub fn has_mets_source(doc: &Document) -> bool {
        doc.get_str(fields::SOURCEDOCFORMAT) == Some(fields::SOURCE_FORMAT_METS)
    }

    /// Fetch the raw METS document of a record.
    pub fn fetch_mets(doc: &Document, ctx: &FormatContext<'_>) -> Result<String> {
        let url = format!(
            "{}{}",
            ctx.config.resolvers.document_resolver_url,
            record_identifier(doc)
        );
        tracing::debug!(%url, "fetching METS");
        ctx.content.fetch(&url)
    }
}

impl Format for MetsFormat {
    fn metadata_format(&self) -> MetadataFormat {
        MetadataFormat::Mets
    }

    fn supports(&self, doc: &Document) -> bool {
        Self::has_mets_source(doc)
    }

    fn render(
        &self,
        doc: &Document,
        _version: Option<&str>,
        ctx: &FormatContext<'_>,
    ) -> Result<String> {
        let content = Self::fetch_mets(doc, ctx)?;
        let parsed = XmlDocument::parse(&content)?;
        let root = parsed.root_element();
        if root.tag_name().name() != "mets" || root.tag_name().namespace() != Some(METS_NAMESPACE) {
            return Err(ConnectorError::MissingElement {
                element: "mets:mets".to_string(),
                context: record_identifier(doc),
            });
        }
        let mut w = XmlWriter::new();
        w.copy_element(root);
        Ok(w.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SearchResponse;
    use crate::oai::ErrorCode;
    use crate::testing::{FnBackend, Harness, MapContent};
    use std::collections::HashMap;

    const METS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:mods="http://www.loc.gov/mods/v3"><mets:dmdSec ID="DMD1"><mets:mdWrap MDTYPE="MODS"><mets:xmlData><mods:mods><mods:titleInfo><mods:title>Faust</mods:title></mods:titleInfo></mods:mods></mets:xmlData></mets:mdWrap></mets:dmdSec></mets:mets>"#;

    fn harness(body: &str) -> Harness {
        let mut content = HashMap::new();
        content.insert(
            "http://localhost/viewer/metsresolver?id=PPN1".to_string(),
            body.to_string(),
        );
        Harness::new(
            FnBackend::new(|_| SearchResponse::default()),
            MapContent(content),
        )
    }

    fn doc() -> Document {
        Document::new()
            .with("PI", "PPN1")
            .with("SOURCEDOCFORMAT", "METS")
    }

    #[test]
    fn test_render_copies_mets_root() {
        let harness = harness(METS);
        let xml = MetsFormat.render(&doc(), None, &harness.ctx()).unwrap();
        assert!(xml.starts_with("<mets:mets "));
        assert!(xml.contains("xmlns:mets=\"http://www.loc.gov/METS/\""));
        assert!(xml.contains("<mods:title>Faust</mods:title>"));
        assert!(!xml.contains("<?xml"));
    }

    #[test]
    fn test_supports_only_mets_sources() {
        assert!(MetsFormat.supports(&doc()));
        let lido = Document::new().with("PI", "X").with("SOURCEDOCFORMAT", "LIDO");
        assert!(!MetsFormat.supports(&lido));
    }

    #[test]
    fn test_missing_content_cannot_be_disseminated() {
        let harness = harness(METS);
        let other = Document::new().with("PI", "PPN2");
        let err = MetsFormat.render(&other, None, &harness.ctx()).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::CannotDisseminateFormat);
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let harness = harness("<html><body/></html>");
        let err = MetsFormat.render(&doc(), None, &harness.ctx()).unwrap_err();
        assert!(matches!(err, ConnectorError::MissingElement { .. }));
    }
}
