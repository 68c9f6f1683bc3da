//! MARC21 slim records, taken from the native MARC section of the METS
//! document.

use roxmltree::{Document as XmlDocument, Node};

use crate::error::{ConnectorError, Result};
use crate::index::Document;
use crate::xml::{find_descendant, XmlWriter};

use super::header::record_identifier;
use super::mets::MetsFormat;
use super::{Format, FormatContext, MetadataFormat};

pub const MARC_NAMESPACE: &str = "http://www.loc.gov/MARC21/slim";

/// The native MARC element: `marc:marc` in Goobi METS, `marc:record` elsewhere.
fn find_marc<'a, 'input>(root: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    find_descendant(root, MARC_NAMESPACE, "marc")
        .or_else(|| find_descendant(root, MARC_NAMESPACE, "record"))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MarcXmlFormat;

impl Format for MarcXmlFormat {
    fn metadata_format(&self) -> MetadataFormat {
        MetadataFormat::Marcxml
    }

    fn supports(&self, doc: &Document) -> bool {
        MetsFormat::has_mets_source(doc)
    }

    fn render(
        &self,
        doc: &Document,
        _version: Option<&str>,
        ctx: &FormatContext<'_>,
    ) -> Result<String> {
        let content = MetsFormat::fetch_mets(doc, ctx)?;
        let parsed = XmlDocument::parse(&content)?;
        let marc = find_marc(parsed.root_element()).ok_or_else(|| {
            ConnectorError::MissingElement {
                element: "marc:record".to_string(),
                context: record_identifier(doc),
            }
        })?;

        let format = self.metadata_format();
        let schema_location = format!("{} {}", format.namespace(), format.schema());
        let mut w = XmlWriter::new();
        w.open(
            "marc:record",
            &[
                ("xmlns:marc", MARC_NAMESPACE),
                ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
                ("xsi:schemaLocation", schema_location.as_str()),
            ],
        )
        .copy_children(marc);
        Ok(w.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SearchResponse;
    use crate::oai::ErrorCode;
    use crate::testing::{FnBackend, Harness, MapContent};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn harness(body: &str) -> Harness {
        let mut content = HashMap::new();
        content.insert(
            "http://localhost/viewer/metsresolver?id=PPN9".to_string(),
            body.to_string(),
        );
        Harness::new(
            FnBackend::new(|_| SearchResponse::default()),
            MapContent(content),
        )
    }

    #[test]
    fn test_wraps_native_marc() {
        let mets = r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/" xmlns:marc="http://www.loc.gov/MARC21/slim"><mets:dmdSec><mets:mdWrap MDTYPE="MARC"><mets:xmlData><marc:marc><marc:controlfield tag="001">PPN9</marc:controlfield></marc:marc></mets:xmlData></mets:mdWrap></mets:dmdSec></mets:mets>"#;
        let harness = harness(mets);
        let doc = Document::new().with("PI", "PPN9");
        let xml = MarcXmlFormat.render(&doc, None, &harness.ctx()).unwrap();
        assert_eq!(
            xml,
            "<marc:record xmlns:marc=\"http://www.loc.gov/MARC21/slim\" \
             xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \
             xsi:schemaLocation=\"http://www.loc.gov/MARC21/slim \
             http://www.loc.gov/standards/marcxml/schema/MARC21slim.xsd\">\
             <marc:controlfield tag=\"001\">PPN9</marc:controlfield></marc:record>"
        );
    }

    #[test]
    fn test_accepts_marc_record_element() {
        let mets = r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/"><mets:dmdSec><mets:mdWrap MDTYPE="MARC"><mets:xmlData><marc:record xmlns:marc="http://www.loc.gov/MARC21/slim"><marc:leader>00000nam</marc:leader></marc:record></mets:xmlData></mets:mdWrap></mets:dmdSec></mets:mets>"#;
        let harness = harness(mets);
        let doc = Document::new().with("PI", "PPN9");
        let xml = MarcXmlFormat.render(&doc, None, &harness.ctx()).unwrap();
        assert!(xml.ends_with("<marc:leader>00000nam</marc:leader></marc:record>"));
    }

    #[test]
    fn test_mets_without_marc_section() {
        let harness = harness(r#"<mets:mets xmlns:mets="http://www.loc.gov/METS/"/>"#);
        let doc = Document::new().with("PI", "PPN9");
        let err = MarcXmlFormat.render(&doc, None, &harness.ctx()).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::CannotDisseminateFormat);
    }
}
