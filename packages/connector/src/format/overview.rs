//! Viewer snapshot formats: overview page texts and crowdsourcing status.
//!
//! These records describe the current state of a work, so list queries for
//! them carry no time window.

use crate::error::Result;
use crate::index::{fields, Document};
use crate::xml::XmlWriter;

use super::header::record_identifier;
use super::{Format, FormatContext, MetadataFormat};

/// Element name and source field of each snapshot value.
fn field_map(kind: MetadataFormat) -> &'static [(&'static str, &'static str)] {
    match kind {
        MetadataFormat::IvOverviewpage => &[
            ("description", fields::MD_OVERVIEWPAGE_DESCRIPTION),
            ("publicationText", fields::MD_OVERVIEWPAGE_PUBLICATIONTEXT),
        ],
        _ => &[("title", fields::MD_TITLE), ("pages", fields::NUMPAGES)],
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OverviewFormat {
    kind: MetadataFormat,
}

impl OverviewFormat {
    #[must_use]
    pub fn overview_page() -> Self {
        Self {
            kind: MetadataFormat::IvOverviewpage,
        }
    }

    #[must_use]
    pub fn crowdsourcing() -> Self {
        Self {
            kind: MetadataFormat::IvCrowdsourcing,
        }
    }

    fn root_element(self) -> &'static str {
        match self.kind {
            MetadataFormat::IvOverviewpage => "overviewPage",
            _ => "crowdsourcing",
        }
    }
}

impl Format for OverviewFormat {
    fn metadata_format(&self) -> MetadataFormat {
        self.kind
    }

    fn render(
        &self,
        doc: &Document,
        _version: Option<&str>,
        ctx: &FormatContext<'_>,
    ) -> Result<String> {
        let prefix = self.kind.prefix();
        let qualified = |local: &str| format!("{prefix}:{local}");
        let schema_location = format!("{} {}", self.kind.namespace(), self.kind.schema());
        let xmlns = format!("xmlns:{prefix}");

        let mut w = XmlWriter::new();
        w.open(
            &qualified(self.root_element()),
            &[
                (xmlns.as_str(), self.kind.namespace()),
                ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
                ("xsi:schemaLocation", schema_location.as_str()),
            ],
        );
        w.leaf(
            &qualified("url"),
            &[],
            &format!(
                "{}{}",
                ctx.config.resolvers.pi_resolver_url,
                record_identifier(doc)
            ),
        );
        for (element, field) in field_map(self.kind) {
            for value in doc.get_strings(field) {
                w.leaf(&qualified(element), &[], &value);
            }
        }
        Ok(w.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::SearchResponse;
    use crate::testing::{FnBackend, Harness, MapContent};

    #[test]
    fn test_overview_page() {
        let harness = Harness::new(
            FnBackend::new(|_| SearchResponse::default()),
            MapContent::default(),
        );
        let doc = Document::new()
            .with("PI", "PPN5")
            .with("MD_OVERVIEWPAGE_DESCRIPTION", "<p>Intro</p>");
        let xml = OverviewFormat::overview_page()
            .render(&doc, None, &harness.ctx())
            .unwrap();
        assert!(xml.starts_with("<iv_overviewpage:overviewPage xmlns:iv_overviewpage="));
        assert!(xml.contains(
            "<iv_overviewpage:url>http://localhost/viewer/piresolver?id=PPN5</iv_overviewpage:url>"
        ));
        assert!(xml.contains(
            "<iv_overviewpage:description>&lt;p&gt;Intro&lt;/p&gt;</iv_overviewpage:description>"
        ));
        assert!(!xml.contains("publicationText"));
    }

    #[test]
    fn test_crowdsourcing() {
        let harness = Harness::new(
            FnBackend::new(|_| SearchResponse::default()),
            MapContent::default(),
        );
        let doc = Document::new()
            .with("PI", "PPN6")
            .with("MD_TITLE", "Tagebuch")
            .with("NUMPAGES", 12_i64);
        let format = OverviewFormat::crowdsourcing();
        assert_eq!(format.metadata_format(), MetadataFormat::IvCrowdsourcing);
        let xml = format.render(&doc, None, &harness.ctx()).unwrap();
        assert!(xml.contains("<iv_crowdsourcing:title>Tagebuch</iv_crowdsourcing:title>"));
        assert!(xml.contains("<iv_crowdsourcing:pages>12</iv_crowdsourcing:pages>"));
        assert!(xml.ends_with("</iv_crowdsourcing:crowdsourcing>"));
    }
}
