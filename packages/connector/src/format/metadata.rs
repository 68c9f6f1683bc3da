//! Catalogue of known metadata formats.

use std::fmt;

/// A metadata format the protocol knows by prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataFormat {
    OaiDc,
    Mets,
    Marcxml,
    Lido,
    Epicur,
    Europeana,
    Isebel,
    Tei,
    Cmdi,
    IvOverviewpage,
    IvCrowdsourcing,
}

impl MetadataFormat {
    pub const ALL: [Self; 11] = [
        Self::OaiDc,
        Self::Mets,
        Self::Marcxml,
        Self::Lido,
        Self::Epicur,
        Self::Europeana,
        Self::Isebel,
        Self::Tei,
        Self::Cmdi,
        Self::IvOverviewpage,
        Self::IvCrowdsourcing,
    ];

    /// Look a format up by its `metadataPrefix`. Matching is exact.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.prefix() == prefix)
    }

    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::OaiDc => "oai_dc",
            Self::Mets => "mets",
            Self::Marcxml => "marcxml",
            Self::Lido => "lido",
            Self::Epicur => "epicur",
            Self::Europeana => "europeana",
            Self::Isebel => "isebel",
            Self::Tei => "tei",
            Self::Cmdi => "cmdi",
            Self::IvOverviewpage => "iv_overviewpage",
            Self::IvCrowdsourcing => "iv_crowdsourcing",
        }
    }

    /// XML schema location advertised by ListMetadataFormats.
    #[must_use]
    pub fn schema(self) -> &'static str {
        match self {
            Self::OaiDc => "http://www.openarchives.org/OAI/2.0/oai_dc.xsd",
            Self::Mets => "http://www.loc.gov/mets/mets.xsd",
            Self::Marcxml => "http://www.loc.gov/standards/marcxml/schema/MARC21slim.xsd",
            Self::Lido => "http://www.lido-schema.org/schema/v1.0/lido-v1.0.xsd",
            Self::Epicur => "http://nbn-resolving.de/urn/resolver.pl?urn=urn:nbn:de:1111-2004033116",
            Self::Europeana => "http://www.europeana.eu/schemas/ese/ESE-V3.4.xsd",
            Self::Isebel => "http://www.isebel.eu/ns/isebel2.xsd",
            Self::Tei => "https://www.tei-c.org/release/xml/tei/custom/schema/xsd/tei_all.xsd",
            Self::Cmdi => "https://infra.clarin.eu/CMDI/1.x/xsd/cmd-envelop.xsd",
            Self::IvOverviewpage | Self::IvCrowdsourcing => {
                "http://www.intranda.com/intrandaviewer_overviewpage.xsd"
            }
        }
    }

    /// Metadata namespace URI.
    #[must_use]
    pub fn namespace(self) -> &'static str {
        match self {
            Self::OaiDc => "http://www.openarchives.org/OAI/2.0/oai_dc/",
            Self::Mets => "http://www.loc.gov/METS/",
            Self::Marcxml => "http://www.loc.gov/MARC21/slim",
            Self::Lido => "http://www.lido-schema.org",
            Self::Epicur => "urn:nbn:de:1111-2004033116",
            Self::Europeana => "http://www.europeana.eu/schemas/ese/",
            Self::Isebel => "http://www.isebel.eu/ns/isebel",
            Self::Tei => "http://www.tei-c.org/ns/1.0",
            Self::Cmdi => "http://www.clarin.eu/cmd/1",
            Self::IvOverviewpage => {
                "http://www.intranda.com/digiverso/intrandaviewer/overviewpage"
            }
            Self::IvCrowdsourcing => {
                "http://www.intranda.com/digiverso/intrandaviewer/crowdsourcing"
            }
        }
    }

    /// Snapshot formats: no time window, no anchor records.
    #[must_use]
    pub fn is_overview(self) -> bool {
        matches!(self, Self::IvOverviewpage | Self::IvCrowdsourcing)
    }

    /// Whether anchor (multi-volume parent) records are left out.
    #[must_use]
    pub fn excludes_anchors(self) -> bool {
        matches!(self, Self::Epicur) || self.is_overview()
    }

    /// Extra predicate restricting records to ones carrying a URN.
    #[must_use]
    pub fn requires_urn(self) -> bool {
        matches!(self, Self::Epicur)
    }

    /// Required `SOURCEDOCFORMAT` value, if the format needs one.
    #[must_use]
    pub fn source_doc_format(self) -> Option<&'static str> {
        use crate::index::fields::{SOURCE_FORMAT_LIDO, SOURCE_FORMAT_METS};
        match self {
            Self::Mets | Self::Marcxml => Some(SOURCE_FORMAT_METS),
            Self::Lido => Some(SOURCE_FORMAT_LIDO),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_lookup_is_exhaustive() {
        for format in MetadataFormat::ALL {
            assert_eq!(MetadataFormat::from_prefix(format.prefix()), Some(format));
        }
        assert_eq!(MetadataFormat::from_prefix("OAI_DC"), None);
        assert_eq!(MetadataFormat::from_prefix("mods"), None);
    }

    #[test]
    fn test_source_doc_format() {
        assert_eq!(MetadataFormat::Mets.source_doc_format(), Some("METS"));
        assert_eq!(MetadataFormat::Marcxml.source_doc_format(), Some("METS"));
        assert_eq!(MetadataFormat::Lido.source_doc_format(), Some("LIDO"));
        assert_eq!(MetadataFormat::OaiDc.source_doc_format(), None);
    }

    #[test]
    fn test_anchor_rules() {
        assert!(MetadataFormat::Epicur.excludes_anchors());
        assert!(MetadataFormat::IvOverviewpage.excludes_anchors());
        assert!(!MetadataFormat::OaiDc.excludes_anchors());
    }
}
