//! Protocol verbs and the arguments each accepts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A protocol operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Identify,
    ListMetadataFormats,
    ListSets,
    ListIdentifiers,
    ListRecords,
    GetRecord,
}

/// Whether an argument must, may or must not be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// Only valid as the sole argument besides the verb.
    Exclusive,
}

impl Verb {
    /// Parse a verb name. Matching is case-sensitive.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Identify" => Some(Self::Identify),
            "ListMetadataFormats" => Some(Self::ListMetadataFormats),
            "ListSets" => Some(Self::ListSets),
            "ListIdentifiers" => Some(Self::ListIdentifiers),
            "ListRecords" => Some(Self::ListRecords),
            "GetRecord" => Some(Self::GetRecord),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identify => "Identify",
            Self::ListMetadataFormats => "ListMetadataFormats",
            Self::ListSets => "ListSets",
            Self::ListIdentifiers => "ListIdentifiers",
            Self::ListRecords => "ListRecords",
            Self::GetRecord => "GetRecord",
        }
    }

    /// Arguments this verb accepts, besides `verb` itself.
    #[must_use]
    pub fn arguments(self) -> &'static [(&'static str, Presence)] {
        use Presence::{Exclusive, Optional, Required};
        match self {
            Self::Identify => &[],
            Self::ListMetadataFormats => &[("identifier", Optional)],
            Self::ListSets => &[("resumptionToken", Exclusive)],
            Self::ListIdentifiers | Self::ListRecords => &[
                ("metadataPrefix", Required),
                ("from", Optional),
                ("until", Optional),
                ("set", Optional),
                ("resumptionToken", Exclusive),
            ],
            Self::GetRecord => &[("identifier", Required), ("metadataPrefix", Required)],
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for verb in [
            Verb::Identify,
            Verb::ListMetadataFormats,
            Verb::ListSets,
            Verb::ListIdentifiers,
            Verb::ListRecords,
            Verb::GetRecord,
        ] {
            assert_eq!(Verb::parse(verb.as_str()), Some(verb));
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(Verb::parse("listrecords"), None);
        assert_eq!(Verb::parse(""), None);
    }

    #[test]
    fn test_get_record_requires_identifier() {
        assert!(Verb::GetRecord
            .arguments()
            .contains(&("identifier", Presence::Required)));
    }
}
