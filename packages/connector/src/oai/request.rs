//! Parsing and validation of the request argument bag.

use std::collections::BTreeMap;

use crate::query::datestamp::Datestamp;
use crate::query::HarvestParams;

use super::error_code::{ErrorCode, OaiError};
use super::verb::{Presence, Verb};

pub const ARG_VERB: &str = "verb";
pub const ARG_IDENTIFIER: &str = "identifier";
pub const ARG_METADATA_PREFIX: &str = "metadataPrefix";
pub const ARG_FROM: &str = "from";
pub const ARG_UNTIL: &str = "until";
pub const ARG_SET: &str = "set";
pub const ARG_RESUMPTION_TOKEN: &str = "resumptionToken";

/// A syntactically valid protocol request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    pub verb: Verb,
    pub identifier: Option<String>,
    pub metadata_prefix: Option<String>,
    pub from: Option<String>,
    pub until: Option<String>,
    pub set: Option<String>,
    pub resumption_token: Option<String>,
}

impl HarvestRequest {
    /// Request for `verb` with no arguments.
    #[must_use]
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            identifier: None,
            metadata_prefix: None,
            from: None,
            until: None,
            set: None,
            resumption_token: None,
        }
    }

    /// Parse and validate an argument bag.
    ///
    /// Checks, in order: the verb, repeated and unknown arguments, required
    /// arguments, then datestamp syntax. When a resumption token is given,
    /// every other argument is ignored and only the token is kept.
    pub fn parse<I, K, V>(args: I) -> Result<Self, OaiError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut bag: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in args {
            bag.entry(key.as_ref().to_string())
                .or_default()
                .push(value.as_ref().to_string());
        }

        let verb = match bag.remove(ARG_VERB).as_deref() {
            None | Some([]) => {
                return Err(OaiError::new(ErrorCode::BadVerb, "Missing verb argument"))
            }
            Some([single]) => Verb::parse(single).ok_or_else(|| {
                OaiError::new(ErrorCode::BadVerb, format!("Illegal verb: {single}"))
            })?,
            Some(_) => {
                return Err(OaiError::new(ErrorCode::BadVerb, "Verb argument is repeated"))
            }
        };

        let allowed = verb.arguments();
        let exclusive = allowed
            .iter()
            .find(|(_, presence)| *presence == Presence::Exclusive)
            .map(|(name, _)| *name);
        if let Some(name) = exclusive {
            if let Some([token]) = bag.get(name).map(Vec::as_slice) {
                return Ok(Self {
                    resumption_token: Some(token.clone()),
                    ..Self::new(verb)
                });
            }
        }

        let mut single: BTreeMap<String, String> = BTreeMap::new();
        for (name, mut values) in bag {
            if !allowed.iter().any(|(known, _)| *known == name) {
                return Err(OaiError::bad_argument(format!("Illegal argument: {name}")));
            }
            if values.len() > 1 {
                return Err(OaiError::bad_argument(format!("Repeated argument: {name}")));
            }
            if let Some(value) = values.pop() {
                single.insert(name, value);
            }
        }

        for (name, presence) in allowed {
            if *presence == Presence::Required && !single.contains_key(*name) {
                return Err(OaiError::bad_argument(format!("Missing argument: {name}")));
            }
        }

        let request = Self {
            verb,
            identifier: single.remove(ARG_IDENTIFIER),
            metadata_prefix: single.remove(ARG_METADATA_PREFIX),
            from: single.remove(ARG_FROM),
            until: single.remove(ARG_UNTIL),
            set: single.remove(ARG_SET),
            resumption_token: None,
        };
        request.validate_window()?;
        Ok(request)
    }

    fn validate_window(&self) -> Result<(), OaiError> {
        let parse = |name: &str, value: Option<&str>| -> Result<Option<Datestamp>, OaiError> {
            value
                .map(|v| {
                    Datestamp::parse(v).ok_or_else(|| {
                        OaiError::bad_argument(format!("Illegal {name} datestamp: {v}"))
                    })
                })
                .transpose()
        };
        let from = parse(ARG_FROM, self.from.as_deref())?;
        let until = parse(ARG_UNTIL, self.until.as_deref())?;
        if let (Some(from), Some(until)) = (from, until) {
            if from.granularity != until.granularity {
                return Err(OaiError::bad_argument(
                    "from and until must have the same granularity",
                ));
            }
            if from.lower_bound_ms() > until.lower_bound_ms() {
                return Err(OaiError::bad_argument("from must not be later than until"));
            }
        }
        Ok(())
    }

    /// Selective harvesting arguments of a list request.
    #[must_use]
    pub fn harvest_params(&self) -> HarvestParams {
        HarvestParams {
            from: self.from.clone(),
            until: self.until.clone(),
            set: self.set.clone(),
            metadata_prefix: self.metadata_prefix.clone().unwrap_or_default(),
        }
    }

    /// Arguments as echoed in the response `request` element.
    #[must_use]
    pub fn echo(&self) -> Vec<(&'static str, &str)> {
        let mut attrs = vec![(ARG_VERB, self.verb.as_str())];
        let optional = [
            (ARG_IDENTIFIER, &self.identifier),
            (ARG_METADATA_PREFIX, &self.metadata_prefix),
            (ARG_FROM, &self.from),
            (ARG_UNTIL, &self.until),
            (ARG_SET, &self.set),
            (ARG_RESUMPTION_TOKEN, &self.resumption_token),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                attrs.push((name, value.as_str()));
            }
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[(&str, &str)]) -> Result<HarvestRequest, OaiError> {
        HarvestRequest::parse(args.iter().copied())
    }

    fn code(args: &[(&str, &str)]) -> ErrorCode {
        parse(args).unwrap_err().code
    }

    #[test]
    fn test_verb_errors() {
        assert_eq!(code(&[]), ErrorCode::BadVerb);
        assert_eq!(code(&[("verb", "Explode")]), ErrorCode::BadVerb);
        assert_eq!(
            code(&[("verb", "Identify"), ("verb", "Identify")]),
            ErrorCode::BadVerb
        );
    }

    #[test]
    fn test_identify_takes_no_arguments() {
        assert!(parse(&[("verb", "Identify")]).is_ok());
        assert_eq!(
            code(&[("verb", "Identify"), ("set", "x")]),
            ErrorCode::BadArgument
        );
    }

    #[test]
    fn test_required_and_repeated_arguments() {
        assert_eq!(
            code(&[("verb", "GetRecord"), ("identifier", "PPN1")]),
            ErrorCode::BadArgument
        );
        assert_eq!(
            code(&[
                ("verb", "ListRecords"),
                ("metadataPrefix", "oai_dc"),
                ("set", "a"),
                ("set", "b"),
            ]),
            ErrorCode::BadArgument
        );
    }

    #[test]
    fn test_list_request() {
        let request = parse(&[
            ("verb", "ListRecords"),
            ("metadataPrefix", "mets"),
            ("from", "2020-01-01"),
            ("until", "2020-01-01"),
        ])
        .unwrap();
        assert_eq!(request.verb, Verb::ListRecords);
        let params = request.harvest_params();
        assert_eq!(params.metadata_prefix, "mets");
        assert_eq!(params.from.as_deref(), Some("2020-01-01"));
    }

    #[test]
    fn test_datestamp_validation() {
        let base = [("verb", "ListIdentifiers"), ("metadataPrefix", "oai_dc")];
        let with = |extra: &[(&'static str, &'static str)]| {
            let mut args = base.to_vec();
            args.extend_from_slice(extra);
            code(&args)
        };
        assert_eq!(with(&[("from", "2020-13-01")]), ErrorCode::BadArgument);
        assert_eq!(
            with(&[("from", "2020-01-01"), ("until", "2020-01-02T00:00:00Z")]),
            ErrorCode::BadArgument
        );
        assert_eq!(
            with(&[("from", "2020-02-01"), ("until", "2020-01-01")]),
            ErrorCode::BadArgument
        );
    }

    #[test]
    fn test_resumption_token_wins_over_other_arguments() {
        let request = parse(&[
            ("verb", "ListRecords"),
            ("resumptionToken", "abc"),
            ("metadataPrefix", "oai_dc"),
            ("from", "not-a-date"),
        ])
        .unwrap();
        assert_eq!(request.resumption_token.as_deref(), Some("abc"));
        assert_eq!(request.metadata_prefix, None);
        assert_eq!(request.from, None);
    }

    #[test]
    fn test_echo_order() {
        let request = parse(&[
            ("verb", "GetRecord"),
            ("metadataPrefix", "oai_dc"),
            ("identifier", "PPN1"),
        ])
        .unwrap();
        assert_eq!(
            request.echo(),
            vec![
                ("verb", "GetRecord"),
                ("identifier", "PPN1"),
                ("metadataPrefix", "oai_dc")
            ]
        );
    }
}
