//! Response payloads and their XML envelope.

use chrono::{DateTime, Utc};

use crate::format::{MetadataFormat, Record, RecordBody, RecordHeader};
use crate::query::datestamp::format_datetime;
use crate::xml::XmlWriter;

use super::error_code::{ErrorCode, OaiError};
use super::request::HarvestRequest;
use super::verb::Verb;

pub const OAI_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/";
const OAI_SCHEMA_LOCATION: &str =
    "http://www.openarchives.org/OAI/2.0/ http://www.openarchives.org/OAI/2.0/OAI-PMH.xsd";
const OAI_IDENTIFIER_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/oai-identifier";
const OAI_IDENTIFIER_SCHEMA_LOCATION: &str = "http://www.openarchives.org/OAI/2.0/oai-identifier \
     http://www.openarchives.org/OAI/2.0/oai-identifier.xsd";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

pub const PROTOCOL_VERSION: &str = "2.0";
pub const GRANULARITY: &str = "YYYY-MM-DDThh:mm:ssZ";

/// Repository description returned by Identify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyInfo {
    pub repository_name: String,
    pub base_url: String,
    pub admin_email: String,
    pub earliest_datestamp: String,
    /// Advertised in an `oai-identifier` description when not empty.
    pub repository_identifier: String,
}

/// One entry of ListSets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SetEntry {
    pub spec: String,
    pub name: String,
}

/// Continuation metadata of a list page.
///
/// `token` is `None` on the last page of a resumed list: the element is
/// then written empty, which ends the harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumptionInfo {
    pub token: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub complete_list_size: usize,
    pub cursor: usize,
}

/// Records of one list page.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordList {
    pub records: Vec<Record>,
    pub resumption: Option<ResumptionInfo>,
}

/// A successful response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Identify(IdentifyInfo),
    ListMetadataFormats(Vec<MetadataFormat>),
    ListSets(Vec<SetEntry>),
    ListIdentifiers(RecordList),
    ListRecords(RecordList),
    GetRecord(Record),
}

impl Payload {
    #[must_use]
    pub fn verb(&self) -> Verb {
        match self {
            Self::Identify(_) => Verb::Identify,
            Self::ListMetadataFormats(_) => Verb::ListMetadataFormats,
            Self::ListSets(_) => Verb::ListSets,
            Self::ListIdentifiers(_) => Verb::ListIdentifiers,
            Self::ListRecords(_) => Verb::ListRecords,
            Self::GetRecord(_) => Verb::GetRecord,
        }
    }
}

/// Render a complete protocol response document.
///
/// The request element echoes the arguments only when they were valid.
#[must_use]
pub fn render_response(
    request: Option<&HarvestRequest>,
    outcome: &Result<Payload, OaiError>,
    base_url: &str,
    response_date: DateTime<Utc>,
) -> String {
    let mut w = XmlWriter::new();
    w.declaration();
    w.open(
        "OAI-PMH",
        &[
            ("xmlns", OAI_NAMESPACE),
            ("xmlns:xsi", XSI_NAMESPACE),
            ("xsi:schemaLocation", OAI_SCHEMA_LOCATION),
        ],
    );
    w.leaf("responseDate", &[], &format_datetime(response_date));

    let echo_arguments = match outcome {
        Err(e) => !matches!(e.code, ErrorCode::BadVerb | ErrorCode::BadArgument),
        Ok(_) => true,
    };
    let attrs = match request {
        Some(request) if echo_arguments => request.echo(),
        _ => Vec::new(),
    };
    w.leaf("request", &attrs, base_url);

    match outcome {
        Ok(payload) => write_payload(&mut w, payload),
        Err(error) => write_error(&mut w, error),
    }
    w.finish()
}

fn write_error(w: &mut XmlWriter, error: &OaiError) {
    w.leaf("error", &[("code", error.code.as_str())], &error.message);
}

fn write_payload(w: &mut XmlWriter, payload: &Payload) {
    w.open(payload.verb().as_str(), &[]);
    match payload {
        Payload::Identify(info) => write_identify(w, info),
        Payload::ListMetadataFormats(formats) => {
            for format in formats {
                w.open("metadataFormat", &[])
                    .leaf("metadataPrefix", &[], format.prefix())
                    .leaf("schema", &[], format.schema())
                    .leaf("metadataNamespace", &[], format.namespace())
                    .close();
            }
        }
        Payload::ListSets(sets) => {
            for set in sets {
                w.open("set", &[])
                    .leaf("setSpec", &[], &set.spec)
                    .leaf("setName", &[], &set.name)
                    .close();
            }
        }
        Payload::ListIdentifiers(list) => {
            for record in &list.records {
                write_header(w, &record.header);
            }
            write_resumption(w, list.resumption.as_ref());
        }
        Payload::ListRecords(list) => {
            for record in &list.records {
                write_record(w, record);
            }
            write_resumption(w, list.resumption.as_ref());
        }
        Payload::GetRecord(record) => write_record(w, record),
    }
    w.close();
}

fn write_identify(w: &mut XmlWriter, info: &IdentifyInfo) {
    w.leaf("repositoryName", &[], &info.repository_name)
        .leaf("baseURL", &[], &info.base_url)
        .leaf("protocolVersion", &[], PROTOCOL_VERSION)
        .leaf("adminEmail", &[], &info.admin_email)
        .leaf("earliestDatestamp", &[], &info.earliest_datestamp)
        .leaf("deletedRecord", &[], "no")
        .leaf("granularity", &[], GRANULARITY);
    if !info.repository_identifier.is_empty() {
        w.open("description", &[])
            .open(
                "oai-identifier",
                &[
                    ("xmlns", OAI_IDENTIFIER_NAMESPACE),
                    ("xmlns:xsi", XSI_NAMESPACE),
                    ("xsi:schemaLocation", OAI_IDENTIFIER_SCHEMA_LOCATION),
                ],
            )
            .leaf("scheme", &[], "oai")
            .leaf("repositoryIdentifier", &[], &info.repository_identifier)
            .leaf("delimiter", &[], ":")
            .close()
            .close();
    }
}

fn write_header(w: &mut XmlWriter, header: &RecordHeader) {
    w.open("header", &[])
        .leaf("identifier", &[], &header.identifier)
        .leaf("datestamp", &[], &header.datestamp);
    for spec in &header.set_specs {
        w.leaf("setSpec", &[], spec);
    }
    w.close();
}

fn write_record(w: &mut XmlWriter, record: &Record) {
    w.open("record", &[]);
    write_header(w, &record.header);
    match &record.body {
        RecordBody::HeaderOnly => {}
        RecordBody::Metadata(xml) => {
            w.open("metadata", &[]).raw(xml).close();
        }
        RecordBody::Failed(error) => write_error(w, error),
    }
    w.close();
}

fn write_resumption(w: &mut XmlWriter, resumption: Option<&ResumptionInfo>) {
    let Some(info) = resumption else {
        return;
    };
    let size = info.complete_list_size.to_string();
    let cursor = info.cursor.to_string();
    let expiration = info.expiration_date.map(format_datetime);
    let mut attrs: Vec<(&str, &str)> = Vec::new();
    if let Some(expiration) = &expiration {
        attrs.push(("expirationDate", expiration.as_str()));
    }
    attrs.push(("completeListSize", size.as_str()));
    attrs.push(("cursor", cursor.as_str()));
    match &info.token {
        Some(token) => w.leaf("resumptionToken", &attrs, token),
        None => w.empty("resumptionToken", &attrs),
    };
}
