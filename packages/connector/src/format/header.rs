//! Record headers: identifier, datestamp and set membership.

use crate::error::Result;
use crate::index::{fields, latest_valid_date_updated, Document};
use crate::query::datestamp::format_datestamp;

use super::FormatContext;

/// Separator between an identifier and its version suffix.
pub const VERSION_SEPARATOR: char = '_';

/// The protocol header of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub identifier: String,
    pub datestamp: String,
    pub set_specs: Vec<String>,
}

/// Public identifier of a document: `PI_TOPSTRUCT`, else `PI`.
#[must_use]
pub fn record_identifier(doc: &Document) -> String {
    doc.get_str(fields::PI_TOPSTRUCT)
        .or_else(|| doc.get_str(fields::PI))
        .unwrap_or_default()
        .to_string()
}

/// Identifier of one version of a document.
#[must_use]
pub fn versioned_identifier(doc: &Document, version: Option<&str>) -> String {
    let identifier = record_identifier(doc);
    match version {
        Some(v) => format!("{identifier}{VERSION_SEPARATOR}{v}"),
        None => identifier,
    }
}

/// Split `PPN123_eng` into (`PPN123`, `eng`) when the part after the last
/// separator looks like a version code of 2 to `max_len` ASCII letters.
///
/// # Examples
/// ```
/// use oai_connector::format::split_identifier_and_version;
///
/// assert_eq!(split_identifier_and_version("PPN123_eng", 3), ("PPN123", Some("eng")));
/// assert_eq!(split_identifier_and_version("PPN123", 3), ("PPN123", None));
/// assert_eq!(split_identifier_and_version("PPN_1234", 3), ("PPN_1234", None));
/// ```
#[must_use]
pub fn split_identifier_and_version(identifier: &str, max_len: usize) -> (&str, Option<&str>) {
    match identifier.rsplit_once(VERSION_SEPARATOR) {
        Some((base, version))
            if !base.is_empty()
                && (2..=max_len).contains(&version.len())
                && version.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            (base, Some(version))
        }
        _ => (identifier, None),
    }
}

/// Build the header for one (possibly versioned) record.
///
/// The datestamp is the latest update not after the harvest window's upper
/// bound. Anchors use their newest volume when that is later. Records that
/// were never updated fall back to their creation time.
pub fn build_header(
    doc: &Document,
    version: Option<&str>,
    ctx: &FormatContext<'_>,
) -> Result<RecordHeader> {
    let mut timestamp = latest_valid_date_updated(doc, ctx.until_ms);
    if let Some(volume) = ctx
        .gateway
        .latest_volume_timestamp(doc, ctx.until_ms, ctx.filter)?
    {
        timestamp = timestamp.max(volume);
    }
    if timestamp == 0 {
        timestamp = doc.get_i64(fields::DATECREATED).unwrap_or(0);
    }

    let set_specs = ctx
        .config
        .sets
        .set_spec_fields
        .iter()
        .flat_map(|field| doc.get_strings(field))
        .collect();

    Ok(RecordHeader {
        identifier: versioned_identifier(doc, version),
        datestamp: format_datestamp(timestamp),
        set_specs,
    })
}
