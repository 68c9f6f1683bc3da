//! Metadata formats: turning index documents into protocol records.
//!
//! Each format implements [`Format`]. Paging decisions (where a page starts,
//! how large it is, and the session totals) are made by the engine and
//! handed in through [`ListRequest`]; formats only fetch and render.

pub mod cache;
pub mod dc;
pub mod header;
pub mod marcxml;
pub mod metadata;
pub mod mets;
pub mod overview;
pub mod registry;

use crate::config::Config;
use crate::error::{ConnectorError, Result};
use crate::http::ContentSource;
use crate::index::{Document, SearchGateway};
use crate::oai::{ErrorCode, OaiError};
use crate::query::{FilterSuffix, HarvestParams, QueryTranslator};

pub use cache::AnchorTitleCache;
pub use header::{build_header, split_identifier_and_version, RecordHeader};
pub use metadata::MetadataFormat;
pub use registry::FormatRegistry;

/// Longest version suffix accepted in GetRecord identifiers.
pub const MAX_VERSION_SUFFIX_LEN: usize = 3;

/// Shared collaborators for rendering within one request.
pub struct FormatContext<'a> {
    pub gateway: &'a SearchGateway,
    pub translator: &'a QueryTranslator,
    pub config: &'a Config,
    pub anchors: &'a AnchorTitleCache,
    pub content: &'a dyn ContentSource,
    /// Access restrictions for every query issued while rendering.
    pub filter: &'a FilterSuffix,
    /// Upper bound of the harvest window, for header datestamps.
    pub until_ms: i64,
}

/// Hit counts fixed at the start of a list session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    /// Matching index documents.
    pub total_raw: usize,
    /// Logical records; differs from `total_raw` for versioned formats.
    pub total_virtual: usize,
}

/// What one list page should contain.
#[derive(Debug, Clone)]
pub struct ListRequest<'a> {
    pub params: &'a HarvestParams,
    pub first_raw: usize,
    pub first_virtual: usize,
    pub page_size: usize,
    pub version_field: Option<&'a str>,
    /// Headers only (ListIdentifiers).
    pub header_only: bool,
}

/// Payload of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    HeaderOnly,
    /// Serialized metadata element.
    Metadata(String),
    /// Rendering failed for this record only.
    Failed(OaiError),
}

/// One protocol record.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub header: RecordHeader,
    pub body: RecordBody,
}

/// A rendered list page and how far it advanced.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedPage {
    pub records: Vec<Record>,
    /// Index documents consumed.
    pub emitted_raw: usize,
    /// Logical records emitted.
    pub emitted_virtual: usize,
}

/// A metadata format capability.
pub trait Format: Send + Sync {
    fn metadata_format(&self) -> MetadataFormat;

    /// Whether `doc` has content in this format.
    fn supports(&self, _doc: &Document) -> bool {
        true
    }

    /// Render the metadata element of one record.
    fn render(&self, doc: &Document, version: Option<&str>, ctx: &FormatContext<'_>)
        -> Result<String>;

    /// Count documents and logical records matching a list query.
    fn total_hits(
        &self,
        params: &HarvestParams,
        version_field: Option<&str>,
        ctx: &FormatContext<'_>,
    ) -> Result<Totals> {
        let query = ctx.translator.build(params, version_field, ctx.filter);
        let facets: Vec<String> = version_field.map(ToString::to_string).into_iter().collect();
        let response = ctx.gateway.count(&query, &facets)?;
        let total_virtual = match version_field {
            Some(field) => usize::try_from(response.facet_total(field)).unwrap_or(usize::MAX),
            None => response.num_found,
        };
        Ok(Totals {
            total_raw: response.num_found,
            total_virtual,
        })
    }

    /// Fetch and render one page of a list.
    fn list_records(&self, request: &ListRequest<'_>, ctx: &FormatContext<'_>) -> Result<ListedPage> {
        list_page(self, request, ctx)
    }

    /// Find and render a single record. `None` if no document matches.
    fn get_record(
        &self,
        identifier: &str,
        version_field: Option<&str>,
        ctx: &FormatContext<'_>,
    ) -> Result<Option<Record>> {
        find_record(self, identifier, version_field, ctx)
    }
}

fn list_page<F: Format + ?Sized>(
    format: &F,
    request: &ListRequest<'_>,
    ctx: &FormatContext<'_>,
) -> Result<ListedPage> {
    let query = ctx
        .translator
        .build(request.params, request.version_field, ctx.filter);
    let page = ctx
        .gateway
        .list(&query, request.first_raw, request.page_size, &[])?;

    let mut records = Vec::new();
    for doc in &page.docs {
        let versions: Vec<Option<String>> = match request.version_field {
            Some(field) => doc.distinct_strings(field).into_iter().map(Some).collect(),
            None => vec![None],
        };
        for version in versions {
            records.push(render_record(
                format,
                doc,
                version.as_deref(),
                request.header_only,
                ctx,
            )?);
        }
    }

    tracing::debug!(
        first_raw = request.first_raw,
        documents = page.docs.len(),
        records = records.len(),
        "rendered list page"
    );
    Ok(ListedPage {
        emitted_raw: page.docs.len(),
        emitted_virtual: records.len(),
        records,
    })
}

/// Render one list entry. Content failures become an inline error for this
/// record; index failures abort the page.
fn render_record<F: Format + ?Sized>(
    format: &F,
    doc: &Document,
    version: Option<&str>,
    header_only: bool,
    ctx: &FormatContext<'_>,
) -> Result<Record> {
    let header = build_header(doc, version, ctx)?;
    if header_only {
        return Ok(Record {
            header,
            body: RecordBody::HeaderOnly,
        });
    }
    let body = match format.render(doc, version, ctx) {
        Ok(xml) => RecordBody::Metadata(xml),
        Err(e) if e.error_code() == ErrorCode::CannotDisseminateFormat => {
            tracing::warn!(identifier = %header.identifier, error = %e, "record rendering failed");
            RecordBody::Failed(OaiError::from(e))
        }
        Err(e) => return Err(e),
    };
    Ok(Record { header, body })
}

/// GetRecord lookup chain: the identifier split into base and version (for
/// versioned formats), then the identifier as given.
fn find_record<F: Format + ?Sized>(
    format: &F,
    identifier: &str,
    version_field: Option<&str>,
    ctx: &FormatContext<'_>,
) -> Result<Option<Record>> {
    let mut candidates: Vec<(&str, Option<&str>)> = Vec::new();
    if version_field.is_some() {
        if let (base, Some(version)) =
            split_identifier_and_version(identifier, MAX_VERSION_SUFFIX_LEN)
        {
            candidates.push((base, Some(version)));
        }
    }
    candidates.push((identifier, None));

    for (id, version) in candidates {
        let Some(doc) = ctx.gateway.lookup(id, ctx.filter)? else {
            continue;
        };
        if let (Some(field), Some(v)) = (version_field, version) {
            if !doc.distinct_strings(field).iter().any(|known| known == v) {
                continue;
            }
        }
        if !format.supports(&doc) {
            return Err(ConnectorError::NotRenderable {
                identifier: identifier.to_string(),
                format: format.metadata_format().to_string(),
            });
        }
        let header = build_header(&doc, version, ctx)?;
        let metadata = format.render(&doc, version, ctx)?;
        return Ok(Some(Record {
            header,
            body: RecordBody::Metadata(metadata),
        }));
    }
    Ok(None)
}
