//! The protocol engine: validates a request, runs it against the index and
//! the token store, and hands documents to the requested format.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::Result;
use crate::format::{
    split_identifier_and_version, AnchorTitleCache, Format, FormatContext, FormatRegistry,
    ListRequest, MetadataFormat, MAX_VERSION_SUFFIX_LEN,
};
use crate::http::{ContentSource, HttpContentSource};
use crate::index::{Document, SearchBackend, SearchGateway, SolrClient};
use crate::query::datestamp::{format_datestamp, FAR_FUTURE_MS};
use crate::query::{AccessFilter, FilterSuffix, HarvestParams, QueryTranslator};
use crate::token::{CursorState, CursorStore, FileCursorStore, ResumptionTokenStore};

use super::error_code::{ErrorCode, OaiError};
use super::request::HarvestRequest;
use super::response::{
    render_response, IdentifyInfo, Payload, RecordList, ResumptionInfo, SetEntry,
};
use super::verb::Verb;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Where a list page starts, and the session it belongs to.
struct ListSession {
    params: HarvestParams,
    filter: FilterSuffix,
    first_raw: usize,
    first_virtual: usize,
    /// Totals fixed when the session started; `None` for a new session.
    totals: Option<(usize, usize)>,
    /// Token being continued.
    resumed: Option<String>,
}

/// Answers protocol requests.
///
/// All index, content and storage calls are blocking. Run the engine on a
/// blocking thread when called from async code.
pub struct Engine {
    config: Config,
    registry: FormatRegistry,
    gateway: SearchGateway,
    translator: QueryTranslator,
    access: AccessFilter,
    tokens: ResumptionTokenStore,
    anchors: AnchorTitleCache,
    content: Arc<dyn ContentSource>,
    clock: Clock,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("gateway", &self.gateway)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl Engine {
    #[must_use]
    pub fn new(
        config: Config,
        backend: Arc<dyn SearchBackend>,
        cursors: Arc<dyn CursorStore>,
        content: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            registry: FormatRegistry::with_defaults(),
            gateway: SearchGateway::new(backend, config.index.max_rows),
            translator: QueryTranslator::new(&config),
            access: AccessFilter::new(config.access.clone()),
            tokens: ResumptionTokenStore::new(cursors, config.tokens.expiration_secs),
            anchors: AnchorTitleCache::default(),
            content,
            clock: Arc::new(Utc::now),
            config,
        }
    }

    /// Engine wired to the Solr index, the token folder and HTTP content
    /// retrieval named in `config`.
    ///
    /// Builds blocking HTTP clients; call this outside of an async runtime.
    pub fn from_config(config: Config) -> Result<Self> {
        let backend = Arc::new(SolrClient::new(&config.index)?);
        let cursors = Arc::new(FileCursorStore::new(&config.tokens.folder)?);
        let content = Arc::new(HttpContentSource::new(config.index.max_retries)?);
        Ok(Self::new(config, backend, cursors, content))
    }

    #[must_use]
    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the wall clock, e.g. to test expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &ResumptionTokenStore {
        &self.tokens
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Parse, handle and render one request.
    pub fn respond<I, K, V>(&self, args: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.respond_scoped(args, None)
    }

    /// Like [`Engine::respond`], with an extra access restriction for this
    /// request. The scope is query text appended to every index query, so it
    /// must come from a trusted caller and never from harvest arguments.
    pub fn respond_scoped<I, K, V>(&self, args: I, scope: Option<&str>) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let (request, outcome) = match HarvestRequest::parse(args) {
            Ok(request) => {
                let outcome = self.handle_scoped(&request, scope);
                (Some(request), outcome)
            }
            Err(e) => {
                tracing::debug!(code = %e.code, "request rejected");
                (None, Err(e))
            }
        };
        render_response(
            request.as_ref(),
            &outcome,
            &self.config.identify.base_url,
            self.now(),
        )
    }

    /// Handle a parsed request.
    pub fn handle(&self, request: &HarvestRequest) -> std::result::Result<Payload, OaiError> {
        self.handle_scoped(request, None)
    }

    /// Handle a parsed request with an extra access restriction. A resumed
    /// list keeps the restrictions it started with.
    #[tracing::instrument(skip(self, request), fields(verb = %request.verb))]
    pub fn handle_scoped(
        &self,
        request: &HarvestRequest,
        scope: Option<&str>,
    ) -> std::result::Result<Payload, OaiError> {
        let filter = self.access.suffix(scope);
        let outcome = match request.verb {
            Verb::Identify => self.identify(&filter),
            Verb::ListMetadataFormats => {
                self.list_metadata_formats(request.identifier.as_deref(), &filter)
            }
            Verb::ListSets if request.resumption_token.is_some() => {
                Err(OaiError::new(
                    ErrorCode::BadResumptionToken,
                    "Set lists are not paged",
                ))
            }
            Verb::ListSets => self.list_sets(&filter),
            Verb::ListIdentifiers | Verb::ListRecords => self.list(request, filter),
            Verb::GetRecord => self.get_record(
                request.identifier.as_deref().unwrap_or_default(),
                request.metadata_prefix.as_deref().unwrap_or_default(),
                &filter,
            ),
        };
        if let Err(e) = &outcome {
            if e.code.is_client_error() {
                tracing::debug!(code = %e.code, message = %e.message, "request failed");
            } else {
                tracing::error!(code = %e.code, message = %e.message, "request failed");
            }
        }
        outcome
    }

    fn context<'a>(&'a self, filter: &'a FilterSuffix, until_ms: i64) -> FormatContext<'a> {
        FormatContext {
            gateway: &self.gateway,
            translator: &self.translator,
            config: &self.config,
            anchors: &self.anchors,
            content: self.content.as_ref(),
            filter,
            until_ms,
        }
    }

    /// Formats that are both enabled and renderable, in catalogue order.
    fn available_formats(&self) -> Vec<MetadataFormat> {
        self.registry
            .registered()
            .into_iter()
            .filter(|f| self.config.is_format_enabled(f.prefix()))
            .collect()
    }

    /// Resolve a `metadataPrefix` to an enabled renderer.
    fn format_for(&self, prefix: &str) -> std::result::Result<&dyn Format, OaiError> {
        let cannot = |reason: &str| {
            OaiError::new(
                ErrorCode::CannotDisseminateFormat,
                format!("Metadata format {prefix} {reason}"),
            )
        };
        let format = MetadataFormat::from_prefix(prefix).ok_or_else(|| cannot("is unknown"))?;
        if !self.config.is_format_enabled(prefix) {
            return Err(cannot("is disabled"));
        }
        self.registry
            .get(format)
            .ok_or_else(|| cannot("cannot be disseminated by this repository"))
    }

    fn identify(&self, filter: &FilterSuffix) -> std::result::Result<Payload, OaiError> {
        let earliest = self.gateway.earliest_datestamp(filter)?.unwrap_or(0);
        let identify = &self.config.identify;
        Ok(Payload::Identify(IdentifyInfo {
            repository_name: identify.repository_name.clone(),
            base_url: identify.base_url.clone(),
            admin_email: identify.admin_email.clone(),
            earliest_datestamp: format_datestamp(earliest),
            repository_identifier: identify.repository_identifier.clone(),
        }))
    }

    /// Look a document up by identifier, then by identifier without a
    /// version suffix.
    fn find_document(
        &self,
        identifier: &str,
        filter: &FilterSuffix,
    ) -> Result<Option<Document>> {
        if let Some(doc) = self.gateway.lookup(identifier, filter)? {
            return Ok(Some(doc));
        }
        match split_identifier_and_version(identifier, MAX_VERSION_SUFFIX_LEN) {
            (base, Some(_)) => self.gateway.lookup(base, filter),
            (_, None) => Ok(None),
        }
    }

    fn list_metadata_formats(
        &self,
        identifier: Option<&str>,
        filter: &FilterSuffix,
    ) -> std::result::Result<Payload, OaiError> {
        let mut formats = self.available_formats();
        if let Some(identifier) = identifier {
            let doc = self
                .find_document(identifier, filter)?
                .ok_or_else(|| OaiError::of(ErrorCode::IdDoesNotExist))?;
            formats.retain(|f| self.registry.get(*f).is_some_and(|format| format.supports(&doc)));
        }
        if formats.is_empty() {
            return Err(OaiError::of(ErrorCode::NoMetadataFormats));
        }
        Ok(Payload::ListMetadataFormats(formats))
    }

    fn list_sets(&self, filter: &FilterSuffix) -> std::result::Result<Payload, OaiError> {
        let mut sets: Vec<SetEntry> = self
            .config
            .sets
            .additional
            .iter()
            .map(|s| SetEntry {
                spec: s.spec.clone(),
                name: s.name.clone(),
            })
            .collect();
        for field in &self.config.sets.all_values_fields {
            for (value, _) in self.gateway.facet_values(field, filter)? {
                sets.push(SetEntry {
                    spec: value.clone(),
                    name: value,
                });
            }
        }
        if sets.is_empty() {
            return Err(OaiError::of(ErrorCode::NoSetHierarchy));
        }
        Ok(Payload::ListSets(sets))
    }

    fn get_record(
        &self,
        identifier: &str,
        prefix: &str,
        filter: &FilterSuffix,
    ) -> std::result::Result<Payload, OaiError> {
        let format = self.format_for(prefix)?;
        let ctx = self.context(filter, FAR_FUTURE_MS);
        let version_field = self.config.version_discriminator_field(prefix);
        let record = format
            .get_record(identifier, version_field, &ctx)?
            .ok_or_else(|| OaiError::of(ErrorCode::IdDoesNotExist))?;
        Ok(Payload::GetRecord(record))
    }

    /// Start or continue a list session.
    fn open_session(
        &self,
        request: &HarvestRequest,
        filter: FilterSuffix,
    ) -> std::result::Result<ListSession, OaiError> {
        let Some(token) = request.resumption_token.as_deref() else {
            return Ok(ListSession {
                params: request.harvest_params(),
                filter,
                first_raw: 0,
                first_virtual: 0,
                totals: None,
                resumed: None,
            });
        };
        let cursor = self
            .tokens
            .resolve(token, self.now())?
            .filter(|c| c.state.verb == request.verb)
            .ok_or_else(|| OaiError::of(ErrorCode::BadResumptionToken))?;
        let state = cursor.state;
        Ok(ListSession {
            params: state.params,
            filter: state.filter,
            first_raw: state.raw_offset,
            first_virtual: state.virtual_offset,
            totals: Some((state.total_raw, state.total_virtual)),
            resumed: Some(cursor.token),
        })
    }

    fn list(
        &self,
        request: &HarvestRequest,
        filter: FilterSuffix,
    ) -> std::result::Result<Payload, OaiError> {
        let session = self.open_session(request, filter)?;
        let prefix = session.params.metadata_prefix.as_str();
        let format = self.format_for(prefix)?;
        let version_field = self.config.version_discriminator_field(prefix);
        let ctx = self.context(&session.filter, session.params.until_ms());

        let (total_raw, total_virtual) = match session.totals {
            Some(totals) => totals,
            None => {
                let totals = format.total_hits(&session.params, version_field, &ctx)?;
                if totals.total_raw == 0 {
                    return Err(OaiError::of(ErrorCode::NoRecordsMatch));
                }
                (totals.total_raw, totals.total_virtual)
            }
        };

        let page_size = self.config.hits_per_token(prefix);
        let page = format.list_records(
            &ListRequest {
                params: &session.params,
                first_raw: session.first_raw,
                first_virtual: session.first_virtual,
                page_size,
                version_field,
                header_only: request.verb == Verb::ListIdentifiers,
            },
            &ctx,
        )?;
        if page.records.is_empty() && session.resumed.is_none() {
            return Err(OaiError::of(ErrorCode::NoRecordsMatch));
        }

        let next_raw = session.first_raw + page.emitted_raw;
        let next_virtual = session.first_virtual + page.emitted_virtual;
        tracing::debug!(
            first_raw = session.first_raw,
            next_raw,
            total_raw,
            total_virtual,
            "list page assembled"
        );

        let resumption = if total_raw > next_raw && page.emitted_raw > 0 {
            let cursor = self.tokens.mint(
                CursorState {
                    verb: request.verb,
                    params: session.params.clone(),
                    filter: session.filter.clone(),
                    raw_offset: next_raw,
                    virtual_offset: next_virtual,
                    total_raw,
                    total_virtual,
                },
                self.now(),
            )?;
            Some(ResumptionInfo {
                token: Some(cursor.token),
                expiration_date: Some(cursor.expires_at),
                complete_list_size: total_virtual,
                cursor: session.first_virtual,
            })
        } else {
            session.resumed.as_ref().map(|_| ResumptionInfo {
                token: None,
                expiration_date: None,
                complete_list_size: total_virtual,
                cursor: session.first_virtual,
            })
        };

        if let Some(token) = &session.resumed {
            if let Err(e) = self.tokens.retire(token) {
                tracing::warn!(token = %token, error = %e, "could not retire resumption token");
            }
        }

        let list = RecordList {
            records: page.records,
            resumption,
        };
        Ok(match request.verb {
            Verb::ListIdentifiers => Payload::ListIdentifiers(list),
            _ => Payload::ListRecords(list),
        })
    }
}
