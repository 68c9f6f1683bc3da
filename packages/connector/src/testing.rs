//! Test doubles for the index and content collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::error::{ConnectorError, Result};
use crate::format::{AnchorTitleCache, FormatContext};
use crate::http::ContentSource;
use crate::index::{SearchBackend, SearchGateway, SearchRequest, SearchResponse};
use crate::query::{AccessFilter, FilterSuffix, QueryTranslator};

type Handler = Box<dyn Fn(&SearchRequest) -> SearchResponse + Send + Sync>;

/// Answers every query through a closure and records the query text.
pub struct FnBackend {
    handler: Handler,
    queries: Mutex<Vec<String>>,
}

impl FnBackend {
    pub fn new(handler: impl Fn(&SearchRequest) -> SearchResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl SearchBackend for FnBackend {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.queries
            .lock()
            .unwrap()
            .push(request.query().as_str().to_string());
        Ok((self.handler)(request))
    }
}

/// Serves fixed bodies by URL.
#[derive(Default)]
pub struct MapContent(pub HashMap<String, String>);

impl ContentSource for MapContent {
    fn fetch(&self, url: &str) -> Result<String> {
        self.0
            .get(url)
            .cloned()
            .ok_or_else(|| ConnectorError::ContentFetch {
                url: url.to_string(),
                message: "404 Not Found".to_string(),
            })
    }
}

/// Owns everything a [`FormatContext`] borrows.
pub struct Harness {
    pub config: Config,
    pub gateway: SearchGateway,
    pub translator: QueryTranslator,
    pub anchors: AnchorTitleCache,
    pub content: MapContent,
    pub filter: FilterSuffix,
}

impl Harness {
    pub fn new(backend: Arc<dyn SearchBackend>, content: MapContent) -> Self {
        let config = Config::default();
        Self {
            gateway: SearchGateway::new(backend, config.index.max_rows),
            translator: QueryTranslator::new(&config),
            anchors: AnchorTitleCache::new(16),
            filter: AccessFilter::default().suffix(None),
            content,
            config,
        }
    }

    pub fn ctx(&self) -> FormatContext<'_> {
        FormatContext {
            gateway: &self.gateway,
            translator: &self.translator,
            config: &self.config,
            anchors: &self.anchors,
            content: &self.content,
            filter: &self.filter,
            until_ms: i64::MAX,
        }
    }
}
