//! Shared fakes for the engine integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use oai_connector::config::{Config, FormatConfig};
use oai_connector::error::{ConnectorError, Result};
use oai_connector::http::ContentSource;
use oai_connector::index::{Document, SearchBackend, SearchRequest, SearchResponse};
use oai_connector::query::escape_query_chars;
use oai_connector::token::CursorStore;
use oai_connector::Engine;

/// 2020-01-01T00:00:00Z
pub const JAN_1_2020_MS: i64 = 1_577_836_800_000;

/// In-memory index holding a fixed document list in creation order.
///
/// Honors paging and identifier lookups; every other predicate matches all
/// documents.
#[derive(Default)]
pub struct FakeIndex {
    docs: Vec<Document>,
    queries: Mutex<Vec<String>>,
    unreachable: AtomicBool,
}

impl FakeIndex {
    pub fn new(docs: Vec<Document>) -> Arc<Self> {
        Arc::new(Self {
            docs,
            ..Self::default()
        })
    }

    /// Index of `count` works named `PPN000`, `PPN001`, ...
    pub fn works(count: usize) -> Arc<Self> {
        Self::new((0..count).map(work).collect())
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn facet_counts(&self, field: &str) -> Vec<(String, u64)> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for doc in &self.docs {
            for value in doc.distinct_strings(field) {
                *counts.entry(value).or_default() += 1;
            }
        }
        counts.into_iter().collect()
    }
}

impl SearchBackend for FakeIndex {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let query = request.query().as_str().to_string();
        self.queries.lock().unwrap().push(query.clone());
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ConnectorError::IndexUnreachable {
                message: "connection refused".to_string(),
            });
        }

        if let Some(rest) = query.strip_prefix("(PI:") {
            let wanted = rest.split(' ').next().unwrap_or_default();
            let docs: Vec<Document> = self
                .docs
                .iter()
                .filter(|d| {
                    d.get_str("PI")
                        .is_some_and(|pi| escape_query_chars(pi) == wanted)
                })
                .take(1)
                .cloned()
                .collect();
            return Ok(SearchResponse {
                num_found: docs.len(),
                docs,
                ..SearchResponse::default()
            });
        }

        let facets: BTreeMap<String, Vec<(String, u64)>> = request
            .facet_fields
            .iter()
            .map(|field| (field.clone(), self.facet_counts(field)))
            .collect();
        let docs = self
            .docs
            .iter()
            .skip(request.start)
            .take(request.rows)
            .cloned()
            .collect();
        Ok(SearchResponse {
            docs,
            num_found: self.docs.len(),
            facets,
        })
    }
}

/// A work document created and updated on consecutive days from 2020-01-01.
pub fn work(n: usize) -> Document {
    let day = i64::try_from(n).unwrap() * 86_400_000;
    Document::new()
        .with("PI", format!("PPN{n:03}").as_str())
        .with("ISWORK", true)
        .with("DC", "collection")
        .with("DATECREATED", JAN_1_2020_MS + day)
        .with("DATEUPDATED", JAN_1_2020_MS + day)
        .with("MD_TITLE", format!("Title {n}").as_str())
}

/// Serves fixed bodies by URL.
#[derive(Default)]
pub struct StaticContent(pub HashMap<String, String>);

impl ContentSource for StaticContent {
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

/// Clock that tests can move forward.
#[derive(Clone)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self(Arc::new(AtomicI64::new(time.timestamp_millis())))
    }

    pub fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0.load(Ordering::SeqCst)).unwrap()
    }

    pub fn advance_secs(&self, secs: i64) {
        self.0.fetch_add(secs * 1000, Ordering::SeqCst);
    }
}

/// Configuration with `prefixes` enabled at `hits_per_token` records per page.
pub fn config(prefixes: &[&str], hits_per_token: usize) -> Config {
    let mut config = Config::default();
    config.identify.repository_name = "Test Repository".to_string();
    config.identify.base_url = "http://localhost/oai".to_string();
    config.hits_per_token = hits_per_token;
    for prefix in prefixes {
        config.formats.insert(
            (*prefix).to_string(),
            FormatConfig {
                enabled: true,
                ..FormatConfig::default()
            },
        );
    }
    config
}

pub fn engine(
    config: Config,
    index: Arc<FakeIndex>,
    cursors: Arc<dyn CursorStore>,
    content: StaticContent,
) -> Engine {
    Engine::new(config, index, cursors, Arc::new(content))
}

/// Send a request given as `(name, value)` pairs.
pub fn request(engine: &Engine, args: &[(&str, &str)]) -> String {
    engine.respond(args.iter().copied())
}

/// Parsed view of a response document.
#[derive(Debug, Default)]
pub struct Reply {
    pub error_code: Option<String>,
    pub identifiers: Vec<String>,
    pub records: usize,
    pub token: Option<String>,
    /// `(completeListSize, cursor)` when a resumptionToken element is present.
    pub resumption: Option<(usize, usize)>,
    pub request_attributes: Vec<(String, String)>,
}

pub fn parse_reply(xml: &str) -> Reply {
    let doc = roxmltree::Document::parse(xml).unwrap();
    let mut reply = Reply::default();
    for node in doc.descendants().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "error" if node.parent_element().is_some_and(|p| p.tag_name().name() == "OAI-PMH") => {
                reply.error_code = node.attribute("code").map(str::to_string);
            }
            "identifier" if node.parent_element().is_some_and(|p| p.tag_name().name() == "header") => {
                reply.identifiers.push(node.text().unwrap_or_default().to_string());
            }
            "record" => reply.records += 1,
            "resumptionToken" => {
                reply.token = node.text().map(str::to_string);
                let size = node.attribute("completeListSize").unwrap().parse().unwrap();
                let cursor = node.attribute("cursor").unwrap().parse().unwrap();
                reply.resumption = Some((size, cursor));
            }
            "request" => {
                reply.request_attributes = node
                    .attributes()
                    .map(|a| (a.name().to_string(), a.value().to_string()))
                    .collect();
            }
            _ => {}
        }
    }
    reply
}
