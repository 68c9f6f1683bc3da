//! Solr implementation of [`SearchBackend`] over the JSON select API.

use std::collections::BTreeMap;

use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use crate::config::{IndexConfig, MAX_CLIENT_RETRIES};
use crate::error::{ConnectorError, Result};
use crate::http::{create_client, download_bytes, FetchError};

use super::backend::{SearchBackend, SearchRequest, SearchResponse};
use super::Document;

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: SelectResult,
    #[serde(default)]
    facet_counts: Option<FacetCounts>,
}

#[derive(Debug, Deserialize)]
struct SelectResult {
    #[serde(rename = "numFound")]
    num_found: usize,
    #[serde(default)]
    docs: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct FacetCounts {
    #[serde(default)]
    facet_fields: BTreeMap<String, Vec<serde_json::Value>>,
}

/// Blocking Solr client.
#[derive(Debug, Clone)]
pub struct SolrClient {
    client: Client,
    select_url: Url,
    max_retries: u32,
}

impl SolrClient {
    /// Create a client for the core at `config.url`.
    ///
    /// Must be called outside of any async runtime.
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let base = config.url.trim_end_matches('/');
        let raw = format!("{base}/select");
        let select_url = Url::parse(&raw).map_err(|source| ConnectorError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;
        Ok(Self {
            client: create_client(config.timeout_secs)?,
            select_url,
            max_retries: config.max_retries.min(MAX_CLIENT_RETRIES),
        })
    }

    /// Full request URL for a search request.
    #[must_use]
    pub fn request_url(&self, request: &SearchRequest) -> Url {
        let mut url = self.select_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", request.query().as_str())
                .append_pair("start", &request.start.to_string())
                .append_pair("rows", &request.rows.to_string())
                .append_pair("wt", "json");
            if !request.sort.is_empty() {
                let sort: Vec<String> = request
                    .sort
                    .iter()
                    .map(|(field, order)| format!("{field} {}", order.as_str()))
                    .collect();
                pairs.append_pair("sort", &sort.join(","));
            }
            if !request.fields.is_empty() {
                pairs.append_pair("fl", &request.fields.join(","));
            }
            if !request.facet_fields.is_empty() {
                pairs
                    .append_pair("facet", "true")
                    .append_pair("facet.mincount", "1")
                    .append_pair("facet.limit", "-1");
                for field in &request.facet_fields {
                    pairs.append_pair("facet.field", field);
                }
            }
        }
        url
    }
}

impl SearchBackend for SolrClient {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let url = self.request_url(request);
        tracing::debug!(query = %request.query(), start = request.start, rows = request.rows, "Solr query");

        let bytes = download_bytes(&self.client, url.as_str(), self.max_retries).map_err(|e| {
            tracing::error!(error = %e, "Search index request failed");
            match e {
                FetchError::Status { status, body } => ConnectorError::IndexRejected {
                    status,
                    message: body,
                },
                FetchError::Transport(message) => ConnectorError::IndexUnreachable { message },
            }
        })?;

        let parsed: SelectResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ConnectorError::IndexResponse(e.to_string()))?;

        let facets = parsed
            .facet_counts
            .map(|fc| {
                fc.facet_fields
                    .into_iter()
                    .map(|(field, flat)| (field, facet_pairs(&flat)))
                    .collect()
            })
            .unwrap_or_default();

        tracing::debug!(
            num_found = parsed.response.num_found,
            returned = parsed.response.docs.len(),
            "Solr response"
        );

        Ok(SearchResponse {
            docs: parsed.response.docs,
            num_found: parsed.response.num_found,
            facets,
        })
    }
}

/// Decode Solr's flat `[value, count, value, count, ...]` facet layout.
fn facet_pairs(flat: &[serde_json::Value]) -> Vec<(String, u64)> {
    flat.chunks_exact(2)
        .filter_map(|pair| {
            let value = match &pair[0] {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => return None,
                other => other.to_string(),
            };
            let count = pair[1].as_u64()?;
            Some((value, count))
        })
        .collect()
}
