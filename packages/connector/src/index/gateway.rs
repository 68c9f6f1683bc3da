//! Search gateway: paging, sorting and access restrictions on top of a
//! [`SearchBackend`].

use std::sync::Arc;

use crate::error::Result;
use crate::query::{escape_query_chars, FilterSuffix, FilteredQuery};

use super::backend::{SearchBackend, SearchRequest, SearchResponse, SortOrder};
use super::{fields, Document};

/// One page of a list query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    /// Documents in ascending creation order.
    pub docs: Vec<Document>,
    /// Total matching documents.
    pub total_hits: usize,
    /// Whether documents beyond this page exist.
    pub has_more: bool,
    pub response: SearchResponse,
}

/// Executes access-filtered queries against the index.
#[derive(Clone)]
pub struct SearchGateway {
    backend: Arc<dyn SearchBackend>,
    max_rows: usize,
}

impl std::fmt::Debug for SearchGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchGateway")
            .field("max_rows", &self.max_rows)
            .finish_non_exhaustive()
    }
}

impl SearchGateway {
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>, max_rows: usize) -> Self {
        Self { backend, max_rows }
    }

    #[must_use]
    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Fetch one page of a list query, sorted by creation time ascending.
    /// Ties are broken by the unique document id so that consecutive pages
    /// neither skip nor repeat documents.
    ///
    /// `rows` is capped at the configured maximum.
    pub fn list(
        &self,
        query: &FilteredQuery,
        start: usize,
        rows: usize,
        facet_fields: &[String],
    ) -> Result<RecordPage> {
        let rows = rows.min(self.max_rows);
        let request = SearchRequest::new(query.clone(), start, rows)
            .sorted_by(fields::DATECREATED, SortOrder::Asc)
            .sorted_by(fields::IDDOC, SortOrder::Asc)
            .with_facets(facet_fields);
        let mut response = self.backend.search(&request)?;
        let docs = std::mem::take(&mut response.docs);
        let total_hits = response.num_found;
        Ok(RecordPage {
            has_more: start + docs.len() < total_hits,
            docs,
            total_hits,
            response,
        })
    }

    /// Count matches of a list query without fetching documents.
    pub fn count(&self, query: &FilteredQuery, facet_fields: &[String]) -> Result<SearchResponse> {
        let request = SearchRequest::new(query.clone(), 0, 0).with_facets(facet_fields);
        self.backend.search(&request)
    }

    /// Find a document by persistent identifier, URN or page URN.
    ///
    /// All three identifier kinds are tried in one query and the first hit
    /// wins; matches across kinds are not treated as ambiguous.
    pub fn lookup(&self, identifier: &str, filter: &FilterSuffix) -> Result<Option<Document>> {
        let id = escape_query_chars(identifier);
        let base = format!(
            "({}:{id} OR {}:{id} OR {}:{id})",
            fields::PI,
            fields::URN,
            fields::IMAGEURN
        );
        self.first_doc(&base, filter, &[])
    }

    /// First document matching `base` (access-filtered), if any.
    pub fn first_doc(
        &self,
        base: &str,
        filter: &FilterSuffix,
        fl: &[&str],
    ) -> Result<Option<Document>> {
        let request = SearchRequest::new(FilteredQuery::new(base, filter), 0, 1).with_fields(fl);
        let response = self.backend.search(&request)?;
        Ok(response.docs.into_iter().next())
    }

    /// Documents matching `base` (access-filtered), up to the row cap.
    pub fn search_all(
        &self,
        base: &str,
        filter: &FilterSuffix,
        fl: &[&str],
    ) -> Result<Vec<Document>> {
        let request =
            SearchRequest::new(FilteredQuery::new(base, filter), 0, self.max_rows).with_fields(fl);
        Ok(self.backend.search(&request)?.docs)
    }

    /// Non-empty values of `field` with their counts, sorted by value.
    pub fn facet_values(&self, field: &str, filter: &FilterSuffix) -> Result<Vec<(String, u64)>> {
        let base = format!("{field}:*");
        let request = SearchRequest::new(FilteredQuery::new(&base, filter), 0, 0)
            .with_facets(&[field.to_string()]);
        let mut response = self.backend.search(&request)?;
        let mut values: Vec<(String, u64)> = response
            .facets
            .remove(field)
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .collect();
        values.sort();
        Ok(values)
    }

    /// Creation timestamp of the oldest visible work.
    pub fn earliest_datestamp(&self, filter: &FilterSuffix) -> Result<Option<i64>> {
        let base = format!("{}:true", fields::ISWORK);
        let request = SearchRequest::new(FilteredQuery::new(&base, filter), 0, 1)
            .sorted_by(fields::DATECREATED, SortOrder::Asc)
            .with_fields(&[fields::DATECREATED]);
        let response = self.backend.search(&request)?;
        Ok(response
            .docs
            .first()
            .and_then(|doc| doc.get_i64(fields::DATECREATED)))
    }

    /// For an anchor, the latest update among its volumes up to `until_ms`.
    pub fn latest_volume_timestamp(
        &self,
        anchor: &Document,
        until_ms: i64,
        filter: &FilterSuffix,
    ) -> Result<Option<i64>> {
        if !anchor.is_true(fields::ISANCHOR) {
            return Ok(None);
        }
        let Some(iddoc) = anchor.get_strings(fields::IDDOC).into_iter().next() else {
            return Ok(None);
        };
        let base = format!(
            "{}:true AND {}:{}",
            fields::ISWORK,
            fields::IDDOC_PARENT,
            escape_query_chars(&iddoc)
        );
        let volumes = self.search_all(&base, filter, &[fields::DATEUPDATED])?;
        Ok(volumes
            .iter()
            .map(|v| latest_valid_date_updated(v, until_ms))
            .filter(|ts| *ts > 0)
            .max())
    }
}

/// Latest `DATEUPDATED` value not after `until_ms`; 0 if there is none.
#[must_use]
pub fn latest_valid_date_updated(doc: &Document, until_ms: i64) -> i64 {
    doc.get_i64s(fields::DATEUPDATED)
        .into_iter()
        .filter(|ts| *ts <= until_ms)
        .max()
        .unwrap_or(0)
        .max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::AccessFilter;
    use crate::config::AccessConfig;
    use std::sync::Mutex;

    /// Records every request and answers with a fixed response.
    #[derive(Default)]
    struct RecordingBackend {
        requests: Mutex<Vec<SearchRequest>>,
        response: SearchResponse,
    }

    impl SearchBackend for RecordingBackend {
        fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(self.response.clone())
        }
    }

    fn restricted() -> FilterSuffix {
        AccessFilter::new(AccessConfig {
            query_suffix: "-HIDDEN:true".to_string(),
            ..AccessConfig::default()
        })
        .suffix(None)
    }

    #[test]
    fn test_lookup_tries_three_identifier_kinds_with_filter() {
        let backend = Arc::new(RecordingBackend::default());
        let gateway = SearchGateway::new(backend.clone(), 100);

        let found = gateway.lookup("urn:nbn:1", &restricted()).unwrap();
        assert!(found.is_none());

        let requests = backend.requests.lock().unwrap();
        assert_eq!(
            requests[0].query().as_str(),
            r"(PI:urn\:nbn\:1 OR URN:urn\:nbn\:1 OR IMAGEURN:urn\:nbn\:1) -HIDDEN:true"
        );
        assert_eq!(requests[0].rows, 1);
    }

    #[test]
    fn test_list_caps_rows_and_sorts() {
        let backend = Arc::new(RecordingBackend {
            response: SearchResponse {
                docs: vec![Document::new(), Document::new()],
                num_found: 12,
                ..SearchResponse::default()
            },
            ..RecordingBackend::default()
        });
        let gateway = SearchGateway::new(backend.clone(), 5);
        let query = FilteredQuery::new("ISWORK:true", &restricted());

        let page = gateway.list(&query, 10, 50, &[]).unwrap();
        assert_eq!(page.total_hits, 12);
        assert!(!page.has_more);

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests[0].rows, 5);
        assert_eq!(
            requests[0].sort,
            vec![
                ("DATECREATED".to_string(), SortOrder::Asc),
                ("IDDOC".to_string(), SortOrder::Asc),
            ]
        );
    }

    #[test]
    fn test_facet_values_drop_zero_counts_and_sort() {
        let mut response = SearchResponse::default();
        response.facets.insert(
            "DC".to_string(),
            vec![
                ("zeta".to_string(), 2),
                ("alpha".to_string(), 1),
                ("empty".to_string(), 0),
            ],
        );
        let backend = Arc::new(RecordingBackend {
            response,
            ..RecordingBackend::default()
        });
        let gateway = SearchGateway::new(backend.clone(), 5);

        let values = gateway.facet_values("DC", &restricted()).unwrap();
        assert_eq!(
            values,
            vec![("alpha".to_string(), 1), ("zeta".to_string(), 2)]
        );
        assert_eq!(
            backend.requests.lock().unwrap()[0].query().as_str(),
            "DC:* -HIDDEN:true"
        );
    }

    #[test]
    fn test_latest_valid_date_updated() {
        let doc = Document::new()
            .with("DATEUPDATED", 100_i64)
            .with("DATEUPDATED", 300_i64)
            .with("DATEUPDATED", 200_i64);
        assert_eq!(latest_valid_date_updated(&doc, 250), 200);
        assert_eq!(latest_valid_date_updated(&doc, 50), 0);
        assert_eq!(latest_valid_date_updated(&Document::new(), 50), 0);
    }

    #[test]
    fn test_latest_volume_timestamp_ignores_non_anchors() {
        let backend = Arc::new(RecordingBackend::default());
        let gateway = SearchGateway::new(backend.clone(), 5);
        let doc = Document::new().with("IDDOC", "1");
        assert_eq!(
            gateway
                .latest_volume_timestamp(&doc, i64::MAX, &restricted())
                .unwrap(),
            None
        );
        assert!(backend.requests.lock().unwrap().is_empty());
    }
}
