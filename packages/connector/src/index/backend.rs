//! The narrow interface to the search index.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::query::FilteredQuery;

use super::Document;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One query against the index.
///
/// The query text is a [`FilteredQuery`], so access restrictions are always
/// part of it.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    query: FilteredQuery,
    pub start: usize,
    pub rows: usize,
    /// Sort keys, most significant first.
    pub sort: Vec<(String, SortOrder)>,
    /// Fields to return; empty means all.
    pub fields: Vec<String>,
    /// Fields to compute value counts for.
    pub facet_fields: Vec<String>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: FilteredQuery, start: usize, rows: usize) -> Self {
        Self {
            query,
            start,
            rows,
            sort: Vec::new(),
            fields: Vec::new(),
            facet_fields: Vec::new(),
        }
    }

    /// Append a sort key. Earlier keys take precedence.
    #[must_use]
    pub fn sorted_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort.push((field.to_string(), order));
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn with_facets(mut self, fields: &[String]) -> Self {
        self.facet_fields = fields.to_vec();
        self
    }

    #[must_use]
    pub fn query(&self) -> &FilteredQuery {
        &self.query
    }
}

/// Result of one index query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub docs: Vec<Document>,
    /// Total number of matching documents, independent of paging.
    pub num_found: usize,
    /// Per requested facet field: `(value, count)` pairs.
    pub facets: BTreeMap<String, Vec<(String, u64)>>,
}

impl SearchResponse {
    /// Sum of all counts for a facet field.
    #[must_use]
    pub fn facet_total(&self, field: &str) -> u64 {
        self.facets
            .get(field)
            .map_or(0, |values| values.iter().map(|(_, count)| count).sum())
    }
}

/// A search index reachable by the connector.
///
/// Implementations perform blocking I/O and must bound it with timeouts.
/// A failed or timed out call is an error; an empty result is not.
pub trait SearchBackend: Send + Sync {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facet_total() {
        let mut response = SearchResponse::default();
        response.facets.insert(
            "LANGUAGE".to_string(),
            vec![("en".to_string(), 3), ("de".to_string(), 2)],
        );
        assert_eq!(response.facet_total("LANGUAGE"), 5);
        assert_eq!(response.facet_total("DC"), 0);
    }
}
