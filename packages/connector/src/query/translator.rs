//! Translation of harvesting parameters into index queries.

use serde::{Deserialize, Serialize};

use super::access::{FilterSuffix, FilteredQuery};
use super::datestamp::{
    from_timestamp, normalize_timestamp, until_timestamp, SINGLE_INSTANT_EPSILON_MS,
};
use super::escape_query_chars;
use crate::config::{Config, SetDefinition};
use crate::format::MetadataFormat;
use crate::index::fields;

/// The selective-harvesting arguments that define a list query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestParams {
    pub from: Option<String>,
    pub until: Option<String>,
    pub set: Option<String>,
    pub metadata_prefix: String,
}

impl HarvestParams {
    /// Upper bound of the harvest window in epoch milliseconds.
    #[must_use]
    pub fn until_ms(&self) -> i64 {
        until_timestamp(self.until.as_deref())
    }
}

/// How a requested set name turned into a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetPredicate {
    /// Statically configured set query.
    Configured(String),
    /// Fallback: collection field equals the set name.
    Collection(String),
}

impl SetPredicate {
    fn clause(&self) -> String {
        match self {
            Self::Configured(query) if query.starts_with('-') || query.starts_with("NOT(") => {
                format!(" AND {query}")
            }
            Self::Configured(query) => format!(" AND ({query})"),
            Self::Collection(value) => {
                format!(" AND {}:{}", fields::DC, escape_query_chars(value))
            }
        }
    }
}

/// Builds list queries from [`HarvestParams`].
#[derive(Debug, Clone, Default)]
pub struct QueryTranslator {
    additional_sets: Vec<SetDefinition>,
    additional_docstruct_types: Vec<String>,
}

impl QueryTranslator {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            additional_sets: config.sets.additional.clone(),
            additional_docstruct_types: config.additional_docstruct_types.clone(),
        }
    }

    /// Resolve a set name: configured sets first, then the collection field.
    #[must_use]
    pub fn resolve_set(&self, set: &str) -> SetPredicate {
        self.additional_sets
            .iter()
            .find(|s| s.spec == set)
            .map_or_else(
                || SetPredicate::Collection(set.to_string()),
                |s| SetPredicate::Configured(s.query.clone()),
            )
    }

    /// Build the full list query, access filter included.
    ///
    /// With a `version_field`, only documents carrying that field match.
    #[must_use]
    pub fn build(
        &self,
        params: &HarvestParams,
        version_field: Option<&str>,
        filter: &FilterSuffix,
    ) -> FilteredQuery {
        let base = self.base_query(params, version_field);
        tracing::debug!(query = %base, "translated harvest query");
        FilteredQuery::new(&base, filter)
    }

    /// The list query without access restrictions.
    #[must_use]
    pub fn base_query(&self, params: &HarvestParams, version_field: Option<&str>) -> String {
        let format = MetadataFormat::from_prefix(&params.metadata_prefix);
        let excludes_anchors = format.is_some_and(MetadataFormat::excludes_anchors);
        let is_overview = format.is_some_and(MetadataFormat::is_overview);

        let mut query = format!("({}:true", fields::ISWORK);
        if !excludes_anchors {
            query.push_str(&format!(" OR {}:true", fields::ISANCHOR));
        }
        for docstrct in &self.additional_docstruct_types {
            query.push_str(&format!(" OR {}:{docstrct}", fields::DOCSTRCT));
        }
        query.push(')');

        if let Some(field) = version_field {
            query.push_str(&format!(" AND {field}:*"));
        }

        if !is_overview && (params.from.is_some() || params.until.is_some()) {
            let from = from_timestamp(params.from.as_deref());
            let mut until = until_timestamp(params.until.as_deref());
            if from == until {
                until += SINGLE_INSTANT_EPSILON_MS;
            }
            query.push_str(&format!(
                " AND {}:[{} TO {}]",
                fields::DATEUPDATED,
                normalize_timestamp(from),
                normalize_timestamp(until)
            ));
        }

        if let Some(set) = params.set.as_deref() {
            query.push_str(&self.resolve_set(set).clause());
        }

        if let Some(format) = format {
            if let Some(source) = format.source_doc_format() {
                query.push_str(&format!(" AND {}:{source}", fields::SOURCEDOCFORMAT));
            }
            if format.requires_urn() {
                query.push_str(&format!(
                    " AND ({}:* OR {}:*)",
                    fields::URN,
                    fields::IMAGEURN_OAI
                ));
            }
        }

        query
    }
}
