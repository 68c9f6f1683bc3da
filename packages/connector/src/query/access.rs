//! Visibility restrictions appended to every index query.
//!
//! [`FilteredQuery`] is the only query type the search backend accepts, and
//! it can only be built from a [`FilterSuffix`], which in turn only comes out
//! of [`AccessFilter::suffix`] (or a persisted cursor that got it from there).

use std::fmt;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{AccessConfig, LicenseType};

/// Placeholder in license conditions replaced by the current year.
const CURRENT_YEAR_PLACEHOLDER: &str = "NOW/YEAR";

/// Access restrictions in query syntax. May be empty, never skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSuffix(String);

impl FilterSuffix {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A complete query string with access restrictions applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredQuery(String);

impl FilteredQuery {
    /// Append `filter` to `base`.
    #[must_use]
    pub fn new(base: &str, filter: &FilterSuffix) -> Self {
        Self(format!("{base}{}", filter.0))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilteredQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the access restriction suffix from configuration.
#[derive(Debug, Clone, Default)]
pub struct AccessFilter {
    config: AccessConfig,
}

impl AccessFilter {
    #[must_use]
    pub fn new(config: AccessConfig) -> Self {
        Self { config }
    }

    /// Restriction suffix for the current year and an optional session scope.
    ///
    /// The HTTP and CLI front ends pass no scope. Embedders supply one through
    /// `Engine::respond_scoped`.
    #[must_use]
    pub fn suffix(&self, session: Option<&str>) -> FilterSuffix {
        self.suffix_for_year(session, Utc::now().year())
    }

    /// Restriction suffix with license conditions evaluated for `year`.
    ///
    /// Composition order: collection blacklist, restricted licenses, static
    /// query suffix, session suffix.
    #[must_use]
    pub fn suffix_for_year(&self, session: Option<&str>, year: i32) -> FilterSuffix {
        let mut sb = String::new();
        if self.config.use_collection_blacklist {
            sb.push_str(&self.blacklist_suffix());
        }
        if !self.config.restricted_licenses.is_empty() {
            let clauses: Vec<String> = self
                .config
                .restricted_licenses
                .iter()
                .map(|license| license_clause(license, year))
                .collect();
            sb.push_str(" -(");
            sb.push_str(&clauses.join(" OR "));
            sb.push(')');
        }
        push_spaced(&mut sb, &self.config.query_suffix);
        if let Some(session) = session {
            push_spaced(&mut sb, session);
        }
        FilterSuffix(sb)
    }

    /// Exclusions for blacklisted collections and their sub-collections.
    #[must_use]
    pub fn blacklist_suffix(&self) -> String {
        let field = &self.config.collection_field;
        self.config
            .collection_blacklist
            .iter()
            .filter(|entry| !entry.is_empty())
            .map(|entry| format!(" -{field}:{entry} -{field}:{entry}.*"))
            .collect()
    }
}

fn license_clause(license: &LicenseType, year: i32) -> String {
    let conditions = license.conditions.trim();
    if conditions.is_empty() {
        return format!("{}:{}", license.field, license.value);
    }
    let processed = conditions.replace(CURRENT_YEAR_PLACEHOLDER, &year.to_string());
    if processed.starts_with('-') {
        // A leading negation must stay unwrapped to keep its meaning.
        format!("({}:\"{}\" AND {processed})", license.field, license.value)
    } else {
        format!("({}:\"{}\" AND ({processed}))", license.field, license.value)
    }
}

fn push_spaced(sb: &mut String, fragment: &str) {
    if fragment.is_empty() {
        return;
    }
    if !fragment.starts_with(' ') {
        sb.push(' ');
    }
    sb.push_str(fragment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn license(value: &str, conditions: &str) -> LicenseType {
        LicenseType {
            field: "ACCESSCONDITION".to_string(),
            value: value.to_string(),
            conditions: conditions.to_string(),
        }
    }

    #[test]
    fn test_empty_configuration_gives_empty_suffix() {
        let filter = AccessFilter::default();
        assert_eq!(filter.suffix(None).as_str(), "");
        let query = FilteredQuery::new("ISWORK:true", &filter.suffix(None));
        assert_eq!(query.as_str(), "ISWORK:true");
    }

    #[test]
    fn test_restricted_licenses() {
        let filter = AccessFilter::new(AccessConfig {
            restricted_licenses: vec![
                license("restricted", ""),
                license("embargo", "MD_YEARPUBLISH:[NOW/YEAR TO *]"),
                license("closed", "-MD_OPEN:true"),
            ],
            ..AccessConfig::default()
        });
        assert_eq!(
            filter.suffix_for_year(None, 2026).as_str(),
            " -(ACCESSCONDITION:restricted OR (ACCESSCONDITION:\"embargo\" AND (MD_YEARPUBLISH:[2026 TO *])) OR (ACCESSCONDITION:\"closed\" AND -MD_OPEN:true))"
        );
    }

    #[test]
    fn test_blacklist_only_when_enabled() {
        let mut config = AccessConfig {
            collection_blacklist: vec!["intern".to_string(), "test".to_string()],
            ..AccessConfig::default()
        };
        assert_eq!(AccessFilter::new(config.clone()).suffix(None).as_str(), "");

        config.use_collection_blacklist = true;
        assert_eq!(
            AccessFilter::new(config).suffix(None).as_str(),
            " -DC:intern -DC:intern.* -DC:test -DC:test.*"
        );
    }

    #[test]
    fn test_query_and_session_suffix_spacing() {
        let filter = AccessFilter::new(AccessConfig {
            query_suffix: "-BOOL_HIDE:true".to_string(),
            ..AccessConfig::default()
        });
        assert_eq!(
            filter.suffix(Some("+DC:tenant")).as_str(),
            " -BOOL_HIDE:true +DC:tenant"
        );
        assert_eq!(filter.suffix(Some(" +DC:x")).as_str(), " -BOOL_HIDE:true +DC:x");
    }

    #[test]
    fn test_filter_suffix_serializes_as_string() {
        let filter = AccessFilter::new(AccessConfig {
            query_suffix: "-X:y".to_string(),
            ..AccessConfig::default()
        });
        let json = serde_json::to_string(&filter.suffix(None)).unwrap();
        assert_eq!(json, "\" -X:y\"");
    }
}
