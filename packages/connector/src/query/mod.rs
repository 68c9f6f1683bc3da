//! Query construction: harvesting parameters, access restrictions, datestamps.

pub mod access;
pub mod datestamp;
pub mod translator;

pub use access::{AccessFilter, FilterSuffix, FilteredQuery};
pub use translator::{HarvestParams, QueryTranslator, SetPredicate};

/// Escape characters with special meaning in the index query syntax.
///
/// # Examples
/// ```
/// use oai_connector::query::escape_query_chars;
///
/// assert_eq!(escape_query_chars("urn:nbn:de:1"), r"urn\:nbn\:de\:1");
/// assert_eq!(escape_query_chars("PPN 1"), r"PPN\ 1");
/// assert_eq!(escape_query_chars("PPN123"), "PPN123");
/// ```
#[must_use]
pub fn escape_query_chars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '\\' | '+'
                | '-'
                | '!'
                | '('
                | ')'
                | ':'
                | '^'
                | '['
                | ']'
                | '"'
                | '{'
                | '}'
                | '~'
                | '*'
                | '?'
                | '|'
                | '&'
                | ';'
                | '/'
        ) || c.is_whitespace()
        {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
