//! Search index access: document model, backend interface, Solr client and
//! the access-filtered gateway used by the protocol engine.

pub mod backend;
pub mod document;
pub mod fields;
pub mod gateway;
pub mod solr;

pub use backend::{SearchBackend, SearchRequest, SearchResponse, SortOrder};
pub use document::{Document, FieldValue};
pub use gateway::{latest_valid_date_updated, RecordPage, SearchGateway};
pub use solr::SolrClient;
