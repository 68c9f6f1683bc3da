//! OAI Connector - Harvesting interface for a Solr-backed digital object
//! repository.
//!
//! This crate answers metadata harvesting requests: it validates the verb
//! and its arguments, translates selective-harvesting parameters into
//! access-filtered index queries, pages through results with durable
//! resumption tokens and renders records in the requested metadata format.
//!
//! # Example
//!
//! ```
//! use oai_connector::oai::{ErrorCode, HarvestRequest, Verb};
//!
//! let request = HarvestRequest::parse([("verb", "ListRecords"), ("metadataPrefix", "oai_dc")])
//!     .unwrap();
//! assert_eq!(request.verb, Verb::ListRecords);
//!
//! let err = HarvestRequest::parse([("verb", "ListRecords")]).unwrap_err();
//! assert_eq!(err.code, ErrorCode::BadArgument);
//! ```
//!
//! # Architecture
//!
//! - [`config`]: YAML configuration, defaults and validation
//! - [`error`]: Error types and Result alias
//! - [`http`]: Blocking HTTP client with bounded retries
//! - [`xml`]: XML reading helpers and the response writer
//! - [`index`]: Document model, search backend, Solr client and gateway
//! - [`query`]: Harvest query translation and access restrictions
//! - [`token`]: Resumption token store and cursor persistence
//! - [`format`]: Metadata formats and their registry
//! - [`oai`]: Verbs, request validation, the engine and response rendering
//! - [`server`]: HTTP transport
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod index;
pub mod oai;
pub mod query;
pub mod server;
pub mod token;
pub mod xml;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used items
pub use config::Config;
pub use error::{ConnectorError, Result};
pub use oai::{Engine, ErrorCode, HarvestRequest, OaiError, Verb};
