//! Error types for the connector.
//!
//! Two layers: `ConnectorError` carries internal failures with their
//! source, while protocol-visible failures are `OaiError` values (see
//! [`crate::oai::OaiError`]). Every `ConnectorError` maps onto exactly one
//! protocol error code.

use thiserror::Error;

use crate::oai::{ErrorCode, OaiError};

/// Main error type for the connector library.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The search index could not be reached or did not answer in time.
    #[error("Search index unreachable: {message}")]
    IndexUnreachable { message: String },

    /// The search index answered with a non-success status.
    #[error("Search index rejected query (status {status}): {message}")]
    IndexRejected { status: u16, message: String },

    /// The search index answered with a body we could not decode.
    #[error("Unexpected search index response: {0}")]
    IndexResponse(String),

    /// HTTP request failed outside of the retry loop.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Fetching auxiliary record content (e.g. a METS file) failed.
    #[error("Failed to fetch content from {url}: {message}")]
    ContentFetch { url: String, message: String },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// The record has no content in the requested format.
    #[error("Record {identifier} cannot be rendered as {format}")]
    NotRenderable { identifier: String, format: String },

    /// Missing required XML element.
    #[error("Missing required XML element: {element} in {context}")]
    MissingElement { element: String, context: String },

    /// Cursor storage failed.
    #[error("Resumption token storage failed: {0}")]
    Storage(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration could not be parsed.
    #[error("Configuration parsing failed: {0}")]
    ConfigParse(#[from] serde_yaml_ng::Error),

    /// Configuration is syntactically valid but unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A protocol request failed outside of a response envelope.
    #[error("Protocol error {0}")]
    Protocol(#[from] OaiError),

    /// Invalid URL.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ConnectorError {
    /// The protocol error code this failure surfaces as.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::IndexUnreachable { .. }
            | Self::IndexRejected { .. }
            | Self::IndexResponse(_)
            | Self::Http(_)
            | Self::InvalidUrl { .. } => ErrorCode::IndexUnreachable,
            Self::ContentFetch { .. }
            | Self::NotRenderable { .. }
            | Self::XmlParse(_)
            | Self::MissingElement { .. } => ErrorCode::CannotDisseminateFormat,
            Self::Storage(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::ConfigParse(_)
            | Self::InvalidConfig(_) => ErrorCode::StorageUnavailable,
            Self::Protocol(e) => e.code,
        }
    }
}

/// Result type alias for connector operations.
pub type Result<T> = std::result::Result<T, ConnectorError>;
