//! Protocol error codes returned in place of a payload.

use std::fmt;

use thiserror::Error;

use crate::error::ConnectorError;

/// Machine-readable error code of a protocol response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BadVerb,
    BadArgument,
    BadResumptionToken,
    CannotDisseminateFormat,
    IdDoesNotExist,
    NoRecordsMatch,
    NoMetadataFormats,
    NoSetHierarchy,
    /// The search index failed or timed out.
    IndexUnreachable,
    /// Resumption state could not be read or written.
    StorageUnavailable,
}

impl ErrorCode {
    /// Code as it appears in the `code` attribute.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadVerb => "badVerb",
            Self::BadArgument => "badArgument",
            Self::BadResumptionToken => "badResumptionToken",
            Self::CannotDisseminateFormat => "cannotDisseminateFormat",
            Self::IdDoesNotExist => "idDoesNotExist",
            Self::NoRecordsMatch => "noRecordsMatch",
            Self::NoMetadataFormats => "noMetadataFormats",
            Self::NoSetHierarchy => "noSetHierarchy",
            Self::IndexUnreachable => "indexUnreachable",
            Self::StorageUnavailable => "storageUnavailable",
        }
    }

    /// Human-readable default message.
    #[must_use]
    pub fn default_message(self) -> &'static str {
        match self {
            Self::BadVerb => "Illegal OAI verb",
            Self::BadArgument => {
                "The request includes illegal arguments, is missing required arguments, \
                 includes a repeated argument, or values for arguments have an illegal syntax."
            }
            Self::BadResumptionToken => "The value of the resumptionToken argument is invalid or expired.",
            Self::CannotDisseminateFormat => {
                "The metadata format identified by the value given for the metadataPrefix \
                 argument is not supported by the item or by the repository."
            }
            Self::IdDoesNotExist => {
                "The value of the identifier argument is unknown or illegal in this repository."
            }
            Self::NoRecordsMatch => {
                "The combination of the values of the from, until, set and metadataPrefix \
                 arguments results in an empty list."
            }
            Self::NoMetadataFormats => "There are no metadata formats available for the specified item.",
            Self::NoSetHierarchy => "The repository does not support sets.",
            Self::IndexUnreachable => "The search index is currently unreachable.",
            Self::StorageUnavailable => "Resumption state storage is currently unavailable.",
        }
    }

    /// Whether the request itself was at fault, as opposed to the server.
    #[must_use]
    pub fn is_client_error(self) -> bool {
        !matches!(self, Self::IndexUnreachable | Self::StorageUnavailable)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol error: one code plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct OaiError {
    pub code: ErrorCode,
    pub message: String,
}

impl OaiError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Error with the code's default message.
    #[must_use]
    pub fn of(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    #[must_use]
    pub fn bad_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadArgument, message)
    }
}

impl From<ConnectorError> for OaiError {
    fn from(err: ConnectorError) -> Self {
        Self::new(err.error_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(ErrorCode::BadVerb.as_str(), "badVerb");
        assert_eq!(ErrorCode::IdDoesNotExist.to_string(), "idDoesNotExist");
        assert!(ErrorCode::NoRecordsMatch.is_client_error());
        assert!(!ErrorCode::IndexUnreachable.is_client_error());
    }

    #[test]
    fn test_from_connector_error() {
        let err: OaiError = ConnectorError::IndexUnreachable {
            message: "timeout".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::IndexUnreachable);
        assert!(err.message.contains("timeout"));
    }

    #[test]
    fn test_default_message() {
        let err = OaiError::of(ErrorCode::NoSetHierarchy);
        assert_eq!(err.to_string(), "noSetHierarchy: The repository does not support sets.");
    }
}
