//! The harvesting protocol: verbs, request validation, error codes, the
//! engine that answers requests and the XML response envelope.

pub mod engine;
pub mod error_code;
pub mod request;
pub mod response;
pub mod verb;

pub use engine::Engine;
pub use error_code::{ErrorCode, OaiError};
pub use request::HarvestRequest;
pub use response::{
    render_response, IdentifyInfo, Payload, RecordList, ResumptionInfo, SetEntry,
};
pub use verb::{Presence, Verb};
