//! XML reading helpers and response writer.

pub mod utils;
pub mod writer;

pub use utils::find_descendant;
pub use writer::{escape_attr, escape_text, XmlWriter};
