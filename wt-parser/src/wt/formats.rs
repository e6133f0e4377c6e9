//! Output formats for token streams
//!
//! - [`json`]: serde_json rendering, for debugging and for diffing pipeline output
//! - text rendering lives with the tokens ([`detokenize`](crate::wt::token::detokenize))

pub mod json;

pub use json::{to_json, to_json_string};
