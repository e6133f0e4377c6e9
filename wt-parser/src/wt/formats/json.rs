//! JSON rendering of token streams

use crate::wt::token::Token;
use serde_json::Value;

pub fn to_json(tokens: &[Token]) -> Result<Value, serde_json::Error> {
    serde_json::to_value(tokens)
}

/// Pretty-printed form of [`to_json`].
pub fn to_json_string(tokens: &[Token]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(tokens)
}
