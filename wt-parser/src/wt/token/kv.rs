//! Attribute pairs

use super::core::Token;
use serde::Serialize;
use std::ops::Range;

/// Key or value of an attribute.
///
/// Either plain text, or a token sequence that still has to go through the pipeline (a
/// template invocation, a nested tag, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Tokens(Vec<Token>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Tokens(_) => None,
        }
    }

    pub fn is_tokens(&self) -> bool {
        matches!(self, AttrValue::Tokens(_))
    }

    /// True only for the empty plain string. An empty token sequence is not "empty text".
    pub fn is_empty_text(&self) -> bool {
        matches!(self, AttrValue::Text(s) if s.is_empty())
    }
}

impl Default for AttrValue {
    fn default() -> Self {
        AttrValue::Text(String::new())
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<Vec<Token>> for AttrValue {
    fn from(tokens: Vec<Token>) -> Self {
        AttrValue::Tokens(tokens)
    }
}

/// A key/value slot on a tag token, with optional pointers back into the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kv {
    #[serde(rename = "k")]
    pub key: AttrValue,
    #[serde(rename = "v")]
    pub value: AttrValue,
    /// Raw source of the key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_src: Option<String>,
    /// Raw source of the value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_offsets: Option<Range<usize>>,
}

impl Kv {
    pub fn new(key: impl Into<AttrValue>, value: impl Into<AttrValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn with_sources(
        mut self,
        key_src: impl Into<String>,
        value_src: impl Into<String>,
    ) -> Self {
        self.key_src = Some(key_src.into());
        self.value_src = Some(value_src.into());
        self
    }

    pub fn with_offsets(mut self, offsets: Range<usize>) -> Self {
        self.src_offsets = Some(offsets);
        self
    }

    /// Whether either side still contains unexpanded tokens.
    pub fn needs_expansion(&self) -> bool {
        self.key.is_tokens() || self.value.is_tokens()
    }

    /// Copy the source pointers that `original` has onto this pair.
    pub fn carry_sources_from(&mut self, original: &Kv) {
        if original.key_src.is_some() {
            self.key_src.clone_from(&original.key_src);
        }
        if original.value_src.is_some() {
            self.value_src.clone_from(&original.value_src);
        }
        if original.src_offsets.is_some() {
            self.src_offsets.clone_from(&original.src_offsets);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_expansion() {
        assert!(!Kv::new("a", "b").needs_expansion());
        assert!(Kv::new(vec![Token::text("a")], "b").needs_expansion());
        assert!(Kv::new("a", vec![Token::text("b")]).needs_expansion());
    }

    #[test]
    fn test_empty_text() {
        assert!(AttrValue::from("").is_empty_text());
        assert!(!AttrValue::from("x").is_empty_text());
        assert!(!AttrValue::Tokens(vec![]).is_empty_text());
    }

    #[test]
    fn test_carry_sources_keeps_missing_fields() {
        let original = Kv::new("a", "b").with_offsets(3..9);
        let mut expanded = Kv::new("a", "c").with_sources("{{k}}", "{{v}}");

        expanded.carry_sources_from(&original);

        assert_eq!(expanded.src_offsets, Some(3..9));
        assert_eq!(expanded.key_src.as_deref(), Some("{{k}}"));
        assert_eq!(expanded.value_src.as_deref(), Some("{{v}}"));
    }
}
