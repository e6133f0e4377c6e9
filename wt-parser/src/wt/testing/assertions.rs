//! Fluent assertion API for token streams

use crate::wt::token::{detokenize, AttrValue, ContentType, MetaMarker, Tag, Token, ToWtString};

// ============================================================================
// Entry Point
// ============================================================================

/// Create an assertion builder for a token stream
pub fn assert_tokens(tokens: &[Token]) -> TokensAssertion<'_> {
    TokensAssertion { tokens }
}

// ============================================================================
// Stream Assertions
// ============================================================================

pub struct TokensAssertion<'a> {
    tokens: &'a [Token],
}

impl<'a> TokensAssertion<'a> {
    /// Assert the number of tokens in the stream
    pub fn count(self, expected: usize) -> Self {
        assert_eq!(
            self.tokens.len(),
            expected,
            "Expected {} tokens, found {}: {}",
            expected,
            self.tokens.len(),
            detokenize(self.tokens)
        );
        self
    }

    /// Assert on a specific token by index
    pub fn token<F>(self, index: usize, assertion: F) -> Self
    where
        F: FnOnce(TokenAssertion<'a>),
    {
        assert!(
            index < self.tokens.len(),
            "Token index {} out of bounds (stream has {} tokens)",
            index,
            self.tokens.len()
        );
        assertion(TokenAssertion {
            token: &self.tokens[index],
            context: format!("tokens[{}]", index),
        });
        self
    }

    /// Assert the rendered stream
    pub fn renders(self, expected: &str) -> Self {
        assert_eq!(detokenize(self.tokens), expected);
        self
    }

    /// Assert every marker and every tag carrying an `about` use one and the same id
    pub fn share_about(self) -> Self {
        let mut ids = Vec::new();
        for token in self.tokens {
            match token {
                Token::Meta(marker) => ids.push(marker.about.clone()),
                Token::TagOpen(tag) | Token::SelfClosing(tag) => {
                    if let Some(about) = tag.get_text_attribute("about") {
                        ids.push(Some(about.to_string()));
                    }
                }
                _ => {}
            }
        }
        assert!(!ids.is_empty(), "No grouping ids in {}", detokenize(self.tokens));
        assert!(
            ids.iter().all(|id| id.is_some() && *id == ids[0]),
            "Grouping ids differ: {:?}",
            ids
        );
        self
    }

    /// Assert the stream has no marker tokens
    pub fn no_markers(self) -> Self {
        let markers = self
            .tokens
            .iter()
            .filter(|t| matches!(t, Token::Meta(_)))
            .count();
        assert_eq!(markers, 0, "Expected no markers in {}", detokenize(self.tokens));
        self
    }
}

// ============================================================================
// Token Assertions
// ============================================================================

pub struct TokenAssertion<'a> {
    token: &'a Token,
    context: String,
}

impl<'a> TokenAssertion<'a> {
    /// Assert this token is a provenance marker
    pub fn assert_marker(self) -> MarkerAssertion<'a> {
        match self.token {
            Token::Meta(marker) => MarkerAssertion {
                marker,
                context: self.context,
            },
            other => panic!(
                "{}: Expected marker, found {}",
                self.context,
                other.to_wt_string()
            ),
        }
    }

    /// Assert this token is an opening or self-closing tag named `name`
    pub fn assert_tag(self, name: &str) -> TagAssertion<'a> {
        match self.token {
            Token::TagOpen(tag) | Token::SelfClosing(tag) if tag.name == name => TagAssertion {
                tag,
                context: self.context,
            },
            other => panic!(
                "{}: Expected <{}>, found {}",
                self.context,
                name,
                other.to_wt_string()
            ),
        }
    }

    /// Assert this token is the text `expected`
    pub fn assert_text(self, expected: &str) {
        match self.token {
            Token::Text(text) => assert_eq!(text, expected, "{}: text mismatch", self.context),
            other => panic!(
                "{}: Expected text, found {}",
                self.context,
                other.to_wt_string()
            ),
        }
    }
}

// ============================================================================
// Marker Assertions
// ============================================================================

pub struct MarkerAssertion<'a> {
    marker: &'a MetaMarker,
    context: String,
}

impl<'a> MarkerAssertion<'a> {
    pub fn content_type(self, expected: ContentType) -> Self {
        assert_eq!(
            self.marker.content_type, expected,
            "{}: content type mismatch",
            self.context
        );
        self
    }

    pub fn object_type(self, expected: &str) -> Self {
        assert_eq!(
            self.marker.object_type, expected,
            "{}: object type mismatch",
            self.context
        );
        self
    }

    pub fn key(self, expected: &str) -> Self {
        assert_eq!(
            self.marker.key.as_text(),
            Some(expected),
            "{}: marker key mismatch",
            self.context
        );
        self
    }

    /// Stripped value
    pub fn value(self, expected: impl Into<AttrValue>) -> Self {
        assert_eq!(
            self.marker.value,
            expected.into(),
            "{}: marker value mismatch",
            self.context
        );
        self
    }

    /// Rendering of the unstripped expansion
    pub fn expansion_renders(self, expected: &str) -> Self {
        assert_eq!(
            self.marker.expansion.to_wt_string(),
            expected,
            "{}: marker expansion mismatch",
            self.context
        );
        self
    }

    pub fn about(self, expected: &str) -> Self {
        assert_eq!(
            self.marker.about.as_deref(),
            Some(expected),
            "{}: marker about mismatch",
            self.context
        );
        self
    }
}

// ============================================================================
// Tag Assertions
// ============================================================================

pub struct TagAssertion<'a> {
    tag: &'a Tag,
    context: String,
}

impl<'a> TagAssertion<'a> {
    /// Assert the plain string attribute `key` equals `expected`
    pub fn attribute(self, key: &str, expected: &str) -> Self {
        assert_eq!(
            self.tag.get_text_attribute(key),
            Some(expected),
            "{}: attribute '{}' mismatch on {}",
            self.context,
            key,
            self.render()
        );
        self
    }

    /// Assert attribute `key` exists with any value
    pub fn has_attribute(self, key: &str) -> Self {
        assert!(
            self.tag.get_attribute(key).is_some(),
            "{}: missing attribute '{}' on {}",
            self.context,
            key,
            self.render()
        );
        self
    }

    pub fn no_attribute(self, key: &str) -> Self {
        assert!(
            self.tag.get_attribute(key).is_none(),
            "{}: unexpected attribute '{}' on {}",
            self.context,
            key,
            self.render()
        );
        self
    }

    /// Assert the attribute keys, in order
    pub fn keys(self, expected: &[&str]) -> Self {
        let keys: Vec<String> = self
            .tag
            .attribs
            .iter()
            .map(|kv| kv.key.to_wt_string())
            .collect();
        assert_eq!(keys, expected, "{}: attribute keys mismatch", self.context);
        self
    }

    /// Assert the space separated `typeof` lists `label`
    pub fn type_of_contains(self, label: &str) -> Self {
        let type_of = self.tag.get_text_attribute("typeof").unwrap_or_default();
        assert!(
            type_of.split_whitespace().any(|word| word == label),
            "{}: typeof '{}' does not list '{}'",
            self.context,
            type_of,
            label
        );
        self
    }

    fn render(&self) -> String {
        Token::TagOpen(self.tag.clone()).to_wt_string()
    }
}
