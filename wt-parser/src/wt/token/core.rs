//! Core token types

use super::kv::{AttrValue, Kv};
use super::meta::MetaMarker;
use serde::Serialize;
use std::ops::Range;
use std::rc::Rc;

/// Auxiliary per-token data: source positions and syntax hints.
///
/// Owned by the token, so cloning a token copies this record as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DataAttribs {
    /// Byte range of the token in the source text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsr: Option<Range<usize>>,
    /// Original source of the token, when it differs from its rendering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Syntax variant the token was written in (e.g. `html`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stx: Option<String>,
}

impl DataAttribs {
    pub fn with_tsr(range: Range<usize>) -> Self {
        Self {
            tsr: Some(range),
            ..Self::default()
        }
    }
}

/// A tag with its ordered attribute list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    pub name: String,
    pub attribs: Vec<Rc<Kv>>,
    #[serde(skip_serializing_if = "is_default_data")]
    pub data: DataAttribs,
}

fn is_default_data(data: &DataAttribs) -> bool {
    *data == DataAttribs::default()
}

impl Tag {
    pub fn new(name: impl Into<String>, attribs: Vec<Kv>) -> Self {
        Self {
            name: name.into(),
            attribs: attribs.into_iter().map(Rc::new).collect(),
            data: DataAttribs::default(),
        }
    }

    pub fn with_data(mut self, data: DataAttribs) -> Self {
        self.data = data;
        self
    }

    /// First attribute whose key is the plain string `key`.
    pub fn get_attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attribs
            .iter()
            .find(|kv| kv.key.as_text() == Some(key))
            .map(|kv| &kv.value)
    }

    /// Like [`Tag::get_attribute`], but only for plain string values.
    pub fn get_text_attribute(&self, key: &str) -> Option<&str> {
        self.get_attribute(key).and_then(AttrValue::as_text)
    }

    pub fn add_attribute(&mut self, key: impl Into<AttrValue>, value: impl Into<AttrValue>) {
        self.attribs.push(Rc::new(Kv::new(key, value)));
    }

    /// Give the first pair keyed `key` a new value, or append one. The pair is copied before it
    /// is changed.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        match self.attribs.iter_mut().find(|kv| kv.key.as_text() == Some(key)) {
            Some(kv) => Rc::make_mut(kv).value = value,
            None => self.add_attribute(key, value),
        }
    }

    /// Add `value` to a space separated attribute such as `typeof` or `class`.
    ///
    /// An existing plain string attribute is extended (unless it already lists `value`);
    /// otherwise a new attribute is appended. The existing pair is copied before it is changed.
    pub fn add_space_separated_attribute(&mut self, key: &str, value: &str) {
        let existing = self
            .attribs
            .iter_mut()
            .find(|kv| kv.key.as_text() == Some(key) && kv.value.as_text().is_some());

        match existing {
            Some(kv) => {
                let current = kv.value.as_text().unwrap_or_default();
                if current.split_whitespace().any(|word| word == value) {
                    return;
                }
                let updated = if current.is_empty() {
                    value.to_string()
                } else {
                    format!("{} {}", current, value)
                };
                Rc::make_mut(kv).value = AttrValue::Text(updated);
            }
            None => self.add_attribute(key, value),
        }
    }
}

/// A single event in the token stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Token {
    /// `<name ...>`
    TagOpen(Tag),
    /// `<name .../>`
    SelfClosing(Tag),
    /// `</name>`
    TagClose(Tag),
    /// Provenance marker synthesized by attribute expansion
    Meta(MetaMarker),
    Text(String),
    Newline,
    Comment(String),
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::TagOpen(_) => TokenKind::TagOpen,
            Token::SelfClosing(_) => TokenKind::SelfClosing,
            Token::TagClose(_) => TokenKind::TagClose,
            Token::Meta(_) => TokenKind::Meta,
            Token::Text(_) => TokenKind::Text,
            Token::Newline => TokenKind::Newline,
            Token::Comment(_) => TokenKind::Comment,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Token::TagOpen(tag) | Token::SelfClosing(tag) | Token::TagClose(tag) => Some(tag),
            _ => None,
        }
    }

    /// True for any tag token named `name`.
    pub fn is_tag_named(&self, name: &str) -> bool {
        self.as_tag().is_some_and(|tag| tag.name == name)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Token::Text(s.into())
    }
}

/// Discriminant of [`Token`], used by handler registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    TagOpen,
    SelfClosing,
    TagClose,
    Meta,
    Text,
    Newline,
    Comment,
}

/// Which tokens a registered handler wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFilter {
    Any,
    Only(TokenKind),
}

impl KindFilter {
    pub fn matches(self, kind: TokenKind) -> bool {
        match self {
            KindFilter::Any => true,
            KindFilter::Only(expected) => expected == kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_attribute_returns_first_match() {
        let tag = Tag::new("div", vec![Kv::new("id", "a"), Kv::new("id", "b")]);
        assert_eq!(tag.get_text_attribute("id"), Some("a"));
        assert_eq!(tag.get_attribute("missing"), None);
    }

    #[test]
    fn test_get_text_attribute_skips_token_values() {
        let tag = Tag::new(
            "div",
            vec![Kv::new("title", vec![Token::text("x")])],
        );
        assert!(tag.get_attribute("title").is_some());
        assert_eq!(tag.get_text_attribute("title"), None);
    }

    #[test]
    fn test_set_attribute_replaces_token_value() {
        let shared = Rc::new(Kv::new("about", vec![Token::text("#x")]));
        let mut tag = Tag::new("div", vec![Kv::new("id", "a")]);
        tag.attribs.push(Rc::clone(&shared));

        tag.set_attribute("about", "#mwt1");

        assert_eq!(tag.attribs.len(), 2);
        assert_eq!(tag.get_text_attribute("about"), Some("#mwt1"));
        assert!(shared.value.is_tokens());
    }

    #[test]
    fn test_set_attribute_appends_missing() {
        let mut tag = Tag::new("div", vec![Kv::new("id", "a")]);
        tag.set_attribute("about", "#mwt1");
        assert_eq!(tag.attribs.len(), 2);
        assert_eq!(tag.get_text_attribute("about"), Some("#mwt1"));
    }

    #[test]
    fn test_add_space_separated_attribute_appends_once() {
        let mut tag = Tag::new("span", vec![Kv::new("typeof", "mw:Transclusion")]);
        tag.add_space_separated_attribute("typeof", "mw:ExpandedAttrs/Template");
        tag.add_space_separated_attribute("typeof", "mw:ExpandedAttrs/Template");

        assert_eq!(
            tag.get_text_attribute("typeof"),
            Some("mw:Transclusion mw:ExpandedAttrs/Template")
        );
        assert_eq!(tag.attribs.len(), 1);
    }

    #[test]
    fn test_add_space_separated_attribute_creates_missing() {
        let mut tag = Tag::new("span", vec![]);
        tag.add_space_separated_attribute("class", "a");
        assert_eq!(tag.get_text_attribute("class"), Some("a"));
    }

    #[test]
    fn test_add_space_separated_attribute_copies_shared_pair() {
        let shared = Rc::new(Kv::new("class", "a"));
        let mut tag = Tag::new("span", vec![]);
        tag.attribs.push(Rc::clone(&shared));

        tag.add_space_separated_attribute("class", "b");

        assert_eq!(shared.value, AttrValue::from("a"));
        assert_eq!(tag.get_text_attribute("class"), Some("a b"));
    }

    #[test]
    fn test_token_kind_filter() {
        let token = Token::TagOpen(Tag::new("div", vec![]));
        assert_eq!(token.kind(), TokenKind::TagOpen);
        assert!(KindFilter::Any.matches(token.kind()));
        assert!(KindFilter::Only(TokenKind::TagOpen).matches(token.kind()));
        assert!(!KindFilter::Only(TokenKind::Text).matches(token.kind()));
    }

    #[test]
    fn test_clone_copies_data_attribs() {
        let token = Token::TagOpen(Tag::new("div", vec![]).with_data(DataAttribs::with_tsr(0..5)));
        let mut copy = token.clone();
        if let Token::TagOpen(tag) = &mut copy {
            tag.data.tsr = Some(1..2);
        }
        assert_eq!(token.as_tag().and_then(|t| t.data.tsr.clone()), Some(0..5));
    }
}
