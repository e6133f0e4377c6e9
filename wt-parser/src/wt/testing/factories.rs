//! Test factories for building tokens and attributes succinctly

use crate::wt::token::{DataAttribs, Kv, Tag, Token};
use std::ops::Range;

/// A plain string attribute.
pub fn kv(key: &str, value: &str) -> Kv {
    Kv::new(key, value)
}

/// `<name ...>`
pub fn open(name: &str, attribs: Vec<Kv>) -> Token {
    Token::TagOpen(Tag::new(name, attribs))
}

/// `<name .../>`
pub fn self_closing(name: &str, attribs: Vec<Kv>) -> Token {
    Token::SelfClosing(Tag::new(name, attribs))
}

/// `<name ...>` with a source range.
pub fn open_at(name: &str, attribs: Vec<Kv>, tsr: Range<usize>) -> Token {
    Token::TagOpen(Tag::new(name, attribs).with_data(DataAttribs::with_tsr(tsr)))
}

/// `</name>`
pub fn close(name: &str) -> Token {
    Token::TagClose(Tag::new(name, vec![]))
}

/// An unexpanded `{{target}}` transclusion as the tokenizer hands it over.
pub fn template(target: &str) -> Token {
    Token::SelfClosing(Tag::new("template", vec![kv("target", target)]))
}

/// A `meta` tag of the given `typeof`, as the template wrapper emits it.
pub fn wrapper_meta(type_of: &str, about: &str) -> Token {
    Token::SelfClosing(Tag::new(
        "meta",
        vec![kv("typeof", type_of), kv("about", about)],
    ))
}
