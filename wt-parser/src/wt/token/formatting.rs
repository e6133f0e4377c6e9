//! Rendering tokens back to text
//!
//! Two flavours live here:
//!
//! - [`ToWtString`] / [`detokenize`] render a token stream as compact HTML-ish text. This is
//!   what tests and trace output use to look at a stream; it is not the final serializer.
//! - [`tokens_to_string`] / [`tokens_to_string_strict`] collect the plain text of a stream, the
//!   way attribute expansion needs it when it reinterprets expanded content.

use super::core::{Tag, Token};
use super::kv::{AttrValue, Kv};
use super::meta::MetaMarker;

/// Trait for converting a token to its string representation
pub trait ToWtString {
    fn to_wt_string(&self) -> String;
}

impl ToWtString for Token {
    fn to_wt_string(&self) -> String {
        match self {
            Token::TagOpen(tag) => format!("<{}{}>", tag.name, render_attribs(tag)),
            Token::SelfClosing(tag) => format!("<{}{}/>", tag.name, render_attribs(tag)),
            Token::TagClose(tag) => format!("</{}>", tag.name),
            Token::Meta(marker) => marker.to_wt_string(),
            Token::Text(s) => s.clone(),
            Token::Newline => "\n".to_string(),
            Token::Comment(s) => format!("<!--{}-->", s),
        }
    }
}

impl ToWtString for MetaMarker {
    fn to_wt_string(&self) -> String {
        let mut out = format!(
            "<meta typeof=\"{}\" property=\"{}\"",
            self.content_type.label(),
            self.key.to_wt_string()
        );
        if let Some(about) = &self.about {
            out.push_str(&format!(" about=\"{}\"", about));
        }
        out.push_str("/>");
        out
    }
}

impl ToWtString for AttrValue {
    fn to_wt_string(&self) -> String {
        match self {
            AttrValue::Text(s) => s.clone(),
            AttrValue::Tokens(tokens) => detokenize(tokens),
        }
    }
}

impl ToWtString for Kv {
    fn to_wt_string(&self) -> String {
        format!(
            "{}=\"{}\"",
            self.key.to_wt_string(),
            self.value.to_wt_string()
        )
    }
}

fn render_attribs(tag: &Tag) -> String {
    tag.attribs
        .iter()
        .map(|kv| format!(" {}", kv.to_wt_string()))
        .collect()
}

/// Render a token stream as one string.
pub fn detokenize(tokens: &[Token]) -> String {
    tokens.iter().map(ToWtString::to_wt_string).collect()
}

/// Plain text of a token stream. Tags, markers and comments contribute nothing.
pub fn tokens_to_string(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Text(s) => out.push_str(s),
            Token::Newline => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// Plain text prefix of a token stream, plus whatever follows the first non-text token.
///
/// Comments are skipped. For a stream that is all text the remainder is empty.
pub fn tokens_to_string_strict(tokens: &[Token]) -> (String, &[Token]) {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Text(s) => out.push_str(s),
            Token::Newline => out.push('\n'),
            Token::Comment(_) => {}
            _ => return (out, &tokens[i..]),
        }
    }
    (out, &[])
}
