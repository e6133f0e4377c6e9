//! Provenance helpers for attribute expansion
//!
//! Pure functions, no pipeline access:
//!
//! - [`strip_meta_tags`] drops the wrapper metas a template expansion leaves in an attribute and
//!   reports which producer (template, extension) they belonged to.
//! - [`make_tpl_affected_meta`] builds the marker token for a template-affected attribute.
//! - [`infer_key_value`] reads an expanded key of the form `k=v` as a whole attribute.

use crate::wt::token::meta::OBJECT_PREFIX;
use crate::wt::token::{tokens_to_string_strict, AttrValue, ContentType, MetaMarker, Token};
use once_cell::sync::Lazy;
use regex::Regex;

/// `ident ['"]? value ['"]?` at the end of the string.
static KEY_VALUE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([^=]+)=['"]?([^'"]*)['"]?$"#).unwrap());

/// Result of [`strip_meta_tags`].
#[derive(Debug, Clone, PartialEq)]
pub struct Stripped {
    /// The value without marker tokens. All-text results collapse to [`AttrValue::Text`].
    pub value: AttrValue,
    /// Object type of the first wrapper found, e.g. `mw:Object/Template`
    pub object_type: Option<String>,
}

/// Remove `meta` tags and provenance markers from an expanded value.
///
/// The producer object type is only recorded when templates are wrapped; unwrapped expansions
/// carry no wrapper metas to read it from.
pub fn strip_meta_tags(value: &AttrValue, wrap_templates: bool) -> Stripped {
    let tokens = match value {
        AttrValue::Text(_) => {
            return Stripped {
                value: value.clone(),
                object_type: None,
            }
        }
        AttrValue::Tokens(tokens) => tokens,
    };

    let mut kept = Vec::with_capacity(tokens.len());
    let mut object_type = None;
    for token in tokens {
        match token {
            Token::Meta(_) => {}
            Token::TagOpen(tag) | Token::SelfClosing(tag) | Token::TagClose(tag)
                if tag.name == "meta" =>
            {
                if wrap_templates && object_type.is_none() {
                    object_type = tag.get_text_attribute("typeof").and_then(object_type_of);
                }
            }
            other => kept.push(other.clone()),
        }
    }

    Stripped {
        value: collapse(kept),
        object_type,
    }
}

/// The start-wrapper object type listed in a `typeof` value, if any.
///
/// `mw:Object/Template` counts, `mw:Object/Template/End` (the closing wrapper) does not.
pub fn object_type_of(type_of: &str) -> Option<String> {
    type_of
        .split_whitespace()
        .find(|word| word.starts_with(OBJECT_PREFIX) && !word.ends_with("/End"))
        .map(str::to_string)
}

fn collapse(tokens: Vec<Token>) -> AttrValue {
    if tokens.iter().all(|t| matches!(t, Token::Text(_))) {
        let text = tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::Text(s) => Some(s),
                _ => None,
            })
            .collect();
        AttrValue::Text(text)
    } else {
        AttrValue::Tokens(tokens)
    }
}

/// Marker for an attribute whose `content_type` part was produced by `object_type`.
///
/// `value` is the stripped content, `expansion` the content before stripping. The grouping id is
/// assigned later, once the owning tag has one.
pub fn make_tpl_affected_meta(
    content_type: ContentType,
    key: AttrValue,
    object_type: &str,
    value: AttrValue,
    expansion: AttrValue,
) -> MetaMarker {
    MetaMarker::new(content_type, object_type, key, value, expansion)
}

/// Split an expanded key of the form `k=v` (optionally quoted) into key and value.
///
/// Only the leading plain text of a token key is matched. Tokens after it are kept and follow
/// the split value. Returns `None` when the text has no `k=v` shape; callers then keep the key
/// as it is.
pub fn infer_key_value(key: &AttrValue) -> Option<(String, AttrValue)> {
    let (text, rest): (&str, &[Token]) = match key {
        AttrValue::Text(s) => (s.as_str(), &[]),
        AttrValue::Tokens(tokens) => {
            let (prefix, rest) = tokens_to_string_strict(tokens);
            return split_key_value(&prefix, rest);
        }
    };
    split_key_value(text, rest)
}

fn split_key_value(text: &str, rest: &[Token]) -> Option<(String, AttrValue)> {
    let caps = KEY_VALUE_PATTERN.captures(text)?;
    let key = caps.get(1)?.as_str().to_string();
    let value = caps.get(2)?.as_str().to_string();

    if rest.is_empty() {
        return Some((key, AttrValue::Text(value)));
    }
    let mut tokens = Vec::with_capacity(rest.len() + 1);
    tokens.push(Token::Text(value));
    tokens.extend(rest.iter().cloned());
    Some((key, AttrValue::Tokens(tokens)))
}
