//! Token and attribute model shared by every pipeline stage.
//!
//! Tokens are plain values. Attribute pairs are held behind `Rc` so that a stage which leaves a
//! pair untouched can hand the very same pair to the next stage, while a stage that needs a
//! different pair builds a fresh one (or goes through `Rc::make_mut`). Nothing in this module
//! mutates a pair that may be shared.

pub mod core;
pub mod formatting;
pub mod kv;
pub mod meta;

pub use self::core::{DataAttribs, KindFilter, Tag, Token, TokenKind};
pub use self::formatting::{detokenize, tokens_to_string, tokens_to_string_strict, ToWtString};
pub use self::kv::{AttrValue, Kv};
pub use self::meta::{ContentType, MetaMarker};
