//! Provenance markers
//!
//! When attribute expansion changes a key or value because a template (or extension) produced
//! it, the stage emits a [`MetaMarker`] in front of the rewritten tag. All markers for one tag
//! share the tag's `about` id, which is how later stages put them back together.

use super::kv::AttrValue;
use serde::Serialize;

/// Sentinel key meaning "the role of this attribute (link text or sort key) is not known yet".
pub const MAYBE_CONTENT: &str = "mw:maybeContent";
/// Synthetic attribute carrying the expanded value of a deferred-role key.
pub const KEY_AFFECTED: &str = "mw:keyAffected";
/// Synthetic attribute packaging both forms of a deferred-role value.
pub const VAL_AFFECTED: &str = "mw:valAffected";
/// Keys in this namespace belong to the pipeline, not to the author.
pub const RESERVED_PREFIX: &str = "mw:";
/// Prefix of the object types written by the template wrapper.
pub const OBJECT_PREFIX: &str = "mw:Object/";
/// Prefix of the `typeof` label put on a tag whose attributes were expanded.
pub const EXPANDED_ATTRS_PREFIX: &str = "mw:ExpandedAttrs/";

/// What part of an attribute was produced by expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContentType {
    #[serde(rename = "mw:objectAttrKey")]
    ObjectAttrKey,
    #[serde(rename = "mw:objectAttrVal")]
    ObjectAttrVal,
    /// Key and value both came out of one expansion ("k=v" split)
    #[serde(rename = "mw:objectAttr")]
    ObjectAttr,
}

impl ContentType {
    pub fn label(self) -> &'static str {
        match self {
            ContentType::ObjectAttrKey => "mw:objectAttrKey",
            ContentType::ObjectAttrVal => "mw:objectAttrVal",
            ContentType::ObjectAttr => "mw:objectAttr",
        }
    }
}

/// A zero-content token describing one template-affected attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaMarker {
    pub content_type: ContentType,
    /// Producer object type, e.g. `mw:Object/Template`
    pub object_type: String,
    /// Key of the affected attribute after expansion
    pub key: AttrValue,
    /// Expanded content with marker tokens stripped
    pub value: AttrValue,
    /// Expanded content as the nested pipeline returned it
    pub expansion: AttrValue,
    /// Grouping id shared with the owning tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

impl MetaMarker {
    pub fn new(
        content_type: ContentType,
        object_type: impl Into<String>,
        key: AttrValue,
        value: AttrValue,
        expansion: AttrValue,
    ) -> Self {
        Self {
            content_type,
            object_type: object_type.into(),
            key,
            value,
            expansion,
            about: None,
        }
    }

    /// Producer name without the `mw:Object/` prefix (`Template`, `Extension/ref`, ...).
    pub fn producer(&self) -> &str {
        producer_name(&self.object_type)
    }
}

pub fn producer_name(object_type: &str) -> &str {
    object_type
        .strip_prefix(OBJECT_PREFIX)
        .unwrap_or(object_type)
}

/// The `typeof` label for a tag whose attributes were produced by `object_type`.
pub fn expanded_attrs_type(object_type: &str) -> String {
    format!("{}{}", EXPANDED_ATTRS_PREFIX, producer_name(object_type))
}
