//! Attribute expansion stage
//!
//! Expands the keys and values of tag attributes (templates, parser functions, nested tags) and
//! records which attributes were produced by expansion.
//!
//! For every `TagOpen`/`SelfClosing` token with attributes the stage hands the attribute list to
//! an [`AttributeTransformManager`], answers the pipeline asynchronously, and once every key and
//! value has come back it reconciles the expanded list against the original:
//!
//! - source pointers of the original pairs are copied onto expanded pairs,
//! - wrapper metas are stripped from expanded keys and values,
//! - a template-produced key of the form `k=v` with an empty value becomes key `k` and value `v`,
//! - deferred-role attributes (`mw:maybeContent`) get a `mw:keyAffected` / `mw:valAffected`
//!   companion attribute instead of being resolved here,
//! - template-produced keys and values get a [`MetaMarker`] each.
//!
//! An untouched token is emitted as is. A changed one is emitted as a new token, preceded by its
//! markers; the markers and the token share one `about` id and the token is labelled
//! `mw:ExpandedAttrs/<Producer>` in its `typeof`.

use crate::wt::env::ParseEnv;
use crate::wt::token::meta::{
    expanded_attrs_type, KEY_AFFECTED, MAYBE_CONTENT, RESERVED_PREFIX, VAL_AFFECTED,
};
use crate::wt::token::{
    detokenize, tokens_to_string, AttrValue, ContentType, KindFilter, Kv, MetaMarker, Tag, Token,
};
use crate::wt::transforms::attributes::AttributeTransformManager;
use crate::wt::transforms::provenance::{infer_key_value, make_tpl_affected_meta, strip_meta_tags};
use crate::wt::transforms::{
    Completion, ExpansionOptions, Frame, HandlerResult, Pipeline, Rank, TokenHandler,
    TransformError,
};
use std::rc::Rc;

/// Runs after tokenization and template handling, before later semantic stages.
pub const RANK: Rank = 1.12;

pub struct AttributeExpander {
    options: ExpansionOptions,
}

impl AttributeExpander {
    pub fn new(options: ExpansionOptions) -> Self {
        Self { options }
    }

    /// Register a new expander on `pipeline` at `rank`.
    pub fn register(pipeline: &Pipeline, options: ExpansionOptions, rank: Rank) {
        pipeline.register(
            Rc::new(Self::new(options)),
            "AttributeExpander:onToken",
            rank,
            KindFilter::Any,
        );
    }
}

impl TokenHandler for AttributeExpander {
    fn on_token(
        &self,
        token: Token,
        frame: &Frame,
        done: Completion<Vec<Token>>,
    ) -> HandlerResult {
        let attribs = match &token {
            Token::TagOpen(tag) | Token::SelfClosing(tag) if !tag.attribs.is_empty() => {
                tag.attribs.clone()
            }
            _ => {
                tracing::trace!(kind = ?token.kind(), "AttributeExpander: pass-through");
                return HandlerResult::Tokens(vec![token]);
            }
        };

        let env = Rc::clone(frame.env());
        let options = self.options;
        let atm = AttributeTransformManager::new(frame, options);
        atm.process(
            &attribs,
            Completion::new(move |result: Result<Vec<Rc<Kv>>, TransformError>| {
                let outcome = match result {
                    Ok(expanded) => return_attributes(token, expanded, &env, options),
                    Err(err) => Err(token_failure(&token, err)),
                };
                done.complete(outcome);
            }),
        );
        HandlerResult::Async
    }
}

fn token_failure(token: &Token, err: TransformError) -> TransformError {
    let (tag, offsets) = match token.as_tag() {
        Some(tag) => (tag.name.clone(), tag.data.tsr.clone()),
        None => (String::new(), None),
    };
    TransformError::TokenFailed {
        tag,
        offsets,
        source: Box::new(err),
    }
}

/// Reconcile the expanded attribute list of `token` and build the tokens to emit.
///
/// `expanded` must line up with the token's attributes: same order, at least the same length.
pub fn return_attributes(
    token: Token,
    expanded: Vec<Rc<Kv>>,
    env: &ParseEnv,
    options: ExpansionOptions,
) -> Result<Vec<Token>, TransformError> {
    let (tag, rebuild): (Tag, fn(Tag) -> Token) = match token {
        Token::TagOpen(tag) => (tag, Token::TagOpen),
        Token::SelfClosing(tag) => (tag, Token::SelfClosing),
        other => return Ok(vec![other]),
    };

    if expanded.len() < tag.attribs.len() {
        return Err(TransformError::MalformedToken {
            tag: tag.name.clone(),
            expected: tag.attribs.len(),
            actual: expanded.len(),
            offsets: tag.data.tsr.clone(),
        });
    }

    let mut reconciler = Reconciler::new(options);
    let mut attribs = expanded;
    for (original, slot) in tag.attribs.iter().zip(attribs.iter_mut()) {
        reconciler.reconcile(original, slot);
    }

    tracing::debug!(
        tag = %tag.name,
        modified = reconciler.modified,
        markers = reconciler.markers.len(),
        "AttributeExpander: expanded attributes returned"
    );

    if !reconciler.modified {
        return Ok(vec![rebuild(tag)]);
    }

    let Reconciler {
        markers,
        producer,
        synthetic,
        ..
    } = reconciler;

    // The token is owned here; nothing else sees it, so updating it is the clone.
    let mut tag = tag;
    attribs.extend(synthetic.into_iter().map(Rc::new));
    tag.attribs = attribs;

    let mut markers = markers;
    if !markers.is_empty() {
        // An `about` that is still token content cannot be shared with the markers; replace it.
        let about = match tag.get_text_attribute("about") {
            Some(id) => id.to_string(),
            None => {
                let id = env.new_about_id();
                tag.set_attribute("about", id.clone());
                id
            }
        };
        if let Some(producer) = &producer {
            tag.add_space_separated_attribute("typeof", &expanded_attrs_type(producer));
        }
        for marker in &mut markers {
            marker.about = Some(about.clone());
        }
    }

    let mut tokens: Vec<Token> = markers.into_iter().map(Token::Meta).collect();
    tokens.push(rebuild(tag));
    tracing::trace!(output = %detokenize(&tokens), "AttributeExpander: emitting");
    Ok(tokens)
}

/// State accumulated while walking one token's attribute list.
struct Reconciler {
    options: ExpansionOptions,
    modified: bool,
    markers: Vec<MetaMarker>,
    /// Object type of the last template-affected attribute
    producer: Option<String>,
    /// `mw:keyAffected` / `mw:valAffected` pairs appended after the original attributes
    synthetic: Vec<Kv>,
}

impl Reconciler {
    fn new(options: ExpansionOptions) -> Self {
        Self {
            options,
            modified: false,
            markers: Vec::new(),
            producer: None,
            synthetic: Vec::new(),
        }
    }

    fn reconcile(&mut self, original: &Rc<Kv>, expanded: &mut Rc<Kv>) {
        if !Rc::ptr_eq(original, expanded) {
            Rc::make_mut(expanded).carry_sources_from(original);
        }

        let mut new_key = expanded.key.clone();
        if new_key.is_empty_text() {
            return;
        }

        if original.key.is_tokens() {
            new_key = self.reconcile_key(new_key, expanded);
        } else if new_key != original.key {
            self.modified = true;
        }

        match new_key.as_text() {
            Some(key) if original.value.is_tokens() => {
                self.modified = true;
                if key.contains(MAYBE_CONTENT) {
                    self.package_deferred_value(&new_key, expanded);
                } else if !key.starts_with(RESERVED_PREFIX) {
                    self.reconcile_value(&new_key, expanded);
                }
            }
            _ => {
                if expanded.value != original.value {
                    self.modified = true;
                }
            }
        }
    }

    /// Key that went through expansion. Returns the key used for the rest of the pair.
    fn reconcile_key(&mut self, new_key: AttrValue, expanded: &mut Rc<Kv>) -> AttrValue {
        self.modified = true;

        let key_text = match &new_key {
            AttrValue::Text(text) => text.clone(),
            AttrValue::Tokens(tokens) => tokens_to_string(tokens),
        };
        if key_text.contains(MAYBE_CONTENT) {
            let pair = Rc::make_mut(expanded);
            pair.key = AttrValue::Text(key_text);
            self.synthetic.push(Kv::new(KEY_AFFECTED, pair.value.clone()));
            return AttrValue::from(KEY_AFFECTED);
        }

        let stripped = strip_meta_tags(&new_key, self.options.wrap_templates);
        let mut key = stripped.value.clone();
        let mut content_type = ContentType::ObjectAttrKey;

        if stripped.object_type.is_some() && expanded.value.is_empty_text() {
            // A template may produce a whole `k="v"` fragment, e.g. `<div {{GetStyle}}>`.
            if let Some((split_key, split_value)) = infer_key_value(&key) {
                content_type = ContentType::ObjectAttr;
                key = AttrValue::Text(split_key);
                Rc::make_mut(expanded).value = split_value;
            }
        }
        Rc::make_mut(expanded).key = key.clone();

        if let Some(object_type) = stripped.object_type {
            self.markers.push(make_tpl_affected_meta(
                content_type,
                key.clone(),
                &object_type,
                stripped.value,
                new_key,
            ));
            self.producer = Some(object_type);
        }
        key
    }

    /// Value that went through expansion under an ordinary key.
    fn reconcile_value(&mut self, key: &AttrValue, expanded: &mut Rc<Kv>) {
        let raw = expanded.value.clone();
        let stripped = strip_meta_tags(&raw, self.options.wrap_templates);
        Rc::make_mut(expanded).value = stripped.value.clone();

        if let Some(object_type) = stripped.object_type {
            self.markers.push(make_tpl_affected_meta(
                ContentType::ObjectAttrVal,
                key.clone(),
                &object_type,
                stripped.value,
                raw,
            ));
            self.producer = Some(object_type);
        }
    }

    /// Value under a deferred-role key: keep it unstripped on the pair and package both forms.
    ///
    /// Link and category handlers decide later which form applies.
    fn package_deferred_value(&mut self, key: &AttrValue, expanded: &Kv) {
        let stripped = strip_meta_tags(&expanded.value, self.options.wrap_templates);
        if let Some(object_type) = stripped.object_type {
            let marker = make_tpl_affected_meta(
                ContentType::ObjectAttrVal,
                key.clone(),
                &object_type,
                stripped.value,
                expanded.value.clone(),
            );
            self.synthetic.push(Kv::new(
                VAL_AFFECTED,
                vec![Token::Text(object_type), Token::Meta(marker)],
            ));
        }
    }
}
