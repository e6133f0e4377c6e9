//! Attribute Transform Manager
//!
//! Expands every key and value of an attribute list by running it through the whole pipeline
//! as an independent token stream. All nested runs are started before any of them has to finish;
//! results are gathered per position and handed to the caller once, in the original order.
//!
//! Pairs with nothing to expand (both sides plain text) are returned as the same `Rc`, so the
//! caller can tell them apart from freshly built pairs with `Rc::ptr_eq`. Expanded pairs are new
//! `Kv`s holding only the expanded key and value; copying source pointers over is left to the
//! caller.

use super::join::Join;
use super::{Completion, ExpansionOptions, Frame, Pipeline, TransformError};
use crate::wt::token::{tokens_to_string, AttrValue, Kv};
use std::rc::Rc;

pub struct AttributeTransformManager {
    pipeline: Pipeline,
    options: ExpansionOptions,
}

impl AttributeTransformManager {
    /// `options` are passed unchanged to every nested run.
    pub fn new(frame: &Frame, options: ExpansionOptions) -> Self {
        Self {
            pipeline: frame.pipeline().clone(),
            options,
        }
    }

    /// Expand `attribs` and deliver a list of the same length to `done`.
    pub fn process(&self, attribs: &[Rc<Kv>], done: Completion<Vec<Rc<Kv>>>) {
        let join = Join::new(attribs.len(), done);
        for (i, kv) in attribs.iter().enumerate() {
            let slot = join.slot(i);
            if kv.needs_expansion() {
                self.expand_pair(kv, slot);
            } else {
                slot.complete(Ok(Rc::clone(kv)));
            }
        }
    }

    fn expand_pair(&self, kv: &Kv, slot: Completion<Rc<Kv>>) {
        let key_label = match &kv.key {
            AttrValue::Text(s) => s.clone(),
            AttrValue::Tokens(tokens) => tokens_to_string(tokens),
        };
        let halves = Completion::new(move |result: Result<Vec<AttrValue>, TransformError>| {
            let pair = result
                .map_err(|err| TransformError::NestedExpansion {
                    key: key_label,
                    source: Box::new(err),
                })
                .map(|halves| {
                    let mut halves = halves.into_iter();
                    let key = halves.next().unwrap_or_default();
                    let value = halves.next().unwrap_or_default();
                    Rc::new(Kv::new(key, value))
                });
            slot.complete(pair);
        });

        let join = Join::new(2, halves);
        self.expand_value(&kv.key, join.slot(0));
        self.expand_value(&kv.value, join.slot(1));
    }

    fn expand_value(&self, value: &AttrValue, slot: Completion<AttrValue>) {
        match value {
            AttrValue::Text(_) => {
                slot.complete(Ok(value.clone()));
            }
            AttrValue::Tokens(tokens) => {
                self.pipeline.process_with(
                    tokens.clone(),
                    self.options,
                    Completion::new(move |result| {
                        slot.complete(result.map(AttrValue::Tokens));
                    }),
                );
            }
        }
    }
}
