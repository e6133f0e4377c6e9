//! Standard handler set
//!
//! Builds a pipeline with the stages this crate provides. Collaborators that live elsewhere
//! (tokenizer output, template and extension handlers) register on the returned pipeline at
//! their own ranks.

use super::stages::attribute_expander::{self, AttributeExpander};
use super::{ExpansionOptions, Pipeline, Rank};
use crate::wt::env::ParseEnv;
use std::rc::Rc;

/// A fresh session with the attribute expander at its usual rank.
pub fn standard_pipeline(options: ExpansionOptions) -> Pipeline {
    pipeline_with(Rc::new(ParseEnv::new()), options, attribute_expander::RANK)
}

/// Like [`standard_pipeline`] with an explicit session and expander rank.
pub fn pipeline_with(
    env: Rc<ParseEnv>,
    options: ExpansionOptions,
    expander_rank: Rank,
) -> Pipeline {
    let pipeline = Pipeline::new(env, options);
    AttributeExpander::register(&pipeline, options, expander_rank);
    pipeline
}
