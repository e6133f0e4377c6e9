//! Testing utilities for token pipelines
//!
//! # Writing stage tests
//!
//! Stages are asynchronous and recursive: the attribute expander feeds attribute content back
//! into the pipeline it runs in. To test a stage in isolation you need a pipeline with a
//! collaborator that expands something, and a way to look at the resulting token stream.
//!
//! 1. **[TemplateStub]** - A stand-in template handler with canned bodies. It wraps its output in
//!    `mw:Object/Template` metas the way the real template handler does, and it can hold its
//!    answers back ([`TemplateStub::deferred`]) so tests can complete them in any order.
//! 2. **[assert_tokens](fn@assert_tokens)** - Fluent assertions over a token stream.
//! 3. **[factories]** - Short constructors for tags, attributes and template tokens.
//!
//! ```rust-example
//! use crate::wt::testing::{assert_tokens, factories::*, TemplateStub};
//!
//! let pipeline = standard_pipeline(ExpansionOptions::default());
//! TemplateStub::new().with_template("T", "b").register(&pipeline);
//!
//! let out = pipeline.run(vec![open("div", vec![Kv::new("k2", vec![template("T")])])])?;
//!
//! assert_tokens(&out)
//!     .count(2)
//!     .token(0, |t| t.assert_marker().content_type(ContentType::ObjectAttrVal).key("k2"))
//!     .token(1, |t| t.assert_tag("div").attribute("k2", "b"))
//!     .share_about();
//! ```

mod assertions;
pub mod factories;
mod template_stub;

pub use assertions::{assert_tokens, MarkerAssertion, TagAssertion, TokenAssertion, TokensAssertion};
pub use template_stub::TemplateStub;
