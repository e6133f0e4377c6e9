//! Token transform infrastructure
//!
//! Stages of the pipeline are token handlers registered on a [`Pipeline`] at a rank. The
//! pipeline feeds every token to the lowest-ranked handler that wants it, and feeds whatever that
//! handler produces to the handlers ranked after it.
//!
//! # Handlers and continuations
//!
//! A handler is anything implementing [`TokenHandler`]. It receives the token, a [`Frame`]
//! (access to the pipeline, the parse session and the expansion options) and a [`Completion`]:
//!
//! ```rust,ignore
//! impl TokenHandler for MyStage {
//!     fn on_token(&self, token: Token, frame: &Frame, done: Completion<Vec<Token>>) -> HandlerResult {
//!         if !interesting(&token) {
//!             return HandlerResult::Tokens(vec![token]);   // synchronous answer
//!         }
//!         start_work(token, move |result| { done.complete(result); });
//!         HandlerResult::Async                            // answer arrives through `done`
//!     }
//! }
//! ```
//!
//! A [`Completion`] fires at most once. Cloning it hands out another handle to the same
//! continuation; whichever handle fires first wins and the rest become no-ops.
//!
//! # Joins
//!
//! Work that fans out (every attribute of a tag, every token of a stream) is gathered with a
//! [`Join`]: N slots, filled in any order, delivered once, in slot order, when the last slot
//! arrives. A failed slot fails the whole join immediately.
//!
//! # Module Organization
//!
//! - [`manager`]: the handler registry and dispatcher ([`Pipeline`])
//! - [`join`]: counting join over completions
//! - [`attributes`]: expansion of attribute keys and values through nested pipeline runs
//! - [`provenance`]: marker stripping, marker synthesis and "k=v" inference
//! - [`stages`]: registered handlers (the attribute expander)
//! - [`standard`]: the standard handler set

pub mod attributes;
pub mod join;
pub mod manager;
pub mod provenance;
pub mod stages;
pub mod standard;

pub use join::Join;
pub use manager::{Pipeline, Rank};

use crate::wt::env::ParseEnv;
use crate::wt::token::Token;
use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;
use thiserror::Error;

/// Error that can occur during transformation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Expanded attribute list does not line up with the original one
    #[error("malformed <{tag}> token: expected {expected} expanded attributes, got {actual} (source {offsets:?})")]
    MalformedToken {
        tag: String,
        expected: usize,
        actual: usize,
        offsets: Option<Range<usize>>,
    },
    /// A nested pipeline run for an attribute key or value failed
    #[error("expansion of attribute '{key}' failed")]
    NestedExpansion {
        key: String,
        #[source]
        source: Box<TransformError>,
    },
    /// Processing of a tag token failed
    #[error("attribute expansion of <{tag}> failed (source {offsets:?})")]
    TokenFailed {
        tag: String,
        offsets: Option<Range<usize>>,
        #[source]
        source: Box<TransformError>,
    },
    /// A registered handler reported failure
    #[error("handler '{handler}' failed: {message}")]
    Handler { handler: String, message: String },
    /// Stage failed with specific error
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },
    /// A synchronous run returned before every continuation fired
    #[error("pipeline did not complete synchronously")]
    Incomplete,
}

/// Trait for anything that can transform an input to an output synchronously
pub trait Runnable<I, O> {
    /// Execute this transformation on the input
    fn run(&self, input: I) -> Result<O, TransformError>;
}

type Callback<T> = Box<dyn FnOnce(Result<T, TransformError>)>;

/// Single-fire continuation.
pub struct Completion<T> {
    slot: Rc<RefCell<Option<Callback<T>>>>,
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: 'static> Completion<T> {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(Result<T, TransformError>) + 'static,
    {
        Self {
            slot: Rc::new(RefCell::new(Some(Box::new(callback)))),
        }
    }

    /// Deliver the result. Returns false when the continuation had already fired.
    pub fn complete(self, result: Result<T, TransformError>) -> bool {
        let callback = self.slot.borrow_mut().take();
        match callback {
            Some(callback) => {
                callback(result);
                true
            }
            None => {
                tracing::trace!("ignoring result for a completion that already fired");
                false
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.slot.borrow().is_none()
    }
}

/// What a handler did with a token.
#[derive(Debug)]
pub enum HandlerResult {
    /// Replacement tokens, available right away
    Tokens(Vec<Token>),
    /// The handler kept the completion and will fire it later
    Async,
    /// The handler could not process the token
    Failed(TransformError),
}

/// Options that travel with a pipeline run and into its nested runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionOptions {
    /// Wrap expanded templates in `mw:Object/...` meta tags
    pub wrap_templates: bool,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            wrap_templates: true,
        }
    }
}

/// Context handed to handlers along with each token.
#[derive(Clone)]
pub struct Frame {
    pipeline: Pipeline,
    options: ExpansionOptions,
}

impl Frame {
    pub fn new(pipeline: Pipeline, options: ExpansionOptions) -> Self {
        Self { pipeline, options }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn env(&self) -> &Rc<ParseEnv> {
        self.pipeline.env()
    }

    pub fn options(&self) -> ExpansionOptions {
        self.options
    }
}

/// A pipeline stage.
pub trait TokenHandler {
    fn on_token(&self, token: Token, frame: &Frame, done: Completion<Vec<Token>>)
        -> HandlerResult;
}

/// Plain functions and closures work as synchronous handlers.
impl<F> TokenHandler for F
where
    F: Fn(Token, &Frame) -> Result<Vec<Token>, TransformError>,
{
    fn on_token(
        &self,
        token: Token,
        frame: &Frame,
        _done: Completion<Vec<Token>>,
    ) -> HandlerResult {
        match self(token, frame) {
            Ok(tokens) => HandlerResult::Tokens(tokens),
            Err(err) => HandlerResult::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_completion_fires_once() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let done: Completion<u32> = Completion::new(move |result| sink.borrow_mut().push(result));
        let twin = done.clone();

        assert!(!done.is_complete());
        assert!(done.clone().complete(Ok(1)));
        assert!(!twin.clone().complete(Ok(2)));
        assert!(twin.is_complete());
        assert_eq!(*calls.borrow(), vec![Ok(1)]);
    }

    #[test]
    fn test_error_display() {
        let err = TransformError::Handler {
            handler: "TemplateStub".to_string(),
            message: "unknown template 'T'".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "handler 'TemplateStub' failed: unknown template 'T'"
        );

        let stage_err = TransformError::StageFailed {
            stage: "tokenization".to_string(),
            message: "invalid token".to_string(),
        };
        assert_eq!(
            format!("{}", stage_err),
            "Stage 'tokenization' failed: invalid token"
        );
    }

    #[test]
    fn test_nested_error_source() {
        let inner = TransformError::Incomplete;
        let err = TransformError::NestedExpansion {
            key: "title".to_string(),
            source: Box::new(inner.clone()),
        };
        assert_eq!(format!("{}", err), "expansion of attribute 'title' failed");
        assert_eq!(err.source().map(|s| s.to_string()), Some(inner.to_string()));
    }
}
