//! Handler registry and dispatcher
//!
//! [`Pipeline`] is a cheap, clonable handle to one parse session's handler set. Handlers are kept
//! sorted by rank, equal ranks in registration order. A token is offered to the first handler
//! whose filter accepts it; each token that handler returns is then offered to the handlers
//! that come after it in that order, and so on until no handler is left. Output order always follows input order, no matter
//! in which order asynchronous handlers finish.

use super::join::Join;
use super::{
    Completion, ExpansionOptions, Frame, HandlerResult, Runnable, TokenHandler, TransformError,
};
use crate::wt::env::ParseEnv;
use crate::wt::token::{KindFilter, Token};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Position of a handler in the pipeline. Lower ranks run first.
pub type Rank = f64;

struct Registration {
    name: String,
    rank: Rank,
    /// Registration order, breaks ties between equal ranks
    seq: u64,
    filter: KindFilter,
    handler: Rc<dyn TokenHandler>,
}

struct PipelineInner {
    env: Rc<ParseEnv>,
    options: ExpansionOptions,
    handlers: RefCell<Vec<Registration>>,
    next_seq: Cell<u64>,
}

/// Where a token stands in the handler order: after the handler with this rank and sequence.
type Position = (Rank, u64);

impl Registration {
    fn comes_after(&self, position: Option<Position>) -> bool {
        match position {
            None => true,
            Some((rank, seq)) => match self.rank.total_cmp(&rank) {
                std::cmp::Ordering::Greater => true,
                std::cmp::Ordering::Equal => self.seq > seq,
                std::cmp::Ordering::Less => false,
            },
        }
    }
}

#[derive(Clone)]
pub struct Pipeline {
    inner: Rc<PipelineInner>,
}

impl Pipeline {
    pub fn new(env: Rc<ParseEnv>, options: ExpansionOptions) -> Self {
        Self {
            inner: Rc::new(PipelineInner {
                env,
                options,
                handlers: RefCell::new(Vec::new()),
                next_seq: Cell::new(0),
            }),
        }
    }

    pub fn env(&self) -> &Rc<ParseEnv> {
        &self.inner.env
    }

    /// Options used by [`Pipeline::process`].
    pub fn options(&self) -> ExpansionOptions {
        self.inner.options
    }

    /// Register `handler` at `rank`. Handlers with equal rank run in registration order.
    pub fn register(
        &self,
        handler: Rc<dyn TokenHandler>,
        name: impl Into<String>,
        rank: Rank,
        filter: KindFilter,
    ) {
        let name = name.into();
        let seq = self.inner.next_seq.get();
        self.inner.next_seq.set(seq + 1);
        tracing::trace!(handler = %name, rank, "registering handler");
        let mut handlers = self.inner.handlers.borrow_mut();
        let position = handlers
            .iter()
            .position(|r| r.rank.total_cmp(&rank).is_gt())
            .unwrap_or(handlers.len());
        handlers.insert(
            position,
            Registration {
                name,
                rank,
                seq,
                filter,
                handler,
            },
        );
    }

    /// Registered handler names, in dispatch order.
    pub fn handler_names(&self) -> Vec<String> {
        self.inner
            .handlers
            .borrow()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    /// Run one token through every handler.
    pub fn dispatch(&self, token: Token, done: Completion<Vec<Token>>) {
        self.transform_token(token, self.options(), None, done);
    }

    /// Run a token stream through every handler with the session options.
    pub fn process(&self, tokens: Vec<Token>, done: Completion<Vec<Token>>) {
        self.process_with(tokens, self.options(), done);
    }

    /// Run a token stream through every handler with explicit options.
    ///
    /// This is also the entry point for nested runs, e.g. over an attribute value.
    pub fn process_with(
        &self,
        tokens: Vec<Token>,
        options: ExpansionOptions,
        done: Completion<Vec<Token>>,
    ) {
        self.transform_tokens(tokens, options, None, done);
    }

    fn transform_tokens(
        &self,
        tokens: Vec<Token>,
        options: ExpansionOptions,
        after: Option<Position>,
        done: Completion<Vec<Token>>,
    ) {
        let flatten = Completion::new(move |result: Result<Vec<Vec<Token>>, TransformError>| {
            done.complete(result.map(|chunks| chunks.into_iter().flatten().collect()));
        });
        let join = Join::new(tokens.len(), flatten);
        for (i, token) in tokens.into_iter().enumerate() {
            self.transform_token(token, options, after, join.slot(i));
        }
    }

    fn transform_token(
        &self,
        token: Token,
        options: ExpansionOptions,
        after: Option<Position>,
        done: Completion<Vec<Token>>,
    ) {
        let kind = token.kind();
        let next = {
            let handlers = self.inner.handlers.borrow();
            handlers
                .iter()
                .find(|r| r.comes_after(after) && r.filter.matches(kind))
                .map(|r| (Rc::clone(&r.handler), (r.rank, r.seq), r.name.clone()))
        };

        let Some((handler, position, name)) = next else {
            done.complete(Ok(vec![token]));
            return;
        };

        tracing::trace!(handler = %name, rank = position.0, ?kind, "dispatching token");
        let pipeline = self.clone();
        let resume = Completion::new(move |result| match result {
            Ok(tokens) => pipeline.transform_tokens(tokens, options, Some(position), done),
            Err(err) => {
                done.complete(Err(err));
            }
        });

        let frame = Frame::new(self.clone(), options);
        match handler.on_token(token, &frame, resume.clone()) {
            HandlerResult::Tokens(tokens) => {
                resume.complete(Ok(tokens));
            }
            HandlerResult::Failed(err) => {
                resume.complete(Err(err));
            }
            HandlerResult::Async => {}
        }
    }
}

/// Synchronous driver: succeeds only if every handler completed before `run` returns.
impl Runnable<Vec<Token>, Vec<Token>> for Pipeline {
    fn run(&self, input: Vec<Token>) -> Result<Vec<Token>, TransformError> {
        let output = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&output);
        self.process(
            input,
            Completion::new(move |result| {
                *sink.borrow_mut() = Some(result);
            }),
        );
        let result = output.borrow_mut().take();
        result.unwrap_or(Err(TransformError::Incomplete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wt::token::{Tag, TokenKind};

    fn pipeline() -> Pipeline {
        Pipeline::new(Rc::new(ParseEnv::new()), ExpansionOptions::default())
    }

    fn upper(token: Token, _frame: &Frame) -> Result<Vec<Token>, TransformError> {
        Ok(match token {
            Token::Text(s) => vec![Token::Text(s.to_uppercase())],
            other => vec![other],
        })
    }

    fn split(token: Token, _frame: &Frame) -> Result<Vec<Token>, TransformError> {
        Ok(match token {
            Token::Text(s) => s.chars().map(|c| Token::Text(c.to_string())).collect(),
            other => vec![other],
        })
    }

    #[test]
    fn test_handlers_sorted_by_rank() {
        let p = pipeline();
        p.register(Rc::new(upper), "b", 2.0, KindFilter::Any);
        p.register(Rc::new(upper), "a", 1.0, KindFilter::Any);
        p.register(Rc::new(upper), "b2", 2.0, KindFilter::Any);
        assert_eq!(p.handler_names(), vec!["a", "b", "b2"]);
    }

    #[test]
    fn test_equal_ranks_run_in_registration_order() {
        let p = pipeline();
        let hits = Rc::new(RefCell::new(Vec::new()));
        for name in ["a", "b"] {
            let sink = Rc::clone(&hits);
            p.register(
                Rc::new(move |t: Token, _f: &Frame| -> Result<Vec<Token>, TransformError> {
                    sink.borrow_mut().push(name);
                    Ok(vec![t])
                }),
                name,
                1.0,
                KindFilter::Any,
            );
        }

        let out = p.run(vec![Token::text("x")]).unwrap();
        assert_eq!(out, vec![Token::text("x")]);
        assert_eq!(*hits.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_output_flows_to_later_handlers() {
        let p = pipeline();
        p.register(Rc::new(split), "split", 1.0, KindFilter::Any);
        p.register(Rc::new(upper), "upper", 2.0, KindFilter::Any);

        let out = p.run(vec![Token::text("ab"), Token::Newline]).unwrap();
        assert_eq!(out, vec![Token::text("A"), Token::text("B"), Token::Newline]);
    }

    #[test]
    fn test_output_does_not_revisit_earlier_handlers() {
        let p = pipeline();
        // upper runs first; split output must not be uppercased again by a lower rank
        p.register(Rc::new(upper), "upper", 1.0, KindFilter::Any);
        p.register(Rc::new(split), "split", 2.0, KindFilter::Any);
        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        p.register(
            Rc::new(move |t: Token, _f: &Frame| -> Result<Vec<Token>, TransformError> {
                *counter.borrow_mut() += 1;
                Ok(vec![t])
            }),
            "count",
            3.0,
            KindFilter::Any,
        );

        let out = p.run(vec![Token::text("ab")]).unwrap();
        assert_eq!(out, vec![Token::text("A"), Token::text("B")]);
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn test_kind_filter() {
        let p = pipeline();
        p.register(Rc::new(upper), "upper", 1.0, KindFilter::Only(TokenKind::Comment));
        let out = p.run(vec![Token::text("a")]).unwrap();
        assert_eq!(out, vec![Token::text("a")]);
    }

    #[test]
    fn test_failure_propagates() {
        let p = pipeline();
        p.register(
            Rc::new(|_t: Token, _f: &Frame| -> Result<Vec<Token>, TransformError> {
                Err(TransformError::StageFailed {
                    stage: "boom".into(),
                    message: "no".into(),
                })
            }),
            "boom",
            1.0,
            KindFilter::Any,
        );
        let err = p.run(vec![Token::text("a"), Token::text("b")]).unwrap_err();
        assert!(matches!(err, TransformError::StageFailed { .. }));
    }

    struct Parked {
        parked: RefCell<Vec<(Completion<Vec<Token>>, Token)>>,
    }

    impl TokenHandler for Parked {
        fn on_token(
            &self,
            token: Token,
            _frame: &Frame,
            done: Completion<Vec<Token>>,
        ) -> HandlerResult {
            self.parked.borrow_mut().push((done, token));
            HandlerResult::Async
        }
    }

    #[test]
    fn test_async_completion_preserves_order() {
        let p = pipeline();
        let parked = Rc::new(Parked {
            parked: RefCell::new(Vec::new()),
        });
        p.register(parked.clone(), "parked", 1.0, KindFilter::Only(TokenKind::Text));

        let output = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&output);
        p.process(
            vec![Token::text("a"), Token::Newline, Token::text("b")],
            Completion::new(move |r| *sink.borrow_mut() = Some(r)),
        );
        assert!(output.borrow().is_none());

        let pending = std::mem::take(&mut *parked.parked.borrow_mut());
        for (done, token) in pending.into_iter().rev() {
            done.complete(Ok(vec![token]));
        }

        let result = output.borrow_mut().take().unwrap().unwrap();
        assert_eq!(result, vec![Token::text("a"), Token::Newline, Token::text("b")]);
    }

    #[test]
    fn test_run_reports_incomplete() {
        let p = pipeline();
        p.register(
            Rc::new(Parked {
                parked: RefCell::new(Vec::new()),
            }),
            "parked",
            1.0,
            KindFilter::Any,
        );
        assert_eq!(
            p.run(vec![Token::TagOpen(Tag::new("div", vec![]))]),
            Err(TransformError::Incomplete)
        );
    }
}
