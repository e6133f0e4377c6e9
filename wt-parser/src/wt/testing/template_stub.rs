//! A canned template handler for tests

use super::factories::wrapper_meta;
use crate::wt::token::{KindFilter, Token, TokenKind};
use crate::wt::transforms::{
    Completion, Frame, HandlerResult, Pipeline, Rank, TokenHandler, TransformError,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Where the template handler sits, ahead of attribute expansion.
pub const TEMPLATE_RANK: Rank = 1.1;

type Pending = (Completion<Vec<Token>>, Result<Vec<Token>, TransformError>);

/// Expands `template` tokens (`{{target}}`) to fixed text bodies.
///
/// Unknown targets fail with a [`TransformError::Handler`]. In deferred mode answers are parked
/// until [`TemplateStub::flush`] or [`TemplateStub::flush_reversed`] is called.
#[derive(Default)]
pub struct TemplateStub {
    bodies: HashMap<String, String>,
    deferred: bool,
    pending: RefCell<Vec<Pending>>,
}

impl TemplateStub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, target: &str, body: &str) -> Self {
        self.bodies.insert(target.to_string(), body.to_string());
        self
    }

    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Register on `pipeline` at [`TEMPLATE_RANK`] and keep a handle for flushing.
    pub fn register(self, pipeline: &Pipeline) -> Rc<TemplateStub> {
        self.register_at(pipeline, TEMPLATE_RANK)
    }

    pub fn register_at(self, pipeline: &Pipeline, rank: Rank) -> Rc<TemplateStub> {
        let stub = Rc::new(self);
        pipeline.register(
            stub.clone(),
            "TemplateStub:onTemplate",
            rank,
            KindFilter::Only(TokenKind::SelfClosing),
        );
        stub
    }

    /// Number of parked answers.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Complete parked answers in arrival order.
    pub fn flush(&self) {
        let parked = self.pending.take();
        for (done, result) in parked {
            done.complete(result);
        }
    }

    /// Complete parked answers last-first.
    pub fn flush_reversed(&self) {
        let parked = self.pending.take();
        for (done, result) in parked.into_iter().rev() {
            done.complete(result);
        }
    }

    fn expand(&self, target: &str, frame: &Frame) -> Result<Vec<Token>, TransformError> {
        let body = self
            .bodies
            .get(target)
            .ok_or_else(|| TransformError::Handler {
                handler: "TemplateStub".to_string(),
                message: format!("unknown template '{}'", target),
            })?;

        if !frame.options().wrap_templates {
            return Ok(vec![Token::text(body.as_str())]);
        }
        let about = format!("#{}", frame.env().new_object_id());
        Ok(vec![
            wrapper_meta("mw:Object/Template", &about),
            Token::text(body.as_str()),
            wrapper_meta("mw:Object/Template/End", &about),
        ])
    }
}

impl TokenHandler for TemplateStub {
    fn on_token(
        &self,
        token: Token,
        frame: &Frame,
        done: Completion<Vec<Token>>,
    ) -> HandlerResult {
        let target = match token.as_tag() {
            Some(tag) if tag.name == "template" => tag.get_text_attribute("target"),
            _ => None,
        };
        let Some(target) = target else {
            return HandlerResult::Tokens(vec![token]);
        };

        let result = self.expand(target, frame);
        if self.deferred {
            self.pending.borrow_mut().push((done, result));
            return HandlerResult::Async;
        }
        match result {
            Ok(tokens) => HandlerResult::Tokens(tokens),
            Err(err) => HandlerResult::Failed(err),
        }
    }
}
