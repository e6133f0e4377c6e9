//! Counting join over completions

use super::{Completion, TransformError};
use std::cell::RefCell;
use std::rc::Rc;

/// Gathers `len` results delivered in any order.
///
/// Each slot hands out a [`Completion`]. When the last slot is filled the joined completion
/// receives all values in slot order. The first failure is delivered immediately and every
/// later result is dropped. A join of length zero completes as soon as it is created.
pub struct Join<T> {
    state: Rc<RefCell<JoinState<T>>>,
}

struct JoinState<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
    done: Option<Completion<Vec<T>>>,
}

impl<T: 'static> Join<T> {
    pub fn new(len: usize, done: Completion<Vec<T>>) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        let done = if len == 0 {
            done.complete(Ok(Vec::new()));
            None
        } else {
            Some(done)
        };
        Self {
            state: Rc::new(RefCell::new(JoinState {
                slots,
                remaining: len,
                done,
            })),
        }
    }

    /// Completion for slot `index`.
    pub fn slot(&self, index: usize) -> Completion<T> {
        let state = Rc::clone(&self.state);
        Completion::new(move |result| fill(&state, index, result))
    }

    pub fn len(&self) -> usize {
        self.state.borrow().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn fill<T: 'static>(
    state: &RefCell<JoinState<T>>,
    index: usize,
    result: Result<T, TransformError>,
) {
    let ready = {
        let mut guard = state.borrow_mut();
        let state = &mut *guard;
        if state.done.is_none() {
            return;
        }
        match result {
            Err(err) => state.done.take().map(|done| (done, Err(err))),
            Ok(value) => match state.slots.get_mut(index) {
                Some(slot) if slot.is_none() => {
                    *slot = Some(value);
                    state.remaining -= 1;
                    if state.remaining == 0 {
                        let values = state.slots.iter_mut().filter_map(Option::take).collect();
                        state.done.take().map(|done| (done, Ok(values)))
                    } else {
                        None
                    }
                }
                // out of range or filled twice
                _ => None,
            },
        }
    };

    if let Some((done, result)) = ready {
        done.complete(result);
    }
}
