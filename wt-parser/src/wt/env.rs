//! Parse session state
//!
//! A [`ParseEnv`] is created when a parse starts and dropped when it ends. Stages receive it by
//! reference (through the pipeline [`Frame`](crate::wt::transforms::Frame)); nothing in the crate
//! keeps ids in a global.

use std::cell::Cell;

pub const DEFAULT_ID_PREFIX: &str = "mwt";

#[derive(Debug)]
pub struct ParseEnv {
    id_prefix: String,
    next_uid: Cell<u64>,
}

impl ParseEnv {
    pub fn new() -> Self {
        Self::with_id_prefix(DEFAULT_ID_PREFIX)
    }

    pub fn with_id_prefix(prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: prefix.into(),
            next_uid: Cell::new(1),
        }
    }

    /// Allocate a fresh object id (`mwt1`, `mwt2`, ...).
    ///
    /// Handlers run on one thread, one at a time, so a plain increment is enough.
    pub fn new_object_id(&self) -> String {
        let uid = self.next_uid.get();
        self.next_uid.set(uid + 1);
        format!("{}{}", self.id_prefix, uid)
    }

    /// Allocate a fresh `about` id (`#mwt1`, ...).
    pub fn new_about_id(&self) -> String {
        format!("#{}", self.new_object_id())
    }

    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }
}

impl Default for ParseEnv {
    fn default() -> Self {
        Self::new()
    }
}
