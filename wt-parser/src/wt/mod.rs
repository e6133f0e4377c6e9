//! Core modules of the wt token pipeline.

pub mod env;
pub mod formats;
pub mod testing;
pub mod token;
pub mod transforms;
