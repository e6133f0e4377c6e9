//! Registered pipeline stages

pub mod attribute_expander;

pub use attribute_expander::AttributeExpander;
