//! # wt-parser
//!
//! Token-level building blocks for a wikitext to HTML pipeline.
//!
//! File Layout
//!
//! The crate currently hosts the attribute expansion stage and the pieces it needs to run:
//!
//! src/wt
//!   ├── token        Tag tokens, attribute pairs and provenance markers
//!   ├── env          Per-parse session state (object id allocation)
//!   ├── transforms   Handler registry, continuations, attribute expansion
//!   ├── formats      Serializers for token streams
//!   └── testing      Stand-in collaborators and fluent assertions for tests
//!
//! The tokenizer, template fetching and DOM construction live outside this crate; they talk to
//! it through [`wt::transforms::TokenHandler`] and the token model.

pub mod wt;
