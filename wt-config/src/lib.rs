//! Configuration loader for wikitext token transforms.
//!
//! `defaults/wt.default.toml` is embedded into the crate so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`WtConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;
use wt_parser::wt::env::ParseEnv;
use wt_parser::wt::token::{KindFilter, TokenKind};
use wt_parser::wt::transforms::standard::pipeline_with;
use wt_parser::wt::transforms::{ExpansionOptions, Pipeline, TokenHandler};

const DEFAULT_TOML: &str = include_str!("../defaults/wt.default.toml");

/// Top-level configuration of a transform session.
#[derive(Debug, Clone, Deserialize)]
pub struct WtConfig {
    pub expansion: ExpansionConfig,
    pub pipeline: PipelineConfig,
    pub ids: IdsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    pub wrap_templates: bool,
}

/// Handler ranks.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub template_rank: f64,
    pub attribute_expander_rank: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdsConfig {
    pub prefix: String,
}

impl WtConfig {
    pub fn expansion_options(&self) -> ExpansionOptions {
        ExpansionOptions {
            wrap_templates: self.expansion.wrap_templates,
        }
    }

    /// A fresh parse session using the configured id prefix.
    pub fn env(&self) -> ParseEnv {
        ParseEnv::with_id_prefix(self.ids.prefix.clone())
    }

    /// The standard pipeline for a fresh session, with the configured options and ranks.
    ///
    /// Template handlers are registered by the caller, see [`WtConfig::register_template_handler`].
    pub fn build_pipeline(&self) -> Pipeline {
        pipeline_with(
            Rc::new(self.env()),
            self.expansion_options(),
            self.pipeline.attribute_expander_rank,
        )
    }

    /// Register a template handler at [`PipelineConfig::template_rank`].
    ///
    /// Template tokens are self-closing, so the handler only sees self-closing tags.
    pub fn register_template_handler(
        &self,
        pipeline: &Pipeline,
        handler: Rc<dyn TokenHandler>,
        name: &str,
    ) {
        pipeline.register(
            handler,
            name,
            self.pipeline.template_rank,
            KindFilter::Only(TokenKind::SelfClosing),
        );
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override, e.g. `expansion.wrap_templates`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<WtConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<WtConfig, ConfigError> {
    Loader::new().build()
}
