//! Configuration management for the voice gateway
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, `config/{env}.yaml`)
//! - Environment variables (VOICE_GATEWAY_ prefix)
//!
//! Engine tunables live in [`pipeline`], backend selection in [`providers`].

pub mod constants;
pub mod pipeline;
pub mod providers;
pub mod settings;

pub use pipeline::{
    AudioConfig, BargeInConfig, DecayMode, StreamerConfig, TranscriptionConfig,
    TurnTakingConfig, VadConfig,
};
pub use providers::{KnowledgeConfig, ProviderConfig, ProviderKind, ProvidersConfig};
pub use settings::{
    load_settings, load_settings_from, ObservabilityConfig, RuntimeEnvironment, ServerConfig,
    Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for voice_gateway_core::Error {
    fn from(err: ConfigError) -> Self {
        voice_gateway_core::Error::Config(err.to_string())
    }
}
