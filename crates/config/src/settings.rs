//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::server;
use crate::pipeline::validate_pipeline;
use crate::{
    AudioConfig, BargeInConfig, ConfigError, KnowledgeConfig, ProvidersConfig, StreamerConfig,
    TranscriptionConfig, TurnTakingConfig, VadConfig,
};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub vad: VadConfig,

    #[serde(default)]
    pub turn_taking: TurnTakingConfig,

    #[serde(default)]
    pub barge_in: BargeInConfig,

    #[serde(default)]
    pub transcription: TranscriptionConfig,

    #[serde(default)]
    pub streamer: StreamerConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Upper bound on concurrent sessions (0 = unlimited)
    #[serde(default)]
    pub max_sessions: usize,
}

fn default_host() -> String {
    server::HOST.to_string()
}

fn default_port() -> u16 {
    server::PORT
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_sessions: 0,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        validate_pipeline(
            &self.audio,
            &self.vad,
            &self.turn_taking,
            &self.barge_in,
            &self.transcription,
            &self.streamer,
        )?;
        self.providers.validate()?;
        self.knowledge.validate()?;

        if self.environment.is_production() && self.server.cors_origins.is_empty() {
            tracing::warn!("CORS allows any origin in production");
        }
        Ok(())
    }
}

/// Load settings from `config/` relative to the working directory
///
/// Priority (highest to lowest):
/// 1. Environment variables (VOICE_GATEWAY_ prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Load settings from an explicit config directory
pub fn load_settings_from(dir: impl AsRef<Path>, env: Option<&str>) -> Result<Settings, ConfigError> {
    let dir = dir.as_ref();
    let mut builder = Config::builder();

    builder = builder
        .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false));

    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&dir.join(env_name).to_string_lossy()).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("VOICE_GATEWAY")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DecayMode, ProviderKind};
    use std::fs;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.audio.recognition_sample_rate, 8000);
        assert_eq!(settings.audio.playback_sample_rate, 16000);
        assert!(settings.barge_in.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_vad_weights_must_sum_to_one() {
        let mut settings = Settings::default();
        settings.vad.energy_weight = 0.9;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_trailing_context_shorter_than_interval() {
        let mut settings = Settings::default();
        settings.transcription.trailing_context_ms = settings.transcription.partial_interval_ms;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_low_confidence_multiplier_must_be_finite_and_at_least_one() {
        for bad in [-1.0, 0.5, f32::NAN, f32::INFINITY] {
            let mut settings = Settings::default();
            settings.turn_taking.low_confidence_multiplier = bad;
            assert!(settings.validate().is_err(), "accepted {}", bad);
        }
        let mut settings = Settings::default();
        settings.turn_taking.low_confidence_multiplier = 1.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_engine_sample_rates_within_accepted_range() {
        let mut settings = Settings::default();
        settings.audio.playback_sample_rate = 96000;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.audio.min_sample_rate = 16000;
        settings.audio.max_sample_rate = 8000;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_http_provider_needs_endpoint() {
        let mut settings = Settings::default();
        settings.providers.transcriber.kind = ProviderKind::Http;
        assert!(settings.validate().is_err());
        settings.providers.transcriber.endpoint = Some("http://localhost:9000/stt".into());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_layers_env_file_over_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.yaml"),
            "server:\n  port: 9100\nturn_taking:\n  settle_delay_ms: 700\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("staging.yaml"),
            "environment: staging\nserver:\n  port: 9200\nbarge_in:\n  decay:\n    mode: linear\n    step: 0.25\n",
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), Some("staging")).unwrap();
        assert_eq!(settings.environment, RuntimeEnvironment::Staging);
        assert_eq!(settings.server.port, 9200);
        assert_eq!(settings.turn_taking.settle_delay_ms, 700);
        assert_eq!(settings.turn_taking.finalize_delay_ms, 300);
        assert_eq!(settings.barge_in.decay, DecayMode::Linear { step: 0.25 });
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(dir.path(), None).unwrap();
        assert_eq!(settings.server.port, 8080);
    }
}
