//! Backend provider selection

use serde::{Deserialize, Serialize};

use crate::constants::{endpoints, timeouts};
use crate::ConfigError;

/// Which implementation backs a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Generic JSON/WAV over HTTP
    Http,
    /// OpenAI-compatible chat completions (responder only)
    OpenAi,
    /// Canned output, for demos and smoke tests
    Static,
    /// Capability disabled
    #[default]
    None,
}

/// One provider instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    /// Voice name passed to synthesis providers
    pub voice: Option<String>,
    /// Sample rate of raw PCM16 returned by a synthesis provider
    pub output_sample_rate: u32,
    /// Text returned by a static provider
    pub static_text: Option<String>,
    pub timeout_ms: u64,
    /// Provider tried when this one fails
    pub fallback: Option<Box<ProviderConfig>>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::None,
            endpoint: None,
            api_key: None,
            model: None,
            voice: None,
            output_sample_rate: 16000,
            static_text: None,
            timeout_ms: timeouts::STT_TIMEOUT_MS,
            fallback: None,
        }
    }
}

impl ProviderConfig {
    pub fn endpoint_or_default(&self) -> &str {
        match self.kind {
            ProviderKind::OpenAi => self.endpoint.as_deref().unwrap_or(endpoints::OPENAI_DEFAULT),
            _ => self.endpoint.as_deref().unwrap_or_default(),
        }
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(endpoints::OPENAI_MODEL)
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if self.kind == ProviderKind::Http && self.endpoint.is_none() {
            return Err(ConfigError::MissingField(format!("{}.endpoint", field)));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.timeout_ms", field),
                message: "must be greater than zero".to_string(),
            });
        }
        if let Some(fallback) = &self.fallback {
            fallback.validate(&format!("{}.fallback", field))?;
        }
        Ok(())
    }
}

/// Providers per capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub transcriber: ProviderConfig,
    pub synthesizer: ProviderConfig,
    pub responder: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            transcriber: ProviderConfig::default(),
            synthesizer: ProviderConfig {
                timeout_ms: timeouts::TTS_TIMEOUT_MS,
                ..ProviderConfig::default()
            },
            responder: ProviderConfig {
                kind: ProviderKind::Static,
                static_text: Some("Sorry, I can't help with that right now.".to_string()),
                timeout_ms: timeouts::LLM_REQUEST_MS,
                ..ProviderConfig::default()
            },
        }
    }
}

impl ProvidersConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.transcriber.validate("providers.transcriber")?;
        self.synthesizer.validate("providers.synthesizer")?;
        self.responder.validate("providers.responder")?;
        if self.transcriber.kind == ProviderKind::OpenAi
            || self.synthesizer.kind == ProviderKind::OpenAi
        {
            return Err(ConfigError::InvalidValue {
                field: "providers".to_string(),
                message: "the openai provider only backs the responder".to_string(),
            });
        }
        Ok(())
    }
}

/// Knowledge base lookup settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    /// Answers at or above this confidence are used without the model
    pub sufficient_confidence: f32,
    pub timeout_ms: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            sufficient_confidence: 0.8,
            timeout_ms: timeouts::KNOWLEDGE_TIMEOUT_MS,
        }
    }
}

impl KnowledgeConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.endpoint.is_none() {
            return Err(ConfigError::MissingField("knowledge.endpoint".to_string()));
        }
        if !(0.0..=1.0).contains(&self.sufficient_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "knowledge.sufficient_confidence".to_string(),
                message: format!("must be within [0, 1], got {}", self.sufficient_confidence),
            });
        }
        Ok(())
    }
}
