//! Provider factory
//!
//! Builds the capability implementations selected in configuration. A
//! provider with a `fallback` section is wrapped in the matching fallback
//! decorator.

pub mod fallback;
pub mod http;
pub mod local;

pub use fallback::{FallbackResponder, FallbackSynthesizer, FallbackTranscriber};
pub use http::{HttpKnowledgeBase, HttpResponder, HttpSynthesizer, HttpTranscriber, OpenAiResponder};
pub use local::{Disabled, SilenceSynthesizer, StaticResponder, StaticTranscriber};

use std::sync::Arc;
use voice_gateway_config::{KnowledgeConfig, ProviderConfig, ProviderKind};
use voice_gateway_core::{
    BackendError, KnowledgeBase, Responder, Result, Synthesizer, Transcriber,
};

pub fn create_transcriber(config: &ProviderConfig) -> Result<Arc<dyn Transcriber>> {
    let primary: Arc<dyn Transcriber> = match config.kind {
        ProviderKind::Http => Arc::new(HttpTranscriber::new(config)?),
        ProviderKind::Static => Arc::new(StaticTranscriber::new(
            config.static_text.clone().unwrap_or_default(),
        )),
        ProviderKind::None => Arc::new(StaticTranscriber::default()),
        ProviderKind::OpenAi => {
            return Err(BackendError::NotConfigured("openai transcriber".to_string()).into())
        },
    };
    Ok(match &config.fallback {
        Some(fallback) => Arc::new(FallbackTranscriber::new(primary, create_transcriber(fallback)?)),
        None => primary,
    })
}

pub fn create_synthesizer(config: &ProviderConfig) -> Result<Arc<dyn Synthesizer>> {
    let primary: Arc<dyn Synthesizer> = match config.kind {
        ProviderKind::Http => Arc::new(HttpSynthesizer::new(config)?),
        ProviderKind::Static => Arc::new(SilenceSynthesizer::new(config.output_sample_rate)),
        ProviderKind::None => Arc::new(Disabled),
        ProviderKind::OpenAi => {
            return Err(BackendError::NotConfigured("openai synthesizer".to_string()).into())
        },
    };
    Ok(match &config.fallback {
        Some(fallback) => Arc::new(FallbackSynthesizer::new(primary, create_synthesizer(fallback)?)),
        None => primary,
    })
}

pub fn create_responder(config: &ProviderConfig) -> Result<Arc<dyn Responder>> {
    let primary: Arc<dyn Responder> = match config.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiResponder::new(config)?),
        ProviderKind::Http => Arc::new(HttpResponder::new(config)?),
        ProviderKind::Static => Arc::new(StaticResponder::new(
            config.static_text.clone().unwrap_or_default(),
        )),
        ProviderKind::None => Arc::new(Disabled),
    };
    Ok(match &config.fallback {
        Some(fallback) => Arc::new(FallbackResponder::new(primary, create_responder(fallback)?)),
        None => primary,
    })
}

/// `None` when the knowledge base is switched off
pub fn create_knowledge_base(config: &KnowledgeConfig) -> Result<Option<Arc<dyn KnowledgeBase>>> {
    if !config.enabled {
        return Ok(None);
    }
    Ok(Some(Arc::new(HttpKnowledgeBase::new(config)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_gateway_core::ReplyRequest;

    #[tokio::test]
    async fn test_static_responder_with_fallback() {
        let config = ProviderConfig {
            kind: ProviderKind::None,
            fallback: Some(Box::new(ProviderConfig {
                kind: ProviderKind::Static,
                static_text: Some("One moment please.".to_string()),
                ..ProviderConfig::default()
            })),
            ..ProviderConfig::default()
        };
        let responder = create_responder(&config).unwrap();
        let reply = responder.reply(&ReplyRequest::default()).await.unwrap();
        assert_eq!(reply.text, "One moment please.");
    }

    #[test]
    fn test_openai_transcriber_rejected() {
        let config = ProviderConfig {
            kind: ProviderKind::OpenAi,
            ..ProviderConfig::default()
        };
        assert!(create_transcriber(&config).is_err());
    }

    #[test]
    fn test_knowledge_disabled_by_default() {
        let kb = create_knowledge_base(&KnowledgeConfig::default()).unwrap();
        assert!(kb.is_none());
    }
}
