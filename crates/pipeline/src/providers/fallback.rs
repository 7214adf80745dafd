//! Fallback decorators
//!
//! Each wraps a primary and a secondary implementation of the same
//! capability and retries on the secondary when the primary fails.

use async_trait::async_trait;
use std::sync::Arc;
use voice_gateway_core::{
    AudioFormat, Reply, ReplyRequest, Responder, Result, SynthesizedAudio, Synthesizer,
    Transcriber,
};

fn note_fallback(capability: &'static str, primary: &str, error: &voice_gateway_core::Error) {
    metrics::counter!("voice_gateway_provider_fallbacks_total", "capability" => capability)
        .increment(1);
    tracing::warn!(capability, primary, error = %error, "Primary provider failed, using fallback");
}

pub struct FallbackTranscriber {
    primary: Arc<dyn Transcriber>,
    secondary: Arc<dyn Transcriber>,
}

impl FallbackTranscriber {
    pub fn new(primary: Arc<dyn Transcriber>, secondary: Arc<dyn Transcriber>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Transcriber for FallbackTranscriber {
    async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<String> {
        match self.primary.transcribe(audio, format).await {
            Ok(text) => Ok(text),
            Err(e) => {
                note_fallback("transcriber", self.primary.name(), &e);
                self.secondary.transcribe(audio, format).await
            },
        }
    }

    fn name(&self) -> &str {
        self.primary.name()
    }
}

pub struct FallbackSynthesizer {
    primary: Arc<dyn Synthesizer>,
    secondary: Arc<dyn Synthesizer>,
}

impl FallbackSynthesizer {
    pub fn new(primary: Arc<dyn Synthesizer>, secondary: Arc<dyn Synthesizer>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Synthesizer for FallbackSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        match self.primary.synthesize(text).await {
            Ok(audio) => Ok(audio),
            Err(e) => {
                note_fallback("synthesizer", self.primary.name(), &e);
                self.secondary.synthesize(text).await
            },
        }
    }

    fn name(&self) -> &str {
        self.primary.name()
    }
}

pub struct FallbackResponder {
    primary: Arc<dyn Responder>,
    secondary: Arc<dyn Responder>,
}

impl FallbackResponder {
    pub fn new(primary: Arc<dyn Responder>, secondary: Arc<dyn Responder>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Responder for FallbackResponder {
    async fn reply(&self, request: &ReplyRequest) -> Result<Reply> {
        match self.primary.reply(request).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                note_fallback("responder", self.primary.model_name(), &e);
                self.secondary.reply(request).await
            },
        }
    }

    fn model_name(&self) -> &str {
        self.primary.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::local::{Disabled, StaticResponder};

    #[tokio::test]
    async fn test_secondary_answers_when_primary_fails() {
        let responder = FallbackResponder::new(
            Arc::new(Disabled),
            Arc::new(StaticResponder::new("backup")),
        );
        let reply = responder.reply(&ReplyRequest::default()).await.unwrap();
        assert_eq!(reply.text, "backup");
        assert_eq!(responder.model_name(), "none");
    }

    #[tokio::test]
    async fn test_primary_result_is_kept() {
        let responder = FallbackResponder::new(
            Arc::new(StaticResponder::new("main")),
            Arc::new(StaticResponder::new("backup")),
        );
        let reply = responder.reply(&ReplyRequest::default()).await.unwrap();
        assert_eq!(reply.text, "main");
    }
}
