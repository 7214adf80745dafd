//! Providers that need no network

use async_trait::async_trait;
use bytes::Bytes;
use voice_gateway_core::{
    AudioFormat, BackendError, Reply, ReplyRequest, Responder, Result, SynthesizedAudio,
    Synthesizer, TokenUsage, Transcriber,
};

/// Always returns the same reply
#[derive(Debug, Clone)]
pub struct StaticResponder {
    text: String,
}

impl StaticResponder {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Responder for StaticResponder {
    async fn reply(&self, _request: &ReplyRequest) -> Result<Reply> {
        Ok(Reply::from_model(self.text.clone(), TokenUsage::default()))
    }

    fn model_name(&self) -> &str {
        "static"
    }
}

/// Returns fixed text for every pass, or nothing at all
#[derive(Debug, Clone, Default)]
pub struct StaticTranscriber {
    text: String,
}

impl StaticTranscriber {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(&self, _audio: &[u8], _format: AudioFormat) -> Result<String> {
        Ok(self.text.clone())
    }

    fn name(&self) -> &str {
        if self.text.is_empty() {
            "none"
        } else {
            "static"
        }
    }
}

/// Produces silence sized roughly to the spoken length of the text
#[derive(Debug, Clone)]
pub struct SilenceSynthesizer {
    sample_rate: u32,
}

const MS_PER_WORD: u64 = 300;
const MIN_SILENCE_MS: u64 = 200;

impl SilenceSynthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

#[async_trait]
impl Synthesizer for SilenceSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let words = text.split_whitespace().count() as u64;
        let ms = (words * MS_PER_WORD).max(MIN_SILENCE_MS);
        let samples = self.sample_rate as u64 * ms / 1000;
        Ok(SynthesizedAudio {
            data: Bytes::from(vec![0u8; samples as usize * 2]),
            format: AudioFormat::new(voice_gateway_core::AudioEncoding::Pcm16, self.sample_rate),
        })
    }

    fn name(&self) -> &str {
        "silence"
    }
}

/// Placeholder for a capability that is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

#[async_trait]
impl Synthesizer for Disabled {
    async fn synthesize(&self, _text: &str) -> Result<SynthesizedAudio> {
        Err(BackendError::NotConfigured("synthesizer".to_string()).into())
    }

    fn name(&self) -> &str {
        "none"
    }
}

#[async_trait]
impl Responder for Disabled {
    async fn reply(&self, _request: &ReplyRequest) -> Result<Reply> {
        Err(BackendError::NotConfigured("responder".to_string()).into())
    }

    fn model_name(&self) -> &str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_silence_length_tracks_words() {
        let tts = SilenceSynthesizer::new(16000);
        let short = tts.synthesize("hi").await.unwrap();
        let long = tts.synthesize("one two three four five").await.unwrap();
        // 200 ms floor at 16 kHz PCM16
        assert_eq!(short.data.len(), 6400);
        assert_eq!(long.data.len(), 16000 * 2 * 1500 / 1000);
        assert!(long.data.iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn test_disabled_reports_not_configured() {
        let err = Synthesizer::synthesize(&Disabled, "hello").await.unwrap_err();
        assert!(matches!(
            err,
            voice_gateway_core::Error::Backend(BackendError::NotConfigured(_))
        ));
    }
}
