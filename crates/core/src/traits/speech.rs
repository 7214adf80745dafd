//! Speech processing traits

use async_trait::async_trait;
use bytes::Bytes;

use crate::{AudioFormat, Result};

/// Speech-to-text backend
///
/// The streaming transcription buffer calls this repeatedly on short,
/// overlapping windows, so implementations must tolerate rapid successive
/// calls. An empty string means "nothing recognized" and is not an error.
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribe raw audio described by `format`
    async fn transcribe(&self, audio: &[u8], format: AudioFormat) -> Result<String>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Raw audio returned by a synthesizer
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub data: Bytes,
    pub format: AudioFormat,
}

/// Text-to-speech backend
#[async_trait]
pub trait Synthesizer: Send + Sync + 'static {
    /// Synthesize `text` into raw audio in the backend's fixed output format
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio>;

    /// Name for logging
    fn name(&self) -> &str;
}
