//! Streaming transcription buffer
//!
//! Pseudo-streaming over a request/response transcriber: audio accumulates
//! per utterance, and every `partial_interval_ms` of new audio the pending
//! window is handed out for a partial pass. Only a short trailing slice is
//! kept in the window afterwards so consecutive passes overlap slightly.
//!
//! The buffer also retains the whole utterance (bounded by a frame cap) for
//! the final pass, so the final transcript covers everything the caller
//! said rather than just the last window.

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::time::Instant;
use voice_gateway_config::TranscriptionConfig;
use voice_gateway_core::{AudioFormat, AudioFrame, TranscriptEvent, Transcriber};

use crate::codec::AudioCodec;

/// Audio handed out for a partial pass
#[derive(Debug, Clone)]
pub struct PartialPass {
    pub utterance_id: u64,
    pub audio: Bytes,
    pub format: AudioFormat,
}

impl PartialPass {
    /// Run the pass; `None` when nothing was recognized or the backend failed
    pub async fn run(self, transcriber: &dyn Transcriber) -> (u64, Option<String>) {
        let text = transcribe_pass(transcriber, &self.audio, self.format, "partial").await;
        (self.utterance_id, text)
    }
}

/// One transcription request with failures logged and swallowed
pub async fn transcribe_pass(
    transcriber: &dyn Transcriber,
    audio: &[u8],
    format: AudioFormat,
    kind: &'static str,
) -> Option<String> {
    if audio.is_empty() {
        return None;
    }
    let start = std::time::Instant::now();
    match transcriber.transcribe(audio, format).await {
        Ok(text) => {
            metrics::histogram!("voice_gateway_stt_duration_seconds", "pass" => kind)
                .record(start.elapsed().as_secs_f64());
            let text = text.trim();
            if text.is_empty() {
                tracing::debug!(pass = kind, bytes = audio.len(), "Transcriber returned no text");
                None
            } else {
                Some(text.to_string())
            }
        },
        Err(e) => {
            metrics::counter!("voice_gateway_errors_total", "stage" => "stt").increment(1);
            tracing::warn!(
                pass = kind,
                backend = transcriber.name(),
                error = %e,
                "Transcription pass failed"
            );
            None
        },
    }
}

/// Per-utterance transcription state
pub struct TranscriptionBuffer {
    codec: AudioCodec,
    config: TranscriptionConfig,
    utterance_id: u64,
    max_frames: usize,
    /// Normalized audio of the whole utterance, one chunk per frame
    frames: VecDeque<Bytes>,
    dropped_frames: usize,
    /// Audio since the last partial pass, including the carried-over tail
    window: Vec<u8>,
    /// Text of the most recent partial pass
    partial: Option<String>,
    started_at: Instant,
}

impl TranscriptionBuffer {
    pub fn new(
        codec: AudioCodec,
        config: TranscriptionConfig,
        utterance_id: u64,
        max_frames: usize,
    ) -> Self {
        Self {
            codec,
            config,
            utterance_id,
            max_frames: max_frames.max(1),
            frames: VecDeque::new(),
            dropped_frames: 0,
            window: Vec::new(),
            partial: None,
            started_at: Instant::now(),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn last_partial(&self) -> Option<&str> {
        self.partial.as_deref()
    }

    fn bytes_for(&self, ms: u64) -> usize {
        self.codec.recognition_format().byte_rate() * ms as usize / 1000
    }

    /// Append a frame; returns a partial pass once enough audio accumulated
    pub fn send_audio(&mut self, frame: &AudioFrame) -> Option<PartialPass> {
        let normalized = Bytes::from(
            self.codec
                .normalize_for_recognition(&frame.data, frame.format()),
        );

        if self.frames.len() >= self.max_frames {
            self.frames.pop_front();
            self.dropped_frames += 1;
            if self.dropped_frames == 1 || self.dropped_frames % 100 == 0 {
                tracing::warn!(
                    utterance = self.utterance_id,
                    max_frames = self.max_frames,
                    dropped = self.dropped_frames,
                    "Utterance buffer full, dropping oldest frames"
                );
            }
        }
        self.window.extend_from_slice(&normalized);
        self.frames.push_back(normalized);

        if !self.config.partials_enabled
            || self.window.len() < self.bytes_for(self.config.partial_interval_ms)
        {
            return None;
        }

        let trailing = self.bytes_for(self.config.trailing_context_ms).min(self.window.len());
        let audio = Bytes::from(std::mem::take(&mut self.window));
        self.window = audio[audio.len() - trailing..].to_vec();

        Some(PartialPass {
            utterance_id: self.utterance_id,
            audio,
            format: self.codec.recognition_format(),
        })
    }

    /// Record the outcome of a partial pass and produce the event to emit
    ///
    /// Results for a different utterance are ignored. Passes overlap by the
    /// trailing context, so each result replaces the previous one.
    pub fn accept_partial(&mut self, utterance_id: u64, text: Option<String>) -> Option<TranscriptEvent> {
        if utterance_id != self.utterance_id {
            return None;
        }
        let text = text?;
        self.partial = Some(text.clone());
        Some(TranscriptEvent::partial(text))
    }

    /// Run the final pass over the retained utterance
    ///
    /// Falls back to the last partial when the final pass yields
    /// nothing. Consumes the buffer.
    pub async fn finalize(self, transcriber: &dyn Transcriber) -> Option<String> {
        let mut audio = Vec::with_capacity(self.frames.iter().map(Bytes::len).sum());
        for chunk in &self.frames {
            audio.extend_from_slice(chunk);
        }

        let final_text = transcribe_pass(
            transcriber,
            &audio,
            self.codec.recognition_format(),
            "final",
        )
        .await;

        tracing::debug!(
            utterance = self.utterance_id,
            frames = self.frames.len(),
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            recognized = final_text.is_some(),
            "Transcription finalized"
        );

        final_text.or(self.partial)
    }
}

impl std::fmt::Debug for TranscriptionBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionBuffer")
            .field("utterance_id", &self.utterance_id)
            .field("frames", &self.frames.len())
            .field("window_bytes", &self.window.len())
            .field("partial", &self.partial)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use voice_gateway_config::AudioConfig;
    use voice_gateway_core::{BackendError, Result};

    /// Returns queued responses in order, then empty strings
    struct ScriptedTranscriber {
        responses: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<Vec<usize>>,
    }

    impl ScriptedTranscriber {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transcriber for ScriptedTranscriber {
        async fn transcribe(&self, audio: &[u8], _format: AudioFormat) -> Result<String> {
            self.calls.lock().push(audio.len());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn buffer(max_frames: usize) -> TranscriptionBuffer {
        TranscriptionBuffer::new(
            AudioCodec::new(AudioConfig::default()),
            TranscriptionConfig::default(),
            7,
            max_frames,
        )
    }

    fn frame(seq: u64) -> AudioFrame {
        // 20 ms of μ-law at 8 kHz
        AudioFrame::new(vec![0x90u8; 160], AudioFormat::telephony(), seq)
    }

    #[test]
    fn test_partial_pass_after_interval_keeps_tail() {
        let mut buf = buffer(100);
        for seq in 0..24 {
            assert!(buf.send_audio(&frame(seq)).is_none());
        }
        // 25 x 160 bytes = 4000 bytes = 500 ms
        let pass = buf.send_audio(&frame(24)).expect("partial pass");
        assert_eq!(pass.audio.len(), 4000);
        assert_eq!(pass.utterance_id, 7);
        assert_eq!(buf.window.len(), 1600);
        assert_eq!(buf.frame_count(), 25);
    }

    #[test]
    fn test_accept_partial_replaces_previous_and_ignores_stale() {
        let mut buf = buffer(100);
        let event = buf.accept_partial(7, Some("book a table".into())).unwrap();
        assert!(!event.is_final);
        assert_eq!(event.text, "book a table");
        let event = buf.accept_partial(7, Some("table for two".into())).unwrap();
        assert_eq!(event.text, "table for two");
        assert!(buf.accept_partial(6, Some("stale".into())).is_none());
        assert!(buf.accept_partial(7, None).is_none());
        assert_eq!(buf.last_partial(), Some("table for two"));
    }

    #[tokio::test]
    async fn test_finalize_promotes_only_latest_partial() {
        let stt = ScriptedTranscriber::new(vec![]);
        let mut buf = buffer(100);
        buf.send_audio(&frame(0));
        buf.accept_partial(7, Some("book a table".into()));
        buf.accept_partial(7, Some("table for two".into()));
        assert_eq!(buf.finalize(&stt).await.as_deref(), Some("table for two"));
    }

    #[test]
    fn test_frame_cap_drops_oldest() {
        let mut buf = buffer(3);
        for seq in 0..5 {
            buf.send_audio(&frame(seq));
        }
        assert_eq!(buf.frame_count(), 3);
        assert_eq!(buf.dropped_frames, 2);
    }

    #[tokio::test]
    async fn test_finalize_covers_whole_utterance() {
        let stt = ScriptedTranscriber::new(vec![Ok("  book a table  ".into())]);
        let mut buf = buffer(100);
        for seq in 0..10 {
            buf.send_audio(&frame(seq));
        }
        assert_eq!(buf.finalize(&stt).await.as_deref(), Some("book a table"));
        assert_eq!(*stt.calls.lock(), vec![1600]);
    }

    #[tokio::test]
    async fn test_finalize_promotes_partial_when_final_fails() {
        let stt = ScriptedTranscriber::new(vec![Err(BackendError::Transcription("down".into()).into())]);
        let mut buf = buffer(100);
        buf.send_audio(&frame(0));
        buf.accept_partial(7, Some("cancel my order".into()));
        assert_eq!(buf.finalize(&stt).await.as_deref(), Some("cancel my order"));
    }

    #[tokio::test]
    async fn test_finalize_empty_returns_none() {
        let stt = ScriptedTranscriber::new(vec![]);
        let buf = buffer(100);
        assert_eq!(buf.finalize(&stt).await, None);
        assert!(stt.calls.lock().is_empty());
    }
}
