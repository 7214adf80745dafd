//! Real-time turn-taking engine
//!
//! This crate provides the per-call audio path:
//! - μ-law/PCM codec, resampling and format detection
//! - Feature-based voice activity detection
//! - Streaming transcription buffer with periodic partials
//! - Barge-in detection during playback
//! - Paced frame streaming of reply audio
//! - The per-session state machine and the orchestrator that hosts it
//! - HTTP/static provider implementations of the backend traits

pub mod barge_in;
pub mod codec;
pub mod events;
pub mod orchestrator;
pub mod providers;
pub mod session;
pub mod stt;
pub mod tts;
pub mod turn;
pub mod vad;
mod worker;

pub use barge_in::BargeInDetector;
pub use codec::AudioCodec;
pub use events::{EventSink, SessionEvent, SessionEvents};
pub use orchestrator::{Backends, EngineConfig, TurnOrchestrator};
pub use session::{SessionState, VoiceSession};
pub use stt::{PartialPass, TranscriptionBuffer};
pub use tts::{FrameStreamer, StreamReport};
pub use turn::PreparedReply;
pub use vad::{FeatureVad, VadEngine, VadResult};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("VAD error: {0}")]
    Vad(String),
}

impl From<PipelineError> for voice_gateway_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Vad(msg) => voice_gateway_core::AudioError::Codec(msg).into(),
        }
    }
}
