//! Core traits and types for the voice gateway
//!
//! This crate provides foundational types used across all other crates:
//! - Audio frame and format types
//! - Capability traits for pluggable backends (transcription, synthesis,
//!   reply generation, knowledge lookup, message persistence)
//! - Conversation and transcript types
//! - Error types

pub mod audio;
pub mod conversation;
pub mod error;
pub mod traits;
pub mod transcript;

pub use audio::{AudioEncoding, AudioFormat, AudioFrame};
pub use conversation::{ConversationTurn, Role, TokenUsage};
pub use error::{AudioError, BackendError, Error, Result, SessionError};
pub use transcript::TranscriptEvent;

pub use traits::{
    KnowledgeAnswer, KnowledgeBase, MessageStore, Reply, ReplyRequest, ReplySource, Responder,
    SynthesizedAudio, Synthesizer, Transcriber,
};
