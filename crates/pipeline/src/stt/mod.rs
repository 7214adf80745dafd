//! Speech-to-text plumbing
//!
//! The engine does not recognize speech itself; it buffers caller audio
//! and drives a [`voice_gateway_core::Transcriber`].

mod streaming;

pub use streaming::{transcribe_pass, PartialPass, TranscriptionBuffer};
