//! Text-to-speech output path
//!
//! Synthesis itself is delegated to a [`voice_gateway_core::Synthesizer`];
//! this module paces the resulting audio out to the transport.

mod streamer;

pub use streamer::{FrameStreamer, StreamReport};
