//! Core traits for the voice gateway
//!
//! Every external collaborator sits behind one of these traits so that
//! implementations can be swapped from configuration and mocked in tests.
//!
//! ```text
//! Speech:
//!   - Transcriber: audio bytes → text
//!   - Synthesizer: text → raw audio
//!
//! Replies:
//!   - Responder: utterance + history → reply text
//!   - KnowledgeBase: authoritative answers for known questions
//!
//! Persistence:
//!   - MessageStore: per-session message log
//! ```

mod knowledge;
mod reply;
mod speech;
mod store;

pub use knowledge::{KnowledgeAnswer, KnowledgeBase};
pub use reply::{Reply, ReplyRequest, ReplySource, Responder};
pub use speech::{SynthesizedAudio, Synthesizer, Transcriber};
pub use store::MessageStore;
