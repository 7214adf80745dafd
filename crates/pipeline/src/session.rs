//! Per-call session state
//!
//! A [`VoiceSession`] is owned by exactly one session worker task and is
//! never shared, so none of its fields need locking.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use voice_gateway_config::BargeInConfig;
use voice_gateway_core::{AudioFormat, AudioFrame};

use crate::barge_in::BargeInDetector;
use crate::stt::TranscriptionBuffer;
use crate::vad::VadResult;

/// Turn-taking state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    /// Accumulating caller audio
    Listening,
    /// Utterance ended, final transcription running
    Finalizing,
    /// Generating and synthesizing the reply
    Replying,
    /// Reply audio streaming to the caller
    Speaking,
    /// Caller barged in, waiting for the settle delay
    Interrupted,
    Ended,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Listening => "listening",
            SessionState::Finalizing => "finalizing",
            SessionState::Replying => "replying",
            SessionState::Speaking => "speaking",
            SessionState::Interrupted => "interrupted",
            SessionState::Ended => "ended",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded frame buffer that drops the oldest frame when full
#[derive(Debug)]
pub struct FrameRing {
    frames: VecDeque<AudioFrame>,
    capacity: usize,
    dropped: u64,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Append a frame; returns true when an old frame had to go
    pub fn push(&mut self, frame: AudioFrame) -> bool {
        let overflow = self.frames.len() >= self.capacity;
        if overflow {
            self.frames.pop_front();
            self.dropped += 1;
        }
        self.frames.push_back(frame);
        overflow
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// A pending timer or background task, identified by generation
///
/// Cancelling the token stops the task; a result that still arrives is
/// recognized as stale because its generation no longer matches.
#[derive(Debug)]
pub struct TaskHandle {
    pub generation: u64,
    pub cancel: CancellationToken,
}

impl TaskHandle {
    pub fn matches(handle: &Option<TaskHandle>, generation: u64) -> bool {
        handle.as_ref().map(|h| h.generation) == Some(generation)
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Everything the state machine knows about one call
#[derive(Debug)]
pub struct VoiceSession {
    pub id: String,
    pub state: SessionState,
    /// Format in effect, learned from the first chunk
    pub format: Option<AudioFormat>,
    /// Caller frames received while reply audio plays. They may hold echo
    /// of our own reply, so they are never transcribed: the ring only bounds
    /// what is held until playback ends or an interrupt discards it.
    pub playback_frames: FrameRing,
    pub active_frames: u32,
    pub silence_frames: u32,
    pub last_vad: Option<VadResult>,
    pub barge_in: BargeInDetector,
    pub transcription: Option<TranscriptionBuffer>,
    pub finalize_timer: Option<TaskHandle>,
    pub settle_timer: Option<TaskHandle>,
    pub playback_timer: Option<TaskHandle>,
    /// In-flight finalize/reply work
    pub turn: Option<TaskHandle>,
    /// In-flight frame streaming
    pub playback: Option<TaskHandle>,
    pub started_at: Instant,
    generation: u64,
    utterances: u64,
    inbound_sequence: u64,
}

impl VoiceSession {
    pub fn new(id: impl Into<String>, barge_in: BargeInConfig, max_frames: usize) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Idle,
            format: None,
            playback_frames: FrameRing::new(max_frames),
            active_frames: 0,
            silence_frames: 0,
            last_vad: None,
            barge_in: BargeInDetector::new(barge_in),
            transcription: None,
            finalize_timer: None,
            settle_timer: None,
            playback_timer: None,
            turn: None,
            playback: None,
            started_at: Instant::now(),
            generation: 0,
            utterances: 0,
            inbound_sequence: 0,
        }
    }

    /// Fresh generation for a timer or task
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn next_utterance(&mut self) -> u64 {
        self.utterances += 1;
        self.utterances
    }

    pub fn next_inbound_sequence(&mut self) -> u64 {
        let seq = self.inbound_sequence;
        self.inbound_sequence += 1;
        seq
    }

    pub fn reset_counters(&mut self) {
        self.active_frames = 0;
        self.silence_frames = 0;
    }

    /// Drop all pending timers and background work
    pub fn cancel_all(&mut self) {
        self.finalize_timer = None;
        self.settle_timer = None;
        self.playback_timer = None;
        self.turn = None;
        self.playback = None;
        self.transcription = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_ring_drops_oldest() {
        let mut ring = FrameRing::new(2);
        let frame = |seq| AudioFrame::new(vec![0xFFu8; 160], AudioFormat::telephony(), seq);
        assert!(!ring.push(frame(0)));
        assert!(!ring.push(frame(1)));
        assert!(ring.push(frame(2)));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.dropped(), 1);
        assert_eq!(ring.frames.front().map(|f| f.sequence), Some(1));
    }

    #[test]
    fn test_dropping_handle_cancels_task() {
        let token = CancellationToken::new();
        let mut session = VoiceSession::new("s", BargeInConfig::default(), 10);
        let generation = session.next_generation();
        session.finalize_timer = Some(TaskHandle {
            generation,
            cancel: token.clone(),
        });
        assert!(TaskHandle::matches(&session.finalize_timer, generation));
        session.cancel_all();
        assert!(token.is_cancelled());
        assert!(!TaskHandle::matches(&session.finalize_timer, generation));
    }
}
