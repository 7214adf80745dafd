//! Turn orchestrator
//!
//! Owns the table of live sessions and routes transport input to each
//! session's worker. Every session gets its own worker task and command
//! channel, so sessions never block one another and a session's own
//! inputs are handled strictly in arrival order.

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use voice_gateway_config::{
    AudioConfig, BargeInConfig, Settings, StreamerConfig, TranscriptionConfig, TurnTakingConfig,
    VadConfig,
};
use voice_gateway_core::{
    AudioEncoding, KnowledgeBase, MessageStore, Responder, SessionError, Synthesizer, Transcriber,
};

use crate::codec::AudioCodec;
use crate::events::{EventSink, SessionEvent, SessionEvents};
use crate::session::{SessionState, VoiceSession};
use crate::tts::FrameStreamer;
use crate::vad::{FeatureVad, VadEngine};
use crate::worker::{Command, SessionWorker};

/// Engine tunables
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub audio: AudioConfig,
    pub vad: VadConfig,
    pub turn_taking: TurnTakingConfig,
    pub barge_in: BargeInConfig,
    pub transcription: TranscriptionConfig,
    pub streamer: StreamerConfig,
    /// Concurrent session cap; 0 means unlimited
    pub max_sessions: usize,
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            audio: settings.audio.clone(),
            vad: settings.vad.clone(),
            turn_taking: settings.turn_taking.clone(),
            barge_in: settings.barge_in.clone(),
            transcription: settings.transcription.clone(),
            streamer: settings.streamer.clone(),
            max_sessions: settings.server.max_sessions,
        }
    }
}

/// External collaborators, shared by every session
#[derive(Clone)]
pub struct Backends {
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub responder: Arc<dyn Responder>,
    pub knowledge: Option<Arc<dyn KnowledgeBase>>,
    pub store: Arc<dyn MessageStore>,
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("transcriber", &self.transcriber.name())
            .field("synthesizer", &self.synthesizer.name())
            .field("responder", &self.responder.model_name())
            .field("knowledge", &self.knowledge.is_some())
            .finish()
    }
}

/// Immutable per-engine context handed to workers and their tasks
pub(crate) struct EngineContext {
    pub(crate) config: EngineConfig,
    pub(crate) codec: AudioCodec,
    pub(crate) vad: Arc<dyn VadEngine>,
    pub(crate) streamer: FrameStreamer,
    pub(crate) backends: Backends,
}

struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    events: EventSink,
    state: Arc<RwLock<SessionState>>,
}

impl SessionHandle {
    fn send(&self, id: &str, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Closed(id.to_string()))
    }
}

/// Entry point for transports
pub struct TurnOrchestrator {
    ctx: Arc<EngineContext>,
    sessions: DashMap<String, SessionHandle>,
}

impl TurnOrchestrator {
    pub fn new(config: EngineConfig, backends: Backends) -> Self {
        let vad = Arc::new(FeatureVad::new(config.vad.clone()));
        Self::with_vad(config, backends, vad)
    }

    /// Build with a custom voice activity detector
    pub fn with_vad(config: EngineConfig, backends: Backends, vad: Arc<dyn VadEngine>) -> Self {
        tracing::info!(
            transcriber = backends.transcriber.name(),
            synthesizer = backends.synthesizer.name(),
            responder = backends.responder.model_name(),
            knowledge = backends.knowledge.is_some(),
            "Turn orchestrator ready"
        );
        let ctx = EngineContext {
            codec: AudioCodec::new(config.audio.clone()),
            streamer: FrameStreamer::new(config.streamer.clone()),
            vad,
            backends,
            config,
        };
        Self {
            ctx: Arc::new(ctx),
            sessions: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    /// Open a session and return its event stream
    ///
    /// The first event on the stream is the transition to `Listening`.
    pub fn start(&self, session_id: &str) -> Result<SessionEvents, SessionError> {
        let max = self.ctx.config.max_sessions;
        if max > 0 && self.sessions.len() >= max {
            return Err(SessionError::CapacityReached(max));
        }

        let vacant = match self.sessions.entry(session_id.to_string()) {
            Entry::Occupied(_) => return Err(SessionError::AlreadyActive(session_id.to_string())),
            Entry::Vacant(vacant) => vacant,
        };

        let (events, receiver) = EventSink::channel();
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let state = Arc::new(RwLock::new(SessionState::Listening));

        let mut session = VoiceSession::new(
            session_id,
            self.ctx.config.barge_in.clone(),
            self.ctx.config.turn_taking.max_buffered_frames,
        );
        session.state = SessionState::Listening;
        events.emit(SessionEvent::StateChanged(SessionState::Listening));

        let worker = SessionWorker::new(
            session,
            self.ctx.clone(),
            tx.clone(),
            events.clone(),
            cancel.clone(),
            state.clone(),
        );
        tokio::spawn(worker.run(rx));

        vacant.insert(SessionHandle {
            commands: tx,
            cancel,
            events,
            state,
        });

        metrics::counter!("voice_gateway_sessions_started_total").increment(1);
        metrics::gauge!("voice_gateway_sessions_active").set(self.sessions.len() as f64);
        tracing::info!(session_id, "Session started");
        Ok(receiver)
    }

    /// Queue a chunk of caller audio
    ///
    /// Format metadata is optional; without it the format is inferred from
    /// the session or the bytes themselves. A declared rate outside the
    /// accepted range is refused before anything is queued.
    pub fn audio_chunk(
        &self,
        session_id: &str,
        data: Bytes,
        encoding: Option<AudioEncoding>,
        sample_rate: Option<u32>,
    ) -> voice_gateway_core::Result<()> {
        let handle = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        let sample_rate = sample_rate
            .map(|rate| self.ctx.codec.check_sample_rate(rate))
            .transpose()
            .map_err(|e| {
                tracing::warn!(session_id, error = %e, "Rejected audio chunk");
                e
            })?;
        handle.send(
            session_id,
            Command::Audio {
                data,
                encoding,
                sample_rate,
            },
        )?;
        Ok(())
    }

    /// Treat `text` as a finished caller utterance
    pub fn inject_text(&self, session_id: &str, text: impl Into<String>) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        handle.send(session_id, Command::Text(text.into()))
    }

    /// Close a session; `Ended` is the last event it delivers
    pub fn end(&self, session_id: &str) -> Result<(), SessionError> {
        let (_, handle) = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        handle.cancel.cancel();
        *handle.state.write() = SessionState::Ended;
        handle
            .events
            .close_with(SessionEvent::StateChanged(SessionState::Ended));

        metrics::counter!("voice_gateway_sessions_ended_total").increment(1);
        metrics::gauge!("voice_gateway_sessions_active").set(self.sessions.len() as f64);
        tracing::info!(session_id, "Session ended");
        Ok(())
    }

    pub fn state(&self, session_id: &str) -> Option<SessionState> {
        self.sessions.get(session_id).map(|h| *h.state.read())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of live sessions and their states
    pub fn sessions(&self) -> Vec<(String, SessionState)> {
        self.sessions
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value().state.read()))
            .collect()
    }

    /// End every session, used on shutdown
    pub fn end_all(&self) {
        let ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            let _ = self.end(&id);
        }
    }
}

impl Drop for TurnOrchestrator {
    fn drop(&mut self) {
        for entry in self.sessions.iter() {
            entry.value().cancel.cancel();
        }
    }
}
