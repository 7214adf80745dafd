//! Session worker: the turn-taking state machine
//!
//! One worker task per session consumes an ordered command channel. Command
//! handling is synchronous; anything slow (transcription, reply generation,
//! playback pacing, timers) runs in a spawned task holding a child
//! cancellation token and reports back through the same channel tagged with
//! a generation. Stale reports are dropped by comparing generations.

use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use voice_gateway_core::{AudioEncoding, AudioFormat, AudioFrame, Role, TranscriptEvent};

use crate::codec;
use crate::events::{EventSink, SessionEvent};
use crate::orchestrator::EngineContext;
use crate::session::{SessionState, TaskHandle, VoiceSession};
use crate::stt::TranscriptionBuffer;
use crate::tts::StreamReport;
use crate::turn::{prepare_reply, PreparedReply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    Finalize,
    Settle,
    PlaybackEnd,
}

pub(crate) enum Command {
    Audio {
        data: Bytes,
        encoding: Option<AudioEncoding>,
        sample_rate: Option<u32>,
    },
    Text(String),
    TimerFired {
        kind: TimerKind,
        generation: u64,
    },
    Partial {
        utterance_id: u64,
        text: Option<String>,
    },
    Transcribed {
        generation: u64,
        text: Option<String>,
    },
    ReplyReady {
        generation: u64,
        reply: PreparedReply,
    },
    ReplyFailed {
        generation: u64,
        message: String,
    },
    PlaybackDone {
        generation: u64,
        report: StreamReport,
    },
}

pub(crate) struct SessionWorker {
    session: VoiceSession,
    ctx: Arc<EngineContext>,
    commands: mpsc::UnboundedSender<Command>,
    events: EventSink,
    cancel: CancellationToken,
    state_cell: Arc<RwLock<SessionState>>,
    out_sequence: Arc<AtomicU64>,
}

impl SessionWorker {
    pub(crate) fn new(
        session: VoiceSession,
        ctx: Arc<EngineContext>,
        commands: mpsc::UnboundedSender<Command>,
        events: EventSink,
        cancel: CancellationToken,
        state_cell: Arc<RwLock<SessionState>>,
    ) -> Self {
        Self {
            session,
            ctx,
            commands,
            events,
            cancel,
            state_cell,
            out_sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
            }
        }
        self.session.cancel_all();
        tracing::debug!(session_id = %self.session.id, "Session worker stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Audio {
                data,
                encoding,
                sample_rate,
            } => self.on_audio(data, encoding, sample_rate),
            Command::Text(text) => self.on_text(text),
            Command::TimerFired { kind, generation } => self.on_timer(kind, generation),
            Command::Partial { utterance_id, text } => self.on_partial(utterance_id, text),
            Command::Transcribed { generation, text } => self.on_transcribed(generation, text),
            Command::ReplyReady { generation, reply } => self.on_reply(generation, reply),
            Command::ReplyFailed {
                generation,
                message,
            } => self.on_reply_failed(generation, message),
            Command::PlaybackDone { generation, report } => {
                if TaskHandle::matches(&self.session.playback, generation) {
                    self.session.playback = None;
                }
                tracing::debug!(
                    session_id = %self.session.id,
                    sent = report.sent,
                    total = report.total,
                    cancelled = report.cancelled,
                    "Playback stream ended"
                );
            },
        }
    }

    fn set_state(&mut self, state: SessionState) {
        if self.session.state == state {
            return;
        }
        tracing::debug!(
            session_id = %self.session.id,
            from = %self.session.state,
            to = %state,
            "Session state changed"
        );
        self.session.state = state;
        *self.state_cell.write() = state;
        self.events.emit(SessionEvent::StateChanged(state));
    }

    fn back_to_listening(&mut self) {
        self.session.reset_counters();
        self.session.transcription = None;
        self.session.turn = None;
        self.set_state(SessionState::Listening);
    }

    // ---- timers and tasks ----

    fn spawn_timer(&mut self, kind: TimerKind, delay: Duration) -> TaskHandle {
        let generation = self.session.next_generation();
        let token = self.cancel.child_token();
        let cancelled = token.clone();
        let tx = self.commands.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {},
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(Command::TimerFired { kind, generation });
                },
            }
        });
        TaskHandle {
            generation,
            cancel: token,
        }
    }

    fn spawn_task<F, Fut>(&mut self, work: F) -> TaskHandle
    where
        F: FnOnce(u64, CancellationToken) -> Fut,
        Fut: std::future::Future<Output = Option<Command>> + Send + 'static,
    {
        let generation = self.session.next_generation();
        let token = self.cancel.child_token();
        let fut = work(generation, token.clone());
        let cancelled = token.clone();
        let tx = self.commands.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {},
                result = fut => {
                    if let Some(cmd) = result {
                        let _ = tx.send(cmd);
                    }
                },
            }
        });
        TaskHandle {
            generation,
            cancel: token,
        }
    }

    /// Arm the finalize timer unless one is already pending
    fn arm_finalize(&mut self, delay: Duration, reason: &'static str) {
        if self.session.finalize_timer.is_some() {
            return;
        }
        tracing::debug!(
            session_id = %self.session.id,
            delay_ms = delay.as_millis() as u64,
            reason,
            active = self.session.active_frames,
            silence = self.session.silence_frames,
            "Finalize timer armed"
        );
        self.session.finalize_timer = Some(self.spawn_timer(TimerKind::Finalize, delay));
    }

    fn on_timer(&mut self, kind: TimerKind, generation: u64) {
        let slot = match kind {
            TimerKind::Finalize => &mut self.session.finalize_timer,
            TimerKind::Settle => &mut self.session.settle_timer,
            TimerKind::PlaybackEnd => &mut self.session.playback_timer,
        };
        if !TaskHandle::matches(slot, generation) {
            return;
        }
        *slot = None;

        match (kind, self.session.state) {
            (TimerKind::Finalize, SessionState::Listening) => self.begin_finalize(),
            (TimerKind::Settle, SessionState::Interrupted) => self.on_settled(),
            (TimerKind::PlaybackEnd, SessionState::Speaking) => {
                self.session.playback = None;
                self.session.barge_in.stop_playback();
                self.session.playback_frames.clear();
                self.back_to_listening();
            },
            (kind, state) => {
                tracing::trace!(?kind, %state, "Timer fired in unrelated state");
            },
        }
    }

    // ---- inbound audio ----

    fn on_audio(&mut self, data: Bytes, encoding: Option<AudioEncoding>, sample_rate: Option<u32>) {
        if data.is_empty() {
            tracing::debug!(session_id = %self.session.id, "Ignoring empty audio chunk");
            return;
        }

        let format = self
            .ctx
            .codec
            .resolve_format(&data, encoding, sample_rate, self.session.format);
        if self.session.format != Some(format) {
            tracing::info!(
                session_id = %self.session.id,
                encoding = %format.encoding,
                sample_rate = format.sample_rate,
                explicit = encoding.is_some(),
                "Inbound audio format"
            );
            self.session.format = Some(format);
        }
        let frame = AudioFrame::new(data, format, self.session.next_inbound_sequence());

        match self.session.state {
            SessionState::Listening => self.listen(frame, true),
            SessionState::Interrupted => self.listen(frame, false),
            SessionState::Speaking => self.watch_for_barge_in(frame),
            SessionState::Finalizing | SessionState::Replying => {
                tracing::trace!(
                    session_id = %self.session.id,
                    state = %self.session.state,
                    "Dropping caller audio while answering"
                );
            },
            SessionState::Idle | SessionState::Ended => {},
        }
    }

    /// Run VAD and accumulate; `arm` enables the end-of-utterance rules
    fn listen(&mut self, frame: AudioFrame, arm: bool) {
        let vad = self.ctx.vad.classify(&frame);
        self.session.last_vad = Some(vad);
        let turn = self.ctx.config.turn_taking.clone();

        let pass = if vad.is_speech && vad.confidence >= turn.min_speech_confidence {
            self.session.active_frames += 1;
            self.session.silence_frames = 0;
            self.session.finalize_timer = None;

            if self.session.transcription.is_none() {
                let utterance_id = self.session.next_utterance();
                tracing::debug!(session_id = %self.session.id, utterance_id, "Speech started");
                self.session.transcription = Some(TranscriptionBuffer::new(
                    self.ctx.codec.clone(),
                    self.ctx.config.transcription.clone(),
                    utterance_id,
                    turn.max_buffered_frames,
                ));
            }
            self.session
                .transcription
                .as_mut()
                .and_then(|buf| buf.send_audio(&frame))
        } else {
            self.session.silence_frames += 1;
            let pass = self
                .session
                .transcription
                .as_mut()
                .and_then(|buf| buf.send_audio(&frame));

            if arm {
                if vad.should_finalize && self.session.active_frames >= turn.hint_min_active_frames {
                    let mut delay = Duration::from_millis(turn.finalize_delay_ms);
                    if vad.silence_confidence() < turn.confident_silence {
                        delay = delay.mul_f32(turn.low_confidence_multiplier);
                    }
                    self.arm_finalize(delay, "vad");
                } else if self.session.active_frames >= turn.min_active_frames
                    && self.session.silence_frames >= turn.min_silence_frames
                {
                    let delay = Duration::from_millis(turn.fallback_finalize_delay_ms);
                    self.arm_finalize(delay, "frame_count");
                }
            }
            pass
        };

        if let Some(pass) = pass {
            let transcriber = self.ctx.backends.transcriber.clone();
            // Partial passes are fire-and-forget; the buffer matches results by utterance
            let tx = self.commands.clone();
            let token = self.cancel.child_token();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {},
                    (utterance_id, text) = pass.run(transcriber.as_ref()) => {
                        let _ = tx.send(Command::Partial { utterance_id, text });
                    },
                }
            });
        }
    }

    fn on_partial(&mut self, utterance_id: u64, text: Option<String>) {
        let event = self
            .session
            .transcription
            .as_mut()
            .and_then(|buf| buf.accept_partial(utterance_id, text));
        if let Some(event) = event {
            self.events.emit(SessionEvent::Transcript(event));
        }
    }

    // ---- finalize and reply ----

    fn begin_finalize(&mut self) {
        self.session.finalize_timer = None;
        let Some(buffer) = self.session.transcription.take() else {
            self.back_to_listening();
            return;
        };
        metrics::counter!("voice_gateway_finalizations_total").increment(1);
        self.set_state(SessionState::Finalizing);

        let transcriber = self.ctx.backends.transcriber.clone();
        self.session.turn = Some(self.spawn_task(move |generation, _| async move {
            let text = buffer.finalize(transcriber.as_ref()).await;
            Some(Command::Transcribed { generation, text })
        }));
    }

    fn on_transcribed(&mut self, generation: u64, text: Option<String>) {
        if !TaskHandle::matches(&self.session.turn, generation)
            || self.session.state != SessionState::Finalizing
        {
            return;
        }
        self.session.turn = None;

        match text {
            Some(text) => self.begin_reply(text),
            None => {
                tracing::info!(session_id = %self.session.id, "No usable transcript, resuming listening");
                self.back_to_listening();
            },
        }
    }

    fn begin_reply(&mut self, utterance: String) {
        self.events
            .emit(SessionEvent::Transcript(TranscriptEvent::final_text(Role::User, utterance.clone())));
        self.session.reset_counters();
        self.set_state(SessionState::Replying);

        let ctx = self.ctx.clone();
        let session_id = self.session.id.clone();
        self.session.turn = Some(self.spawn_task(move |generation, _| async move {
            Some(match prepare_reply(&ctx, &session_id, &utterance).await {
                Ok(reply) => Command::ReplyReady { generation, reply },
                Err(e) => Command::ReplyFailed {
                    generation,
                    message: e.to_string(),
                },
            })
        }));
    }

    fn on_text(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.session.state != SessionState::Listening {
            self.events.emit(SessionEvent::Error {
                message: format!("cannot accept text while {}", self.session.state),
            });
            return;
        }
        self.session.finalize_timer = None;
        self.session.transcription = None;
        self.begin_reply(text);
    }

    fn on_reply_failed(&mut self, generation: u64, message: String) {
        if !TaskHandle::matches(&self.session.turn, generation)
            || self.session.state != SessionState::Replying
        {
            return;
        }
        tracing::warn!(session_id = %self.session.id, error = %message, "Reply failed for this turn");
        self.events.emit(SessionEvent::Error { message });
        self.back_to_listening();
    }

    fn on_reply(&mut self, generation: u64, reply: PreparedReply) {
        if !TaskHandle::matches(&self.session.turn, generation)
            || self.session.state != SessionState::Replying
        {
            return;
        }
        self.session.turn = None;
        self.events.emit(SessionEvent::Transcript(TranscriptEvent::final_text(
            Role::Assistant,
            reply.text.clone(),
        )));

        if reply.audio.is_empty() {
            tracing::warn!(session_id = %self.session.id, "Synthesizer returned no audio");
            self.back_to_listening();
            return;
        }
        self.start_playback(reply.audio, reply.format);
    }

    // ---- playback and barge-in ----

    fn start_playback(&mut self, audio: Bytes, format: AudioFormat) {
        let streamer = self.ctx.streamer.clone();
        let total_slices = streamer.slice_count(audio.len(), format);
        let estimate = format.duration_of(audio.len())
            + Duration::from_millis(self.ctx.config.turn_taking.playback_margin_ms);

        self.session.playback_frames.clear();
        self.session.barge_in.start_playback(Instant::now());
        self.set_state(SessionState::Speaking);
        self.events.emit(SessionEvent::PlaybackStarted {
            format,
            total_slices,
        });

        let sink = self.events.clone();
        let sequence = self.out_sequence.clone();
        self.session.playback = Some(self.spawn_task(move |generation, cancel| async move {
            let report = streamer
                .stream(audio, format, &cancel, |data| {
                    sink.emit(SessionEvent::FrameReady {
                        data,
                        format,
                        sequence: sequence.fetch_add(1, Ordering::Relaxed),
                    })
                })
                .await;
            Some(Command::PlaybackDone { generation, report })
        }));
        self.session.playback_timer = Some(self.spawn_timer(TimerKind::PlaybackEnd, estimate));

        tracing::debug!(
            session_id = %self.session.id,
            total_slices,
            estimate_ms = estimate.as_millis() as u64,
            "Playback started"
        );
    }

    fn watch_for_barge_in(&mut self, frame: AudioFrame) {
        let amplitude = codec::mean_amplitude(&frame.data, frame.encoding);
        if self.session.playback_frames.push(frame) {
            tracing::warn!(
                session_id = %self.session.id,
                dropped = self.session.playback_frames.dropped(),
                "Playback frame buffer full, dropping oldest"
            );
        }
        if self.session.barge_in.observe(amplitude, Instant::now()) {
            self.interrupt();
        }
    }

    fn interrupt(&mut self) {
        tracing::info!(session_id = %self.session.id, "Caller barged in, stopping playback");
        metrics::counter!("voice_gateway_interrupts_total").increment(1);

        // Dropping the handles cancels the stream before its next slice
        self.session.playback = None;
        self.session.playback_timer = None;
        self.session.barge_in.stop_playback();
        self.session.playback_frames.clear();
        self.session.reset_counters();
        self.session.transcription = None;

        self.events.emit(SessionEvent::Interrupted);
        self.set_state(SessionState::Interrupted);

        let settle = Duration::from_millis(self.ctx.config.turn_taking.settle_delay_ms);
        self.session.settle_timer = Some(self.spawn_timer(TimerKind::Settle, settle));
    }

    fn on_settled(&mut self) {
        let turn = &self.ctx.config.turn_taking;
        let ready = self.session.active_frames >= turn.min_active_frames
            && self.session.silence_frames >= turn.min_silence_frames;
        if ready {
            tracing::debug!(session_id = %self.session.id, "Fresh utterance completed during settle delay");
            self.set_state(SessionState::Listening);
            self.begin_finalize();
        } else {
            self.set_state(SessionState::Listening);
        }
    }
}
