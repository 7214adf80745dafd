//! Events a session emits toward its transport

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use voice_gateway_core::{AudioFormat, TranscriptEvent};

use crate::session::SessionState;

/// Outbound session event, delivered in order on the session's channel
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    Transcript(TranscriptEvent),
    /// Reply audio is about to stream; describes the frames that follow
    PlaybackStarted {
        format: AudioFormat,
        total_slices: usize,
    },
    /// One paced slice of reply audio
    FrameReady {
        data: Bytes,
        format: AudioFormat,
        sequence: u64,
    },
    /// The caller barged in; any locally buffered playback should be dropped
    Interrupted,
    Error {
        message: String,
    },
}

/// Receiving half handed to the transport on `start`
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// Shared sending half
///
/// Closing happens under the same lock as sending, so once `close` returns
/// nothing else can be delivered.
#[derive(Clone)]
pub struct EventSink {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<SessionEvent>>>>,
}

impl EventSink {
    pub fn channel() -> (Self, SessionEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Deliver an event; false once the sink is closed or the receiver dropped
    pub fn emit(&self, event: SessionEvent) -> bool {
        match self.tx.lock().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Deliver a last event and refuse everything after it
    pub fn close_with(&self, event: SessionEvent) {
        if let Some(tx) = self.tx.lock().take() {
            let _ = tx.send(event);
        }
    }

    pub fn is_open(&self) -> bool {
        self.tx
            .lock()
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink").field("open", &self.is_open()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_after_close() {
        let (sink, mut rx) = EventSink::channel();
        assert!(sink.emit(SessionEvent::Interrupted));
        sink.close_with(SessionEvent::StateChanged(SessionState::Ended));
        assert!(!sink.emit(SessionEvent::Interrupted));

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::Interrupted)));
        assert!(matches!(
            rx.try_recv(),
            Ok(SessionEvent::StateChanged(SessionState::Ended))
        ));
        assert!(rx.try_recv().is_err());
    }
}
