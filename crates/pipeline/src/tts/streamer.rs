//! Paced frame streaming of reply audio
//!
//! Reply audio is cut into fixed-duration slices and released one slice per
//! pacing interval, so a barge-in only has to stop the stream to cut the
//! reply within one slice. Cancellation and transport liveness are checked
//! before every slice.

use bytes::Bytes;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use voice_gateway_config::StreamerConfig;
use voice_gateway_core::AudioFormat;

/// Outcome of one streaming run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReport {
    pub sent: usize,
    pub total: usize,
    pub cancelled: bool,
}

impl StreamReport {
    pub fn completed(&self) -> bool {
        !self.cancelled && self.sent == self.total
    }
}

#[derive(Debug, Clone)]
pub struct FrameStreamer {
    config: StreamerConfig,
}

impl FrameStreamer {
    pub fn new(config: StreamerConfig) -> Self {
        Self { config }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.config.slice_ms)
    }

    /// Bytes per slice, aligned to whole samples
    pub fn slice_len(&self, format: AudioFormat) -> usize {
        let sample = format.encoding.bytes_per_sample();
        let raw = format.byte_rate() * self.config.slice_ms as usize / 1000;
        (raw - raw % sample).max(sample)
    }

    pub fn slice_count(&self, len: usize, format: AudioFormat) -> usize {
        len.div_ceil(self.slice_len(format))
    }

    /// Stream `audio` through `emit`
    ///
    /// `emit` returns false when the transport is gone, which stops the run
    /// like a cancellation does.
    pub async fn stream<F>(
        &self,
        audio: Bytes,
        format: AudioFormat,
        cancel: &CancellationToken,
        mut emit: F,
    ) -> StreamReport
    where
        F: FnMut(Bytes) -> bool,
    {
        let slice_len = self.slice_len(format);
        let total = self.slice_count(audio.len(), format);
        let mut sent = 0;

        let mut offset = 0;
        while offset < audio.len() {
            if cancel.is_cancelled() {
                break;
            }
            let end = (offset + slice_len).min(audio.len());
            if !emit(audio.slice(offset..end)) {
                tracing::debug!(sent, total, "Transport closed during playback");
                break;
            }
            sent += 1;
            offset = end;

            if offset < audio.len() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval()) => {},
                }
            }
        }

        let report = StreamReport {
            sent,
            total,
            cancelled: sent < total,
        };
        tracing::debug!(
            sent = report.sent,
            total = report.total,
            cancelled = report.cancelled,
            "Playback stream finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_gateway_core::AudioEncoding;

    fn pcm16k() -> AudioFormat {
        AudioFormat::new(AudioEncoding::Pcm16, 16000)
    }

    #[test]
    fn test_slice_len_at_16k_pcm() {
        let streamer = FrameStreamer::new(StreamerConfig::default());
        assert_eq!(streamer.slice_len(pcm16k()), 320);
        assert_eq!(streamer.slice_len(AudioFormat::telephony()), 80);
        assert_eq!(streamer.slice_count(3200, pcm16k()), 10);
        assert_eq!(streamer.slice_count(3201, pcm16k()), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_streams_all_slices_with_pacing() {
        let streamer = FrameStreamer::new(StreamerConfig::default());
        let audio = Bytes::from(vec![1u8; 3200 + 100]);
        let mut sizes = Vec::new();
        let start = tokio::time::Instant::now();
        let report = streamer
            .stream(audio, pcm16k(), &CancellationToken::new(), |slice| {
                sizes.push(slice.len());
                true
            })
            .await;
        assert!(report.completed());
        assert_eq!(report.sent, 11);
        assert_eq!(sizes[..10], [320; 10]);
        assert_eq!(sizes[10], 100);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_before_next_slice() {
        let streamer = FrameStreamer::new(StreamerConfig::default());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let mut sent = 0;
        let report = streamer
            .stream(Bytes::from(vec![0u8; 32000]), pcm16k(), &cancel, |_| {
                sent += 1;
                if sent == 3 {
                    trigger.cancel();
                }
                true
            })
            .await;
        assert_eq!(report.sent, 3);
        assert_eq!(report.total, 100);
        assert!(report.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_transport_stops_stream() {
        let streamer = FrameStreamer::new(StreamerConfig::default());
        let report = streamer
            .stream(Bytes::from(vec![0u8; 3200]), pcm16k(), &CancellationToken::new(), |_| false)
            .await;
        assert_eq!(report.sent, 0);
        assert!(report.cancelled);
    }
}
