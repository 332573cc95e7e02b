//! Rate-limited audio output device
//!
//! Paces synthesized audio onto the media sink at real-time playback
//! rate. A chunk of x seconds is followed by a sleep of roughly x
//! seconds, so at any moment at most one chunk is "ahead" of the
//! caller's ear. Barge-in then works by simply not dequeuing further:
//! interruption flags queued events and the loop skips them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use crate::audio::chunk::{AudioChunk, ChunkState, InterruptibleQueue};
use crate::audio::encoding::{bytes_per_second, AudioEncoding};
use crate::error::PipelineError;

/// Downstream destination for paced audio (carrier WebSocket, speaker)
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Deliver one chunk for immediate playback. A send failure is
    /// fatal to the call.
    async fn send_media(&self, chunk: &[u8], call_id: &str) -> Result<(), PipelineError>;
}

/// Output device that serializes chunks at real-time rate.
///
/// Single consumer over an [`InterruptibleQueue`]; the loop owns all
/// chunk state transitions and lifecycle hooks.
pub struct RateLimitedOutputDevice<S: MediaSink> {
    queue: Arc<InterruptibleQueue<AudioChunk>>,
    sink: S,
    call_id: String,
    sampling_rate: u32,
    audio_encoding: AudioEncoding,
    per_chunk_allowance: Duration,
    is_processing: AtomicBool,
}

impl<S: MediaSink> RateLimitedOutputDevice<S> {
    pub fn new(
        queue: Arc<InterruptibleQueue<AudioChunk>>,
        sink: S,
        call_id: impl Into<String>,
        sampling_rate: u32,
        audio_encoding: AudioEncoding,
        per_chunk_allowance: Duration,
    ) -> Self {
        Self {
            queue,
            sink,
            call_id: call_id.into(),
            sampling_rate,
            audio_encoding,
            per_chunk_allowance,
            is_processing: AtomicBool::new(false),
        }
    }

    pub fn queue(&self) -> Arc<InterruptibleQueue<AudioChunk>> {
        self.queue.clone()
    }

    /// Consume the queue until it closes. Chunks are delivered in
    /// enqueue order; the sleep after each send never exceeds the
    /// chunk's real duration. Cancellation at the dequeue point is a
    /// clean exit: no hook fires and no sleep runs.
    pub async fn run_loop(&self) -> Result<(), PipelineError> {
        loop {
            let Some(event) = self.queue.pop().await else {
                return Ok(());
            };
            let start = Instant::now();
            self.is_processing.store(true, Ordering::SeqCst);

            let chunk = event.payload();
            if event.is_interrupted() {
                chunk.fire_on_interrupt();
                chunk.set_state(ChunkState::Interrupted);
                self.finish_chunk();
                continue;
            }

            let speech_length_seconds = chunk.data.len() as f64
                / bytes_per_second(self.audio_encoding, self.sampling_rate) as f64;

            chunk.set_state(ChunkState::Playing);
            if let Err(err) = self.sink.send_media(&chunk.data, &self.call_id).await {
                self.finish_chunk();
                return Err(err);
            }
            chunk.fire_on_play();
            chunk.set_state(ChunkState::Played);

            let elapsed = start.elapsed().as_secs_f64();
            let sleep_seconds = (speech_length_seconds
                - elapsed
                - self.per_chunk_allowance.as_secs_f64())
            .max(0.0);
            tokio::time::sleep(Duration::from_secs_f64(sleep_seconds)).await;

            event.mark_uninterruptible();
            self.finish_chunk();
        }
    }

    fn finish_chunk(&self) {
        self.queue.clear_in_flight();
        self.is_processing.store(false, Ordering::SeqCst);
    }

    /// Interruption needs no device-side logic: stopping the flow of
    /// chunks is all it takes, and that happens at the queue.
    pub fn interrupt(&self) {}

    /// Wait until the queue is empty and no chunk is in flight.
    /// Returns true on drain, false on timeout. Never deadlocks.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.queue.is_empty() && !self.is_processing.load(Ordering::SeqCst) {
                return true;
            }
            if Instant::now() >= deadline {
                debug!("output device drain timed out");
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::chunk::InterruptibleEvent;
    use std::sync::Mutex;

    struct RecordingSink {
        sent: Mutex<Vec<usize>>,
        fail: bool,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl MediaSink for RecordingSink {
        async fn send_media(&self, chunk: &[u8], _call_id: &str) -> Result<(), PipelineError> {
            if self.fail {
                return Err(PipelineError::Transport("sink closed".into()));
            }
            self.sent.lock().unwrap().push(chunk.len());
            Ok(())
        }
    }

    fn device_with_sink(
        sink: RecordingSink,
    ) -> (
        Arc<InterruptibleQueue<AudioChunk>>,
        RateLimitedOutputDevice<RecordingSink>,
    ) {
        let queue = Arc::new(InterruptibleQueue::new());
        let device = RateLimitedOutputDevice::new(
            queue.clone(),
            sink,
            "call-1",
            8000,
            AudioEncoding::Mulaw,
            Duration::from_millis(10),
        );
        (queue, device)
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunks_delivered_in_order() {
        let (queue, device) = device_with_sink(RecordingSink::new());
        for len in [100, 200, 300] {
            queue.push(InterruptibleEvent::new(AudioChunk::new(vec![0xFF; len])));
        }
        queue.close();

        device.run_loop().await.unwrap();
        assert_eq!(*device.sink.sent.lock().unwrap(), vec![100, 200, 300]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupted_event_skips_playback() {
        let (queue, device) = device_with_sink(RecordingSink::new());

        let played = AudioChunk::new(vec![0xFF; 800]);
        let played_handle = played.handle();
        queue.push(InterruptibleEvent::new(played));

        let skipped = AudioChunk::new(vec![0xFF; 800]);
        let skipped_handle = skipped.handle();
        let event = InterruptibleEvent::new(skipped);
        event.interrupt();
        queue.push(event);
        queue.close();

        device.run_loop().await.unwrap();
        assert_eq!(played_handle.state(), ChunkState::Played);
        assert_eq!(skipped_handle.state(), ChunkState::Interrupted);
        assert_eq!(device.sink.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_matches_chunk_duration() {
        let (queue, device) = device_with_sink(RecordingSink::new());
        // 8000 bytes of mulaw at 8 kHz is exactly one second
        queue.push(InterruptibleEvent::new(AudioChunk::new(vec![0xFF; 8000])));
        queue.close();

        let start = Instant::now();
        device.run_loop().await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(980), "elapsed {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(1020), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_error_is_fatal() {
        let mut sink = RecordingSink::new();
        sink.fail = true;
        let (queue, device) = device_with_sink(sink);
        queue.push(InterruptibleEvent::new(AudioChunk::new(vec![0xFF; 100])));

        let err = device.run_loop().await.unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_drain() {
        let (queue, device) = device_with_sink(RecordingSink::new());
        let device = Arc::new(device);

        queue.push(InterruptibleEvent::new(AudioChunk::new(vec![0xFF; 4000])));
        queue.close();

        let runner = {
            let device = device.clone();
            tokio::spawn(async move { device.run_loop().await })
        };

        assert!(device.wait_for_drain(Duration::from_secs(5)).await);
        runner.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_drain_timeout() {
        let (queue, device) = device_with_sink(RecordingSink::new());
        // Nothing consumes the queue, so it never drains.
        queue.push(InterruptibleEvent::new(AudioChunk::new(vec![0xFF; 100])));
        assert!(!device.wait_for_drain(Duration::from_millis(300)).await);
    }
}
