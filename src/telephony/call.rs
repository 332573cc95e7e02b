//! Call session
//!
//! Owns one live call: the inbound media loop feeding the transcriber,
//! the interruptible output queue feeding the rate-limited device, and
//! the teardown sequence (stop intake, drain output under a bounded
//! timeout, close the socket normally).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::audio::chunk::{AudioChunk, InterruptibleEvent, InterruptibleQueue};
use crate::audio::encoding::AudioEncoding;
use crate::audio::output::{MediaSink, RateLimitedOutputDevice};
use crate::error::PipelineError;
use crate::telephony::media::MediaFrame;

/// Media parameters for one call.
#[derive(Debug, Clone)]
pub struct CallSessionConfig {
    pub call_id: String,
    pub sampling_rate: u32,
    pub audio_encoding: AudioEncoding,
    pub per_chunk_allowance: Duration,
    pub drain_timeout: Duration,
}

/// One live call's moving parts.
pub struct CallSession<S: MediaSink> {
    config: CallSessionConfig,
    conversation_id: Uuid,
    queue: Arc<InterruptibleQueue<AudioChunk>>,
    device: Arc<RateLimitedOutputDevice<S>>,
    audio_tx: mpsc::Sender<Vec<u8>>,
    active: AtomicBool,
}

impl<S: MediaSink> CallSession<S> {
    /// Build a session over a media sink. Returns the session plus the
    /// receiver carrying decoded caller audio toward the transcriber.
    pub fn new(config: CallSessionConfig, sink: S) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let queue = Arc::new(InterruptibleQueue::new());
        let device = Arc::new(RateLimitedOutputDevice::new(
            queue.clone(),
            sink,
            config.call_id.clone(),
            config.sampling_rate,
            config.audio_encoding,
            config.per_chunk_allowance,
        ));
        let (audio_tx, audio_rx) = mpsc::channel(64);
        (
            Self {
                config,
                conversation_id: Uuid::new_v4(),
                queue,
                device,
                audio_tx,
                active: AtomicBool::new(true),
            },
            audio_rx,
        )
    }

    pub fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// The device to spawn `run_loop` on.
    pub fn output_device(&self) -> Arc<RateLimitedOutputDevice<S>> {
        self.device.clone()
    }

    /// Queue synthesized speech for paced delivery.
    pub fn enqueue_speech(&self, chunk: AudioChunk) {
        self.queue.push(InterruptibleEvent::new(chunk));
    }

    /// Caller barge-in: flag all pending speech as interrupted.
    pub fn barge_in(&self) {
        debug!("barge-in on call {}", self.config.call_id);
        self.queue.interrupt_all();
    }

    /// Consume the inbound media stream until disconnect or
    /// termination, forwarding decoded audio to the transcriber side.
    ///
    /// Close code 1000 is a normal hangup; anything else is logged as
    /// abnormal. Malformed frames are protocol errors and terminal.
    pub async fn run_media_loop<R>(&self, mut reader: R) -> Result<(), PipelineError>
    where
        R: Stream<Item = Result<Message, WsError>> + Unpin + Send,
    {
        while self.is_active() {
            let Some(message) = reader.next().await else {
                debug!("media websocket ended for call {}", self.config.call_id);
                break;
            };
            match message {
                Ok(Message::Text(text)) => {
                    let frame = MediaFrame::from_json(&text)?;
                    let audio = frame.decode_audio()?;
                    if self.audio_tx.send(audio).await.is_err() {
                        debug!("transcriber side went away, stopping media intake");
                        break;
                    }
                }
                Ok(Message::Close(close_frame)) => {
                    match &close_frame {
                        Some(frame) if frame.code != CloseCode::Normal => {
                            error!(
                                "media websocket disconnected abnormally with code {} {}",
                                frame.code, frame.reason
                            );
                        }
                        _ => debug!("media websocket closed normally"),
                    }
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(other) => {
                    debug!("ignoring non-media websocket message: {other:?}");
                }
                Err(err) => {
                    return Err(PipelineError::Transport(err.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Tear the call down cleanly: stop intake, let queued speech play
    /// out under the drain timeout, then close the output queue.
    pub async fn terminate(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("terminating call {}", self.config.call_id);
        if !self.device.wait_for_drain(self.config.drain_timeout).await {
            self.queue.interrupt_all();
        }
        self.queue.close();
    }
}

/// Carrier call-control client used to hang up from our side.
pub struct HangupClient {
    client: reqwest::Client,
    telephony_url: String,
}

impl HangupClient {
    pub fn new(telephony_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            telephony_url: telephony_url.into(),
        }
    }

    /// Ask the carrier to end the call. Returns the carrier's success
    /// flag.
    pub async fn end_call(&self, call_id: &str) -> Result<bool, PipelineError> {
        let url = format!("{}/api/tool/hangup/{call_id}", self.telephony_url);
        let response = self.client.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(PipelineError::Transport(format!(
                "failed to end call: {}",
                response.status()
            )));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|err| PipelineError::Protocol(err.to_string()))?;
        Ok(body
            .get("result")
            .and_then(|r| r.get("success"))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::stream;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    struct NullSink;

    #[async_trait]
    impl MediaSink for NullSink {
        async fn send_media(&self, _chunk: &[u8], _call_id: &str) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    fn session() -> (CallSession<NullSink>, mpsc::Receiver<Vec<u8>>) {
        CallSession::new(
            CallSessionConfig {
                call_id: "call-1".into(),
                sampling_rate: 8000,
                audio_encoding: AudioEncoding::Mulaw,
                per_chunk_allowance: Duration::from_millis(10),
                drain_timeout: Duration::from_secs(5),
            },
            NullSink,
        )
    }

    fn text_frame(audio: &[u8]) -> Result<Message, WsError> {
        Ok(Message::text(
            MediaFrame::new("call-1", audio).to_json().unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_media_loop_forwards_decoded_audio() {
        let (session, mut audio_rx) = session();
        let reader = stream::iter(vec![text_frame(&[1, 2, 3]), text_frame(&[4, 5])]);

        session.run_media_loop(reader).await.unwrap();
        assert_eq!(audio_rx.recv().await.unwrap(), vec![1, 2, 3]);
        assert_eq!(audio_rx.recv().await.unwrap(), vec![4, 5]);
    }

    #[tokio::test]
    async fn test_media_loop_stops_on_normal_close() {
        let (session, mut audio_rx) = session();
        let reader = stream::iter(vec![
            Ok(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            }))),
            text_frame(&[9, 9]),
        ]);

        session.run_media_loop(reader).await.unwrap();
        assert!(audio_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_frame_is_protocol_error() {
        let (session, _audio_rx) = session();
        let reader = stream::iter(vec![Ok(Message::text("not json"))]);

        let err = session.run_media_loop(reader).await.unwrap_err();
        assert!(matches!(err, PipelineError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let (session, _audio_rx) = session();
        let reader = stream::iter(vec![Err(WsError::ConnectionClosed)]);

        let err = session.run_media_loop(reader).await.unwrap_err();
        assert!(matches!(err, PipelineError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_drains_then_closes() {
        let (session, _audio_rx) = session();
        let device = session.output_device();
        let runner = tokio::spawn(async move { device.run_loop().await });

        // Half a second of audio, then terminate.
        session.enqueue_speech(AudioChunk::new(vec![0xFF; 4000]));
        session.terminate().await;
        assert!(!session.is_active());

        runner.await.unwrap().unwrap();
    }
}
