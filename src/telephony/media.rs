//! Media WebSocket frame codec
//!
//! Per-call media travels as JSON frames `{call_id, payload}` with
//! base64-encoded audio of the negotiated codec. Outbound audio is
//! sliced to the carrier's chunk size; the final slice is padded with
//! codec-appropriate silence.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures_util::{Sink, SinkExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::audio::output::MediaSink;
use crate::error::PipelineError;

/// One frame on the media WebSocket, both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFrame {
    pub call_id: String,
    /// Base64-encoded audio bytes
    pub payload: String,
}

impl MediaFrame {
    pub fn new(call_id: impl Into<String>, audio: &[u8]) -> Self {
        Self {
            call_id: call_id.into(),
            payload: BASE64.encode(audio),
        }
    }

    /// Decode an inbound frame's audio payload.
    pub fn decode_audio(&self) -> Result<Vec<u8>, PipelineError> {
        BASE64
            .decode(&self.payload)
            .map_err(|err| PipelineError::Protocol(format!("invalid media payload: {err}")))
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Slice outbound audio into carrier-sized frames, padding the tail
/// with silence.
pub fn media_frames(
    audio: &[u8],
    call_id: &str,
    chunk_size: usize,
    silence_byte: u8,
) -> Vec<MediaFrame> {
    audio
        .chunks(chunk_size)
        .map(|subchunk| {
            if subchunk.len() < chunk_size {
                let mut padded = subchunk.to_vec();
                padded.resize(chunk_size, silence_byte);
                MediaFrame::new(call_id, &padded)
            } else {
                MediaFrame::new(call_id, subchunk)
            }
        })
        .collect()
}

/// [`MediaSink`] that writes frames onto a WebSocket writer half.
pub struct WsMediaSink<W> {
    writer: Mutex<W>,
    chunk_size: usize,
    silence_byte: u8,
}

impl<W> WsMediaSink<W>
where
    W: Sink<Message, Error = WsError> + Unpin + Send,
{
    pub fn new(writer: W, chunk_size: usize, silence_byte: u8) -> Self {
        Self {
            writer: Mutex::new(writer),
            chunk_size,
            silence_byte,
        }
    }
}

#[async_trait]
impl<W> MediaSink for WsMediaSink<W>
where
    W: Sink<Message, Error = WsError> + Unpin + Send,
{
    async fn send_media(&self, chunk: &[u8], call_id: &str) -> Result<(), PipelineError> {
        let frames = media_frames(chunk, call_id, self.chunk_size, self.silence_byte);
        let mut writer = self.writer.lock().await;
        for frame in frames {
            let text = frame.to_json()?;
            writer
                .send(Message::text(text))
                .await
                .map_err(|err| PipelineError::Transport(err.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_round_trip() {
        let frame = MediaFrame::new("call-1", &[1u8, 2, 3]);
        let json = frame.to_json().unwrap();
        let back = MediaFrame::from_json(&json).unwrap();
        assert_eq!(back, frame);
        assert_eq!(back.decode_audio().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_invalid_payload_is_protocol_error() {
        let frame = MediaFrame {
            call_id: "call-1".into(),
            payload: "!!not base64!!".into(),
        };
        assert!(matches!(
            frame.decode_audio(),
            Err(PipelineError::Protocol(_))
        ));
    }

    #[test]
    fn test_slicing_pads_last_frame_with_silence() {
        let audio = vec![0x01u8; 250];
        let frames = media_frames(&audio, "call-1", 100, 0xFF);
        assert_eq!(frames.len(), 3);

        let last = frames[2].decode_audio().unwrap();
        assert_eq!(last.len(), 100);
        assert_eq!(&last[..50], &[0x01u8; 50][..]);
        assert_eq!(&last[50..], &[0xFFu8; 50][..]);
    }

    #[test]
    fn test_exact_multiple_needs_no_padding() {
        let audio = vec![0x01u8; 200];
        let frames = media_frames(&audio, "call-1", 100, 0xFF);
        assert_eq!(frames.len(), 2);
        assert!(frames
            .iter()
            .all(|f| f.decode_audio().unwrap() == vec![0x01u8; 100]));
    }
}
