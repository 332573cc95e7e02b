//! Transcriber seam
//!
//! Concrete ASR vendors live outside this crate. The pipeline consumes
//! [`Transcription`] values from anything implementing [`Transcriber`]
//! and feeds it raw carrier audio.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audio::encoding::AudioEncoding;
use crate::error::PipelineError;

/// How the transcriber decides an utterance has ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointingConfig {
    TimeBased {
        #[serde(default = "default_time_cutoff")]
        time_cutoff_seconds: f64,
    },
    PunctuationBased {
        #[serde(default = "default_time_cutoff")]
        time_cutoff_seconds: f64,
    },
}

fn default_time_cutoff() -> f64 {
    0.4
}

/// Audio-shape and behavior parameters for a transcriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriberConfig {
    pub sampling_rate: u32,
    pub audio_encoding: AudioEncoding,
    pub chunk_size: usize,
    #[serde(default)]
    pub endpointing_config: Option<EndpointingConfig>,
    #[serde(default)]
    pub downsampling: Option<u32>,
    /// Drop transcriptions while the bot is speaking.
    #[serde(default)]
    pub mute_during_speech: bool,
}

/// One transcription result, partial or final.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub message: String,
    pub confidence: f64,
    pub is_final: bool,
    /// The caller spoke over bot playback.
    #[serde(default)]
    pub is_interrupt: bool,
    /// Added only on final transcriptions.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

impl Transcription {
    /// Words per minute of the utterance, when duration is known.
    pub fn wpm(&self) -> Option<f64> {
        self.duration_seconds
            .filter(|d| *d > 0.0)
            .map(|duration| 60.0 * self.message.split_whitespace().count() as f64 / duration)
    }
}

/// An ASR backend consuming carrier audio and producing
/// transcriptions.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Feed one chunk of raw carrier audio.
    async fn send_audio(&self, chunk: Vec<u8>) -> Result<(), PipelineError>;

    /// Receive the next transcription; `None` when the stream ends.
    async fn next_transcription(&self) -> Option<Transcription>;
}
