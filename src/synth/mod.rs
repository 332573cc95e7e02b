//! Synthesizer seam
//!
//! Concrete TTS vendors live outside this crate; the pipeline only
//! needs something that turns text into encoded audio and identifies
//! its voice configuration stably enough to key the shared cache.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audio::cache::AudioCache;
use crate::audio::encoding::AudioEncoding;
use crate::error::PipelineError;

/// A TTS backend.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Opaque string identifying the full voice configuration. Two
    /// synthesizers with equal identifiers must produce byte-identical
    /// audio for the same text.
    fn voice_identifier(&self) -> String;

    /// Language the synthesizer is speaking, used to pick the cache
    /// bucket.
    fn language(&self) -> &str;

    /// Synthesize one utterance to encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, PipelineError>;
}

/// Voice parameters folded into the cache key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub provider: String,
    pub voice_id: String,
    pub model_id: Option<String>,
    pub stability: Option<f32>,
    pub similarity_boost: Option<f32>,
    pub style: Option<f32>,
    pub speed: Option<f32>,
    pub audio_encoding: AudioEncoding,
}

impl VoiceConfig {
    /// Colon-joined identifier covering every knob that changes the
    /// produced audio.
    pub fn voice_identifier(&self) -> String {
        [
            self.provider.clone(),
            self.voice_id.clone(),
            format!("{:?}", self.model_id),
            format!("{:?}", self.stability),
            format!("{:?}", self.similarity_boost),
            format!("{:?}", self.style),
            format!("{:?}", self.speed),
            format!("{:?}", self.audio_encoding),
        ]
        .join(":")
    }
}

/// Wraps a synthesizer with the shared audio cache: hits skip the
/// vendor entirely, misses populate the cache after synthesis.
pub struct CachingSynthesizer<S: Synthesizer> {
    inner: S,
    cache: Arc<AudioCache>,
    use_cache: bool,
}

impl<S: Synthesizer> CachingSynthesizer<S> {
    pub fn new(inner: S, cache: Arc<AudioCache>) -> Self {
        Self {
            inner,
            cache,
            use_cache: true,
        }
    }

    pub fn with_cache_disabled(inner: S, cache: Arc<AudioCache>) -> Self {
        Self {
            inner,
            cache,
            use_cache: false,
        }
    }
}

#[async_trait]
impl<S: Synthesizer> Synthesizer for CachingSynthesizer<S> {
    fn voice_identifier(&self) -> String {
        self.inner.voice_identifier()
    }

    fn language(&self) -> &str {
        self.inner.language()
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, PipelineError> {
        let text = text.trim();
        let voice = self.inner.voice_identifier();
        if self.use_cache {
            if let Some(audio) = self.cache.get(self.inner.language(), &voice, text).await {
                debug!("serving {} bytes of cached synthesis", audio.len());
                return Ok(audio);
            }
        }
        let audio = self.inner.synthesize(text).await?;
        if self.use_cache && !text.is_empty() {
            self.cache
                .set(self.inner.language(), &voice, text, audio.clone(), None)
                .await;
        }
        Ok(audio)
    }
}
