//! Voxpipe - Real-Time Voice-Agent Telephony Runtime
//!
//! The core pipeline that makes a live phone call behave like a
//! conversation with an LLM agent:
//! - Rate-limited audio output with responsive barge-in
//! - Multi-tenant, per-language LRU cache in front of TTS synthesis
//! - Transcript-to-chat projection with tool-call pairing
//! - Streaming token demultiplexing for incremental model output
//! - External-action dispatch with parameter routing and signing
//! - Natural-language temporal enrichment for multilingual utterances
//!
//! # Architecture
//!
//! ```text
//! Caller ── audio ──► CallSession ──► Transcriber ──► AgentLoop ──► Synthesizer ──► OutputDevice ──► Caller
//!                                          │              │
//!                                          │              └─► ExternalActionRunner ──► HTTP
//!                                          └─► Transcript (append-only event log)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use voxpipe::audio::cache::AudioCache;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = AudioCache::shared().await;
//!     let hit = cache.get("es", "eleven:abc", "hola").await;
//!     println!("cache hit: {}", hit.is_some());
//!     Ok(())
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod error;
pub mod config;
pub mod audio;
pub mod synth;
pub mod asr;
pub mod transcript;
pub mod llm;
pub mod action;
pub mod temporal;
pub mod telephony;
pub mod agent;

// Re-export commonly used types for convenience
pub use audio::{
    chunk::{AudioChunk, ChunkHandle, ChunkState, InterruptibleEvent, InterruptibleQueue},
    encoding::AudioEncoding,
    output::RateLimitedOutputDevice,
    cache::AudioCache,
};

pub use transcript::{EventLog, Sender, Transcript};

pub use llm::{
    schema::{ChatMessage, FunctionDefinition, ToolCall},
    stream::{stream_tokens, FunctionFragment, StreamedToken},
};

pub use action::{
    config::ExternalActionConfig,
    runner::{ActionResponse, ExternalActionRunner},
};

pub use temporal::enricher::TemporalEnricher;

pub use error::PipelineError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library info
pub fn info() -> String {
    format!("{} v{} - Real-Time Voice-Agent Telephony Runtime", NAME, VERSION)
}
