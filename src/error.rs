//! Error kinds for the call pipeline
//!
//! Soft kinds (cache, context overflow) are absorbed and logged so the
//! pipeline keeps running with degraded functionality. Terminal kinds
//! tear the call down cleanly: stop consuming media, drain the output
//! device with a bounded timeout, close the socket with code 1000.

use thiserror::Error;

/// Errors that can occur anywhere in the call pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network-level failure (WebSocket send/recv, HTTP transport).
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed frame or JSON on a wire boundary.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Schema violation in action arguments (missing path placeholder,
    /// bad parameter shape). Aborts the single action only.
    #[error("argument error: {0}")]
    Argument(String),

    /// The backing cache store is unreachable. Soft: callers fall back
    /// to synthesizing uncached.
    #[error("audio cache unavailable")]
    CacheUnavailable,

    /// The projected prompt cannot fit the model context even after
    /// trimming. Soft: the projector truncates and logs.
    #[error("model context overflow: {tokens} tokens over a {max} limit")]
    ModelContextOverflow { tokens: usize, max: usize },

    /// The call is over; all tasks should unwind.
    #[error("call terminated: {0}")]
    CallTerminated(String),
}

impl PipelineError {
    /// Soft errors are absorbed by the pipeline; everything else tears
    /// the call down.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            PipelineError::CacheUnavailable | PipelineError::ModelContextOverflow { .. }
        )
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Protocol(err.to_string())
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Transport(err.to_string())
    }
}
