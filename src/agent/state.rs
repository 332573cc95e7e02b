//! Per-call conversation state
//!
//! Owns the transcript and the agent-mute flag. The transcript is
//! append-only and written exclusively through this manager by the
//! agent loop; the mute flag gates transcription intake while an
//! external action round-trips.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::action::runner::AgentControl;
use crate::transcript::Transcript;

#[derive(Default)]
pub struct ConversationStateManager {
    muted: AtomicBool,
    transcript: Mutex<Transcript>,
}

impl ConversationStateManager {
    pub fn new() -> Self {
        Self {
            muted: AtomicBool::new(false),
            transcript: Mutex::new(Transcript::new()),
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Run a closure against the transcript under its lock.
    pub fn with_transcript<R>(&self, f: impl FnOnce(&mut Transcript) -> R) -> R {
        let mut transcript = self.transcript.lock().expect("transcript lock poisoned");
        f(&mut transcript)
    }
}

impl AgentControl for ConversationStateManager {
    fn mute_agent(&self) {
        debug!("muting agent");
        self.muted.store(true, Ordering::SeqCst);
    }

    fn unmute_agent(&self) {
        debug!("unmuting agent");
        self.muted.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mute_round_trip() {
        let state = ConversationStateManager::new();
        assert!(!state.is_muted());
        state.mute_agent();
        assert!(state.is_muted());
        state.unmute_agent();
        assert!(!state.is_muted());
    }

    #[test]
    fn test_transcript_access() {
        let state = ConversationStateManager::new();
        state.with_transcript(|t| t.add_human_message("hola"));
        let len = state.with_transcript(|t| t.len());
        assert_eq!(len, 1);
    }
}
