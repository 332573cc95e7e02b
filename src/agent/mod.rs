//! Agent loop and conversation state
//!
//! The glue between transcriptions, the transcript, the chat model,
//! actions, and the synthesizer queue.

pub mod state;
pub mod dialog;

pub use dialog::{AgentLoop, ChatProvider};
pub use state::ConversationStateManager;
