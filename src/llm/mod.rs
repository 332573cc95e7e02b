//! LLM-facing types and stream handling
//!
//! OpenAI-style chat message and tool schemas, the streaming token
//! demultiplexer, and the token/context accountant.

pub mod schema;
pub mod stream;
pub mod tokens;

pub use schema::{ChatMessage, FunctionCall, FunctionDefinition, ToolCall, ToolDefinition};
pub use stream::{stream_tokens, ChatCompletionChunk, FunctionFragment, StreamedToken};
