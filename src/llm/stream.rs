//! Streaming token demultiplexer
//!
//! Consumes the chunked delta stream a chat model produces and fuses
//! it into a single stream of either text tokens or incremental
//! function-call fragments. Lazy, finite, not restartable.

use std::collections::HashMap;

use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One SSE chunk of a streamed chat completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallChunk>>,
    /// Legacy single-function field some older models still emit.
    #[serde(default)]
    pub function_call: Option<FunctionCallChunk>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallChunk {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionCallChunk>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionCallChunk {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Incremental slice of a function call. The name rides along on the
/// first fragment only; arguments accumulate across fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionFragment {
    pub name: String,
    pub arguments: String,
    pub tool_call_id: Option<String>,
}

/// What the demultiplexer hands downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamedToken {
    Text(String),
    Function(FunctionFragment),
}

#[derive(Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    name_sent: bool,
}

struct DemuxState<S> {
    chunks: S,
    tool_calls: HashMap<usize, ToolCallAccumulator>,
    pending: Vec<StreamedToken>,
    done: bool,
}

/// Fuse a chunked model stream into text tokens and function
/// fragments.
///
/// Only tool-call index 0 is surfaced downstream; the first tool call
/// wins and the rest are accumulated but never forwarded. A
/// `content_filter` finish reason logs and terminates the stream;
/// every other finish reason terminates it silently.
pub fn stream_tokens<S>(chunks: S) -> impl Stream<Item = StreamedToken>
where
    S: Stream<Item = ChatCompletionChunk> + Unpin,
{
    let state = DemuxState {
        chunks,
        tool_calls: HashMap::new(),
        pending: Vec::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if !state.pending.is_empty() {
                let token = state.pending.remove(0);
                return Some((token, state));
            }
            if state.done {
                return None;
            }

            let Some(chunk) = state.chunks.next().await else {
                return None;
            };
            let Some(choice) = chunk.choices.first() else {
                continue;
            };

            if let Some(finish_reason) = &choice.finish_reason {
                if finish_reason == "content_filter" {
                    warn!("detected content filter; terminating token stream");
                }
                state.done = true;
                continue;
            }

            let delta = &choice.delta;
            if let Some(content) = &delta.content {
                return Some((StreamedToken::Text(content.clone()), state));
            }

            if let Some(tool_call_chunks) = &delta.tool_calls {
                for tool_call_chunk in tool_call_chunks {
                    let index = tool_call_chunk.index;
                    let accumulator = state.tool_calls.entry(index).or_default();

                    if let Some(id) = &tool_call_chunk.id {
                        accumulator.id = id.clone();
                    }
                    let Some(function) = &tool_call_chunk.function else {
                        continue;
                    };
                    if let Some(name) = &function.name {
                        accumulator.name.push_str(name);
                    }
                    let Some(arguments) = &function.arguments else {
                        continue;
                    };
                    // Parallel tool calls beyond the first are absorbed,
                    // not forwarded.
                    if index != 0 {
                        continue;
                    }
                    let name_to_send = if !accumulator.name_sent && !accumulator.name.is_empty() {
                        accumulator.name_sent = true;
                        accumulator.name.clone()
                    } else {
                        String::new()
                    };
                    state.pending.push(StreamedToken::Function(FunctionFragment {
                        name: name_to_send,
                        arguments: arguments.clone(),
                        tool_call_id: Some(accumulator.id.clone()),
                    }));
                }
                continue;
            }

            if let Some(function_call) = &delta.function_call {
                // Backward compatibility for older models
                return Some((
                    StreamedToken::Function(FunctionFragment {
                        name: function_call.name.clone().unwrap_or_default(),
                        arguments: function_call.arguments.clone().unwrap_or_default(),
                        tool_call_id: None,
                    }),
                    state,
                ));
            }
        }
    })
}
