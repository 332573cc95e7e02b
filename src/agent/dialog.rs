//! The dialog loop
//!
//! Consumes final transcriptions, projects the transcript into chat
//! messages, streams the model's reply, and routes the demultiplexed
//! output: text goes to the synthesizer queue, tool calls go through
//! the external action runner and back into the transcript so the
//! model can react to the result.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::action::runner::ExternalActionRunner;
use crate::agent::state::ConversationStateManager;
use crate::asr::Transcription;
use crate::config::AgentConfig;
use crate::error::PipelineError;
use crate::llm::schema::{FunctionDefinition, ToolDefinition};
use crate::llm::stream::{stream_tokens, ChatCompletionChunk, StreamedToken};
use crate::transcript::projector::format_chat_messages_from_transcript;
use crate::transcript::ActionTrigger;

/// Chat backend seam: produce a delta-chunk stream for a prompt.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn stream_chat(
        &self,
        messages: Vec<crate::llm::schema::ChatMessage>,
        tools: Vec<ToolDefinition>,
    ) -> Result<BoxStream<'static, ChatCompletionChunk>, PipelineError>;
}

/// Cap on model→action→model rounds within one caller turn.
const MAX_ACTION_ROUNDS: usize = 4;

struct PendingToolCall {
    name: String,
    arguments: String,
    tool_call_id: Option<String>,
}

/// The per-call dialog loop.
pub struct AgentLoop<P: ChatProvider> {
    provider: P,
    state: Arc<ConversationStateManager>,
    actions: HashMap<String, Arc<ExternalActionRunner>>,
    prompt_preamble: String,
    config: AgentConfig,
    speech_tx: mpsc::Sender<String>,
}

impl<P: ChatProvider> AgentLoop<P> {
    pub fn new(
        provider: P,
        state: Arc<ConversationStateManager>,
        actions: Vec<Arc<ExternalActionRunner>>,
        prompt_preamble: impl Into<String>,
        config: AgentConfig,
        speech_tx: mpsc::Sender<String>,
    ) -> Self {
        let actions = actions
            .into_iter()
            .map(|runner| (runner.config().name.clone(), runner))
            .collect();
        Self {
            provider,
            state,
            actions,
            prompt_preamble: prompt_preamble.into(),
            config,
            speech_tx,
        }
    }

    fn function_definitions(&self) -> Vec<FunctionDefinition> {
        self.actions
            .values()
            .map(|runner| FunctionDefinition {
                name: runner.config().name.clone(),
                description: runner.config().description.clone(),
                parameters: runner.config().llm_schema(),
            })
            .collect()
    }

    /// Feed one transcription into the dialog. Partials and anything
    /// arriving while the agent is muted are dropped.
    pub async fn handle_transcription(
        &self,
        transcription: Transcription,
    ) -> Result<(), PipelineError> {
        if !transcription.is_final || transcription.message.trim().is_empty() {
            return Ok(());
        }
        if self.state.is_muted() {
            debug!("agent muted, dropping transcription: {}", transcription.message);
            return Ok(());
        }
        self.state
            .with_transcript(|t| t.add_human_message(transcription.message.clone()));
        self.respond().await
    }

    /// Run model rounds until the model stops calling tools (or the
    /// round cap is hit).
    async fn respond(&self) -> Result<(), PipelineError> {
        let functions = self.function_definitions();
        let tools: Vec<ToolDefinition> = functions.iter().cloned().map(Into::into).collect();

        for _ in 0..MAX_ACTION_ROUNDS {
            let messages = self.state.with_transcript(|transcript| {
                format_chat_messages_from_transcript(
                    transcript,
                    &self.config.model,
                    &functions,
                    &self.prompt_preamble,
                    self.config.max_response_tokens,
                )
            });

            let chunks = self.provider.stream_chat(messages, tools.clone()).await?;
            let tokens = stream_tokens(chunks);
            futures::pin_mut!(tokens);

            let mut spoken = String::new();
            let mut pending: Option<PendingToolCall> = None;
            while let Some(token) = tokens.next().await {
                match token {
                    StreamedToken::Text(text) => spoken.push_str(&text),
                    StreamedToken::Function(fragment) => match &mut pending {
                        Some(call) => {
                            call.arguments.push_str(&fragment.arguments);
                            if call.tool_call_id.is_none() {
                                call.tool_call_id = fragment.tool_call_id;
                            }
                        }
                        None => {
                            pending = Some(PendingToolCall {
                                name: fragment.name,
                                arguments: fragment.arguments,
                                tool_call_id: fragment.tool_call_id,
                            });
                        }
                    },
                }
            }

            if !spoken.trim().is_empty() {
                self.state
                    .with_transcript(|t| t.add_bot_message(spoken.clone()));
                let _ = self.speech_tx.send(spoken).await;
            }

            let Some(call) = pending else {
                return Ok(());
            };
            self.run_tool_call(call).await;
        }
        warn!("action round cap reached, yielding turn back to the caller");
        Ok(())
    }

    async fn run_tool_call(&self, call: PendingToolCall) {
        let Some(runner) = self.actions.get(&call.name) else {
            warn!("model requested unknown action '{}'", call.name);
            return;
        };

        let payload = match serde_json::from_str::<Value>(&call.arguments) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!("unparseable arguments for action '{}'", call.name);
                serde_json::Map::new()
            }
        };

        self.state.with_transcript(|t| {
            t.add_action_start(
                call.tool_call_id.clone(),
                call.name.clone(),
                Value::Object(payload.clone()),
                ActionTrigger::FunctionCall,
            )
        });

        match runner.run(&payload, self.state.as_ref()).await {
            Ok(output) => {
                let result_text = output
                    .response
                    .result
                    .as_ref()
                    .map(Value::to_string)
                    .unwrap_or_else(|| format!("success: {}", output.response.success));
                self.state
                    .with_transcript(|t| t.add_action_finish(call.tool_call_id.clone(), result_text));
                if let Some(canned) = output.canned_response {
                    self.state
                        .with_transcript(|t| t.add_bot_message(canned.clone()));
                    let _ = self.speech_tx.send(canned).await;
                }
            }
            Err(err) => {
                // Argument errors abort this action only; the model
                // sees the failure and the call goes on.
                warn!("action '{}' aborted: {err}", call.name);
                self.state.with_transcript(|t| {
                    t.add_action_finish(call.tool_call_id.clone(), format!("error: {err}"))
                });
            }
        }
    }
}
