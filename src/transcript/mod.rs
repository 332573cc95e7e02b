//! Call transcript: an append-only event log
//!
//! Every observable conversation event lands here in order: caller and
//! bot utterances, action (tool call) starts and finishes, and
//! conference announcements. The transcript is written exclusively by
//! the agent loop and projected into LLM chat messages at read time.

pub mod projector;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Who produced an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Human,
    Bot,
}

/// How an action was invoked. Phrase-triggered actions are fired by an
/// utterance pattern rather than an LLM tool call and are excluded from
/// tool-call projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTrigger {
    FunctionCall,
    PhraseBased,
}

/// One entry in the transcript.
///
/// Invariant: every function-call-triggered `ActionStart` carrying a
/// `tool_call_id` is eventually followed by exactly one `ActionFinish`
/// with the same id, or the call terminates first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventLog {
    Message {
        sender: Sender,
        text: String,
    },
    ActionStart {
        tool_call_id: Option<String>,
        action_type: String,
        action_input: serde_json::Value,
        trigger: ActionTrigger,
    },
    ActionFinish {
        tool_call_id: Option<String>,
        result_text: String,
    },
    ConferenceEvent {
        text: String,
    },
}

impl EventLog {
    /// True for action events fired by utterance patterns; these never
    /// project as tool calls.
    pub fn is_phrase_triggered(&self) -> bool {
        matches!(
            self,
            EventLog::ActionStart {
                trigger: ActionTrigger::PhraseBased,
                ..
            }
        )
    }
}

/// Ordered, append-only sequence of events for one call.
#[derive(Debug, Default)]
pub struct Transcript {
    event_logs: Vec<EventLog>,
    started_at: Option<DateTime<Utc>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            event_logs: Vec::new(),
            started_at: Some(Utc::now()),
        }
    }

    pub fn add_event(&mut self, event: EventLog) {
        if let Some(started) = self.started_at {
            debug!(
                elapsed_ms = (Utc::now() - started).num_milliseconds(),
                "transcript event: {event:?}"
            );
        }
        self.event_logs.push(event);
    }

    pub fn add_human_message(&mut self, text: impl Into<String>) {
        self.add_event(EventLog::Message {
            sender: Sender::Human,
            text: text.into(),
        });
    }

    pub fn add_bot_message(&mut self, text: impl Into<String>) {
        self.add_event(EventLog::Message {
            sender: Sender::Bot,
            text: text.into(),
        });
    }

    pub fn add_action_start(
        &mut self,
        tool_call_id: Option<String>,
        action_type: impl Into<String>,
        action_input: serde_json::Value,
        trigger: ActionTrigger,
    ) {
        self.add_event(EventLog::ActionStart {
            tool_call_id,
            action_type: action_type.into(),
            action_input,
            trigger,
        });
    }

    pub fn add_action_finish(&mut self, tool_call_id: Option<String>, result_text: impl Into<String>) {
        self.add_event(EventLog::ActionFinish {
            tool_call_id,
            result_text: result_text.into(),
        });
    }

    pub fn event_logs(&self) -> &[EventLog] {
        &self.event_logs
    }

    pub fn len(&self) -> usize {
        self.event_logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_logs.is_empty()
    }
}
