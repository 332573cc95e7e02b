//! Transcript-to-chat projection
//!
//! Rebuilds the message list an LLM expects from the append-only event
//! log, pairing each tool call with its response exactly the way the
//! model requires, then trims the result to the model's context window
//! without ever orphaning a tool-call/tool-response pair.

use std::collections::{HashMap, HashSet};

use tracing::{error, info};

use crate::llm::schema::{ChatMessage, FunctionDefinition, ToolCall};
use crate::llm::tokens::{
    get_chat_gpt_max_tokens, num_tokens_from_functions, num_tokens_from_messages,
};
use crate::transcript::{EventLog, Sender, Transcript};

/// How far past a bot message we look for its associated tool call.
const TOOL_CALL_LOOKAHEAD: usize = 4;

/// Safety margin subtracted from the context limit on top of the
/// response reservation.
const CONTEXT_MARGIN_TOKENS: usize = 50;

/// Merge consecutive bot messages into one, space-joined. Human
/// messages and action events pass through untouched.
pub fn merge_bot_messages(event_logs: &[EventLog]) -> Vec<EventLog> {
    let mut merged: Vec<EventLog> = Vec::with_capacity(event_logs.len());
    let mut idx = 0;
    while idx < event_logs.len() {
        let mut bot_texts: Vec<&str> = Vec::new();
        while let Some(EventLog::Message {
            sender: Sender::Bot,
            text,
        }) = event_logs.get(idx)
        {
            bot_texts.push(text);
            idx += 1;
        }
        if !bot_texts.is_empty() {
            merged.push(EventLog::Message {
                sender: Sender::Bot,
                text: bot_texts.join(" "),
            });
        } else {
            merged.push(event_logs[idx].clone());
            idx += 1;
        }
    }
    merged
}

fn tool_call_from_action(
    tool_call_id: &str,
    action_type: &str,
    action_input: &serde_json::Value,
) -> ToolCall {
    ToolCall::function(tool_call_id, action_type, action_input.to_string())
}

/// Project merged events into chat messages, preserving tool-call
/// pairing. Each tool_call_id appears at most once in the output.
pub fn chat_messages_from_events(
    merged_event_logs: &[EventLog],
    prompt_preamble: &str,
) -> Vec<ChatMessage> {
    let mut chat_messages = vec![ChatMessage::system(prompt_preamble)];

    // First pass: index action starts and finishes by tool_call_id
    let mut finishes_by_id: HashMap<&str, &str> = HashMap::new();
    for event in merged_event_logs {
        if let EventLog::ActionFinish {
            tool_call_id: Some(id),
            result_text,
        } = event
        {
            finishes_by_id.insert(id.as_str(), result_text.as_str());
        }
    }

    let mut processed_tool_calls: HashSet<&str> = HashSet::new();

    // Second pass: build messages in log order
    let mut i = 0;
    while i < merged_event_logs.len() {
        match &merged_event_logs[i] {
            EventLog::Message { sender, text } => {
                if text.trim().is_empty() {
                    i += 1;
                    continue;
                }
                match sender {
                    Sender::Human => chat_messages.push(ChatMessage::user(text.clone())),
                    Sender::Bot => {
                        // Look ahead for the action this utterance announced,
                        // stopping at the next human turn.
                        let mut associated: Option<(&str, &str, &serde_json::Value)> = None;
                        for next in merged_event_logs
                            .iter()
                            .skip(i + 1)
                            .take(TOOL_CALL_LOOKAHEAD)
                        {
                            match next {
                                EventLog::ActionStart {
                                    tool_call_id: Some(id),
                                    action_type,
                                    action_input,
                                    ..
                                } if !next.is_phrase_triggered()
                                    && finishes_by_id.contains_key(id.as_str())
                                    && !processed_tool_calls.contains(id.as_str()) =>
                                {
                                    associated = Some((id.as_str(), action_type, action_input));
                                    break;
                                }
                                EventLog::Message {
                                    sender: Sender::Human,
                                    ..
                                } => break,
                                _ => {}
                            }
                        }

                        if let Some((id, action_type, action_input)) = associated {
                            processed_tool_calls.insert(id);
                            chat_messages.push(ChatMessage::assistant_with_tools(
                                Some(text.clone()),
                                vec![tool_call_from_action(id, action_type, action_input)],
                            ));
                            if let Some(result_text) = finishes_by_id.get(id) {
                                chat_messages.push(ChatMessage::tool_result(id, *result_text));
                            }
                        } else {
                            chat_messages.push(ChatMessage::assistant(text.clone()));
                        }
                    }
                }
                i += 1;
            }
            event @ EventLog::ActionStart {
                tool_call_id,
                action_type,
                action_input,
                ..
            } => {
                // Orphan starts (no announcing bot message) still project
                // as a content-less assistant tool call.
                let Some(id) = tool_call_id.as_deref() else {
                    i += 1;
                    continue;
                };
                if event.is_phrase_triggered() || processed_tool_calls.contains(id) {
                    i += 1;
                    continue;
                }
                if let Some(result_text) = finishes_by_id.get(id) {
                    processed_tool_calls.insert(id);
                    chat_messages.push(ChatMessage::assistant_with_tools(
                        None,
                        vec![tool_call_from_action(id, action_type, action_input)],
                    ));
                    chat_messages.push(ChatMessage::tool_result(id, *result_text));
                }
                i += 1;
            }
            EventLog::ConferenceEvent { text } => {
                chat_messages.push(ChatMessage::user(text.clone()));
                i += 1;
            }
            EventLog::ActionFinish { .. } => {
                i += 1;
            }
        }
    }

    chat_messages
}

/// Full projection: merge, project, then trim to the model's context
/// window while keeping every tool-call/tool-response pair intact.
pub fn format_chat_messages_from_transcript(
    transcript: &Transcript,
    model_name: &str,
    functions: &[FunctionDefinition],
    prompt_preamble: &str,
    max_response_tokens: usize,
) -> Vec<ChatMessage> {
    let merged = merge_bot_messages(transcript.event_logs());
    let mut chat_messages = chat_messages_from_events(&merged, prompt_preamble);

    let budget = get_chat_gpt_max_tokens(model_name)
        .saturating_sub(max_response_tokens)
        .saturating_sub(CONTEXT_MARGIN_TOKENS);

    let mut context_size = num_tokens_from_messages(&chat_messages, model_name)
        + num_tokens_from_functions(functions, model_name);

    let mut num_removed_messages = 0;
    while context_size > budget {
        if chat_messages.len() <= 1 {
            error!("prompt is too long to fit in context window, num tokens {context_size}");
            break;
        }
        num_removed_messages += 1;

        // Remove the first message that is neither the system prompt,
        // a tool response, nor an assistant message carrying tool
        // calls; that keeps every pair intact.
        let removable = (1..chat_messages.len()).find(|&idx| {
            let msg = &chat_messages[idx];
            msg.role != "system" && msg.role != "tool" && !(msg.role == "assistant" && msg.has_tool_calls())
        });
        match removable {
            Some(idx) => {
                chat_messages.remove(idx);
            }
            // No safe message left: drop index 1 unconditionally.
            None => {
                chat_messages.remove(1);
            }
        }

        context_size = num_tokens_from_messages(&chat_messages, model_name)
            + num_tokens_from_functions(functions, model_name);
    }

    if num_removed_messages > 0 {
        info!("removed {num_removed_messages} messages from prompt to satisfy context limit");
    }

    chat_messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::ActionTrigger;
    use serde_json::json;

    fn transcript_with_tool_call() -> Transcript {
        let mut transcript = Transcript::new();
        transcript.add_bot_message("Let me check");
        transcript.add_action_start(
            Some("T1".into()),
            "lookup",
            json!({"q": "x"}),
            ActionTrigger::FunctionCall,
        );
        transcript.add_action_finish(Some("T1".into()), "ok");
        transcript.add_bot_message("Found it");
        transcript
    }

    #[test]
    fn test_merge_consecutive_bot_messages() {
        let events = vec![
            EventLog::Message {
                sender: Sender::Bot,
                text: "Hello".into(),
            },
            EventLog::Message {
                sender: Sender::Bot,
                text: "there".into(),
            },
            EventLog::Message {
                sender: Sender::Human,
                text: "hi".into(),
            },
        ];
        let merged = merge_bot_messages(&events);
        assert_eq!(merged.len(), 2);
        assert_eq!(
            merged[0],
            EventLog::Message {
                sender: Sender::Bot,
                text: "Hello there".into()
            }
        );
    }

    #[test]
    fn test_projection_pairs_tool_call_with_response() {
        let transcript = transcript_with_tool_call();
        let messages = chat_messages_from_events(
            &merge_bot_messages(transcript.event_logs()),
            "You are helpful.",
        );

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content.as_deref(), Some("You are helpful."));

        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].content.as_deref(), Some("Let me check"));
        let tool_calls = messages[1].tool_calls.as_ref().unwrap();
        assert_eq!(tool_calls.len(), 1);
        assert_eq!(tool_calls[0].id, "T1");
        assert_eq!(tool_calls[0].function.name, "lookup");
        assert_eq!(tool_calls[0].function.arguments, r#"{"q":"x"}"#);

        assert_eq!(messages[2].role, "tool");
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("T1"));
        assert_eq!(messages[2].content.as_deref(), Some("ok"));

        assert_eq!(messages[3].role, "assistant");
        assert_eq!(messages[3].content.as_deref(), Some("Found it"));
    }

    #[test]
    fn test_orphan_action_start_projects_with_null_content() {
        let mut transcript = Transcript::new();
        transcript.add_human_message("do it");
        transcript.add_action_start(
            Some("T9".into()),
            "book",
            json!({"slot": "10am"}),
            ActionTrigger::FunctionCall,
        );
        transcript.add_action_finish(Some("T9".into()), "booked");

        let messages = chat_messages_from_events(transcript.event_logs(), "sys");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[2].content, None);
        assert!(messages[2].has_tool_calls());
        assert_eq!(messages[3].role, "tool");
    }

    #[test]
    fn test_tool_call_projected_at_most_once() {
        let mut transcript = transcript_with_tool_call();
        // The same start appearing again must not duplicate the pair.
        transcript.add_action_start(
            Some("T1".into()),
            "lookup",
            json!({"q": "x"}),
            ActionTrigger::FunctionCall,
        );

        let messages =
            chat_messages_from_events(&merge_bot_messages(transcript.event_logs()), "sys");
        let tool_responses = messages.iter().filter(|m| m.role == "tool").count();
        assert_eq!(tool_responses, 1);
    }

    #[test]
    fn test_phrase_triggered_actions_are_dropped() {
        let mut transcript = Transcript::new();
        transcript.add_bot_message("Goodbye");
        transcript.add_action_start(
            Some("T2".into()),
            "hangup",
            json!({}),
            ActionTrigger::PhraseBased,
        );
        transcript.add_action_finish(Some("T2".into()), "done");

        let messages = chat_messages_from_events(transcript.event_logs(), "sys");
        assert_eq!(messages.len(), 2);
        assert!(messages[1].tool_calls.is_none());
    }

    #[test]
    fn test_lookahead_stops_at_human_message() {
        let mut transcript = Transcript::new();
        transcript.add_bot_message("One moment");
        transcript.add_human_message("actually wait");
        transcript.add_action_start(
            Some("T3".into()),
            "lookup",
            json!({}),
            ActionTrigger::FunctionCall,
        );
        transcript.add_action_finish(Some("T3".into()), "found");

        let messages = chat_messages_from_events(transcript.event_logs(), "sys");
        // The bot message stays plain; the action projects as an orphan
        // after the human turn.
        assert_eq!(messages[1].role, "assistant");
        assert!(!messages[1].has_tool_calls());
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[3].role, "assistant");
        assert!(messages[3].has_tool_calls());
    }

    #[test]
    fn test_unfinished_action_does_not_project() {
        let mut transcript = Transcript::new();
        transcript.add_bot_message("Checking");
        transcript.add_action_start(
            Some("T4".into()),
            "lookup",
            json!({}),
            ActionTrigger::FunctionCall,
        );
        // no finish

        let messages = chat_messages_from_events(transcript.event_logs(), "sys");
        assert_eq!(messages.len(), 2);
        assert!(!messages[1].has_tool_calls());
    }

    #[test]
    fn test_empty_messages_are_dropped() {
        let mut transcript = Transcript::new();
        transcript.add_human_message("   ");
        transcript.add_bot_message("hello");

        let messages = chat_messages_from_events(transcript.event_logs(), "sys");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, "assistant");
    }

    #[test]
    fn test_conference_event_projects_as_user() {
        let mut transcript = Transcript::new();
        transcript.add_event(EventLog::ConferenceEvent {
            text: "Caller 2 joined".into(),
        });
        let messages = chat_messages_from_events(transcript.event_logs(), "sys");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content.as_deref(), Some("Caller 2 joined"));
    }

    #[test]
    fn test_truncation_preserves_pairs() {
        let mut transcript = Transcript::new();
        for turn in 0..200 {
            transcript.add_human_message(format!(
                "user turn {turn} with enough words to occupy a noticeable number of tokens in the prompt"
            ));
            transcript.add_bot_message(format!("bot answer {turn}"));
        }
        transcript.add_bot_message("Let me check");
        transcript.add_action_start(
            Some("T1".into()),
            "lookup",
            json!({"q": "x"}),
            ActionTrigger::FunctionCall,
        );
        transcript.add_action_finish(Some("T1".into()), "ok");

        // Unknown model => 4050-token window, forcing heavy trimming.
        let messages = format_chat_messages_from_transcript(
            &transcript,
            "tiny-model",
            &[],
            "system prompt",
            256,
        );

        assert_eq!(messages[0].role, "system");
        for (idx, msg) in messages.iter().enumerate() {
            if msg.role == "tool" {
                let prev = &messages[idx - 1];
                assert!(prev.has_tool_calls(), "tool response lost its call");
                let id = msg.tool_call_id.as_deref().unwrap();
                assert!(prev
                    .tool_calls
                    .as_ref()
                    .unwrap()
                    .iter()
                    .any(|tc| tc.id == id));
            }
        }
        // The pair survived the trim.
        assert!(messages.iter().any(|m| m.role == "tool"));
    }
}
