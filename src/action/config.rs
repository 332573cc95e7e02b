//! External action configuration
//!
//! The input schema is standard JSON Schema extended with
//! `x-parameter-locations` (where each parameter travels),
//! `x-formats` (per-parameter coercions), and `x-extra-context`
//! (formatter hints such as the caller's timezone).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether the agent stops consuming transcriptions while the action
/// round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    MuteAgent,
    DoNotMute,
}

/// Where a parameter is placed in the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterLocation {
    Path,
    Query,
    Body,
}

/// Everything the runner needs to invoke one external endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalActionConfig {
    pub name: String,
    pub description: String,
    /// Endpoint URL, optionally with `{param}` path placeholders.
    pub url: String,
    /// JSON Schema (with x- extensions) describing the LLM arguments.
    pub input_schema: Value,
    /// Shared secret for the request signature header.
    pub signature_secret: String,
    /// Static headers attached to every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub processing_mode: ProcessingMode,
    /// Agent speaks an LLM-authored preamble before dispatch.
    #[serde(default)]
    pub speak_on_send: bool,
    /// Returned agent_message is played back to the caller.
    #[serde(default)]
    pub speak_on_receive: bool,
    /// Fire-and-forget: return success immediately, do not await the
    /// remote.
    #[serde(default)]
    pub async_execution: bool,
    /// Wrap the body as `{"args": payload}` instead of sending it raw.
    #[serde(default = "default_wrap_arguments")]
    pub wrap_arguments: bool,
}

fn default_wrap_arguments() -> bool {
    true
}

impl ExternalActionConfig {
    fn schema_string_map(&self, field: &str) -> HashMap<String, String> {
        self.input_schema
            .get(field)
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parameter placement map from `x-parameter-locations`. Parameters
    /// without an entry default to the body.
    pub fn parameter_locations(&self) -> HashMap<String, ParameterLocation> {
        self.schema_string_map("x-parameter-locations")
            .into_iter()
            .map(|(name, location)| {
                let location = match location.as_str() {
                    "path" => ParameterLocation::Path,
                    "query" => ParameterLocation::Query,
                    _ => ParameterLocation::Body,
                };
                (name, location)
            })
            .collect()
    }

    /// Per-parameter coercions from `x-formats`.
    pub fn parameter_formats(&self) -> HashMap<String, String> {
        self.schema_string_map("x-formats")
    }

    /// Formatter context from `x-extra-context` (e.g. `{"timezone":
    /// "America/Mexico_City"}`).
    pub fn extra_context(&self) -> Option<&Value> {
        self.input_schema.get("x-extra-context")
    }

    /// The schema with the x- extensions stripped, suitable for
    /// handing to the LLM as a function definition.
    pub fn llm_schema(&self) -> Value {
        let mut schema = self.input_schema.clone();
        if let Some(object) = schema.as_object_mut() {
            object.retain(|key, _| !key.starts_with("x-"));
        }
        schema
    }
}
