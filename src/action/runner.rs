//! External action runner
//!
//! Dispatches LLM-produced arguments to the configured HTTP endpoint.
//! Parameters are coerced (`x-formats`), routed to path/query/body
//! (`x-parameter-locations`), and the body is HMAC-signed under the
//! action's shared secret. Transport failures come back as
//! `success: false` so the dialog can continue; only schema violations
//! abort the individual action.

use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::action::config::{ExternalActionConfig, ParameterLocation, ProcessingMode};
use crate::action::formatter::apply_parameter_formats;
use crate::error::PipelineError;

static PATH_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("valid placeholder pattern"));

/// Response body contract of an action endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_message: Option<String>,
}

/// What the agent loop receives after running an action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutput {
    pub response: ActionResponse,
    /// Played back to the caller when `speak_on_receive` is set.
    pub canned_response: Option<String>,
}

/// Surface through which the runner silences the agent's transcriber
/// input for the duration of an action round-trip.
pub trait AgentControl: Send + Sync {
    fn mute_agent(&self);
    fn unmute_agent(&self);
}

/// Stateless dispatcher for one configured external action.
pub struct ExternalActionRunner {
    client: reqwest::Client,
    config: ExternalActionConfig,
}

impl ExternalActionRunner {
    pub fn new(config: ExternalActionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &ExternalActionConfig {
        &self.config
    }

    /// Split the payload by declared location. Undeclared parameters
    /// travel in the body.
    pub fn partition_parameters(
        &self,
        payload: &serde_json::Map<String, Value>,
    ) -> (
        serde_json::Map<String, Value>,
        serde_json::Map<String, Value>,
        serde_json::Map<String, Value>,
    ) {
        let locations = self.config.parameter_locations();
        let mut path_params = serde_json::Map::new();
        let mut query_params = serde_json::Map::new();
        let mut body_params = serde_json::Map::new();

        for (name, value) in payload {
            match locations.get(name).copied().unwrap_or(ParameterLocation::Body) {
                ParameterLocation::Path => path_params.insert(name.clone(), value.clone()),
                ParameterLocation::Query => query_params.insert(name.clone(), value.clone()),
                ParameterLocation::Body => body_params.insert(name.clone(), value.clone()),
            };
        }
        (path_params, query_params, body_params)
    }

    fn value_as_plain_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Substitute `{name}` path placeholders and append the query
    /// string. Every placeholder must be covered by a path parameter.
    pub fn build_request_url(
        &self,
        path_params: &serde_json::Map<String, Value>,
        query_params: &serde_json::Map<String, Value>,
    ) -> Result<String, PipelineError> {
        let mut url = self.config.url.clone();

        for capture in PATH_PLACEHOLDER.captures_iter(&self.config.url) {
            let name = &capture[1];
            let value = path_params.get(name).ok_or_else(|| {
                PipelineError::Argument(format!("missing required path parameter: {name}"))
            })?;
            url = url.replace(&format!("{{{name}}}"), &Self::value_as_plain_string(value));
        }

        if !query_params.is_empty() {
            let query_string: String = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(
                    query_params
                        .iter()
                        .map(|(k, v)| (k.clone(), Self::value_as_plain_string(v))),
                )
                .finish();
            let separator = if url.contains('?') { '&' } else { '?' };
            url = format!("{url}{separator}{query_string}");
        }

        Ok(url)
    }

    fn request_body(&self, body_params: serde_json::Map<String, Value>) -> Value {
        if self.config.wrap_arguments {
            json!({ "args": Value::Object(body_params) })
        } else {
            Value::Object(body_params)
        }
    }

    /// HMAC-SHA256 of the serialized body under the action's secret.
    pub fn sign_body(&self, serialized_body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.config.signature_secret.as_bytes())
            .expect("hmac accepts any key length");
        mac.update(serialized_body);
        use base64::Engine as _;
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    async fn send_request(&self, url: &str, body: &Value) -> Result<ActionResponse, PipelineError> {
        let serialized = serde_json::to_vec(body)?;
        let signature = self.sign_body(&serialized);

        let mut request = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .header("signature", signature);
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!("dispatching external action '{}' to {url}", self.config.name);
        let response = request.body(serialized).send().await?;
        if !response.status().is_success() {
            return Err(PipelineError::Transport(format!(
                "action endpoint returned {}",
                response.status()
            )));
        }
        let parsed: ActionResponse = response
            .json()
            .await
            .map_err(|err| PipelineError::Protocol(err.to_string()))?;
        Ok(parsed)
    }

    async fn dispatch(
        &self,
        url: String,
        body_params: serde_json::Map<String, Value>,
    ) -> ActionResponse {
        let body = self.request_body(body_params);

        if self.config.async_execution {
            // Fire and forget: the agent proceeds without awaiting the
            // remote; failures are only logged.
            let client = self.client.clone();
            let config = self.config.clone();
            let runner = ExternalActionRunner { client, config };
            tokio::spawn(async move {
                if let Err(err) = runner.send_request(&url, &body).await {
                    warn!("async external action '{}' failed: {err}", runner.config.name);
                }
            });
            return ActionResponse {
                success: true,
                result: Some(json!({"info": "success"})),
                agent_message: None,
            };
        }

        match self.send_request(&url, &body).await {
            Ok(response) => response,
            Err(err) => {
                warn!("external action '{}' failed: {err}", self.config.name);
                ActionResponse {
                    success: false,
                    result: None,
                    agent_message: None,
                }
            }
        }
    }

    /// Run the action against a payload of LLM arguments.
    ///
    /// The agent stays muted from dispatch to completion (in
    /// `MuteAgent` mode) regardless of the outcome. Only schema/path
    /// violations return an error; endpoint failures surface as
    /// `success: false` so the LLM can keep going.
    pub async fn run(
        &self,
        payload: &serde_json::Map<String, Value>,
        agent: &dyn AgentControl,
    ) -> Result<ActionOutput, PipelineError> {
        let formatted = apply_parameter_formats(
            payload,
            &self.config.parameter_formats(),
            self.config.extra_context(),
        );
        let (path_params, query_params, body_params) = self.partition_parameters(&formatted);
        let url = self.build_request_url(&path_params, &query_params)?;

        let mute = self.config.processing_mode == ProcessingMode::MuteAgent;
        if mute {
            agent.mute_agent();
        }
        let response = self.dispatch(url, body_params).await;
        if mute {
            agent.unmute_agent();
        }

        let canned_response = if self.config.speak_on_receive {
            response.agent_message.clone()
        } else {
            None
        };
        Ok(ActionOutput {
            response,
            canned_response,
        })
    }
}
