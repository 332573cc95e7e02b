//! Runtime configuration
//!
//! Tunables for the call pipeline: cache budgets, output pacing, drain
//! timeouts, and the temporal-direction bias. Every field has a serde
//! default so partial configs deserialize cleanly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::temporal::TemporalDirection;

/// Main runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    /// Audio cache budgets and TTL
    #[serde(default)]
    pub cache: CacheConfig,
    /// Output device pacing
    #[serde(default)]
    pub output: OutputConfig,
    /// Agent loop limits
    #[serde(default)]
    pub agent: AgentConfig,
    /// Temporal enricher behavior
    #[serde(default)]
    pub temporal: TemporalConfig,
}

/// Per-language audio cache budgets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Max cached bytes per language bucket
    #[serde(default = "default_language_budgets")]
    pub language_budgets: HashMap<String, u64>,
    /// Budget for languages without an explicit entry
    #[serde(default = "default_cache_budget")]
    pub default_budget: u64,
    /// Entry TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_seconds: u64,
    /// When false, writes over budget only warn instead of evicting
    #[serde(default = "default_true")]
    pub evict_on_overflow: bool,
}

fn default_language_budgets() -> HashMap<String, u64> {
    HashMap::from([
        ("es".to_string(), 1536 * 1024 * 1024),
        ("en".to_string(), 512 * 1024 * 1024),
        ("pt".to_string(), 512 * 1024 * 1024),
        ("fr".to_string(), 512 * 1024 * 1024),
    ])
}

fn default_cache_budget() -> u64 {
    512 * 1024 * 1024
}

fn default_cache_ttl() -> u64 {
    3600 * 4
}

fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            language_budgets: default_language_budgets(),
            default_budget: default_cache_budget(),
            default_ttl_seconds: default_cache_ttl(),
            evict_on_overflow: true,
        }
    }
}

impl CacheConfig {
    /// Budget for a language bucket, falling back to the default
    pub fn budget_for(&self, language: &str) -> u64 {
        self.language_budgets
            .get(language)
            .copied()
            .unwrap_or(self.default_budget)
    }
}

/// Output device pacing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Seconds shaved off each chunk's sleep so barge-in stays snappy
    #[serde(default = "default_per_chunk_allowance")]
    pub per_chunk_allowance_seconds: f64,
    /// Max seconds to wait for the output queue to drain on terminate
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: f64,
}

fn default_per_chunk_allowance() -> f64 {
    0.01
}

fn default_drain_timeout() -> f64 {
    30.0
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            per_chunk_allowance_seconds: default_per_chunk_allowance(),
            drain_timeout_seconds: default_drain_timeout(),
        }
    }
}

/// Agent loop limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model identifier used for context accounting
    #[serde(default = "default_model")]
    pub model: String,
    /// Tokens reserved for the model's reply
    #[serde(default = "default_max_response_tokens")]
    pub max_response_tokens: usize,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_response_tokens() -> usize {
    256
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_response_tokens: default_max_response_tokens(),
        }
    }
}

/// Temporal enricher behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Languages scanned for date expressions
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// IANA timezone used to resolve relative dates
    #[serde(default)]
    pub timezone: Option<String>,
    /// Direction used when context gives no signal. Future suits
    /// booking/payment domains; expose it so other domains can flip it.
    #[serde(default = "default_ambiguous_direction")]
    pub ambiguous_direction: TemporalDirection,
}

fn default_languages() -> Vec<String> {
    vec!["es".to_string(), "en".to_string()]
}

fn default_ambiguous_direction() -> TemporalDirection {
    TemporalDirection::Future
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            timezone: None,
            ambiguous_direction: default_ambiguous_direction(),
        }
    }
}
