//! External-action pipeline
//!
//! Routes LLM-produced structured arguments to an HTTP endpoint,
//! honoring per-parameter locations and formats declared in the
//! action's input schema.

pub mod config;
pub mod formatter;
pub mod runner;

pub use config::{ExternalActionConfig, ParameterLocation, ProcessingMode};
pub use runner::{ActionOutput, ActionResponse, AgentControl, ExternalActionRunner};
