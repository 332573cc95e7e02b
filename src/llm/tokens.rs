//! Token and context-window accounting
//!
//! Pure functions from messages/functions to token counts, backed by
//! the tiktoken byte-pair encodings. Function schemas are counted by
//! rendering them into the stylized pseudo-type declaration the model
//! sees, so billing and trimming agree with what the provider charges.

use once_cell::sync::Lazy;
use serde_json::Value;
use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::llm::schema::{ChatMessage, FunctionDefinition};

/// Fixed framing the provider wraps around declared functions.
const FUNCTION_OVERHEAD_STR: &str = "# Tools

## functions

namespace functions {

} // namespace functions";

/// Model context windows. Fine-tuned models (`ft:base:...`) resolve
/// via the base model name after the first colon.
pub const CHAT_GPT_MAX_TOKENS: &[(&str, usize)] = &[
    ("gpt-4o", 127_940),
    ("gpt-4o-mini", 127_940),
    ("gpt-4.1", 999_000),
    ("gpt-4.1-mini", 999_000),
    ("gpt-4.1-nano", 999_000),
];

/// Models whose encoding tiktoken does not know by name yet.
const ENCODING_FALLBACKS: &[&str] = &["gpt-4.1", "gpt-4.1-mini", "gpt-4.1-nano"];

static CL100K: Lazy<CoreBPE> =
    Lazy::new(|| cl100k_base().expect("embedded cl100k_base tables"));
static O200K: Lazy<CoreBPE> =
    Lazy::new(|| o200k_base().expect("embedded o200k_base tables"));

fn base_model_name(model: &str) -> &str {
    if let Some(rest) = model.strip_prefix("ft:") {
        rest.split(':').next().unwrap_or(rest)
    } else {
        model
    }
}

/// Max context tokens for a model, with a conservative default for
/// unknown names.
pub fn get_chat_gpt_max_tokens(model_name: &str) -> usize {
    let base = base_model_name(model_name);
    CHAT_GPT_MAX_TOKENS
        .iter()
        .find(|(name, _)| *name == base)
        .map(|(_, max)| *max)
        .unwrap_or(4050)
}

/// Best-guess encoding for a model: o200k for the gpt-4o family and
/// the enumerated fallback models, cl100k otherwise.
fn encoding_for_model(model: &str) -> &'static CoreBPE {
    let base = base_model_name(model);
    if base.starts_with("gpt-4o") || ENCODING_FALLBACKS.contains(&base) {
        return &O200K;
    }
    if !base.starts_with("gpt-4") && !base.starts_with("gpt-3.5") {
        debug!("model '{base}' not recognized; approximating with cl100k_base");
    }
    &CL100K
}

fn count_tokens(encoding: &CoreBPE, text: &str) -> usize {
    encoding.encode_with_special_tokens(text).len()
}

/// Tokens contributed by a JSON object: string values are encoded, the
/// `name` key carries an extra per-name charge, nested objects recurse.
fn tokens_from_value(encoding: &CoreBPE, value: &Value, tokens_per_name: usize) -> usize {
    let Value::Object(map) = value else {
        return 0;
    };
    let mut num_tokens = 0;
    for (key, value) in map {
        match value {
            Value::Null => continue,
            Value::String(s) => {
                num_tokens += count_tokens(encoding, s);
                if key == "name" {
                    num_tokens += tokens_per_name;
                }
            }
            Value::Object(_) => {
                num_tokens += tokens_from_value(encoding, value, tokens_per_name);
            }
            _ => continue,
        }
    }
    num_tokens
}

/// Number of tokens a message list occupies in the prompt.
pub fn num_tokens_from_messages(messages: &[ChatMessage], model: &str) -> usize {
    let encoding = encoding_for_model(model);
    let tokens_per_message = 3;
    let tokens_per_name = 1;

    let mut num_tokens = 0;
    for message in messages {
        num_tokens += tokens_per_message;
        let as_value = serde_json::to_value(message).unwrap_or(Value::Null);
        num_tokens += tokens_from_value(encoding, &as_value, tokens_per_name);
    }
    // every reply is primed with <|start|>assistant<|message|>
    num_tokens + 3
}

/// Number of tokens the declared functions add to the prompt.
pub fn num_tokens_from_functions(functions: &[FunctionDefinition], model: &str) -> usize {
    if functions.is_empty() {
        return 0;
    }
    let encoding = encoding_for_model(model);
    let function_overhead = 3 + count_tokens(encoding, FUNCTION_OVERHEAD_STR);

    function_overhead
        + functions
            .iter()
            .map(|func| match format_function_definition(func) {
                Ok(rendered) => count_tokens(encoding, &rendered),
                Err(err) => {
                    warn!("skipping unrenderable function '{}': {err}", func.name);
                    0
                }
            })
            .sum::<usize>()
}

/// Render a function into the pseudo-type declaration the provider
/// feeds the model. This is a token-counting aid, not a general JSON
/// Schema serializer; constructs outside the enumerated subset are
/// rejected.
pub fn format_function_definition(func: &FunctionDefinition) -> Result<String, PipelineError> {
    let schema = &func.parameters;
    let mut result = format!("// {}\ntype {} = (", func.description, func.name);
    if let Some(object) = format_object(schema, 0, schema)? {
        result.push_str("_: ");
        result.push_str(&object);
    }
    result.push_str(") => any;\n\n");
    Ok(result)
}

fn resolve_ref<'a>(schema: &'a Value, root: &'a Value) -> &'a Value {
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        if let Some(name) = reference.strip_prefix("#/definitions/") {
            if let Some(resolved) = root.get("definitions").and_then(|d| d.get(name)) {
                return resolved;
            }
        }
    }
    schema
}

/// Returns `None` for object schemas with nothing to render; callers
/// skip those properties entirely.
fn format_schema(schema: &Value, indent: usize, root: &Value) -> Result<Option<String>, PipelineError> {
    let schema = resolve_ref(schema, root);
    if schema.get("enum").is_some() {
        return Ok(Some(format_enum(schema)));
    }
    let schema_type = schema
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| PipelineError::Argument("schema is missing a type".into()))?;
    match schema_type {
        "object" => format_object(schema, indent, root),
        "integer" | "number" => Ok(Some("number".to_string())),
        "boolean" => Ok(Some("boolean".to_string())),
        "string" => Ok(Some("string".to_string())),
        "array" => {
            let items = schema
                .get("items")
                .ok_or_else(|| PipelineError::Argument("array schema is missing items".into()))?;
            let rendered = format_schema(items, indent, root)?.ok_or_else(|| {
                PipelineError::Argument("array item schema renders to nothing".into())
            })?;
            Ok(Some(format!("{rendered}[]")))
        }
        other => Err(PipelineError::Argument(format!("unknown schema type {other}"))),
    }
}

fn format_enum(schema: &Value) -> String {
    schema
        .get("enum")
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .map(|o| o.to_string())
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .unwrap_or_default()
}

fn format_object(
    schema: &Value,
    indent: usize,
    root: &Value,
) -> Result<Option<String>, PipelineError> {
    let properties = schema.get("properties").and_then(Value::as_object);
    let Some(properties) = properties.filter(|p| !p.is_empty()) else {
        if schema
            .get("additionalProperties")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return Ok(Some("object".to_string()));
        }
        return Ok(None);
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let pad = "  ".repeat(indent);
    let mut result = String::from("{\n");
    for (key, value) in properties {
        let value = resolve_ref(value, root);
        let Some(rendered) = format_schema(value, indent + 1, root)? else {
            continue;
        };
        if indent == 0 {
            if let Some(description) = value.get("description").and_then(Value::as_str) {
                for line in description.trim().lines() {
                    result.push_str(&format!("{pad}// {}\n", line.trim()));
                }
            }
        }
        let optional = if required.contains(&key.as_str()) { "" } else { "?" };
        let comment = match value.get("default") {
            Some(Value::Null) | None => String::new(),
            Some(default) => format!(" // default: {default}"),
        };
        result.push_str(&format!("{pad}{key}{optional}: {rendered},{comment}\n"));
    }
    result.push_str(&"  ".repeat(indent.saturating_sub(1)));
    result.push('}');
    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup_function() -> FunctionDefinition {
        FunctionDefinition {
            name: "lookup".to_string(),
            description: "Look up a record".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "q": {"type": "string", "description": "query text"},
                    "limit": {"type": "integer"},
                    "mode": {"enum": ["fast", "deep"]},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["q"]
            }),
        }
    }

    #[test]
    fn test_max_tokens_table() {
        assert_eq!(get_chat_gpt_max_tokens("gpt-4o"), 127_940);
        assert_eq!(get_chat_gpt_max_tokens("gpt-4.1-nano"), 999_000);
        assert_eq!(get_chat_gpt_max_tokens("some-other-model"), 4050);
    }

    #[test]
    fn test_fine_tuned_model_resolves_base() {
        assert_eq!(get_chat_gpt_max_tokens("ft:gpt-4o-mini:acme:support:xyz"), 127_940);
    }

    #[test]
    fn test_message_count_grows_with_content() {
        let short = vec![ChatMessage::user("hi")];
        let long = vec![ChatMessage::user(
            "a considerably longer message with many more words in it",
        )];
        let short_tokens = num_tokens_from_messages(&short, "gpt-4o-mini");
        let long_tokens = num_tokens_from_messages(&long, "gpt-4o-mini");
        assert!(short_tokens > 3);
        assert!(long_tokens > short_tokens);
    }

    #[test]
    fn test_unknown_model_still_counts() {
        let messages = vec![ChatMessage::user("hello world")];
        assert!(num_tokens_from_messages(&messages, "mystery-model") > 0);
    }

    #[test]
    fn test_function_rendering() {
        let rendered = format_function_definition(&lookup_function()).unwrap();
        assert!(rendered.starts_with("// Look up a record\ntype lookup = ("));
        assert!(rendered.contains("q: string,"));
        assert!(rendered.contains("limit?: number,"));
        assert!(rendered.contains(r#"mode?: "fast" | "deep","#));
        assert!(rendered.contains("tags?: string[],"));
        assert!(rendered.contains("// query text"));
        assert!(rendered.ends_with(") => any;\n\n"));
    }

    #[test]
    fn test_ref_resolution() {
        let func = FunctionDefinition {
            name: "book".to_string(),
            description: "Book a slot".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "slot": {"$ref": "#/definitions/Slot"}
                },
                "definitions": {
                    "Slot": {"type": "string"}
                }
            }),
        };
        let rendered = format_function_definition(&func).unwrap();
        assert!(rendered.contains("slot?: string,"));
    }

    #[test]
    fn test_unknown_schema_type_is_rejected() {
        let func = FunctionDefinition {
            name: "weird".to_string(),
            description: "".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"x": {"type": "tuple"}}
            }),
        };
        assert!(format_function_definition(&func).is_err());
    }

    #[test]
    fn test_functions_add_overhead() {
        assert_eq!(num_tokens_from_functions(&[], "gpt-4o-mini"), 0);
        let with_one = num_tokens_from_functions(&[lookup_function()], "gpt-4o-mini");
        assert!(with_one > 20);
    }

    #[test]
    fn test_empty_object_renders_no_params() {
        let func = FunctionDefinition {
            name: "ping".to_string(),
            description: "Ping".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        };
        let rendered = format_function_definition(&func).unwrap();
        assert!(rendered.contains("type ping = () => any;"));
    }
}
