//! Parameter formatters for external action requests
//!
//! Transforms parameter values according to the `x-formats` field of an
//! action's input schema, so the LLM can speak ISO-8601 while the
//! remote API receives epoch timestamps. Formatting never fails a
//! request: anything unconvertible passes through unchanged with a
//! warning.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::warn;

/// Convert an ISO-8601 datetime string to an epoch value.
///
/// A trailing `Z` is normalized to `+00:00`. Naive timestamps are
/// localized to `timezone_str` when given (falling back to UTC on an
/// unknown zone), otherwise to UTC.
pub fn convert_datetime_to_epoch(
    datetime_str: &str,
    format_type: &str,
    timezone_str: Option<&str>,
) -> Value {
    let normalized = datetime_str.replace('Z', "+00:00");

    let timestamp = if let Ok(aware) = DateTime::parse_from_rfc3339(&normalized) {
        aware.with_timezone(&Utc)
    } else {
        let Ok(naive) = normalized.parse::<NaiveDateTime>() else {
            warn!("failed to convert datetime '{datetime_str}' to epoch, keeping original value");
            return Value::String(datetime_str.to_string());
        };
        localize_naive(naive, timezone_str)
    };

    match format_type {
        "epoch_s" => Value::from(timestamp.timestamp()),
        "epoch_ms" => Value::from(timestamp.timestamp_millis()),
        other => {
            warn!("unknown format type '{other}', keeping original value");
            Value::String(datetime_str.to_string())
        }
    }
}

fn localize_naive(naive: NaiveDateTime, timezone_str: Option<&str>) -> DateTime<Utc> {
    let tz: Tz = match timezone_str {
        Some(name) => match name.parse() {
            Ok(tz) => tz,
            Err(_) => {
                warn!("unknown timezone '{name}', defaulting to UTC for datetime conversion");
                chrono_tz::UTC
            }
        },
        None => chrono_tz::UTC,
    };
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive).with_timezone(&tz))
        .with_timezone(&Utc)
}

/// Apply one format to one value. Unknown formats and non-string
/// values pass through untouched.
pub fn apply_parameter_format(
    param_value: &Value,
    format_type: &str,
    extra_context: Option<&Value>,
) -> Value {
    if matches!(format_type, "epoch_s" | "epoch_ms") {
        if let Value::String(datetime_str) = param_value {
            let timezone_str = extra_context
                .and_then(|ctx| ctx.get("timezone"))
                .and_then(Value::as_str);
            return convert_datetime_to_epoch(datetime_str, format_type, timezone_str);
        }
    }
    param_value.clone()
}

/// Apply formats batchwise over a payload. Only keys listed in
/// `param_formats` are rewritten; everything else passes through.
pub fn apply_parameter_formats(
    payload: &serde_json::Map<String, Value>,
    param_formats: &std::collections::HashMap<String, String>,
    extra_context: Option<&Value>,
) -> serde_json::Map<String, Value> {
    if param_formats.is_empty() {
        return payload.clone();
    }
    payload
        .iter()
        .map(|(name, value)| {
            let formatted = match param_formats.get(name) {
                Some(format_type) => apply_parameter_format(value, format_type, extra_context),
                None => value.clone(),
            };
            (name.clone(), formatted)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_utc_datetime_to_epoch_seconds() {
        assert_eq!(
            convert_datetime_to_epoch("2025-09-06T10:00:00Z", "epoch_s", None),
            json!(1757152800)
        );
    }

    #[test]
    fn test_offset_datetime_to_epoch_seconds() {
        assert_eq!(
            convert_datetime_to_epoch("2025-09-06T10:00:00-05:00", "epoch_s", None),
            json!(1757170800)
        );
    }

    #[test]
    fn test_epoch_milliseconds() {
        assert_eq!(
            convert_datetime_to_epoch("2025-09-06T10:00:00Z", "epoch_ms", None),
            json!(1757152800000i64)
        );
    }

    #[test]
    fn test_naive_datetime_localizes_to_timezone() {
        // America/Mexico_City is UTC-6 (no DST since 2022), so local
        // 10:00 equals the aware timestamp at -06:00.
        let naive = convert_datetime_to_epoch(
            "2025-09-06T10:00:00",
            "epoch_s",
            Some("America/Mexico_City"),
        );
        let aware = convert_datetime_to_epoch("2025-09-06T10:00:00-06:00", "epoch_s", None);
        assert_eq!(naive, aware);
    }

    #[test]
    fn test_naive_datetime_defaults_to_utc() {
        assert_eq!(
            convert_datetime_to_epoch("2025-09-06T10:00:00", "epoch_s", None),
            json!(1757152800)
        );
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        assert_eq!(
            convert_datetime_to_epoch("2025-09-06T10:00:00", "epoch_s", Some("Mars/Olympus")),
            json!(1757152800)
        );
    }

    #[test]
    fn test_unparseable_value_passes_through() {
        assert_eq!(
            convert_datetime_to_epoch("next tuesday", "epoch_s", None),
            json!("next tuesday")
        );
    }

    #[test]
    fn test_unknown_format_passes_through() {
        assert_eq!(
            apply_parameter_format(&json!("some-value"), "unknown_format", None),
            json!("some-value")
        );
    }

    #[test]
    fn test_non_string_value_passes_through() {
        assert_eq!(apply_parameter_format(&json!(42), "epoch_s", None), json!(42));
    }

    #[test]
    fn test_batch_rewrites_only_listed_keys() {
        let payload = json!({
            "date": "2025-09-06T10:00:00Z",
            "name": "John"
        });
        let formats = HashMap::from([("date".to_string(), "epoch_s".to_string())]);
        let formatted =
            apply_parameter_formats(payload.as_object().unwrap(), &formats, None);
        assert_eq!(formatted["date"], json!(1757152800));
        assert_eq!(formatted["name"], json!("John"));
    }

    #[test]
    fn test_context_timezone_is_used() {
        let payload = json!({"when": "2025-09-06T10:00:00"});
        let formats = HashMap::from([("when".to_string(), "epoch_s".to_string())]);
        let context = json!({"timezone": "America/Mexico_City"});
        let formatted =
            apply_parameter_formats(payload.as_object().unwrap(), &formats, Some(&context));
        assert_eq!(formatted["when"], json!(1757174400));
    }
}
