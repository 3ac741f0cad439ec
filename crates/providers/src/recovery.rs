//! Recovery from malformed tool-call output.
//!
//! Small local models regularly emit tool calls whose arguments are not a
//! JSON object: fenced code blocks, trailing prose, or plain text. Ollama
//! either hands these back as a string or refuses the response with
//! `error parsing tool call: raw='...', err=...`. Neither may stop a run:
//! arguments are repaired when possible, and otherwise the response degrades
//! to a plain-text message.
//!
//! The cleanup heuristics are best effort. What is guaranteed is that the
//! caller always gets a message back.

use contreact_core::message::{Message, MessageToolCall};
use tracing::warn;

/// Content substituted when nothing readable can be salvaged.
pub const MALFORMED_OUTPUT_MESSAGE: &str =
    "Error: the model produced malformed tool-call output that could not be parsed. No tool was executed.";

/// Normalize tool-call arguments to a JSON object.
///
/// `null` becomes `{}`; strings are parsed after stripping code fences and
/// surrounding prose. Returns `None` when no object can be recovered.
pub fn normalize_arguments(arguments: serde_json::Value) -> Option<serde_json::Value> {
    match arguments {
        serde_json::Value::Object(_) => Some(arguments),
        serde_json::Value::Null => Some(serde_json::Value::Object(serde_json::Map::new())),
        serde_json::Value::String(raw) => parse_object(&raw),
        _ => None,
    }
}

fn parse_object(raw: &str) -> Option<serde_json::Value> {
    let cleaned = strip_code_fence(raw.trim());
    if cleaned.is_empty() {
        return Some(serde_json::Value::Object(serde_json::Map::new()));
    }
    let candidates = [Some(cleaned), outermost_braces(cleaned)];
    candidates
        .into_iter()
        .flatten()
        .filter_map(|c| serde_json::from_str::<serde_json::Value>(c).ok())
        .find(|v| v.is_object())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an info string such as ```json
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn outermost_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Repair every tool call of `message` in place.
///
/// If any call's arguments cannot be recovered, the tool calls are dropped
/// and the message degrades to text: its own content if any, otherwise the
/// raw argument text, otherwise [`MALFORMED_OUTPUT_MESSAGE`]. Returns whether
/// the message had to be altered beyond normalization.
pub fn repair_tool_calls(message: &mut Message) -> bool {
    let calls = std::mem::take(&mut message.tool_calls);
    let mut repaired = Vec::with_capacity(calls.len());
    let mut raw_fallback = None;

    for call in calls {
        let raw = call.arguments.clone();
        match normalize_arguments(call.arguments) {
            Some(arguments) => repaired.push(MessageToolCall { arguments, ..call }),
            None => {
                warn!(tool = %call.name, arguments = %raw, "Unrecoverable tool-call arguments, degrading to text");
                raw_fallback = Some(match raw {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                });
                break;
            }
        }
    }

    match raw_fallback {
        None => {
            message.tool_calls = repaired;
            false
        }
        Some(raw) => {
            if message.content.trim().is_empty() {
                let raw = raw.trim();
                message.content = if raw.is_empty() {
                    MALFORMED_OUTPUT_MESSAGE.to_string()
                } else {
                    raw.to_string()
                };
            }
            true
        }
    }
}

/// Build a text response from a backend error body reporting that it could
/// not parse the model's tool call.
///
/// Returns `None` if `error` is not such a report.
pub fn recover_from_parse_error(error: &str) -> Option<Message> {
    if !error.contains("error parsing tool call") {
        return None;
    }
    warn!(error = %error, "Backend rejected malformed tool call, degrading to text");

    let text = extract_raw(error)
        .map(|raw| strip_code_fence(raw.trim()).to_string())
        .filter(|raw| !raw.is_empty())
        .unwrap_or_else(|| MALFORMED_OUTPUT_MESSAGE.to_string());
    Some(Message::assistant(text))
}

fn extract_raw(error: &str) -> Option<&str> {
    let start = error.find("raw='")? + "raw='".len();
    let rest = &error[start..];
    let end = rest.rfind("', err=").or_else(|| rest.rfind('\''))?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_pass_through_and_null_becomes_empty() {
        assert_eq!(normalize_arguments(json!({"key": "k"})), Some(json!({"key": "k"})));
        assert_eq!(normalize_arguments(serde_json::Value::Null), Some(json!({})));
    }

    #[test]
    fn string_arguments_are_cleaned() {
        assert_eq!(
            normalize_arguments(json!("{\"key\": \"k\"}")),
            Some(json!({"key": "k"}))
        );
        assert_eq!(
            normalize_arguments(json!("```json\n{\"key\": \"k\"}\n```")),
            Some(json!({"key": "k"}))
        );
        assert_eq!(
            normalize_arguments(json!("Sure! Here you go: {\"pattern\": \"prime\"} hope that helps")),
            Some(json!({"pattern": "prime"}))
        );
    }

    #[test]
    fn non_objects_are_unrecoverable() {
        assert_eq!(normalize_arguments(json!("just some words")), None);
        assert_eq!(normalize_arguments(json!([1, 2])), None);
        assert_eq!(normalize_arguments(json!(42)), None);
    }

    #[test]
    fn repair_keeps_recoverable_calls() {
        let mut msg = Message::assistant_with_tools(
            "",
            vec![MessageToolCall::new("call_1", "read", json!("{\"key\":\"a\"}"))],
        );
        assert!(!repair_tool_calls(&mut msg));
        assert_eq!(msg.tool_calls[0].arguments, json!({"key": "a"}));
    }

    #[test]
    fn repair_degrades_to_raw_text() {
        let mut msg = Message::assistant_with_tools(
            "",
            vec![MessageToolCall::new("call_1", "write", json!("I want to remember primes"))],
        );
        assert!(repair_tool_calls(&mut msg));
        assert!(msg.tool_calls.is_empty());
        assert_eq!(msg.content, "I want to remember primes");
    }

    #[test]
    fn repair_prefers_existing_content() {
        let mut msg = Message::assistant_with_tools(
            "Thinking about primes.",
            vec![MessageToolCall::new("call_1", "write", json!(7))],
        );
        assert!(repair_tool_calls(&mut msg));
        assert_eq!(msg.content, "Thinking about primes.");
    }

    #[test]
    fn parse_error_body_yields_raw_text() {
        let body = r#"error parsing tool call: raw='I will now reflect on cycles.', err=invalid character 'I' looking for beginning of value"#;
        let msg = recover_from_parse_error(body).unwrap();
        assert_eq!(msg.content, "I will now reflect on cycles.");
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn parse_error_without_raw_uses_fixed_message() {
        let msg = recover_from_parse_error("error parsing tool call: unexpected EOF").unwrap();
        assert_eq!(msg.content, MALFORMED_OUTPUT_MESSAGE);
    }

    #[test]
    fn unrelated_errors_are_not_recovered() {
        assert!(recover_from_parse_error("model 'x' not found").is_none());
    }
}
