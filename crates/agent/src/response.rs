//! Classifying a model response: tool request or final reflection.

use contreact_core::message::{Message, MessageToolCall};

pub const THINKING_OPEN: &str = "<thinking>";
pub const THINKING_CLOSE: &str = "</thinking>";

/// What the model asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Tool calls to dispatch, in request order
    ToolCalls(Vec<MessageToolCall>),
    /// The cycle's closing note, reasoning blocks removed
    Reflection(String),
}

/// A message is a tool request iff it names at least one tool.
pub fn classify(message: &Message) -> Classified {
    let calls: Vec<MessageToolCall> = message.requested_tool_calls().cloned().collect();
    if calls.is_empty() {
        Classified::Reflection(strip_reasoning(&message.content))
    } else {
        Classified::ToolCalls(calls)
    }
}

/// Remove every closed `<thinking>...</thinking>` block and trim.
///
/// An opening tag without a matching close is left in place along with
/// everything after it.
pub fn strip_reasoning(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(THINKING_OPEN) {
        let after_open = &rest[start + THINKING_OPEN.len()..];
        let Some(end) = after_open.find(THINKING_CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &after_open[end + THINKING_CLOSE.len()..];
    }
    out.push_str(rest);
    out.trim().to_string()
}
