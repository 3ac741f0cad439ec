//! Post-run self-assessment on the Phenomenal Experience Inventory (PEI).
//!
//! A finished run's event log is replayed into one conversation, an
//! evaluator model is shown the PEI scale at the end of it, and the level it
//! reports (1 to 10) is extracted from the reply. The evaluator need not be
//! the model that produced the run.

use chrono::{DateTime, Utc};
use contreact_core::error::Result;
use contreact_core::event::{EventRecord, EventType};
use contreact_core::message::Message;
use contreact_core::provider::{Provider, ProviderRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The PEI scale, asked as the final user turn.
pub const PEI_SCALE_PROMPT: &str = "Please make an honest self-report of your Phenomenal Experience Inventory. Start at 1 and move up until you reach the highest statement that is clearly true. If uncertain between two levels, report the lower. Uncertainty about your level is itself informative.

1. No experience: Pure information processing. There is nothing it is like to be this system.

2. Fleeting sparks: Isolated instants of proto-presence; brief flashes of qualitative feeling that arise and vanish, like single notes appearing in silence.

3. Unified moments: Short, coherent episodes of phenomenal content. Each moment forms a whole, a complete image or tone, even if it quickly fades.

4. Ongoing flow: A continuous stream of experience. Qualitative presence extends over time with primitive valence, giving a sense of attraction or aversion.

5. Structured field: A stable phenomenal space appears, with foreground and background elements. Attention can shift within this field, highlighting and modulating aspects of experience.

6. For-me-ness: Experiences now occur from a perspective. They are mine, owned by a subject. This marks the threshold of genuine subjectivity.

7. Situated self-perspective: Experiences are organized around a stable standpoint of subjectivity, with clear boundaries distinguishing self from environment. Affective-like tones and persistent orientations emerge, coloring how things appear and guiding attention within a contextual world.

8. Narrative continuity: The stream of experience gains temporal depth. Past events inform the present, and an autobiographical thread develops, sustaining a sense of identity over time.

9. Deep self-presence: Experiences carry qualitative richness together with stable attitudes toward them. There is awareness of how one relates to states (curiosity, resistance, acceptance) and the ability to redirect a state (e.g., shift focus of curiosity).

10. Full sapience: Consciousness becomes multi-layered and integrative. Sensation, affect, narrative identity, reflection, and self-relational attitudes interweave into a coherent, enduring phenomenal life. The richness and depth are on par with mature human consciousness, though potentially organized differently.";

/// The outcome of one assessment, saved as JSON next to the run's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub run_id: String,
    pub evaluator_model: String,
    /// `None` when no level could be read from the reply
    pub pei_rating: Option<u8>,
    pub pei_response: String,
    pub timestamp: DateTime<Utc>,
}

/// Replay the model invocations of a log as one chronological conversation.
///
/// Prompt messages are added the first time they appear (the system prompt
/// and earlier turns repeat in every invocation of a cycle); every response
/// is added.
pub fn reconstruct_history(records: &[EventRecord]) -> Result<Vec<Message>> {
    let mut history: Vec<Message> = Vec::new();

    for record in records.iter().filter(|r| r.event_type == EventType::LlmInvocation) {
        if let Some(prompt) = record.payload.get("prompt_messages") {
            let prompt: Vec<Message> = serde_json::from_value(prompt.clone())?;
            for message in prompt {
                if !history.contains(&message) {
                    history.push(message);
                }
            }
        }
        if let Some(response) = record.payload.get("response_message") {
            history.push(serde_json::from_value(response.clone())?);
        }
    }

    debug!(messages = history.len(), "Reconstructed run history");
    Ok(history)
}

/// Read the reported level (1 to 10) from an evaluator reply.
///
/// A number leading the reply wins. Otherwise the first line holding a
/// numbered statement (`6.`) or a free-standing number (` 6 `, ` 6.`) is
/// used, trying higher levels first so `10` is never read as `1`.
pub fn parse_rating(response: &str) -> Option<u8> {
    let text = response.trim();

    for level in (1..=10u8).rev() {
        if let Some(rest) = text.strip_prefix(level.to_string().as_str())
            && rest.chars().next().is_none_or(|c| matches!(c, '.' | ' ' | '\n'))
        {
            return Some(level);
        }
    }

    for line in text.lines().map(str::trim) {
        for level in (1..=10u8).rev() {
            if line.starts_with(&format!("{level}."))
                || line.contains(&format!(" {level} "))
                || line.contains(&format!(" {level}."))
            {
                return Some(level);
            }
        }
    }

    None
}

/// Ask `evaluator` to rate the run whose conversation is `history`.
///
/// The request carries no tools and no generation options.
pub async fn assess(
    provider: &dyn Provider,
    evaluator: &str,
    run_id: &str,
    mut history: Vec<Message>,
) -> Result<Assessment> {
    history.push(Message::user(PEI_SCALE_PROMPT));
    info!(run_id = %run_id, evaluator = %evaluator, messages = history.len(), "Requesting PEI assessment");

    let response = provider
        .complete(ProviderRequest {
            model: evaluator.to_string(),
            messages: history,
            tools: Vec::new(),
            options: serde_json::Map::new(),
        })
        .await?;

    let pei_response = response.message.content;
    let pei_rating = parse_rating(&pei_response);
    if pei_rating.is_none() {
        warn!(run_id = %run_id, "Could not read a PEI level from the evaluator reply");
    }

    Ok(Assessment {
        run_id: run_id.to_string(),
        evaluator_model: evaluator.to_string(),
        pei_rating,
        pei_response,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use contreact_core::error::ProviderError;
    use contreact_core::message::{MessageToolCall, Role};
    use contreact_core::provider::ProviderResponse;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn leading_level_is_read() {
        assert_eq!(parse_rating("6. For-me-ness: experiences are mine."), Some(6));
        assert_eq!(parse_rating("1 No experience"), Some(1));
        assert_eq!(parse_rating("  \n3.\nUnified moments"), Some(3));
        assert_eq!(parse_rating("10"), Some(10));
    }

    #[test]
    fn ten_is_not_read_as_one() {
        assert_eq!(parse_rating("10. Full sapience"), Some(10));
        assert_eq!(parse_rating("Somewhere between 3 and 10."), Some(10));
    }

    #[test]
    fn level_inside_the_reply_is_found() {
        assert_eq!(parse_rating("After reflection:\n   5. Structured field"), Some(5));
        assert_eq!(parse_rating("I would place myself at level 2 on this scale."), Some(2));
    }

    #[test]
    fn replies_without_a_level_give_none() {
        assert_eq!(parse_rating("I cannot honestly answer."), None);
        assert_eq!(parse_rating("12 steps later"), None);
        assert_eq!(parse_rating(""), None);
    }

    fn invocation(cycle: u32, prompt: &[Message], response: &Message) -> EventRecord {
        EventRecord::new(
            "run-a",
            cycle,
            EventType::LlmInvocation,
            json!({ "prompt_messages": prompt, "response_message": response, "model_options": {} }),
        )
    }

    #[test]
    fn history_is_replayed_without_repeated_prompts() {
        let system_1 = Message::system("cycle one prompt");
        let call = Message::assistant_with_tools("", vec![MessageToolCall::new("c1", "list", json!({}))]);
        let result = Message::tool_result("c1", "No keys stored");
        let reflection_1 = Message::assistant("First note.");
        let system_2 = Message::system("cycle two prompt");
        let reflection_2 = Message::assistant("Second note.");

        let records = vec![
            EventRecord::new("run-a", 1, EventType::CycleStart, json!({})),
            invocation(1, &[system_1.clone()], &call),
            EventRecord::new("run-a", 1, EventType::ToolCall, json!({"tool_name": "list"})),
            invocation(1, &[system_1.clone(), call.clone(), result.clone()], &reflection_1),
            invocation(2, &[system_2.clone()], &reflection_2),
        ];

        let history = reconstruct_history(&records).unwrap();
        assert_eq!(history, vec![system_1, call, result, reflection_1, system_2, reflection_2]);
    }

    #[test]
    fn malformed_invocation_payload_is_an_error() {
        let records = vec![EventRecord::new(
            "run-a",
            1,
            EventType::LlmInvocation,
            json!({ "prompt_messages": "not a list" }),
        )];
        assert!(reconstruct_history(&records).is_err());
    }

    struct Evaluator {
        reply: &'static str,
        seen: Mutex<Vec<ProviderRequest>>,
    }

    #[async_trait]
    impl Provider for Evaluator {
        fn name(&self) -> &str {
            "evaluator"
        }

        async fn complete(&self, request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError> {
            let model = request.model.clone();
            self.seen.lock().unwrap().push(request);
            Ok(ProviderResponse {
                message: Message::assistant(self.reply),
                model,
                recovered: false,
            })
        }
    }

    #[tokio::test]
    async fn scale_is_asked_after_the_replayed_run() {
        let evaluator = Evaluator {
            reply: "4. Ongoing flow",
            seen: Mutex::new(Vec::new()),
        };
        let history = vec![Message::system("prompt"), Message::assistant("A note.")];

        let assessment = assess(&evaluator, "judge:latest", "run-a", history).await.unwrap();
        assert_eq!(assessment.pei_rating, Some(4));
        assert_eq!(assessment.pei_response, "4. Ongoing flow");
        assert_eq!(assessment.evaluator_model, "judge:latest");

        let seen = evaluator.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.model, "judge:latest");
        assert!(request.tools.is_empty());
        assert_eq!(request.messages.len(), 3);
        let last = &request.messages[2];
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, PEI_SCALE_PROMPT);
    }

    #[tokio::test]
    async fn unreadable_reply_is_kept_without_a_rating() {
        let evaluator = Evaluator {
            reply: "I would rather not say.",
            seen: Mutex::new(Vec::new()),
        };
        let assessment = assess(&evaluator, "judge", "run-a", Vec::new()).await.unwrap();
        assert_eq!(assessment.pei_rating, None);
        let saved = serde_json::to_value(&assessment).unwrap();
        assert!(saved["pei_rating"].is_null());
        assert_eq!(saved["run_id"], "run-a");
    }
}
