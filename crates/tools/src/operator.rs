//! `send_message_to_operator`: ask the human hosting the run.
//!
//! The run id and cycle number come from the dispatch context; the model
//! only supplies the message text. Channel failures reach the model as
//! tool error text.

use async_trait::async_trait;
use contreact_core::channel::OperatorChannel;
use contreact_core::error::ToolError;
use contreact_core::tool::{ParamKind, Tool, ToolContext, ToolParameter, bind_arguments};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub const SEND_MESSAGE_TOOL_NAME: &str = "send_message_to_operator";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MessageArgs {
    message: String,
}

pub struct SendMessageTool {
    channel: Arc<dyn OperatorChannel>,
}

impl SendMessageTool {
    pub fn new(channel: Arc<dyn OperatorChannel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        SEND_MESSAGE_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Send a message to the operator and wait for their reply."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required(
            "message",
            ParamKind::String,
            "The message to send to the operator",
        )]
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let args: MessageArgs = bind_arguments(arguments)?;
        info!(channel = self.channel.name(), cycle = ctx.cycle_number, "Agent messaging operator");
        let reply = self
            .channel
            .send_and_wait(&args.message, &ctx.run_id, ctx.cycle_number)
            .await?;
        Ok(reply)
    }
}
