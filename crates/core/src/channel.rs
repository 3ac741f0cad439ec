//! Operator channel trait: the abstraction over how the agent reaches a human.
//!
//! A channel delivers one message to the operator and blocks until a reply
//! arrives. Implementations: interactive console, Telegram bot relay.

use async_trait::async_trait;
use crate::error::ChannelError;

#[async_trait]
pub trait OperatorChannel: Send + Sync {
    /// Human-readable channel name (e.g., "console", "telegram").
    fn name(&self) -> &str;

    /// Deliver `message` with its run/cycle context and wait for the reply.
    async fn send_and_wait(
        &self,
        message: &str,
        run_id: &str,
        cycle_number: u32,
    ) -> std::result::Result<String, ChannelError>;
}
