//! Operator link: the channel the agent actually talks through.
//!
//! Either the console alone, or the Telegram relay backed by the console.
//! When the relay fails with a connection problem or times out, the same
//! exchange is retried on the console so the run is never blocked.

use crate::console::ConsoleChannel;
use crate::telegram::TelegramChannel;
use async_trait::async_trait;
use contreact_config::TelegramConfig;
use contreact_core::channel::OperatorChannel;
use contreact_core::error::ChannelError;
use std::sync::Arc;
use tracing::{info, warn};

/// The selected operator channel.
pub enum OperatorLink {
    Console(Arc<dyn OperatorChannel>),
    Relay {
        relay: Arc<dyn OperatorChannel>,
        console: Arc<dyn OperatorChannel>,
    },
}

impl std::fmt::Debug for OperatorLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Console(c) => f.debug_tuple("Console").field(&c.name()).finish(),
            Self::Relay { relay, console } => f
                .debug_struct("Relay")
                .field("relay", &relay.name())
                .field("console", &console.name())
                .finish(),
        }
    }
}

impl OperatorLink {
    /// Pick the link given the outcome of constructing the relay.
    ///
    /// `None` means no relay was requested. A relay that could not connect
    /// leaves the console alone; a misconfigured relay is an error.
    pub fn select(
        relay: Option<Result<Arc<dyn OperatorChannel>, ChannelError>>,
        console: Arc<dyn OperatorChannel>,
    ) -> Result<Self, ChannelError> {
        match relay {
            None => Ok(Self::Console(console)),
            Some(Ok(relay)) => {
                info!(relay = relay.name(), "Operator messages go through relay with console fallback");
                Ok(Self::Relay { relay, console })
            }
            Some(Err(e)) if e.is_recoverable() => {
                warn!(error = %e, "Relay unavailable, using console only");
                Ok(Self::Console(console))
            }
            Some(Err(e)) => Err(e),
        }
    }

    /// Build the link from `[operator.telegram]` on stdin/stdout.
    pub async fn from_config(config: &TelegramConfig) -> Result<Self, ChannelError> {
        let console: Arc<dyn OperatorChannel> = Arc::new(ConsoleChannel::stdio());
        let relay = if config.enabled {
            Some(
                TelegramChannel::from_config(config)
                    .await
                    .map(|t| Arc::new(t) as Arc<dyn OperatorChannel>),
            )
        } else {
            None
        };
        Self::select(relay, console)
    }

    /// Whether a relay is in front of the console.
    pub fn has_relay(&self) -> bool {
        matches!(self, Self::Relay { .. })
    }
}

#[async_trait]
impl OperatorChannel for OperatorLink {
    fn name(&self) -> &str {
        match self {
            Self::Console(console) => console.name(),
            Self::Relay { relay, .. } => relay.name(),
        }
    }

    async fn send_and_wait(
        &self,
        message: &str,
        run_id: &str,
        cycle_number: u32,
    ) -> Result<String, ChannelError> {
        match self {
            Self::Console(console) => console.send_and_wait(message, run_id, cycle_number).await,
            Self::Relay { relay, console } => {
                match relay.send_and_wait(message, run_id, cycle_number).await {
                    Err(e) if e.is_recoverable() => {
                        warn!(relay = relay.name(), error = %e, "Relay failed, falling back to console");
                        console.send_and_wait(message, run_id, cycle_number).await
                    }
                    other => other,
                }
            }
        }
    }
}
