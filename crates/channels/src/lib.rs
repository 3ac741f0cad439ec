//! Operator channel implementations for ContReAct.
//!
//! Each channel delivers one agent message to a human operator and blocks
//! until a reply arrives.
//!
//! Available channels:
//! - **Console**: the terminal the run was started from
//! - **Telegram**: Bot API relay to a list of authorized users
//! - **OperatorLink**: the configured choice, falling back from the relay
//!   to the console when the relay is unreachable or times out

pub mod console;
pub mod fallback;
pub mod telegram;

pub use console::ConsoleChannel;
pub use fallback::OperatorLink;
pub use telegram::{RelaySettings, RelayTransport, RelayUpdate, TelegramBotApi, TelegramChannel};
