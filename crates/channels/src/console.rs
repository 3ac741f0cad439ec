//! Console channel: the operator answers in the terminal.
//!
//! Prints the agent's message with its run and cycle, prompts, and returns
//! the next line exactly as typed (an empty line is a valid reply).

use async_trait::async_trait;
use contreact_core::channel::OperatorChannel;
use contreact_core::error::ChannelError;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::info;

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Interactive console channel.
pub struct ConsoleChannel {
    io: Mutex<(Reader, Writer)>,
}

impl ConsoleChannel {
    /// Console on the process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::with_io(BufReader::new(io::stdin()), io::stdout())
    }

    /// Console on arbitrary streams (used by tests).
    pub fn with_io(
        reader: impl AsyncBufRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            io: Mutex::new((Box::new(reader), Box::new(writer))),
        }
    }
}

fn io_error(e: std::io::Error) -> ChannelError {
    ChannelError::Connection(format!("console I/O failed: {e}"))
}

#[async_trait]
impl OperatorChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn send_and_wait(
        &self,
        message: &str,
        run_id: &str,
        cycle_number: u32,
    ) -> Result<String, ChannelError> {
        info!(run_id = %run_id, cycle = cycle_number, "Asking operator on console");

        let mut guard = self.io.lock().await;
        let (reader, writer) = &mut *guard;

        let prompt = format!("[AGENT - {run_id} | Cycle {cycle_number}]: {message}\n[OPERATOR]: ");
        writer.write_all(prompt.as_bytes()).await.map_err(io_error)?;
        writer.flush().await.map_err(io_error)?;

        let mut line = String::new();
        let read = reader.read_line(&mut line).await.map_err(io_error)?;
        if read == 0 {
            return Err(ChannelError::Connection("console input closed".into()));
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        info!(chars = line.chars().count(), "Operator replied on console");
        Ok(line)
    }
}
