// ABOUTME: Built-in relays: standard output and an external command fed on stdin
// ABOUTME: The command relay runs once per message and checks its exit status

use crate::relay::error::{RelayError, RelayResult};
use crate::relay::traits::Relay;
use std::process::Stdio;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::process::Command;
use tracing::debug;

/// Writes each message to an output stream, separated by a blank line
#[derive(Debug)]
pub struct StdoutRelay<W = Stdout> {
    out: W,
}

impl StdoutRelay {
    pub fn new() -> Self {
        Self {
            out: tokio::io::stdout(),
        }
    }
}

impl Default for StdoutRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: AsyncWrite + Unpin> StdoutRelay<W> {
    /// Relay into any writer instead of the process stdout
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: AsyncWrite + Unpin> Relay for StdoutRelay<W> {
    async fn send(&mut self, text: &str) -> RelayResult<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}

/// Runs a program per message with the rendered text on its stdin
///
/// Typically a chat client CLI or a small webhook script.
#[derive(Debug, Clone)]
pub struct CommandRelay {
    program: String,
    args: Vec<String>,
}

impl CommandRelay {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Relay for CommandRelay {
    async fn send(&mut self, text: &str) -> RelayResult<()> {
        debug!("running relay command {}", self.program);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            // Dropping stdin closes the pipe so the command sees EOF
        }

        let status = child.wait().await?;
        if !status.success() {
            return Err(RelayError::CommandFailed {
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writer_relay_separates_messages() {
        let mut relay = StdoutRelay::with_writer(Vec::new());
        relay.send("*a*\n*b*\none").await.unwrap();
        relay.send("two").await.unwrap();
        assert_eq!(relay.into_inner(), b"*a*\n*b*\none\n\ntwo\n\n".to_vec());
    }

    #[test]
    fn command_relay_collects_args() {
        let relay = CommandRelay::new("notify").arg("-t").args(["chat", "room"]);
        assert_eq!(relay.program(), "notify");
        assert_eq!(relay.args, vec!["-t", "chat", "room"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_relay_succeeds_on_zero_exit() {
        let mut relay = CommandRelay::new("sh").args(["-c", "cat > /dev/null"]);
        relay.send("hello").await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_relay_reports_failed_exit() {
        let mut relay = CommandRelay::new("sh").args(["-c", "cat > /dev/null; exit 3"]);
        let err = relay.send("hello").await.unwrap_err();
        assert!(matches!(err, RelayError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_io_error() {
        let mut relay = CommandRelay::new("/nonexistent/relay-command");
        let err = relay.send("hello").await.unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }
}
