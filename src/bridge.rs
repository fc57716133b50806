// ABOUTME: Bridge driver connecting the modem session to the relay through a bounded queue
// ABOUTME: Configures the modem, runs listing passes on new-message notices and forwards messages

use crate::at::{AtError, Command};
use crate::connection::ModemConnection;
use crate::reader::EventReader;
use crate::reassembly::{Event, Message, ReassemblyConfig, Reassembler};
use crate::relay::{Relay, RelayError, RetryPolicy};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Shortest period of the idle eviction timer
const MIN_EVICTION_PERIOD: Duration = Duration::from_millis(10);

/// Error type for a running bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Modem output could not be parsed or decoded
    #[error("AT error: {0}")]
    At(#[from] AtError),

    /// The modem answered a command with an error line
    #[error("Modem reported error: {0}")]
    Protocol(String),

    /// I/O error writing to the modem
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// The modem stream ended while a command was outstanding
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// The forwarding side stopped accepting messages
    #[error("Message queue closed")]
    QueueClosed,
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Configuration for [`Bridge`]
///
/// # Example
///
/// ```rust
/// use sms_bridge::bridge::BridgeConfig;
/// use sms_bridge::relay::RetryPolicy;
///
/// let config = BridgeConfig::default()
///     .with_queue_capacity(8)
///     .with_retry(RetryPolicy::no_retry());
/// assert_eq!(config.queue_capacity, 8);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub reassembly: ReassemblyConfig,
    pub retry: RetryPolicy,
    /// Messages buffered between the modem and the relay (default: 32)
    pub queue_capacity: usize,
    /// Command that clears read messages after each listing (default: `AT+CMGD=1,1`)
    pub delete_command: Command,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            reassembly: ReassemblyConfig::default(),
            retry: RetryPolicy::default(),
            queue_capacity: 32,
            delete_command: Command::DeleteRead,
        }
    }
}

impl BridgeConfig {
    pub fn with_reassembly(mut self, reassembly: ReassemblyConfig) -> Self {
        self.reassembly = reassembly;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_delete_command(mut self, delete_command: Command) -> Self {
        self.delete_command = delete_command;
        self
    }
}

/// Relays SMS received by a modem on `S` to `R`
///
/// Runs until the modem stream ends or either side fails. The modem side
/// and the relay side run concurrently; a slow relay holds the modem side
/// back once the queue is full.
///
/// Partial multi-part messages are flushed after every listing pass and,
/// while the modem is idle, on a timer running at half the eviction window.
pub struct Bridge<S, R> {
    stream: S,
    relay: R,
    config: BridgeConfig,
}

impl<S, R> Bridge<S, R>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: Relay,
{
    pub fn new(stream: S, relay: R) -> Self {
        Self::with_config(stream, relay, BridgeConfig::default())
    }

    pub fn with_config(stream: S, relay: R, config: BridgeConfig) -> Self {
        Self {
            stream,
            relay,
            config,
        }
    }

    /// Run the bridge, handing the relay back once the modem stream ends
    pub async fn run(self) -> BridgeResult<R> {
        let Bridge {
            stream,
            relay,
            config,
        } = self;

        let (queue, inbox) = mpsc::channel(config.queue_capacity.max(1));
        let events = Reassembler::with_config(
            EventReader::new(ModemConnection::new(stream)),
            config.reassembly,
        );
        let session = ModemSession {
            events,
            queue,
            delete_command: config.delete_command,
            notified: false,
        };

        let ((), relay) = tokio::try_join!(session.run(), forward(inbox, relay, config.retry))?;
        Ok(relay)
    }
}

/// Modem side of the bridge
struct ModemSession<S> {
    events: Reassembler<ModemConnection<S>>,
    queue: mpsc::Sender<Message>,
    delete_command: Command,
    /// A new-message notice arrived during the current pass
    notified: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> ModemSession<S> {
    async fn run(mut self) -> BridgeResult<()> {
        info!("configuring modem");
        self.command(Command::SetPduMode).await?;
        self.command(Command::EnableVerboseErrors).await?;

        // Pick up whatever arrived while the bridge was down
        self.process().await?;

        let window = self.events.config().eviction_window;
        let mut eviction = time::interval((window / 2).max(MIN_EVICTION_PERIOD));
        eviction.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("waiting for new messages, eviction window {:?}", window);
        loop {
            // Reading is cancel safe, so a tick never loses modem output
            let event = tokio::select! {
                event = self.events.next() => Some(event?),
                _ = eviction.tick() => None,
            };

            match event {
                None => self.flush_expired().await?,
                Some(None) => {
                    info!("modem stream closed");
                    return Ok(());
                }
                Some(Some(Event::IncomingNotice { storage, index })) => {
                    debug!("new message notice {:?} {:?}", storage, index);
                    self.process().await?;
                }
                Some(Some(Event::Message(message))) => self.enqueue(message).await?,
                Some(Some(Event::Ok)) => debug!("ignoring unsolicited OK"),
                Some(Some(Event::Error(line))) => return Err(BridgeError::Protocol(line)),
            }
        }
    }

    /// List unread messages, delete read ones, flush stale fragments
    ///
    /// Repeats while notices keep arriving during the pass.
    async fn process(&mut self) -> BridgeResult<()> {
        loop {
            self.notified = false;

            self.command(Command::ListUnread).await?;
            self.command(self.delete_command).await?;
            self.flush_expired().await?;

            if !self.notified {
                debug!("{} partial messages pending", self.events.pending());
                return Ok(());
            }
        }
    }

    /// Send `command` and wait for its final `OK`
    async fn command(&mut self, command: Command) -> BridgeResult<()> {
        self.events
            .get_mut()
            .get_mut()
            .write_command(command)
            .await?;

        loop {
            match self.events.next().await? {
                None => return Err(BridgeError::ConnectionClosed),
                Some(Event::Ok) => return Ok(()),
                Some(Event::Error(line)) => return Err(BridgeError::Protocol(line)),
                Some(Event::IncomingNotice { .. }) => self.notified = true,
                Some(Event::Message(message)) => self.enqueue(message).await?,
            }
        }
    }

    /// Queue whatever partial messages outlived the eviction window
    async fn flush_expired(&mut self) -> BridgeResult<()> {
        for message in self.events.evict_expired() {
            self.enqueue(message).await?;
        }
        Ok(())
    }

    async fn enqueue(&mut self, message: Message) -> BridgeResult<()> {
        debug!("queueing message from {}", message.from);
        self.queue
            .send(message)
            .await
            .map_err(|_| BridgeError::QueueClosed)
    }
}

/// Relay side of the bridge; ends when the modem side drops the queue
async fn forward<R: Relay>(
    mut inbox: mpsc::Receiver<Message>,
    mut relay: R,
    retry: RetryPolicy,
) -> BridgeResult<R> {
    while let Some(message) = inbox.recv().await {
        info!("relaying message from {}", message.from);
        retry.deliver(&mut relay, &message.to_string()).await?;
    }
    Ok(relay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{RelayResult, StdoutRelay};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    const HELLOHELLO: &str =
        "07917283010010F5040BC87238880900F10000993092516195800AE8329BFD4697D9EC37";

    /// Answers every command with `OK`, listing `inbox` on the first
    /// `AT+CMGL=0`; closes the line after the first delete.
    async fn fake_modem(stream: DuplexStream, inbox: Vec<String>) -> Vec<String> {
        let (read, mut write) = tokio::io::split(stream);
        let mut lines = BufReader::new(read).lines();
        let mut inbox = Some(inbox);
        let mut received = Vec::new();

        while let Ok(Some(command)) = lines.next_line().await {
            received.push(command.clone());
            let mut reply = String::new();
            if command == "AT+CMGL=0" {
                for line in inbox.take().unwrap_or_default() {
                    reply.push_str(&line);
                    reply.push_str("\r\n");
                }
            }
            reply.push_str("\r\nOK\r\n");
            write.write_all(reply.as_bytes()).await.unwrap();

            if command == "AT+CMGD=1,1" {
                write.shutdown().await.unwrap();
                break;
            }
        }
        received
    }

    #[tokio::test]
    async fn relays_listed_message_and_stops_at_eof() {
        let (ours, theirs) = tokio::io::duplex(4096);
        let modem = tokio::spawn(fake_modem(
            theirs,
            vec!["+CMGL: 1,0,,24".to_string(), HELLOHELLO.to_string()],
        ));

        let relay = Bridge::new(ours, StdoutRelay::with_writer(Vec::new()))
            .run()
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(relay.into_inner()).unwrap(),
            "*27838890001*\n*2099-03-29T15:16:59+02:00*\nhellohello\n\n"
        );
        assert_eq!(
            modem.await.unwrap(),
            vec!["AT+CMGF=0", "AT+CMEE=1", "AT+CMGL=0", "AT+CMGD=1,1"]
        );
    }

    #[tokio::test]
    async fn modem_error_aborts_bridge() {
        let (ours, theirs) = tokio::io::duplex(4096);
        let modem = tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(theirs);
            let mut lines = BufReader::new(read).lines();
            let command = lines.next_line().await.unwrap();
            write.write_all(b"\r\n+CME ERROR: 3\r\n").await.unwrap();
            // wait for the bridge to hang up
            while let Ok(Some(_)) = lines.next_line().await {}
            command
        });

        let err = Bridge::new(ours, StdoutRelay::with_writer(Vec::new()))
            .run()
            .await
            .err()
            .unwrap();

        assert!(matches!(err, BridgeError::Protocol(line) if line == "+CME ERROR: 3"));
        assert_eq!(modem.await.unwrap().as_deref(), Some("AT+CMGF=0"));
    }

    #[tokio::test]
    async fn closed_stream_during_command_is_an_error() {
        let (ours, theirs) = tokio::io::duplex(4096);
        drop(theirs);

        let err = Bridge::new(ours, StdoutRelay::with_writer(Vec::new()))
            .run()
            .await
            .err()
            .unwrap();
        // the write or the read notices first, depending on timing
        assert!(matches!(
            err,
            BridgeError::ConnectionClosed | BridgeError::Connection(_)
        ));
    }

    struct BrokenRelay;

    impl Relay for BrokenRelay {
        async fn send(&mut self, _text: &str) -> RelayResult<()> {
            Err(RelayError::CommandFailed {
                status: "exit status: 1".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn relay_failure_stops_bridge() {
        let (ours, theirs) = tokio::io::duplex(4096);
        tokio::spawn(fake_modem(
            theirs,
            vec!["+CMGL: 1,0,,24".to_string(), HELLOHELLO.to_string()],
        ));

        let config = BridgeConfig::default().with_retry(RetryPolicy::no_retry());
        let err = Bridge::with_config(ours, BrokenRelay, config)
            .run()
            .await
            .err()
            .unwrap();

        assert!(matches!(
            err,
            BridgeError::Relay(RelayError::RetriesExhausted { attempts: 1, .. })
        ));
    }
}
