// ABOUTME: Command-line entry point relaying SMS from a GSM modem to a chat relay
// ABOUTME: Opens the modem device or a TCP serial server and runs the bridge until the line closes

//! # SMS bridge
//!
//! The modem device is opened at 8N1 without flow control; `--baud` sets the
//! line speed.
//!
//! ```bash
//! # Print messages to stdout
//! sms_bridge --device /dev/ttyUSB2 --baud 9600
//!
//! # Modems that only know the AT+CMGDA form of deleting read messages
//! sms_bridge --delete-all-read
//!
//! # Hand each message to a chat CLI on stdin
//! sms_bridge --relay-command "matrix-commander -m -" --max-retries 5
//!
//! # Modem behind a serial-over-TCP server
//! sms_bridge --tcp 192.168.1.20:2000 -d
//! ```

use argh::FromArgs;
use sms_bridge::Command;
use sms_bridge::bridge::{Bridge, BridgeConfig};
use sms_bridge::connection::SerialConfig;
use sms_bridge::reassembly::ReassemblyConfig;
use sms_bridge::relay::{CommandRelay, Relay, RetryPolicy, StdoutRelay};
use std::error::Error;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Relay SMS received by a GSM modem to a chat relay
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the modem device (default: /dev/ttyAMA0)
    #[argh(option)]
    device: Option<String>,

    /// the modem line speed (default: 115200)
    #[argh(option)]
    baud: Option<u32>,

    /// connect to a serial-over-TCP server at host:port instead of a device
    #[argh(option)]
    tcp: Option<String>,

    /// command run per message with the text on stdin (default: print to stdout)
    #[argh(option)]
    relay_command: Option<String>,

    /// seconds to wait for missing parts of a multi-part message (default: 60)
    #[argh(option)]
    eviction_window: Option<u64>,

    /// relay retries after a failed delivery (default: 3)
    #[argh(option)]
    max_retries: Option<u32>,

    /// seconds before the first relay retry, doubling after (default: 1)
    #[argh(option)]
    retry_delay: Option<u64>,

    /// messages buffered between modem and relay (default: 32)
    #[argh(option)]
    queue_capacity: Option<usize>,

    /// delete read messages with AT+CMGDA=1 instead of AT+CMGD=1,1
    #[argh(switch)]
    delete_all_read: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = config_from_args(&cli_args);

    match cli_args.tcp.as_deref() {
        Some(addr) => {
            info!("Connecting to modem at {addr}");
            let stream = TcpStream::connect(addr).await?;
            run(stream, &cli_args, config).await
        }
        None => {
            let mut serial = SerialConfig::default();
            if let Some(device) = &cli_args.device {
                serial.device = device.clone();
            }
            if let Some(baud) = cli_args.baud {
                serial = serial.with_baud_rate(baud);
            }
            info!("Opening modem device {} at {} baud", serial.device, serial.baud_rate);
            let port = serial.open()?;
            run(port, &cli_args, config).await
        }
    }
}

fn config_from_args(cli_args: &CliArgs) -> BridgeConfig {
    let mut retry = RetryPolicy::default();
    if let Some(max_retries) = cli_args.max_retries {
        retry.max_retries = max_retries;
    }
    if let Some(delay) = cli_args.retry_delay {
        retry = retry.with_initial_delay(Duration::from_secs(delay));
    }

    let mut reassembly = ReassemblyConfig::default();
    if let Some(window) = cli_args.eviction_window {
        reassembly = reassembly.with_eviction_window(Duration::from_secs(window));
    }

    let mut config = BridgeConfig::default()
        .with_retry(retry)
        .with_reassembly(reassembly);
    if let Some(capacity) = cli_args.queue_capacity {
        config = config.with_queue_capacity(capacity);
    }
    if cli_args.delete_all_read {
        config = config.with_delete_command(Command::DeleteAllRead);
    }
    config
}

async fn run<S>(stream: S, cli_args: &CliArgs, config: BridgeConfig) -> Result<(), Box<dyn Error>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match cli_args.relay_command.as_deref() {
        Some(command_line) => {
            let mut words = command_line.split_whitespace();
            let program = words.next().ok_or("empty relay command")?;
            let relay = CommandRelay::new(program).args(words);
            bridge(stream, relay, config).await
        }
        None => bridge(stream, StdoutRelay::new(), config).await,
    }
}

async fn bridge<S, R>(stream: S, relay: R, config: BridgeConfig) -> Result<(), Box<dyn Error>>
where
    S: AsyncRead + AsyncWrite + Unpin,
    R: Relay,
{
    match Bridge::with_config(stream, relay, config).run().await {
        Ok(_) => {
            info!("Modem line closed, shutting down");
            Ok(())
        }
        Err(e) => {
            error!("Bridge stopped: {e}");
            Err(e.into())
        }
    }
}
