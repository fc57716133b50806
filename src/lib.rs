pub mod at;
pub mod bridge;
pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod reader;
pub mod reassembly;
pub mod relay;


// Re-export the decoding layers for direct access
pub use at::{AtError, Command, ListedMessage, Response};
pub use codec::PduError;
pub use datatypes::Sms;
pub use reader::{EventReader, LineSource};
pub use reassembly::{Event, Message, ReassemblyConfig, Reassembler};

// Re-export the bridge API for easy access
pub use bridge::{Bridge, BridgeConfig, BridgeError};
pub use connection::{ModemConnection, SerialConfig};
pub use relay::{CommandRelay, Relay, RelayError, RetryPolicy, StdoutRelay};

/// Error returned by most functions.
///
/// Each layer has its own error `enum` (`PduError`, `AtError`,
/// `BridgeError`, `RelayError`); all of them convert into this boxed
/// `std::error::Error` for callers that only report failures.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for bridge operations.
///
/// This is defined as a convenience.
///
/// # Examples
///
/// ## Decoding a listed PDU
///
/// ```rust
/// use sms_bridge::Sms;
///
/// fn main() -> sms_bridge::Result<()> {
///     let sms = Sms::decode(
///         "07917283010010F5040BC87238880900F10000993092516195800AE8329BFD4697D9EC37",
///     )?;
///     assert_eq!(sms.originating_address.to_string(), "27838890001");
///     assert_eq!(sms.text, "hellohello");
///     Ok(())
/// }
/// ```
///
/// ## Running a bridge
///
/// ```rust,no_run
/// use sms_bridge::{Bridge, SerialConfig, StdoutRelay};
///
/// #[tokio::main]
/// async fn main() -> sms_bridge::Result<()> {
///     let modem = SerialConfig::new("/dev/ttyUSB2").open()?;
///
///     Bridge::new(modem, StdoutRelay::new()).run().await?;
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
