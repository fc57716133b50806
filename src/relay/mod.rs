// ABOUTME: Chat-side relay for complete messages with retry on failure
// ABOUTME: Exports the Relay trait, the stdout and command relays and the retry policy

mod default;
mod error;
mod retry;
mod traits;

pub use default::{CommandRelay, StdoutRelay};
pub use error::{RelayError, RelayResult};
pub use retry::RetryPolicy;
pub use traits::Relay;
