// ABOUTME: Relay trait implemented by every chat-side message sink
// ABOUTME: Uses native async functions in traits like the rest of the crate

use crate::relay::error::RelayResult;

/// Destination for complete, rendered messages
///
/// One call delivers one message. Implementations should not retry
/// internally; [`RetryPolicy`](crate::relay::RetryPolicy) does that.
pub trait Relay {
    async fn send(&mut self, text: &str) -> RelayResult<()>;
}
