// ABOUTME: Retry policy for relay deliveries with geometric backoff
// ABOUTME: Sleeps between failed attempts and gives up after a bounded number of retries

use crate::relay::error::{RelayError, RelayResult};
use crate::relay::traits::Relay;
use std::time::Duration;
use tracing::warn;

/// How failed relay deliveries are retried
///
/// The first retry waits `initial_delay`; each following one waits
/// `multiplier` times longer than the last.
///
/// # Example
///
/// ```rust
/// use sms_bridge::relay::RetryPolicy;
/// use std::time::Duration;
///
/// // Default policy (3 retries, 1s first delay, doubling)
/// let policy = RetryPolicy::default();
///
/// let policy = RetryPolicy::new(5)
///     .with_initial_delay(Duration::from_millis(500))
///     .with_multiplier(3);
/// assert_eq!(policy.delay_for(2), Duration::from_millis(4500));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt (default: 3)
    pub max_retries: u32,

    /// Wait before the first retry (default: 1 second)
    pub initial_delay: Duration,

    /// Growth factor between consecutive waits (default: 2)
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// A policy that tries exactly once
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Wait before retry number `retry`, counting from zero
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry);
        self.initial_delay.saturating_mul(factor)
    }

    /// Send `text` through `relay`, retrying failures per this policy
    pub async fn deliver<R: Relay>(&self, relay: &mut R, text: &str) -> RelayResult<()> {
        let mut retry = 0;
        loop {
            match relay.send(text).await {
                Ok(()) => return Ok(()),
                Err(err) if retry >= self.max_retries => {
                    return Err(RelayError::RetriesExhausted {
                        attempts: retry + 1,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = self.delay_for(retry);
                    warn!("relay attempt {} failed: {}, retrying in {:?}", retry + 1, err, delay);
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    /// Fails a fixed number of times before accepting messages
    struct FlakyRelay {
        failures: u32,
        attempts: u32,
        sent: Vec<String>,
    }

    impl FlakyRelay {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: 0,
                sent: Vec::new(),
            }
        }
    }

    impl Relay for FlakyRelay {
        async fn send(&mut self, text: &str) -> RelayResult<()> {
            self.attempts += 1;
            if self.attempts <= self.failures {
                return Err(RelayError::Io(io::Error::other("unreachable")));
            }
            self.sent.push(text.to_string());
            Ok(())
        }
    }

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries).with_initial_delay(Duration::from_millis(1))
    }

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.multiplier, 2);
    }

    #[test]
    fn delays_grow_geometrically() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn huge_retry_counts_saturate() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(200), Duration::from_secs(u32::MAX as u64));
    }

    #[tokio::test]
    async fn first_success_sends_once() {
        let mut relay = FlakyRelay::new(0);
        fast(3).deliver(&mut relay, "hi").await.unwrap();
        assert_eq!(relay.attempts, 1);
        assert_eq!(relay.sent, vec!["hi".to_string()]);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let mut relay = FlakyRelay::new(2);
        fast(3).deliver(&mut relay, "hi").await.unwrap();
        assert_eq!(relay.attempts, 3);
        assert_eq!(relay.sent.len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let mut relay = FlakyRelay::new(10);
        let err = fast(2).deliver(&mut relay, "hi").await.unwrap_err();
        assert!(matches!(err, RelayError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(relay.attempts, 3);
        assert!(relay.sent.is_empty());
    }

    #[tokio::test]
    async fn no_retry_tries_once() {
        let mut relay = FlakyRelay::new(1);
        let err = RetryPolicy::no_retry().deliver(&mut relay, "hi").await.unwrap_err();
        assert!(matches!(err, RelayError::RetriesExhausted { attempts: 1, .. }));
    }
}
