use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use pushline_protocol::PushRequest;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::TransportResult;
use crate::transport::PushTransport;

pub const DEFAULT_RETRIES: u32 = 5;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 2000;
pub const DEFAULT_MAX_JITTER_MS: u64 = 2000;

/// Bounded retry with exponential backoff for retryable failures.
///
/// Disabled unless `max_retries > 0`. The default keeps retries off;
/// [`RetryPolicy::recommended`] gives the tuned values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_jitter_ms: DEFAULT_MAX_JITTER_MS,
        }
    }
}

impl RetryPolicy {
    pub fn recommended() -> Self {
        Self {
            max_retries: DEFAULT_RETRIES,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Wait before retry number `attempt` (0-based): the initial delay
    /// doubled per attempt plus a random jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self
            .initial_delay_ms
            .saturating_mul(1u64 << attempt.min(16));
        let jitter = if self.max_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.max_jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }
}

/// Wraps a transport and retries retryable failures per [`RetryPolicy`].
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: PushTransport> PushTransport for RetryingTransport<T> {
    async fn execute(&self, request: &PushRequest) -> TransportResult<Bytes> {
        let mut attempt = 0;
        loop {
            match self.inner.execute(request).await {
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let wait = self.policy.delay(attempt);
                    attempt += 1;
                    warn!(
                        request = request.type_name(),
                        attempt,
                        max = self.policy.max_retries,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransport;

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay_ms: 1,
            max_jitter_ms: 0,
        }
    }

    #[test]
    fn default_is_disabled() {
        assert!(!RetryPolicy::default().is_enabled());
        let tuned = RetryPolicy::recommended();
        assert_eq!(tuned.max_retries, 5);
        assert_eq!(tuned.initial_delay_ms, 2000);
        assert_eq!(tuned.max_jitter_ms, 2000);
    }

    #[test]
    fn delay_grows_and_stays_within_jitter() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay_ms: 100,
            max_jitter_ms: 50,
        };
        for attempt in 0..3 {
            let d = policy.delay(attempt).as_millis() as u64;
            let base = 100 << attempt;
            assert!((base..=base + 50).contains(&d), "{attempt}: {d}");
        }
    }

    #[tokio::test]
    async fn retries_retryable_statuses() {
        let inner = MemoryTransport::new();
        inner.fail_next("AcquireLocation", 503);
        inner.fail_next("AcquireLocation", 429);
        let transport = RetryingTransport::new(inner, fast(2));
        assert!(transport.execute(&PushRequest::AcquireLocation).await.is_ok());
        assert_eq!(transport.into_inner().len(), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let inner = MemoryTransport::new();
        inner.fail_next("AcquireLocation", 403);
        let transport = RetryingTransport::new(inner, fast(5));
        let err = transport.execute(&PushRequest::AcquireLocation).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(transport.into_inner().len(), 1);
    }

    #[tokio::test]
    async fn disabled_policy_makes_one_attempt() {
        let inner = MemoryTransport::new();
        inner.fail_next("AcquireLocation", 503);
        let transport = RetryingTransport::new(inner, RetryPolicy::default());
        assert!(transport.execute(&PushRequest::AcquireLocation).await.is_err());
        assert_eq!(transport.into_inner().len(), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let inner = MemoryTransport::new();
        for _ in 0..4 {
            inner.fail_next("AcquireLocation", 500);
        }
        let transport = RetryingTransport::new(inner, fast(2));
        let err = transport.execute(&PushRequest::AcquireLocation).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(transport.into_inner().len(), 3);
    }
}
