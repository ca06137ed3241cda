use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Monotonic ordering identifier attached to pushed items.
///
/// A token is the wall-clock time in milliseconds at which it was minted. The
/// service uses it to sequence updates to the same item and to bound
/// age-based deletes: everything tagged with a smaller token is "older".
///
/// Tokens are always strictly positive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct OrderingToken(u64);

impl OrderingToken {
    /// Wrap a raw value. Zero is rejected.
    pub fn new(value: u64) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::NonPositiveOrderingToken);
        }
        Ok(Self(value))
    }

    /// Accept a signed value as it arrives from user input; anything `<= 0`
    /// is rejected.
    pub fn from_signed(value: i64) -> Result<Self, ValidationError> {
        u64::try_from(value)
            .map_err(|_| ValidationError::NonPositiveOrderingToken)
            .and_then(Self::new)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for OrderingToken {
    type Error = ValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderingToken> for u64 {
    fn from(token: OrderingToken) -> Self {
        token.0
    }
}

impl fmt::Debug for OrderingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderingToken({})", self.0)
    }
}

impl fmt::Display for OrderingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of ordering tokens.
///
/// Exactly one token is minted per logical session and held for its
/// duration. Implementations must be `Send + Sync` so a clock can be shared
/// by independent sessions.
pub trait OrderingClock: Send + Sync {
    fn mint(&self) -> OrderingToken;
}

/// Mints tokens from the system clock.
///
/// Non-decreasing only as long as the system clock does not step backwards.
/// Two sessions started within the same millisecond receive the same token;
/// the service's own ordering model tolerates that.
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl OrderingClock for WallClock {
    fn mint(&self) -> OrderingToken {
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        // A clock set before 1970 would yield 0.
        OrderingToken(ms.max(1))
    }
}

/// Deterministic clock for tests: returns its current value and advances
/// by `step` after every mint.
#[derive(Debug)]
pub struct ManualClock {
    next: AtomicU64,
    step: u64,
}

impl ManualClock {
    pub fn new(start: u64, step: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
            step,
        }
    }

    /// Value the next call to `mint` will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl OrderingClock for ManualClock {
    fn mint(&self) -> OrderingToken {
        OrderingToken(self.next.fetch_add(self.step, Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert_eq!(
            OrderingToken::new(0),
            Err(ValidationError::NonPositiveOrderingToken)
        );
        assert_eq!(
            OrderingToken::from_signed(-5),
            Err(ValidationError::NonPositiveOrderingToken)
        );
        assert_eq!(OrderingToken::from_signed(7).unwrap().get(), 7);
    }

    #[test]
    fn wall_clock_is_non_decreasing() {
        let clock = WallClock;
        let mut prev = clock.mint();
        for _ in 0..1000 {
            let next = clock.mint();
            assert!(next >= prev, "{prev:?} > {next:?}");
            prev = next;
        }
    }

    #[test]
    fn wall_clock_tracks_epoch_millis() {
        let token = WallClock.mint();
        // 2020-01-01T00:00:00Z
        assert!(token.get() > 1_577_836_800_000);
    }

    #[test]
    fn manual_clock_steps() {
        let clock = ManualClock::new(100, 10);
        assert_eq!(clock.mint().get(), 100);
        assert_eq!(clock.mint().get(), 110);
        assert_eq!(clock.peek(), 120);
    }

    #[test]
    fn serde_rejects_zero() {
        let token: OrderingToken = serde_json::from_str("42").unwrap();
        assert_eq!(token.get(), 42);
        assert!(serde_json::from_str::<OrderingToken>("0").is_err());
        assert_eq!(serde_json::to_string(&token).unwrap(), "42");
    }
}
