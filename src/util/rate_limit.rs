//! Rate limiting for inbound input lines

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default cap on input lines per second (two frames per 60 Hz tick)
pub const DEFAULT_INPUT_RATE_LIMIT: u32 = 120;

/// Guards the session input channel against floods from the input source
pub struct InputLimiter {
    limiter: Limiter,
}

impl InputLimiter {
    pub fn per_second(lines_per_second: u32) -> Self {
        let quota =
            Quota::per_second(NonZeroU32::new(lines_per_second).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Returns true if the line may be forwarded
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for InputLimiter {
    fn default() -> Self {
        Self::per_second(DEFAULT_INPUT_RATE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_beyond_quota_is_rejected() {
        let limiter = InputLimiter::per_second(3);
        let allowed = (0..10).filter(|_| limiter.check()).count();
        assert_eq!(allowed, 3);
    }
}
