//! Pacing of calls to external providers.

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use log::debug;
use std::num::NonZeroU32;
use std::time::Duration;

/// clock that can also block the caller, faked in tests
pub trait Pause: Clock {
    fn pause(&self, d: Duration);
}

impl Pause for DefaultClock {
    fn pause(&self, d: Duration) {
        std::thread::sleep(d)
    }
}

pub trait RateLimiter {
    /// blocks until a call is allowed, returns the time waited
    fn acquire(&mut self) -> Duration;
}

/// never waits
#[derive(Debug, Default)]
pub struct Unlimited;

impl RateLimiter for Unlimited {
    fn acquire(&mut self) -> Duration {
        Duration::from_secs(0)
    }
}

/// token bucket holding at most `capacity` tokens, one token refilled per `period`
///
/// the bucket starts full
pub struct TokenBucket<C: Pause = DefaultClock> {
    // none when the period is zero
    limiter: Option<GovernorRateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>>,
    clock: C,
}

impl TokenBucket<DefaultClock> {
    pub fn new(capacity: u32, period: Duration) -> Self {
        TokenBucket::with_clock(capacity, period, DefaultClock::default())
    }

    /// one call per period, the first one immediately
    pub fn fixed_interval(period: Duration) -> Self {
        TokenBucket::new(1, period)
    }
}

impl<C: Pause> TokenBucket<C> {
    pub fn with_clock(capacity: u32, period: Duration, clock: C) -> Self {
        let burst = NonZeroU32::new(capacity).unwrap_or(NonZeroU32::MIN);
        let limiter = Quota::with_period(period)
            .map(|q| GovernorRateLimiter::direct_with_clock(q.allow_burst(burst), &clock));
        TokenBucket { limiter, clock }
    }
}

impl<C: Pause> RateLimiter for TokenBucket<C> {
    fn acquire(&mut self) -> Duration {
        let mut waited = Duration::from_secs(0);
        let limiter = match self.limiter {
            Some(ref limiter) => limiter,
            None => return waited,
        };
        while let Err(not_until) = limiter.check() {
            let wait = not_until.wait_time_from(self.clock.now());
            debug!("Waiting {:?} before the next call.", wait);
            self.clock.pause(wait);
            waited += wait;
        }
        waited
    }
}

/// limiter matching a call interval given in seconds, 0 disables pacing
pub fn call_interval_limiter(seconds: u64) -> Box<dyn RateLimiter> {
    if seconds == 0 {
        Box::new(Unlimited)
    } else {
        Box::new(TokenBucket::fixed_interval(Duration::from_secs(seconds)))
    }
}
