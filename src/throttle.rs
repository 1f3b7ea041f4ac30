//! Fixed-delay request throttling.
//!
//! The harvester is strictly sequential, so a [`Throttle`] is owned by the
//! loop it paces and borrowed mutably; no locking is needed.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use archive_harvester::throttle::Throttle;
//!
//! # async fn example() {
//! let mut throttle = Throttle::new(Duration::from_millis(10));
//! throttle.wait().await; // first call proceeds immediately
//! throttle.wait().await; // later calls keep at least 10ms apart
//! # }
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Cooperative fixed-delay throttle.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    /// Extra multiplier applied to the next wait only (set after a failure).
    penalty: u32,
    /// `None` until the first call.
    last: Option<Instant>,
}

impl Throttle {
    /// Creates a throttle keeping calls at least `delay` apart.
    ///
    /// A zero delay disables throttling.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            penalty: 1,
            last: None,
        }
    }

    /// A throttle that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns whether this throttle never sleeps.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.delay.is_zero()
    }

    /// Doubles the delay applied before the next call.
    pub fn back_off(&mut self) {
        self.penalty = 2;
    }

    /// Delay the next call would be subject to, ignoring elapsed time.
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        self.delay.saturating_mul(self.penalty)
    }

    /// Sleeps until the configured delay has passed since the previous call.
    ///
    /// The first call never sleeps.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last
            && !self.is_disabled()
        {
            let target = last + self.current_delay();
            let now = Instant::now();
            if target > now {
                let remaining = target - now;
                debug!(delay_ms = remaining.as_millis(), "throttling");
                tokio::time::sleep(remaining).await;
            }
        }
        self.penalty = 1;
        self.last = Some(Instant::now());
    }
}
