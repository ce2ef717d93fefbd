//! Randomised inter-page delay.
//!
//! Each worker waits `base + U[0, jitter]` before every fetch. The base comes
//! from the job's `delay` setting; jitter comes from [`EngineConfig`]. With
//! the defaults (1s base, 2s jitter) the wait falls in `[1s, 3s]`.
//!
//! [`EngineConfig`]: crate::config::EngineConfig

use std::time::Duration;

/// Delay policy for one worker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDelay {
    /// Minimum wait before each fetch.
    pub base: Duration,

    /// Maximum random time added on top of `base` (uniform `[0, jitter]`).
    ///
    /// Set to `Duration::ZERO` to disable.
    pub jitter: Duration,
}

impl PageDelay {
    /// A fixed delay with no jitter.
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            jitter: Duration::ZERO,
        }
    }

    /// Build from a job's `delay` hint in seconds. Negative or NaN hints count
    /// as zero; hints past what a `Duration` holds saturate.
    pub fn from_secs_f64(secs: f64) -> Self {
        let base = if secs.is_nan() || secs <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        };
        Self::new(base)
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Draw one wait duration.
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.base;
        }
        let jitter_ms = fastrand::u64(0..=self.jitter.as_millis() as u64);
        self.base.saturating_add(Duration::from_millis(jitter_ms))
    }
}

impl Default for PageDelay {
    /// 1 second base, 2 seconds jitter.
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            jitter: Duration::from_secs(2),
        }
    }
}
