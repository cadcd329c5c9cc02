//! Backoff delay schedule.

use colloquy_core::{FailureClass, FloorScope, ModelProfile};
use rand::Rng;
use std::time::Duration;

/// Source of the random term added to each delay.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Jitter {
    /// Uniform in `[0, 1)` seconds
    #[default]
    Uniform,
    /// A constant, for reproducible schedules
    Fixed(f64),
}

impl Jitter {
    fn sample(&self) -> f64 {
        match self {
            Jitter::Uniform => rand::thread_rng().gen_range(0.0..1.0),
            Jitter::Fixed(value) => *value,
        }
    }
}

/// Exponential backoff with jitter, a cap, and a minimum floor for selected
/// failure classes.
///
/// `delay = min(base * 2^attempt + jitter, max)`, then raised to `floor`
/// when the floor applies to the class. The floor wins over the cap.
///
/// ```
/// use colloquy_core::{FailureClass, FloorScope};
/// use colloquy_dispatch::BackoffPolicy;
/// use std::time::Duration;
///
/// let policy = BackoffPolicy::new(
///     Duration::from_secs(1),
///     Duration::from_secs(30),
///     Duration::from_secs(5),
///     FloorScope::RateLimited,
/// );
/// let delay = policy.delay_with_jitter(0, FailureClass::RateLimited, 0.5);
/// assert_eq!(delay, Duration::from_secs(5));
/// let delay = policy.delay_with_jitter(0, FailureClass::Timeout, 0.5);
/// assert_eq!(delay, Duration::from_millis(1500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
    floor: Duration,
    floor_scope: FloorScope,
    jitter: Jitter,
}

impl BackoffPolicy {
    /// Create a policy with uniform jitter.
    pub fn new(base: Duration, max: Duration, floor: Duration, floor_scope: FloorScope) -> Self {
        Self {
            base,
            max,
            floor,
            floor_scope,
            jitter: Jitter::Uniform,
        }
    }

    /// Policy described by a model profile.
    pub fn from_profile(profile: &ModelProfile) -> Self {
        Self::new(
            profile.base_delay(),
            profile.max_delay(),
            profile.rate_limit_floor(),
            *profile.floor_scope(),
        )
    }

    /// Replace the jitter source.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay after a failed 0-based `attempt`, sampling jitter.
    pub fn delay(&self, attempt: u32, class: FailureClass) -> Duration {
        self.delay_with_jitter(attempt, class, self.jitter.sample())
    }

    /// Delay after a failed 0-based `attempt` with an explicit jitter value,
    /// clamped to `[0, 1]`.
    pub fn delay_with_jitter(&self, attempt: u32, class: FailureClass, jitter: f64) -> Duration {
        let jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.base.as_secs_f64() * 2f64.powi(exponent) + jitter;
        let capped = Duration::try_from_secs_f64(raw)
            .unwrap_or(self.max)
            .min(self.max);
        if self.floor_scope.applies_to(class) {
            capped.max(self.floor)
        } else {
            capped
        }
    }
}
