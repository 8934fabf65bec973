//! Reconnection backoff policies.
//!
//! A [`Reconnector`] is a stateless function of the attempt count. The
//! delivery worker owns the mutable counter through [`ReconnectState`], which
//! is reset on a successful connect and incremented after each failed one.
//! Both policies always retry; shutdown is the only way out of the loop.

use std::time::Duration;

/// Delay used by [`Reconnector::constant`].
pub const DEFAULT_CONSTANT_DELAY: Duration = Duration::from_millis(50);
/// Initial delay used by [`Reconnector::exponential`].
pub const DEFAULT_EXPONENTIAL_BASE: Duration = Duration::from_millis(50);
/// Growth factor applied per failed attempt.
pub const DEFAULT_EXPONENTIAL_FACTOR: f64 = 1.5;
/// Attempt count after which the exponent stops growing.
pub const DEFAULT_CAP_ATTEMPTS: u32 = 18;
/// Upper bound on any exponential delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Backoff policy consulted before each reconnection attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum Reconnector {
    /// Wait the same duration before every attempt.
    Constant { delay: Duration },
    /// Wait `base * factor^min(attempt, cap_attempts)`, clipped to `max`.
    Exponential {
        base: Duration,
        factor: f64,
        cap_attempts: u32,
        max: Duration,
    },
}

impl Default for Reconnector {
    fn default() -> Self {
        Self::exponential()
    }
}

impl Reconnector {
    pub fn constant() -> Self {
        Self::Constant {
            delay: DEFAULT_CONSTANT_DELAY,
        }
    }

    pub fn exponential() -> Self {
        Self::Exponential {
            base: DEFAULT_EXPONENTIAL_BASE,
            factor: DEFAULT_EXPONENTIAL_FACTOR,
            cap_attempts: DEFAULT_CAP_ATTEMPTS,
            max: DEFAULT_MAX_DELAY,
        }
    }

    /// Select the policy named by the `useConstantDelayReconnector` option.
    pub fn from_flag(use_constant: bool) -> Self {
        if use_constant {
            Self::constant()
        } else {
            Self::exponential()
        }
    }

    /// Delay to wait before reconnect attempt number `attempt` (zero based).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        match *self {
            Reconnector::Constant { delay } => delay,
            Reconnector::Exponential {
                base,
                factor,
                cap_attempts,
                max,
            } => {
                let exponent = attempt.min(cap_attempts);
                let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);
                let secs = base.as_secs_f64() * factor.max(1.0).powi(exponent);
                if !secs.is_finite() || secs >= max.as_secs_f64() {
                    return max;
                }
                Duration::from_secs_f64(secs).min(max)
            }
        }
    }

    /// Whether attempt number `attempt` should be made. Both policies
    /// always retry.
    pub fn should_retry(&self, _attempt: u32) -> bool {
        match self {
            Reconnector::Constant { .. } | Reconnector::Exponential { .. } => true,
        }
    }
}

/// Attempt counter driving a [`Reconnector`].
#[derive(Debug)]
pub struct ReconnectState {
    policy: Reconnector,
    attempts: u32,
}

impl ReconnectState {
    pub fn new(policy: Reconnector) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay before the next reconnect attempt.
    pub fn next_delay(&self) -> Duration {
        self.policy.next_delay(self.attempts)
    }

    pub fn should_retry(&self) -> bool {
        self.policy.should_retry(self.attempts)
    }

    pub fn record_failure(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    pub fn record_success(&mut self) {
        self.attempts = 0;
    }
}
