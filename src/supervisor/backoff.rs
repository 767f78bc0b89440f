//! Failure classification and backoff state for supervised loops.
//!
//! Delays grow exponentially per consecutive failure from a base that
//! depends on the failure class, and are capped. After too many consecutive
//! failures the circuit opens: the caller waits a longer cooldown and the
//! failure streak is reported at error level.

use std::time::Duration;

use teloxide::RequestError;

/// Coarse failure categories the supervisor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Connection dropped or could not be established.
    Connection,
    /// Request timed out.
    Timeout,
    /// Server asked us to slow down.
    RateLimited,
    /// Anything else: API errors, malformed responses.
    Other,
}

impl FailureClass {
    pub fn is_transient(self) -> bool {
        !matches!(self, FailureClass::Other)
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureClass::Connection => write!(f, "connection"),
            FailureClass::Timeout => write!(f, "timeout"),
            FailureClass::RateLimited => write!(f, "rate-limited"),
            FailureClass::Other => write!(f, "other"),
        }
    }
}

/// Errors that can tell the supervisor what kind of failure they are.
pub trait Classify {
    fn classify(&self) -> FailureClass;
}

impl Classify for RequestError {
    fn classify(&self) -> FailureClass {
        match self {
            RequestError::Network(e) if e.is_timeout() => FailureClass::Timeout,
            RequestError::Network(_) | RequestError::Io(_) => FailureClass::Connection,
            RequestError::RetryAfter(_) => FailureClass::RateLimited,
            _ => FailureClass::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Base delay for connection, timeout and rate-limit failures.
    pub transient_delay: Duration,
    /// Base delay for every other failure.
    pub other_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Consecutive failures that open the circuit.
    pub max_consecutive_failures: u32,
    pub circuit_cooldown: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            transient_delay: Duration::from_secs(15),
            other_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_delay: Duration::from_secs(300),
            max_consecutive_failures: 10,
            circuit_cooldown: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
}

/// What to do after a failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Retry { delay: Duration, attempt: u32 },
    CircuitOpen { cooldown: Duration, trips: u32 },
}

impl Decision {
    pub fn delay(&self) -> Duration {
        match self {
            Decision::Retry { delay, .. } => *delay,
            Decision::CircuitOpen { cooldown, .. } => *cooldown,
        }
    }
}

#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    consecutive_failures: u32,
    trips: u32,
    circuit: CircuitState,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            consecutive_failures: 0,
            trips: 0,
            circuit: CircuitState::Closed,
        }
    }

    pub fn circuit(&self) -> CircuitState {
        self.circuit
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn trips(&self) -> u32 {
        self.trips
    }

    /// Records a failure and returns how long to wait before the next attempt.
    pub fn record_failure(&mut self, class: FailureClass) -> Decision {
        self.consecutive_failures += 1;

        if self.consecutive_failures >= self.policy.max_consecutive_failures {
            self.trips += 1;
            self.consecutive_failures = 0;
            self.circuit = CircuitState::Open;
            return Decision::CircuitOpen {
                cooldown: self.policy.circuit_cooldown,
                trips: self.trips,
            };
        }

        Decision::Retry {
            delay: self.delay_for(class, self.consecutive_failures),
            attempt: self.consecutive_failures,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.circuit = CircuitState::Closed;
    }

    fn delay_for(&self, class: FailureClass, attempt: u32) -> Duration {
        let base = if class.is_transient() {
            self.policy.transient_delay
        } else {
            self.policy.other_delay
        };

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = base.as_secs_f64() * self.policy.multiplier.powi(exponent);
        let max = self.policy.max_delay.as_secs_f64();

        if !secs.is_finite() || secs >= max {
            self.policy.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}
