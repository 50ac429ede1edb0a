//! Circuit breaker for network-bound boundary sources.
//!
//! - **Closed**: calls go through, consecutive failures are counted.
//! - **Open**: the source is skipped until the cool-down elapses.
//! - **HalfOpen**: probe calls are let through; enough successes close the
//!   circuit again, any failure reopens it.
//!
//! State lives in memory only and starts closed on every process start.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::time::Instant;

const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(60);
const DEFAULT_PROBE_SUCCESSES: u32 = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        })
    }
}

#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    probe_successes: u32,
    opened_at: Option<Instant>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            probe_successes: 0,
            opened_at: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit rejects calls before probing.
    pub cool_down: Duration,
    /// Probe successes needed to close a half-open circuit.
    pub probe_successes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cool_down: DEFAULT_COOL_DOWN,
            probe_successes: DEFAULT_PROBE_SUCCESSES,
        }
    }
}

/// Circuit breaker keyed by source name.
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether a call to `source` may proceed. Moves an open circuit to
    /// half-open once the cool-down has elapsed.
    pub fn allows(&self, source: &str) -> bool {
        let mut circuits = self.lock();
        let circuit = circuits.entry(source.to_string()).or_default();

        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled = circuit
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.cool_down);
                if cooled {
                    info!("Circuit for '{}' half-open, probing", source);
                    circuit.state = CircuitState::HalfOpen;
                    circuit.probe_successes = 0;
                }
                cooled
            }
        }
    }

    pub fn record_success(&self, source: &str) {
        let mut circuits = self.lock();
        let circuit = circuits.entry(source.to_string()).or_default();

        match circuit.state {
            CircuitState::Closed => circuit.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                circuit.probe_successes += 1;
                if circuit.probe_successes >= self.config.probe_successes {
                    info!("Circuit for '{}' closed after successful probes", source);
                    *circuit = Circuit::default();
                }
            }
            CircuitState::Open => {
                debug!("Late success for '{}' while circuit open", source);
            }
        }
    }

    pub fn record_failure(&self, source: &str) {
        let mut circuits = self.lock();
        let circuit = circuits.entry(source.to_string()).or_default();
        circuit.consecutive_failures += 1;

        match circuit.state {
            CircuitState::Closed if circuit.consecutive_failures >= self.config.failure_threshold => {
                info!(
                    "Circuit for '{}' opened after {} consecutive failures",
                    source, circuit.consecutive_failures
                );
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                debug!(
                    "Failure for '{}' ({}/{})",
                    source, circuit.consecutive_failures, self.config.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                info!("Circuit for '{}' reopened, probe failed", source);
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
                circuit.probe_successes = 0;
            }
            CircuitState::Open => {
                circuit.opened_at = Some(Instant::now());
            }
        }
    }

    pub fn state(&self, source: &str) -> CircuitState {
        self.lock()
            .get(source)
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }

    pub fn reset(&self, source: &str) {
        if self.lock().remove(source).is_some() {
            info!("Circuit for '{}' reset", source);
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cool_down_ms: u64, probes: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            cool_down: Duration::from_millis(cool_down_ms),
            probe_successes: probes,
        })
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = breaker(3, 60_000, 1);
        cb.record_failure("registry");
        cb.record_failure("registry");
        assert!(cb.allows("registry"));

        cb.record_failure("registry");
        assert_eq!(cb.state("registry"), CircuitState::Open);
        assert!(!cb.allows("registry"));
    }

    #[test]
    fn test_success_clears_failure_streak() {
        let cb = breaker(2, 60_000, 1);
        cb.record_failure("registry");
        cb.record_success("registry");
        cb.record_failure("registry");
        assert_eq!(cb.state("registry"), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_cycle() {
        let cb = breaker(1, 60_000, 2);
        cb.record_failure("registry");
        assert!(!cb.allows("registry"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!cb.allows("registry"));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cb.allows("registry"));
        assert_eq!(cb.state("registry"), CircuitState::HalfOpen);

        cb.record_success("registry");
        assert_eq!(cb.state("registry"), CircuitState::HalfOpen);
        cb.record_success("registry");
        assert_eq!(cb.state("registry"), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_probe_reopens() {
        let cb = breaker(1, 60_000, 2);
        cb.record_failure("registry");
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cb.allows("registry"));

        cb.record_failure("registry");
        assert_eq!(cb.state("registry"), CircuitState::Open);
        assert!(!cb.allows("registry"));
    }

    #[test]
    fn test_sources_are_isolated_and_resettable() {
        let cb = breaker(1, 60_000, 1);
        cb.record_failure("a");
        assert!(!cb.allows("a"));
        assert!(cb.allows("b"));

        cb.reset("a");
        assert_eq!(cb.state("a"), CircuitState::Closed);
    }
}
