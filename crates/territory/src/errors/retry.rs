/// Classification for how the strategy chain reacts to a failed strategy.
///
/// # Behavior Summary
///
/// | Class | Try Next Strategy? | Record Circuit Breaker Failure? |
/// |-------|-------------------|--------------------------------|
/// | `Never` | No | No |
/// | `FailoverWithPenalty` | Yes | Yes (affects future requests) |
/// | `NextStrategy` | Yes | No |
/// | `CircuitOpen` | Yes (skip this one) | No (already recorded) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Terminal: the input itself is unusable (format or region failure).
    /// Entering the strategy chain again would not change the outcome.
    Never,

    /// Fall through to the next strategy and penalise the source.
    ///
    /// Used for timeouts and rate limiting on the external registry. The
    /// failure is recorded in the circuit breaker, so repeated failures take
    /// the registry out of rotation for a while.
    FailoverWithPenalty,

    /// Fall through to the next strategy without any penalty.
    NextStrategy,

    /// The source's circuit is already open; skip it.
    CircuitOpen,
}
