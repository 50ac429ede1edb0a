use std::fmt;

use log::{debug, warn};

/// Stages of one resolution.
///
/// ```text
/// validating -> normalizing -> cache_check -> strategy_chain
///     -> conflict_resolution -> cache_populate -> done
/// ```
///
/// A cache hit jumps from `cache_check` to `done`. `error` is reachable from
/// every stage except `done`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolutionStage {
    Validating,
    Normalizing,
    CacheCheck,
    StrategyChain,
    ConflictResolution,
    CachePopulate,
    Done,
    Error,
}

impl ResolutionStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Normalizing => "normalizing",
            Self::CacheCheck => "cache_check",
            Self::StrategyChain => "strategy_chain",
            Self::ConflictResolution => "conflict_resolution",
            Self::CachePopulate => "cache_populate",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    pub fn can_transition_to(self, next: ResolutionStage) -> bool {
        use ResolutionStage::*;
        match (self, next) {
            (Done, _) | (Error, _) => false,
            (_, Error) => true,
            (Validating, Normalizing)
            | (Normalizing, CacheCheck)
            | (CacheCheck, StrategyChain)
            | (CacheCheck, Done)
            | (StrategyChain, ConflictResolution)
            | (ConflictResolution, CachePopulate)
            | (CachePopulate, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the stage of one in-flight resolution for logging.
#[derive(Debug)]
pub(crate) struct StageTracker<'a> {
    postal_code: &'a str,
    stage: ResolutionStage,
}

impl<'a> StageTracker<'a> {
    pub(crate) fn new(postal_code: &'a str) -> Self {
        Self {
            postal_code,
            stage: ResolutionStage::Validating,
        }
    }

    pub(crate) fn stage(&self) -> ResolutionStage {
        self.stage
    }

    pub(crate) fn advance(&mut self, next: ResolutionStage) {
        if !self.stage.can_transition_to(next) {
            warn!(
                "Unexpected resolution transition {} -> {} for {}",
                self.stage, next, self.postal_code
            );
        }
        debug!("{}: {} -> {}", self.postal_code, self.stage, next);
        self.stage = next;
    }
}

#[cfg(test)]
mod tests {
    use super::ResolutionStage::*;
    use super::*;

    #[test]
    fn test_happy_path_is_allowed() {
        let path = [
            Validating,
            Normalizing,
            CacheCheck,
            StrategyChain,
            ConflictResolution,
            CachePopulate,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(CacheCheck.can_transition_to(Done));
    }

    #[test]
    fn test_terminal_stages_are_final() {
        assert!(Done.is_terminal());
        assert!(!Done.can_transition_to(Error));
        assert!(!Error.can_transition_to(Validating));
    }

    #[test]
    fn test_no_skipping_ahead() {
        assert!(!Validating.can_transition_to(StrategyChain));
        assert!(!StrategyChain.can_transition_to(Done));
        assert!(StrategyChain.can_transition_to(Error));
    }

    #[test]
    fn test_tracker_follows_transitions() {
        let mut tracker = StageTracker::new("75001");
        tracker.advance(Normalizing);
        tracker.advance(CacheCheck);
        assert_eq!(tracker.stage(), CacheCheck);
    }
}
