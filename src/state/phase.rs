/// Harvest phase definitions
///
/// A run moves through these phases exactly once, in order, ending in `Done`.
use std::fmt;

/// Represents where a harvest run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HarvestPhase {
    // ===== Setup Phases =====
    /// Coordinator built, nothing loaded yet
    Init,

    /// Reading prior progress from the checkpoint
    LoadingCheckpoint,

    /// Drawing candidate identifiers
    Sampling,

    // ===== Main Loop =====
    /// Fetching candidates one at a time
    Running,

    // ===== Loop Outcomes =====
    /// Accumulated records met the target
    TargetReached,

    /// Candidate pool ran out before the target was met
    Exhausted,

    /// Cancellation was requested
    Interrupted,

    // ===== Teardown =====
    /// Writing the final checkpoint and output
    Finalizing,

    /// Run finished
    Done,
}

impl HarvestPhase {
    /// Returns true for the three ways the main loop can end
    pub fn is_loop_outcome(&self) -> bool {
        matches!(
            self,
            Self::TargetReached | Self::Exhausted | Self::Interrupted
        )
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// `Running -> Finalizing` is legal so an unexpected loop error still
    /// reaches finalization.
    pub fn can_transition_to(&self, next: HarvestPhase) -> bool {
        use HarvestPhase::*;
        matches!(
            (self, next),
            (Init, LoadingCheckpoint)
                | (LoadingCheckpoint, Sampling)
                | (Sampling, Running)
                | (Running, TargetReached)
                | (Running, Exhausted)
                | (Running, Interrupted)
                | (Running, Finalizing)
                | (TargetReached, Finalizing)
                | (Exhausted, Finalizing)
                | (Interrupted, Finalizing)
                | (Finalizing, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::LoadingCheckpoint => "loading_checkpoint",
            Self::Sampling => "sampling",
            Self::Running => "running",
            Self::TargetReached => "target_reached",
            Self::Exhausted => "exhausted",
            Self::Interrupted => "interrupted",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for HarvestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
