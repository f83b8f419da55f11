//! Pipeline lifecycle states.

use std::fmt;

/// Where a run is in its lifecycle.
///
/// `Initializing -> Streaming -> Finalizing -> Done`, with `Failed` reachable
/// from every state except `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Initializing,
    Streaming,
    Finalizing,
    Done,
    Failed(String),
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Initializing => "Initializing",
            PipelineState::Streaming => "Streaming",
            PipelineState::Finalizing => "Finalizing",
            PipelineState::Done => "Done",
            PipelineState::Failed(_) => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }

    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Initializing, Streaming)
                | (Streaming, Finalizing)
                | (Finalizing, Done)
                | (Initializing | Streaming | Finalizing, Failed(_))
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Failed(reason) => write!(f, "Failed({reason})"),
            other => f.write_str(other.name()),
        }
    }
}
