use std::fmt;

use serde::{Deserialize, Serialize};

/// Run state of a job pipeline.
///
/// Transitions only move forward
/// (`initialized -> extracting -> writing_output -> completed`); any
/// non-terminal phase may move to `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    #[default]
    Initialized,
    Extracting,
    WritingOutput,
    Completed,
    Failed,
}

impl PipelinePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Extracting => "extracting",
            Self::WritingOutput => "writing_output",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: PipelinePhase) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Self::Failed) => true,
            (Self::Initialized, Self::Extracting)
            | (Self::Extracting, Self::WritingOutput)
            | (Self::WritingOutput, Self::Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
