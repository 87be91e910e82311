//! Engine types
//!
//! Lifecycle states of a single table export.

use std::fmt;

/// Lifecycle of one table export
///
/// `Idle → Extracting → Formatting → Writing → Publishing → CleaningUp → Done`,
/// with `Failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportState {
    #[default]
    Idle,
    Extracting,
    Formatting,
    Writing,
    Publishing,
    CleaningUp,
    Done,
    Failed,
}

impl ExportState {
    /// Whether the export has concluded
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_advance_to(self, next: ExportState) -> bool {
        use ExportState::{CleaningUp, Done, Extracting, Failed, Formatting, Idle, Publishing, Writing};

        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            // Cleanup also runs when writing failed after the artifact existed
            (Writing, CleaningUp) => true,
            (Idle, Extracting)
            | (Extracting, Formatting)
            | (Formatting, Writing)
            | (Writing, Publishing)
            | (Publishing, CleaningUp)
            | (CleaningUp, Done) => true,
            // A finished exporter may start the next table
            (Done | Failed, Idle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Extracting => "extracting",
            Self::Formatting => "formatting",
            Self::Writing => "writing",
            Self::Publishing => "publishing",
            Self::CleaningUp => "cleaning_up",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
