#![forbid(unsafe_code)]

//! The board's workflow states.
//!
//! Any state may move to any other state, including itself, and `Done` tasks
//! can be reopened. The only rule is that nothing outside the four states is
//! ever accepted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BoardError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "To Do")]
    ToDo,
    #[serde(rename = "In Progress")]
    InProgress,
    Testing,
    Done,
}

impl TaskStatus {
    /// Pipeline order, left to right on the board.
    pub const ALL: [Self; 4] = [Self::ToDo, Self::InProgress, Self::Testing, Self::Done];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Testing => "Testing",
            Self::Done => "Done",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::ToDo => "○",
            Self::InProgress => "◐",
            Self::Testing => "◑",
            Self::Done => "●",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = BoardError;

    /// Accepts the display names plus case and separator variants
    /// (`in-progress`, `IN_PROGRESS`, `todo`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "todo" => Ok(Self::ToDo),
            "inprogress" => Ok(Self::InProgress),
            "testing" => Ok(Self::Testing),
            "done" => Ok(Self::Done),
            _ => Err(BoardError::validation(format!(
                "invalid status '{s}': must be one of {}",
                TaskStatus::ALL.map(TaskStatus::as_str).join(", ")
            ))),
        }
    }
}

/// Checks a requested move from `from` to the raw status `to`.
pub fn validate_transition(from: TaskStatus, to: &str) -> Result<TaskStatus, BoardError> {
    let to: TaskStatus = to.parse()?;
    tracing::trace!(%from, %to, "status transition");
    Ok(to)
}
