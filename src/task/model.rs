#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::error::BoardError;
use crate::ids::{self, IdInput};
use crate::store::{EntityKind, Record};
use crate::task::status::TaskStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                BoardError::validation(format!(
                    "invalid priority '{s}': must be one of Low, Medium, High"
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(deserialize_with = "ids::deserialize_canonical")]
    pub id: String,
    /// Empty for tasks written before projects existed; such tasks
    /// belong to no project and count as orphans.
    #[serde(deserialize_with = "ids::deserialize_reference")]
    pub project_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record for Task {
    const KIND: EntityKind = EntityKind::Tasks;

    fn id(&self) -> &str {
        &self.id
    }

    /// Task lists from before projects carry neither `projectId` nor
    /// `updatedAt`.
    fn upgrade(doc: &mut Value) -> bool {
        let Value::Object(map) = doc else {
            return false;
        };
        let mut changed = false;
        if map.get("projectId").is_none_or(Value::is_null) {
            map.insert("projectId".to_owned(), Value::String(String::new()));
            changed = true;
        }
        if !map.contains_key("updatedAt")
            && let Some(created) = map.get("createdAt").cloned()
        {
            map.insert("updatedAt".to_owned(), created);
            changed = true;
        }
        changed
    }
}

/// Input for creating a task. Status and priority arrive as text and are
/// validated by the repository.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub project_id: Option<IdInput>,
}

impl NewTask {
    #[must_use]
    pub fn new(title: impl Into<String>, project_id: impl Into<IdInput>) -> Self {
        Self {
            title: Some(title.into()),
            project_id: Some(project_id.into()),
            ..Self::default()
        }
    }
}

/// Partial update; `None` keeps the stored value. A description of `""`
/// clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub project_id: Option<IdInput>,
}

impl TaskPatch {
    #[must_use]
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }
}
