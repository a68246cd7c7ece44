//! Core data contracts: tasks and their immutable history events.
//!
//! Tasks live in `tasks.json` and are updated in place. History events live
//! in `history.jsonl`, are append-only, and are never mutated or deleted —
//! split/merge lineage is reconstructed from them (see `relations`, `lineage`
//! and `graph`), never from a live field on the task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    #[serde(rename = "inprogress")]
    InProgress,
    Hold,
    Done,
    Archived,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "inprogress",
            TaskStatus::Hold => "hold",
            TaskStatus::Done => "done",
            TaskStatus::Archived => "archived",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "inprogress" => Ok(TaskStatus::InProgress),
            "hold" => Ok(TaskStatus::Hold),
            "done" => Ok(TaskStatus::Done),
            "archived" => Ok(TaskStatus::Archived),
            other => Err(crate::error::Error::InvalidArgument(format!(
                "unknown task status '{other}' (expected todo|inprogress|hold|done|archived)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(crate::error::Error::InvalidArgument(format!(
                "unknown task priority '{other}' (expected low|medium|high)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

/// Informational link kept on the task row. Not authoritative for lineage:
/// the engine derives split/merge ancestry from history events only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRelation {
    pub target_id: String,
    pub kind: RelationKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Parent,
    Child,
    Related,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeLog {
    pub start: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    pub kind: TimeLogKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeLogKind {
    Work,
    Hold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub relations: Vec<TaskRelation>,
    #[serde(default)]
    pub time_logs: Vec<TimeLog>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HistoryType {
    Created,
    Updated,
    StatusChange,
    SplitFrom,
    MergedInto,
}

/// Payload of a history event. Which fields are present depends on the event
/// type; an event missing the fields expected for its type carries no
/// structural information and is skipped by the lineage engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Child task ids, recorded on the parent's stream when it is split.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_into: Option<Vec<String>>,
    /// Parent task id, recorded on a child's stream when it was split out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Source task ids, recorded on the merged task's stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<Vec<String>>,
    /// Merge result id, recorded on each source task's stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub id: String,
    pub task_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: HistoryType,
    #[serde(default)]
    pub details: EventDetails,
}

impl HistoryEvent {
    pub fn new(event_type: HistoryType, task_id: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            task_id: task_id.into(),
            timestamp: Utc::now(),
            event_type,
            details: EventDetails::default(),
        }
    }

    pub fn with_details(mut self, details: EventDetails) -> Self {
        self.details = details;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_serde_names() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"inprogress\"");
        let parsed: TaskStatus = serde_json::from_str("\"inprogress\"").unwrap();
        assert_eq!(parsed, TaskStatus::InProgress);
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert!("blocked".parse::<TaskStatus>().is_err());
        assert_eq!("Done".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
    }

    #[test]
    fn event_details_absent_fields_are_omitted() {
        let event = HistoryEvent::new(HistoryType::SplitFrom, "task-1").with_details(EventDetails {
            source_id: Some("task-0".to_string()),
            ..EventDetails::default()
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("source_id"));
        assert!(!json.contains("merged_from"));
        assert!(!json.contains("split_into"));
    }

    #[test]
    fn event_missing_details_deserializes_to_empty_payload() {
        let json = r#"{"id":"01ARZ3NDEKTSV4RRFFQ69G5FAV","task_id":"t1","timestamp":"2025-01-01T00:00:00Z","type":"status_change"}"#;
        let event: HistoryEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, HistoryType::StatusChange);
        assert!(event.details.status.is_none());
        assert!(event.details.split_into.is_none());
    }
}
