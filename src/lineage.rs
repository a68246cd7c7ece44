//! Direct lineage resolution for a single focal task.
//!
//! Answers "what is directly connected to this task by split/merge
//! relations?" from the task's own history events alone, without building
//! the full graph. Used by the direct graph mode and by detail views.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::{HistoryEvent, HistoryType, Task};

/// Immediate split/merge neighborhood of one task.
///
/// A task can have any number of parents, children and merge sources, but is
/// merged into at most one target.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectRelations {
    /// Tasks this task was split out of.
    pub parents: Vec<Task>,
    /// Tasks this task was split into.
    pub children: Vec<Task>,
    /// Tasks that were merged into this task.
    pub merged_from: Vec<Task>,
    /// The task this task was merged into, if any.
    pub merged_into: Option<Task>,
}

impl DirectRelations {
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
            && self.children.is_empty()
            && self.merged_from.is_empty()
            && self.merged_into.is_none()
    }
}

/// Resolve the direct relations of `task_id`.
///
/// Only events whose `task_id` matches the focal id are considered; the same
/// field-presence rules as edge extraction classify each event into exactly
/// one bucket. Referenced ids that don't resolve in `tasks` are dropped
/// silently. Events are expected in the store's `(timestamp, id)` order,
/// which makes the output order deterministic.
pub fn resolve_direct_relations(
    task_id: &str,
    history: &[HistoryEvent],
    tasks: &HashMap<String, Task>,
) -> DirectRelations {
    let mut relations = DirectRelations::default();
    let mut seen_parents = HashSet::new();
    let mut seen_children = HashSet::new();
    let mut seen_sources = HashSet::new();

    for event in history.iter().filter(|event| event.task_id == task_id) {
        match event.event_type {
            HistoryType::SplitFrom => {
                if let Some(parent_id) = event.details.source_id.as_deref() {
                    if seen_parents.insert(parent_id.to_string()) {
                        if let Some(parent) = tasks.get(parent_id) {
                            relations.parents.push(parent.clone());
                        }
                    }
                }
            }
            HistoryType::StatusChange => {
                if let Some(child_ids) = &event.details.split_into {
                    for child_id in child_ids {
                        if seen_children.insert(child_id.clone()) {
                            if let Some(child) = tasks.get(child_id) {
                                relations.children.push(child.clone());
                            }
                        }
                    }
                }
            }
            HistoryType::MergedInto => {
                if let Some(source_ids) = &event.details.merged_from {
                    for source_id in source_ids {
                        if seen_sources.insert(source_id.clone()) {
                            if let Some(source) = tasks.get(source_id) {
                                relations.merged_from.push(source.clone());
                            }
                        }
                    }
                } else if let Some(target_id) = event.details.target_id.as_deref() {
                    if relations.merged_into.is_none() {
                        relations.merged_into = tasks.get(target_id).cloned();
                    }
                }
            }
            HistoryType::Created | HistoryType::Updated => {}
        }
    }

    relations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventDetails, TaskPriority, TaskStatus};
    use chrono::Utc;

    fn task(id: &str) -> Task {
        let now = Utc::now();
        Task {
            id: id.to_string(),
            title: id.to_uppercase(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            tags: Vec::new(),
            due_date: None,
            checklist: Vec::new(),
            relations: Vec::new(),
            time_logs: Vec::new(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    fn task_map(ids: &[&str]) -> HashMap<String, Task> {
        ids.iter().map(|id| (id.to_string(), task(id))).collect()
    }

    fn event(event_type: HistoryType, task_id: &str, details: EventDetails) -> HistoryEvent {
        HistoryEvent::new(event_type, task_id).with_details(details)
    }

    #[test]
    fn no_relations_yields_four_empty_buckets() {
        let tasks = task_map(&["a"]);
        let history = vec![event(
            HistoryType::Created,
            "a",
            EventDetails {
                title: Some("A".to_string()),
                ..EventDetails::default()
            },
        )];

        let relations = resolve_direct_relations("a", &history, &tasks);
        assert!(relations.is_empty());
    }

    #[test]
    fn split_scenario_links_parent_and_children() {
        let tasks = task_map(&["a", "b", "c"]);
        let history = vec![
            event(
                HistoryType::StatusChange,
                "a",
                EventDetails {
                    split_into: Some(vec!["b".to_string(), "c".to_string()]),
                    ..EventDetails::default()
                },
            ),
            event(
                HistoryType::SplitFrom,
                "b",
                EventDetails {
                    source_id: Some("a".to_string()),
                    ..EventDetails::default()
                },
            ),
            event(
                HistoryType::SplitFrom,
                "c",
                EventDetails {
                    source_id: Some("a".to_string()),
                    ..EventDetails::default()
                },
            ),
        ];

        let of_a = resolve_direct_relations("a", &history, &tasks);
        let child_ids: Vec<&str> = of_a.children.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(child_ids, vec!["b", "c"]);
        assert!(of_a.parents.is_empty());

        let of_b = resolve_direct_relations("b", &history, &tasks);
        let parent_ids: Vec<&str> = of_b.parents.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(parent_ids, vec!["a"]);
        assert!(of_b.children.is_empty());
    }

    #[test]
    fn merge_scenario_links_sources_and_target() {
        let tasks = task_map(&["x", "y", "z"]);
        let history = vec![
            event(
                HistoryType::MergedInto,
                "z",
                EventDetails {
                    merged_from: Some(vec!["x".to_string(), "y".to_string()]),
                    ..EventDetails::default()
                },
            ),
            event(
                HistoryType::MergedInto,
                "x",
                EventDetails {
                    target_id: Some("z".to_string()),
                    ..EventDetails::default()
                },
            ),
            event(
                HistoryType::MergedInto,
                "y",
                EventDetails {
                    target_id: Some("z".to_string()),
                    ..EventDetails::default()
                },
            ),
        ];

        let of_z = resolve_direct_relations("z", &history, &tasks);
        let source_ids: Vec<&str> = of_z.merged_from.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(source_ids, vec!["x", "y"]);
        assert!(of_z.merged_into.is_none());

        let of_x = resolve_direct_relations("x", &history, &tasks);
        assert_eq!(of_x.merged_into.as_ref().map(|t| t.id.as_str()), Some("z"));
        assert!(of_x.merged_from.is_empty());
    }

    #[test]
    fn missing_references_are_dropped_silently() {
        let tasks = task_map(&["b"]);
        let history = vec![event(
            HistoryType::SplitFrom,
            "b",
            EventDetails {
                source_id: Some("gone".to_string()),
                ..EventDetails::default()
            },
        )];

        let relations = resolve_direct_relations("b", &history, &tasks);
        assert!(relations.parents.is_empty());
    }

    #[test]
    fn only_the_focal_tasks_events_are_scanned() {
        let tasks = task_map(&["a", "b", "c"]);
        // Event on another task's stream must not leak into a's relations.
        let history = vec![event(
            HistoryType::StatusChange,
            "b",
            EventDetails {
                split_into: Some(vec!["c".to_string()]),
                ..EventDetails::default()
            },
        )];

        let relations = resolve_direct_relations("a", &history, &tasks);
        assert!(relations.is_empty());
    }

    #[test]
    fn first_merge_target_wins_and_duplicates_collapse() {
        let tasks = task_map(&["x", "z1", "z2"]);
        let history = vec![
            event(
                HistoryType::MergedInto,
                "x",
                EventDetails {
                    target_id: Some("z1".to_string()),
                    ..EventDetails::default()
                },
            ),
            event(
                HistoryType::MergedInto,
                "x",
                EventDetails {
                    target_id: Some("z2".to_string()),
                    ..EventDetails::default()
                },
            ),
        ];

        let relations = resolve_direct_relations("x", &history, &tasks);
        assert_eq!(relations.merged_into.as_ref().map(|t| t.id.as_str()), Some("z1"));
    }
}
