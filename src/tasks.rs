//! Task store: queries and operations over the task table and history log.
//!
//! The task table (`tasks.json`) is the authoritative mutable record of
//! tasks; the history log (`history.jsonl`) is append-only and is the sole
//! source of truth for split/merge lineage. Operations that change structure
//! record the relation from both participants' perspectives: a split writes
//! one event on the parent's stream and one per child, a merge writes one on
//! the result's stream and one per source. Rows are soft-deleted, never
//! removed, so history references always resolve.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TasksConfig;
use crate::error::{Error, Result};
use crate::graph::{build_lineage_graph, GraphLayout, GraphMode, LineageGraph, TimeFilter};
use crate::lineage::{resolve_direct_relations, DirectRelations};
use crate::lock::{FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::model::{
    ChecklistItem, EventDetails, HistoryEvent, HistoryType, RelationKind, Task, TaskPriority,
    TaskRelation, TaskStatus,
};
use crate::store::Storage;

const TASKS_SCHEMA_VERSION: &str = "chronicle.tasks.v1";

/// The persisted task table document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTable {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub tasks: Vec<Task>,
}

impl TaskTable {
    pub fn empty() -> Self {
        Self {
            schema_version: TASKS_SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            tasks: Vec::new(),
        }
    }
}

/// Filter for `list_tasks`
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    /// Include soft-deleted rows (hidden by default)
    pub include_deleted: bool,
    /// Creation-date window
    pub created: TimeFilter,
}

/// Input for `create_task`
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Field updates for `edit_task`; absent fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    storage: Storage,
    config: TasksConfig,
}

impl TaskStore {
    pub fn new(storage: Storage, config: TasksConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn config(&self) -> &TasksConfig {
        &self.config
    }

    /// Create the data directory and an empty task table when missing.
    /// Returns true when anything was created.
    pub fn init(&self) -> Result<bool> {
        let already = self.storage.is_initialized() && self.storage.tasks_file().exists();
        self.storage.init()?;
        if !self.storage.tasks_file().exists() {
            self.write_table(&TaskTable::empty())?;
        }
        Ok(!already)
    }

    // =========================================================================
    // Query API
    // =========================================================================

    /// Fetch one task, soft-deleted rows included
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let table = self.load_table()?;
        Ok(table.tasks.into_iter().find(|task| task.id == id))
    }

    /// List tasks in table (creation) order
    pub fn list_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let table = self.load_table()?;
        Ok(table
            .tasks
            .into_iter()
            .filter(|task| query.include_deleted || !task.is_deleted)
            .filter(|task| query.status.map_or(true, |status| task.status == status))
            .filter(|task| query.created.contains(task.created_at))
            .collect())
    }

    /// All history events about one task, in `(timestamp, id)` order
    pub fn list_history_for_task(&self, task_id: &str) -> Result<Vec<HistoryEvent>> {
        let mut events = self.load_history()?;
        events.retain(|event| event.task_id == task_id);
        Ok(events)
    }

    /// All history events of the given types, in `(timestamp, id)` order
    pub fn list_history_by_types(&self, types: &[HistoryType]) -> Result<Vec<HistoryEvent>> {
        let mut events = self.load_history()?;
        events.retain(|event| types.contains(&event.event_type));
        Ok(events)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub fn create_task(&self, input: NewTask) -> Result<Task> {
        let title = non_empty_title(&input.title)?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: title.clone(),
            description: input.description.unwrap_or_default(),
            status: self.config.default_status,
            priority: input.priority.unwrap_or(self.config.default_priority),
            tags: input.tags,
            due_date: input.due_date,
            checklist: Vec::new(),
            relations: Vec::new(),
            time_logs: Vec::new(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };

        let mut table = self.load_table()?;
        table.tasks.push(task.clone());
        self.write_table(&table)?;

        self.append_event(
            HistoryEvent::new(HistoryType::Created, task.id.as_str()).with_details(EventDetails {
                title: Some(title),
                ..EventDetails::default()
            }),
        )?;

        tracing::debug!(task_id = %task.id, "created task");
        Ok(task)
    }

    pub fn update_status(&self, id: &str, status: TaskStatus) -> Result<Task> {
        let task = self.mutate_task(id, |task, now| {
            task.status = status;
            task.updated_at = now;
        })?;

        self.append_event(
            HistoryEvent::new(HistoryType::StatusChange, id).with_details(EventDetails {
                status: Some(status),
                ..EventDetails::default()
            }),
        )?;

        Ok(task)
    }

    pub fn edit_task(&self, id: &str, edit: TaskEdit) -> Result<Task> {
        if let Some(title) = &edit.title {
            non_empty_title(title)?;
        }
        let new_title = edit.title.clone();
        let task = self.mutate_task(id, move |task, now| {
            if let Some(title) = edit.title {
                task.title = title.trim().to_string();
            }
            if let Some(description) = edit.description {
                task.description = description;
            }
            if let Some(priority) = edit.priority {
                task.priority = priority;
            }
            if let Some(tags) = edit.tags {
                task.tags = tags;
            }
            if let Some(due_date) = edit.due_date {
                task.due_date = Some(due_date);
            }
            task.updated_at = now;
        })?;

        self.append_event(
            HistoryEvent::new(HistoryType::Updated, id).with_details(EventDetails {
                title: new_title,
                ..EventDetails::default()
            }),
        )?;

        Ok(task)
    }

    /// Soft delete: the row is flagged, never removed, so lineage references
    /// keep resolving. Writes no history (matching task restore below).
    pub fn soft_delete(&self, id: &str) -> Result<Task> {
        self.mutate_task(id, |task, now| {
            task.is_deleted = true;
            task.updated_at = now;
        })
    }

    pub fn restore(&self, id: &str) -> Result<Task> {
        self.mutate_task(id, |task, now| {
            task.is_deleted = false;
            task.updated_at = now;
        })
    }

    pub fn add_checklist_item(&self, task_id: &str, text: &str) -> Result<Task> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidArgument(
                "checklist item text cannot be empty".to_string(),
            ));
        }
        let item = ChecklistItem {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            completed: false,
        };
        self.mutate_task(task_id, move |task, now| {
            task.checklist.push(item);
            task.updated_at = now;
        })
    }

    pub fn toggle_checklist_item(&self, task_id: &str, item_id: &str) -> Result<Task> {
        self.mutate_task_checked(task_id, |task, now| {
            let item = task
                .checklist
                .iter_mut()
                .find(|item| item.id == item_id)
                .ok_or_else(|| {
                    Error::InvalidArgument(format!("checklist item not found: {item_id}"))
                })?;
            item.completed = !item.completed;
            task.updated_at = now;
            Ok(())
        })
    }

    pub fn remove_checklist_item(&self, task_id: &str, item_id: &str) -> Result<Task> {
        self.mutate_task_checked(task_id, |task, now| {
            let before = task.checklist.len();
            task.checklist.retain(|item| item.id != item_id);
            if task.checklist.len() == before {
                return Err(Error::InvalidArgument(format!(
                    "checklist item not found: {item_id}"
                )));
            }
            task.updated_at = now;
            Ok(())
        })
    }

    /// Split a task into new sub-tasks.
    ///
    /// Children inherit priority and tags, carry an informational `parent`
    /// relation, and start at the default status; the parent is closed as
    /// `done`. The relation is recorded twice: `split_into` on the parent's
    /// stream and `source_id` on each child's.
    pub fn split_task(&self, parent_id: &str, titles: &[String]) -> Result<Vec<Task>> {
        let titles: Vec<String> = titles
            .iter()
            .map(|title| non_empty_title(title))
            .collect::<Result<_>>()?;
        if titles.is_empty() {
            return Err(Error::InvalidArgument(
                "split requires at least one sub-task title".to_string(),
            ));
        }

        let mut table = self.load_table()?;
        let parent_index = find_task(&table, parent_id)?;
        let parent_title = table.tasks[parent_index].title.clone();
        let parent_priority = table.tasks[parent_index].priority;
        let parent_tags = table.tasks[parent_index].tags.clone();

        let now = Utc::now();
        let children: Vec<Task> = titles
            .iter()
            .map(|title| Task {
                id: Uuid::new_v4().to_string(),
                title: title.clone(),
                description: format!("Split from: {parent_title}"),
                status: self.config.default_status,
                priority: parent_priority,
                tags: parent_tags.clone(),
                due_date: None,
                checklist: Vec::new(),
                relations: vec![TaskRelation {
                    target_id: parent_id.to_string(),
                    kind: RelationKind::Parent,
                }],
                time_logs: Vec::new(),
                created_at: now,
                updated_at: now,
                is_deleted: false,
            })
            .collect();

        table.tasks.extend(children.iter().cloned());
        table.tasks[parent_index].status = TaskStatus::Done;
        table.tasks[parent_index].updated_at = now;
        self.write_table(&table)?;

        let child_ids: Vec<String> = children.iter().map(|child| child.id.clone()).collect();
        self.append_event(
            HistoryEvent::new(HistoryType::StatusChange, parent_id).with_details(EventDetails {
                split_into: Some(child_ids),
                ..EventDetails::default()
            }),
        )?;
        for child in &children {
            self.append_event(
                HistoryEvent::new(HistoryType::SplitFrom, child.id.as_str()).with_details(
                    EventDetails {
                        source_id: Some(parent_id.to_string()),
                        ..EventDetails::default()
                    },
                ),
            )?;
        }

        tracing::debug!(parent_id, children = children.len(), "split task");
        Ok(children)
    }

    /// Merge tasks into a new consolidated task.
    ///
    /// The result starts at the default status with the union of the source
    /// tags; sources are closed as `done`. Recorded twice: `merged_from` on
    /// the result's stream and `target_id` on each source's.
    pub fn merge_tasks(&self, source_ids: &[String], title: &str) -> Result<Task> {
        let title = non_empty_title(title)?;
        if source_ids.len() < 2 {
            return Err(Error::InvalidArgument(
                "merge requires at least two source tasks".to_string(),
            ));
        }
        let mut unique = HashSet::new();
        for id in source_ids {
            if !unique.insert(id.as_str()) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate merge source: {id}"
                )));
            }
        }

        let mut table = self.load_table()?;
        let mut source_indexes = Vec::with_capacity(source_ids.len());
        for id in source_ids {
            source_indexes.push(find_task(&table, id)?);
        }

        let mut tags = Vec::new();
        let mut seen_tags = HashSet::new();
        let mut source_titles = Vec::with_capacity(source_indexes.len());
        for &index in &source_indexes {
            source_titles.push(table.tasks[index].title.clone());
            for tag in &table.tasks[index].tags {
                if seen_tags.insert(tag.clone()) {
                    tags.push(tag.clone());
                }
            }
        }

        let now = Utc::now();
        let merged = Task {
            id: Uuid::new_v4().to_string(),
            title,
            description: format!("Merged from: {}", source_titles.join(", ")),
            status: self.config.default_status,
            priority: self.config.default_priority,
            tags,
            due_date: None,
            checklist: Vec::new(),
            relations: Vec::new(),
            time_logs: Vec::new(),
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };

        table.tasks.push(merged.clone());
        for &index in &source_indexes {
            table.tasks[index].status = TaskStatus::Done;
            table.tasks[index].updated_at = now;
        }
        self.write_table(&table)?;

        self.append_event(
            HistoryEvent::new(HistoryType::MergedInto, merged.id.as_str()).with_details(
                EventDetails {
                    merged_from: Some(source_ids.to_vec()),
                    ..EventDetails::default()
                },
            ),
        )?;
        for source_id in source_ids {
            self.append_event(
                HistoryEvent::new(HistoryType::MergedInto, source_id.as_str()).with_details(
                    EventDetails {
                        target_id: Some(merged.id.clone()),
                        ..EventDetails::default()
                    },
                ),
            )?;
        }

        tracing::debug!(merged_id = %merged.id, sources = source_ids.len(), "merged tasks");
        Ok(merged)
    }

    // =========================================================================
    // Lineage (snapshot wrappers over the pure engine)
    // =========================================================================

    /// Direct split/merge relations of one task. An unknown id yields four
    /// empty buckets, not an error; callers that need to distinguish call
    /// `get_task` themselves.
    pub fn relations(&self, task_id: &str) -> Result<DirectRelations> {
        let table = self.load_table()?;
        let map: HashMap<String, Task> = table
            .tasks
            .into_iter()
            .map(|task| (task.id.clone(), task))
            .collect();
        let history = self.list_history_for_task(task_id)?;
        Ok(resolve_direct_relations(task_id, &history, &map))
    }

    /// Build the lineage graph from a point-in-time snapshot of the store
    pub fn lineage_graph(
        &self,
        mode: GraphMode,
        focal_task_id: Option<&str>,
        time_filter: Option<&TimeFilter>,
        layout: &GraphLayout,
    ) -> Result<LineageGraph> {
        let tasks = self.list_tasks(&TaskQuery::default())?;
        let history = self.list_history_by_types(&[
            HistoryType::SplitFrom,
            HistoryType::StatusChange,
            HistoryType::MergedInto,
        ])?;
        Ok(build_lineage_graph(
            &tasks,
            &history,
            mode,
            focal_task_id,
            time_filter,
            layout,
        ))
    }

    // =========================================================================
    // Persistence internals
    // =========================================================================

    fn load_table(&self) -> Result<TaskTable> {
        if !self.storage.is_initialized() {
            return Err(Error::NotInitialized(self.storage.data_dir().to_path_buf()));
        }
        let path = self.storage.tasks_file();
        if !path.exists() {
            return Ok(TaskTable::empty());
        }
        self.storage.read_json(&path)
    }

    fn write_table(&self, table: &TaskTable) -> Result<()> {
        let path = self.storage.tasks_file();
        let lock_path = path.with_extension("lock");
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;
        let mut table = table.clone();
        table.generated_at = Utc::now();
        self.storage.write_json(&path, &table)
    }

    fn load_history(&self) -> Result<Vec<HistoryEvent>> {
        if !self.storage.is_initialized() {
            return Err(Error::NotInitialized(self.storage.data_dir().to_path_buf()));
        }
        let mut events: Vec<HistoryEvent> =
            self.storage.read_jsonl(&self.storage.history_file())?;
        sort_events(&mut events);
        Ok(events)
    }

    fn append_event(&self, event: HistoryEvent) -> Result<()> {
        let path = self.storage.history_file();
        let lock_path = path.with_extension("lock");
        let _lock = FileLock::acquire(&lock_path, DEFAULT_LOCK_TIMEOUT_MS)?;
        self.storage.append_jsonl(&path, &event)
    }

    fn mutate_task(&self, id: &str, apply: impl FnOnce(&mut Task, DateTime<Utc>)) -> Result<Task> {
        self.mutate_task_checked(id, |task, now| {
            apply(task, now);
            Ok(())
        })
    }

    fn mutate_task_checked(
        &self,
        id: &str,
        apply: impl FnOnce(&mut Task, DateTime<Utc>) -> Result<()>,
    ) -> Result<Task> {
        let mut table = self.load_table()?;
        let index = find_task(&table, id)?;
        apply(&mut table.tasks[index], Utc::now())?;
        let task = table.tasks[index].clone();
        self.write_table(&table)?;
        Ok(task)
    }
}

fn find_task(table: &TaskTable, id: &str) -> Result<usize> {
    table
        .tasks
        .iter()
        .position(|task| task.id == id)
        .ok_or_else(|| Error::TaskNotFound(id.to_string()))
}

fn non_empty_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("title cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn sort_events(events: &mut [HistoryEvent]) {
    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.id.cmp(&b.id))
    });
}
