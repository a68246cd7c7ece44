//! chronicle task command implementations.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{Error, Result};
use crate::lineage::DirectRelations;
use crate::model::{HistoryEvent, HistoryType, Task, TaskPriority, TaskStatus};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::tasks::{NewTask, TaskEdit, TaskQuery};

pub struct NewOptions {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub due: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub deleted: bool,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct ShowOptions {
    pub id: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct StatusOptions {
    pub id: String,
    pub status: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub due: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct RmOptions {
    pub id: String,
    pub restore: bool,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub enum CheckAction {
    Add { text: String },
    Toggle { item: String },
    Remove { item: String },
}

pub struct CheckOptions {
    pub id: String,
    pub action: CheckAction,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct SplitOptions {
    pub id: String,
    pub titles: Vec<String>,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct MergeOptions {
    pub ids: Vec<String>,
    pub title: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct HistoryOptions {
    pub id: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub struct RelationsOptions {
    pub id: String,
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let priority = options
        .priority
        .as_deref()
        .map(str::parse::<TaskPriority>)
        .transpose()?;
    let due_date = options.due.as_deref().map(parse_due_date).transpose()?;

    let task = context.store.create_task(NewTask {
        title: options.title,
        description: options.description,
        priority,
        tags: options.tags,
        due_date,
    })?;

    let mut human = HumanOutput::new("chronicle task new: created task");
    human.push_summary("id", task.id.clone());
    human.push_summary("title", task.title.clone());
    human.push_summary("status", task.status.as_str());
    human.push_summary("priority", task.priority.as_str());
    human.push_next_step(format!("chronicle task show {}", task.id));

    emit_success(options.output, "task new", &task, Some(&human))
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let status = options
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()?;
    let tasks = context.store.list_tasks(&TaskQuery {
        status,
        include_deleted: options.deleted,
        ..TaskQuery::default()
    })?;

    let mut human = HumanOutput::new(format!("chronicle task list: {} task(s)", tasks.len()));
    for task in &tasks {
        human.push_detail(format!(
            "{} [{}/{}] {}{}",
            task.id,
            task.status.as_str(),
            task.priority.as_str(),
            task.title,
            if task.is_deleted { " (deleted)" } else { "" }
        ));
    }

    emit_success(options.output, "task list", &tasks, Some(&human))
}

#[derive(serde::Serialize)]
struct ShowReport {
    task: Task,
    events: usize,
    relations: DirectRelations,
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let task = context
        .store
        .get_task(&options.id)?
        .ok_or_else(|| Error::TaskNotFound(options.id.clone()))?;
    let events = context.store.list_history_for_task(&options.id)?.len();
    let relations = context.store.relations(&options.id)?;

    let mut human = HumanOutput::new(format!("chronicle task show: {}", task.title));
    human.push_summary("id", task.id.clone());
    human.push_summary("status", task.status.as_str());
    human.push_summary("priority", task.priority.as_str());
    if !task.tags.is_empty() {
        human.push_summary("tags", task.tags.join(", "));
    }
    if !task.description.is_empty() {
        human.push_summary("description", task.description.clone());
    }
    human.push_summary("events", events.to_string());
    for item in &task.checklist {
        let mark = if item.completed { "x" } else { " " };
        human.push_detail(format!("[{mark}] {} ({})", item.text, item.id));
    }
    push_relation_details(&mut human, &relations);

    let report = ShowReport {
        task,
        events,
        relations,
    };
    emit_success(options.output, "task show", &report, Some(&human))
}

pub fn run_status(options: StatusOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let status: TaskStatus = options.status.parse()?;
    let task = context.store.update_status(&options.id, status)?;

    let mut human = HumanOutput::new("chronicle task status: updated");
    human.push_summary("id", task.id.clone());
    human.push_summary("status", task.status.as_str());

    emit_success(options.output, "task status", &task, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let priority = options
        .priority
        .as_deref()
        .map(str::parse::<TaskPriority>)
        .transpose()?;
    let due_date = options.due.as_deref().map(parse_due_date).transpose()?;
    let tags = if options.tags.is_empty() {
        None
    } else {
        Some(options.tags)
    };

    let task = context.store.edit_task(
        &options.id,
        TaskEdit {
            title: options.title,
            description: options.description,
            priority,
            tags,
            due_date,
        },
    )?;

    let mut human = HumanOutput::new("chronicle task edit: updated");
    human.push_summary("id", task.id.clone());
    human.push_summary("title", task.title.clone());

    emit_success(options.output, "task edit", &task, Some(&human))
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let (task, header, command) = if options.restore {
        (
            context.store.restore(&options.id)?,
            "chronicle task restore: restored",
            "task restore",
        )
    } else {
        (
            context.store.soft_delete(&options.id)?,
            "chronicle task rm: deleted (row kept for lineage)",
            "task rm",
        )
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("id", task.id.clone());
    human.push_summary("title", task.title.clone());

    emit_success(options.output, command, &task, Some(&human))
}

pub fn run_check(options: CheckOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let (task, header) = match options.action {
        CheckAction::Add { text } => (
            context.store.add_checklist_item(&options.id, &text)?,
            "chronicle task check: added item",
        ),
        CheckAction::Toggle { item } => (
            context.store.toggle_checklist_item(&options.id, &item)?,
            "chronicle task check: toggled item",
        ),
        CheckAction::Remove { item } => (
            context.store.remove_checklist_item(&options.id, &item)?,
            "chronicle task check: removed item",
        ),
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("id", task.id.clone());
    let done = task.checklist.iter().filter(|item| item.completed).count();
    human.push_summary("checklist", format!("{}/{}", done, task.checklist.len()));
    for item in &task.checklist {
        let mark = if item.completed { "x" } else { " " };
        human.push_detail(format!("[{mark}] {} ({})", item.text, item.id));
    }

    emit_success(options.output, "task check", &task, Some(&human))
}

#[derive(serde::Serialize)]
struct SplitReport {
    parent: Task,
    children: Vec<Task>,
}

pub fn run_split(options: SplitOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let children = context.store.split_task(&options.id, &options.titles)?;
    let parent = context
        .store
        .get_task(&options.id)?
        .ok_or_else(|| Error::TaskNotFound(options.id.clone()))?;

    let mut human = HumanOutput::new(format!(
        "chronicle task split: {} sub-task(s) created",
        children.len()
    ));
    human.push_summary("parent", parent.id.clone());
    for child in &children {
        human.push_detail(format!("{} {}", child.id, child.title));
    }
    human.push_next_step(format!("chronicle graph --mode direct --task {}", parent.id));

    let report = SplitReport { parent, children };
    emit_success(options.output, "task split", &report, Some(&human))
}

#[derive(serde::Serialize)]
struct MergeReport {
    merged: Task,
    sources: Vec<String>,
}

pub fn run_merge(options: MergeOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let merged = context.store.merge_tasks(&options.ids, &options.title)?;

    let mut human = HumanOutput::new("chronicle task merge: merged");
    human.push_summary("id", merged.id.clone());
    human.push_summary("title", merged.title.clone());
    human.push_summary("sources", options.ids.join(", "));
    human.push_next_step(format!("chronicle graph --mode direct --task {}", merged.id));

    let report = MergeReport {
        merged,
        sources: options.ids,
    };
    emit_success(options.output, "task merge", &report, Some(&human))
}

pub fn run_history(options: HistoryOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    if context.store.get_task(&options.id)?.is_none() {
        return Err(Error::TaskNotFound(options.id));
    }
    let events = context.store.list_history_for_task(&options.id)?;

    let mut human = HumanOutput::new(format!(
        "chronicle task history: {} event(s)",
        events.len()
    ));
    for event in &events {
        human.push_detail(format!(
            "{} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            describe_event(event)
        ));
    }

    emit_success(options.output, "task history", &events, Some(&human))
}

pub fn run_relations(options: RelationsOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    if context.store.get_task(&options.id)?.is_none() {
        return Err(Error::TaskNotFound(options.id));
    }
    let relations = context.store.relations(&options.id)?;

    let mut human = HumanOutput::new("chronicle task relations");
    human.push_summary("id", options.id.clone());
    if relations.is_empty() {
        human.push_summary("relations", "none");
    }
    push_relation_details(&mut human, &relations);

    emit_success(options.output, "task relations", &relations, Some(&human))
}

fn push_relation_details(human: &mut HumanOutput, relations: &DirectRelations) {
    for parent in &relations.parents {
        human.push_detail(format!("split from: {} {}", parent.id, parent.title));
    }
    for child in &relations.children {
        human.push_detail(format!("split into: {} {}", child.id, child.title));
    }
    for source in &relations.merged_from {
        human.push_detail(format!("merged from: {} {}", source.id, source.title));
    }
    if let Some(target) = &relations.merged_into {
        human.push_detail(format!("merged into: {} {}", target.id, target.title));
    }
}

fn describe_event(event: &HistoryEvent) -> String {
    match event.event_type {
        HistoryType::Created => match &event.details.title {
            Some(title) => format!("created '{title}'"),
            None => "created".to_string(),
        },
        HistoryType::Updated => "updated".to_string(),
        HistoryType::StatusChange => {
            if let Some(children) = &event.details.split_into {
                format!("split into {} sub-task(s)", children.len())
            } else if let Some(status) = event.details.status {
                format!("status -> {}", status.as_str())
            } else {
                "status change".to_string()
            }
        }
        HistoryType::SplitFrom => match &event.details.source_id {
            Some(source) => format!("split from {source}"),
            None => "split from".to_string(),
        },
        HistoryType::MergedInto => {
            if let Some(sources) = &event.details.merged_from {
                format!("merged from {} task(s)", sources.len())
            } else if let Some(target) = &event.details.target_id {
                format!("merged into {target}")
            } else {
                "merged".to_string()
            }
        }
    }
}

pub(crate) fn parse_due_date(raw: &str) -> Result<DateTime<Utc>> {
    let date = parse_date(raw)?;
    Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        Error::InvalidArgument(format!("invalid date '{raw}' (expected YYYY-MM-DD)"))
    })
}
