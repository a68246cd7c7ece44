//! Command-line interface for chronicle
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::store::Storage;
use crate::tasks::TaskStore;

mod graph;
mod init;
mod task;

/// chronicle - personal task tracker with split/merge lineage
///
/// Tasks can be split into sub-tasks or merged into a consolidated task;
/// every structural change is recorded as an immutable history event, and
/// the lineage graph is rebuilt from that log on demand.
#[derive(Parser, Debug)]
#[command(name = "chronicle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the data directory (defaults to .chronicle in the current directory)
    #[arg(long, global = true, env = "CHRONICLE_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the data directory and config
    Init,

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Render the split/merge lineage graph
    Graph {
        /// Traversal mode: direct, recursive, or all
        #[arg(long, default_value = "direct")]
        mode: String,

        /// Focal task id (required for direct and recursive modes)
        #[arg(long)]
        task: Option<String>,

        /// Only include tasks created on or after this date (YYYY-MM-DD, all mode)
        #[arg(long)]
        from: Option<String>,

        /// Only include tasks created up to the end of this date (YYYY-MM-DD, all mode)
        #[arg(long)]
        until: Option<String>,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task
    New {
        /// Task title
        title: String,

        /// Task description
        #[arg(long)]
        description: Option<String>,

        /// Priority: low, medium, high
        #[arg(long)]
        priority: Option<String>,

        /// Tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// List tasks
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Include soft-deleted tasks
        #[arg(long)]
        deleted: bool,
    },

    /// Show one task with its history and relations
    Show {
        /// Task id
        id: String,
    },

    /// Change a task's status
    Status {
        /// Task id
        id: String,

        /// New status: todo, inprogress, hold, done, archived
        status: String,
    },

    /// Edit task fields in place
    Edit {
        /// Task id
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New priority
        #[arg(long)]
        priority: Option<String>,

        /// Replace tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// New due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// Soft-delete a task (the row is kept for lineage)
    Rm {
        /// Task id
        id: String,
    },

    /// Restore a soft-deleted task
    Restore {
        /// Task id
        id: String,
    },

    /// Checklist management
    #[command(subcommand)]
    Check(CheckCommands),

    /// Split a task into new sub-tasks
    Split {
        /// Parent task id
        id: String,

        /// Titles of the sub-tasks
        #[arg(required = true)]
        titles: Vec<String>,
    },

    /// Merge tasks into a new consolidated task
    Merge {
        /// Source task ids (at least two)
        #[arg(required = true, num_args = 2..)]
        ids: Vec<String>,

        /// Title of the merged task
        #[arg(long, required = true)]
        title: String,
    },

    /// Show a task's history events
    History {
        /// Task id
        id: String,
    },

    /// Show a task's direct split/merge relations
    Relations {
        /// Task id
        id: String,
    },
}

/// Checklist subcommands
#[derive(Subcommand, Debug)]
pub enum CheckCommands {
    /// Add a checklist item
    Add {
        /// Task id
        id: String,

        /// Item text
        text: String,
    },

    /// Toggle a checklist item's completion
    Toggle {
        /// Task id
        id: String,

        /// Checklist item id
        item: String,
    },

    /// Remove a checklist item
    Rm {
        /// Task id
        id: String,

        /// Checklist item id
        item: String,
    },
}

/// Resolved store + config for a command invocation
pub(crate) struct Context {
    pub store: TaskStore,
    pub config: Config,
}

/// Resolve the data directory and open the store.
///
/// Precedence: `--data-dir` / `CHRONICLE_DIR`, then `[storage].dir` from
/// `.chronicle.toml` in the working directory, then the default.
pub(crate) fn open_context(data_dir: Option<PathBuf>) -> Result<Context> {
    let cwd = std::env::current_dir()?;
    let config = Config::load_from_dir(&cwd);
    let dir = data_dir.unwrap_or_else(|| config.storage.dir.clone());
    let dir = if dir.is_absolute() { dir } else { cwd.join(dir) };
    let storage = Storage::new(dir);
    let store = TaskStore::new(storage, config.tasks.clone());
    Ok(Context { store, config })
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = crate::output::OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Init => init::run(init::InitOptions {
                data_dir: self.data_dir,
                output,
            }),
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    title,
                    description,
                    priority,
                    tags,
                    due,
                } => task::run_new(task::NewOptions {
                    title,
                    description,
                    priority,
                    tags,
                    due,
                    data_dir: self.data_dir,
                    output,
                }),
                TaskCommands::List { status, deleted } => task::run_list(task::ListOptions {
                    status,
                    deleted,
                    data_dir: self.data_dir,
                    output,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions {
                    id,
                    data_dir: self.data_dir,
                    output,
                }),
                TaskCommands::Status { id, status } => task::run_status(task::StatusOptions {
                    id,
                    status,
                    data_dir: self.data_dir,
                    output,
                }),
                TaskCommands::Edit {
                    id,
                    title,
                    description,
                    priority,
                    tags,
                    due,
                } => task::run_edit(task::EditOptions {
                    id,
                    title,
                    description,
                    priority,
                    tags,
                    due,
                    data_dir: self.data_dir,
                    output,
                }),
                TaskCommands::Rm { id } => task::run_rm(task::RmOptions {
                    id,
                    restore: false,
                    data_dir: self.data_dir,
                    output,
                }),
                TaskCommands::Restore { id } => task::run_rm(task::RmOptions {
                    id,
                    restore: true,
                    data_dir: self.data_dir,
                    output,
                }),
                TaskCommands::Check(check) => match check {
                    CheckCommands::Add { id, text } => task::run_check(task::CheckOptions {
                        id,
                        action: task::CheckAction::Add { text },
                        data_dir: self.data_dir,
                        output,
                    }),
                    CheckCommands::Toggle { id, item } => task::run_check(task::CheckOptions {
                        id,
                        action: task::CheckAction::Toggle { item },
                        data_dir: self.data_dir,
                        output,
                    }),
                    CheckCommands::Rm { id, item } => task::run_check(task::CheckOptions {
                        id,
                        action: task::CheckAction::Remove { item },
                        data_dir: self.data_dir,
                        output,
                    }),
                },
                TaskCommands::Split { id, titles } => task::run_split(task::SplitOptions {
                    id,
                    titles,
                    data_dir: self.data_dir,
                    output,
                }),
                TaskCommands::Merge { ids, title } => task::run_merge(task::MergeOptions {
                    ids,
                    title,
                    data_dir: self.data_dir,
                    output,
                }),
                TaskCommands::History { id } => task::run_history(task::HistoryOptions {
                    id,
                    data_dir: self.data_dir,
                    output,
                }),
                TaskCommands::Relations { id } => task::run_relations(task::RelationsOptions {
                    id,
                    data_dir: self.data_dir,
                    output,
                }),
            },
            Commands::Graph {
                mode,
                task,
                from,
                until,
            } => graph::run(graph::GraphOptions {
                mode,
                task,
                from,
                until,
                data_dir: self.data_dir,
                output,
            }),
        }
    }
}
