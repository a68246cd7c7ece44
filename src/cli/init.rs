//! chronicle init command implementation
//!
//! Creates the data directory, an empty task table, and a default config
//! file in the working directory when none exists.

use std::path::PathBuf;

use crate::config::{Config, CONFIG_FILE};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};

pub struct InitOptions {
    pub data_dir: Option<PathBuf>,
    pub output: OutputOptions,
}

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    data_dir: bool,
    config: bool,
}

pub fn run(options: InitOptions) -> Result<()> {
    let context = super::open_context(options.data_dir)?;

    let created_data_dir = context.store.init()?;

    let cwd = std::env::current_dir()?;
    let config_path = cwd.join(CONFIG_FILE);
    let created_config = if config_path.exists() {
        false
    } else {
        Config::default().save(&config_path)?;
        true
    };

    let report = InitReport {
        data_dir: context.store.storage().data_dir().to_path_buf(),
        created: InitCreated {
            data_dir: created_data_dir,
            config: created_config,
        },
    };

    let header = if created_data_dir || created_config {
        "chronicle init: initialized"
    } else {
        "chronicle init: nothing to do"
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("data dir", report.data_dir.display().to_string());
    let mut created_items = Vec::new();
    if created_data_dir {
        created_items.push(report.data_dir.display().to_string());
    }
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("chronicle task new \"My first task\"");

    emit_success(options.output, "init", &report, Some(&human))
}
