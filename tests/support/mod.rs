#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A temp working directory with its own chronicle data dir.
pub struct TestSpace {
    dir: TempDir,
}

impl TestSpace {
    /// Create a workspace and run `chronicle init` in it.
    pub fn init() -> Self {
        let space = Self::bare();
        space.cmd().arg("init").assert().success();
        space
    }

    /// Create a workspace without initializing chronicle.
    pub fn bare() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("chronicle").expect("chronicle binary");
        cmd.current_dir(self.dir.path());
        cmd.env_remove("CHRONICLE_DIR");
        cmd
    }

    /// Run a command with `--json` and parse the envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    /// Create a task and return its id.
    pub fn new_task(&self, title: &str) -> String {
        let value = self.json(&["task", "new", title]);
        value["data"]["id"]
            .as_str()
            .expect("task id")
            .to_string()
    }
}
