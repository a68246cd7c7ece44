//! File storage for the chronicle data directory.
//!
//! All persistent state lives under a single data directory (default
//! `.chronicle/` in the working directory):
//!
//! ```text
//! .chronicle/
//!   tasks.json      # task table, updated in place (atomic writes)
//!   history.jsonl   # append-only history event log
//!   *.lock          # lock sidecars for concurrent commands
//! ```
//!
//! Writes go through temp-file-and-rename so concurrent readers never see a
//! partial file; mutating call sites hold a `FileLock` on the sidecar.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::lock;

/// Default name of the data directory
pub const DATA_DIR: &str = ".chronicle";

const TASKS_FILE: &str = "tasks.json";
const HISTORY_FILE: &str = "history.jsonl";

/// Storage manager for the chronicle data directory
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Storage rooted at `<base>/.chronicle`
    pub fn for_dir(base: &Path) -> Self {
        Self::new(base.join(DATA_DIR))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path to the task table
    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE)
    }

    /// Path to the history event log (JSONL format)
    pub fn history_file(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    /// Create the data directory and touch the history log
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let history = self.history_file();
        if !history.exists() {
            File::create(&history)?;
        }
        Ok(())
    }

    /// Check whether the data directory exists
    pub fn is_initialized(&self) -> bool {
        self.data_dir.exists()
    }

    /// Write JSON data atomically (write to temp, then rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read JSON data from a file
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Append a record to a JSONL file
    ///
    /// Not atomic on its own; callers hold a `FileLock` on the sidecar.
    pub fn append_jsonl<T: Serialize>(&self, path: &Path, record: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string(record)?;
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;

        use std::io::Write;
        writeln!(file, "{}", json)?;
        file.sync_all()?;

        Ok(())
    }

    /// Read all records from a JSONL file
    pub fn read_jsonl<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: T = serde_json::from_str(&line)?;
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn storage_paths() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::for_dir(temp.path());

        assert_eq!(storage.data_dir(), temp.path().join(".chronicle"));
        assert_eq!(storage.tasks_file(), temp.path().join(".chronicle/tasks.json"));
        assert_eq!(
            storage.history_file(),
            temp.path().join(".chronicle/history.jsonl")
        );
    }

    #[test]
    fn init_creates_directory_and_log() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::for_dir(temp.path());

        assert!(!storage.is_initialized());
        storage.init().unwrap();
        assert!(storage.is_initialized());
        assert!(storage.history_file().exists());
    }

    #[test]
    fn json_round_trip() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::for_dir(temp.path());
        storage.init().unwrap();

        #[derive(Serialize, serde::Deserialize, PartialEq, Debug)]
        struct TestData {
            name: String,
            value: i32,
        }

        let data = TestData {
            name: "test".to_string(),
            value: 42,
        };

        let path = storage.data_dir().join("test.json");
        storage.write_json(&path, &data).unwrap();
        let read_back: TestData = storage.read_json(&path).unwrap();

        assert_eq!(data, read_back);
    }

    #[test]
    fn jsonl_append_and_read() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::for_dir(temp.path());
        storage.init().unwrap();

        #[derive(Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Record {
            id: u32,
        }

        let path = storage.data_dir().join("test.jsonl");
        for id in 1..=3 {
            storage.append_jsonl(&path, &Record { id }).unwrap();
        }

        let records: Vec<Record> = storage.read_jsonl(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[2].id, 3);
    }

    #[test]
    fn missing_jsonl_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::for_dir(temp.path());

        #[derive(serde::Deserialize)]
        struct Record {}

        let records: Vec<Record> = storage
            .read_jsonl(&storage.data_dir().join("missing.jsonl"))
            .unwrap();
        assert!(records.is_empty());
    }
}
