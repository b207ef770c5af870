use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;
use trak::task::Task;

pub struct TestRoot {
    dir: TempDir,
}

impl TestRoot {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(Self { dir })
    }

    /// Create a root and run `trak init` in it
    pub fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let root = Self::new()?;
        trak_cmd()
            .current_dir(root.path())
            .arg("init")
            .assert()
            .success();
        Ok(root)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file(".trak.toml", contents)
    }

    pub fn trak_dir(&self) -> PathBuf {
        self.dir.path().join(".trak")
    }

    pub fn active_path(&self) -> PathBuf {
        self.trak_dir().join("tasks.jsonl")
    }

    pub fn archive_path(&self) -> PathBuf {
        self.trak_dir().join("complete.jsonl")
    }

    pub fn read_tasks(&self, path: &Path) -> Result<Vec<Task>, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(path)?;
        let mut tasks = Vec::new();
        for line in contents.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let task: Task = serde_json::from_str(trimmed)?;
            tasks.push(task);
        }
        Ok(tasks)
    }

    pub fn active_tasks(&self) -> Result<Vec<Task>, Box<dyn std::error::Error>> {
        self.read_tasks(&self.active_path())
    }

    pub fn archived_tasks(&self) -> Result<Vec<Task>, Box<dyn std::error::Error>> {
        self.read_tasks(&self.archive_path())
    }
}

pub fn trak_cmd() -> Command {
    Command::cargo_bin("trak").expect("binary")
}
