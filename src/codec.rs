//! Line-record codec for task files
//!
//! Stores a flat collection of task records as one JSON object per line.
//! Every mutation re-reads the file, transforms the collection in memory,
//! and atomically replaces the file, so within one process there are no
//! lost updates and a reader never observes a partial write.
//!
//! Reads are tolerant: a line that fails to parse or fails shape validation
//! is skipped with a warning, never an error. Writes are strict: records are
//! validated before any bytes reach disk.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::lock;
use crate::schema;
use crate::task::Task;

// =============================================================================
// Commit strategies
// =============================================================================

/// How serialized bytes reach the destination path
pub trait CommitStrategy {
    fn commit(&mut self, path: &Path, data: &[u8]) -> Result<()>;
}

/// Write a sibling temp file, then rename it over the destination
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicRename;

impl CommitStrategy for AtomicRename {
    fn commit(&mut self, path: &Path, data: &[u8]) -> Result<()> {
        lock::write_atomic(path, data)
    }
}

/// Write through an already-open handle: seek to start, write, truncate.
///
/// For platforms where an exclusive lock on the destination prevents
/// renaming over it. The caller keeps the handle (and its lock) open for
/// the duration of the operation.
pub struct LockedHandleWrite<'a> {
    file: &'a mut File,
}

impl<'a> LockedHandleWrite<'a> {
    pub fn new(file: &'a mut File) -> Self {
        LockedHandleWrite { file }
    }
}

impl CommitStrategy for LockedHandleWrite<'_> {
    fn commit(&mut self, _path: &Path, data: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(data)?;
        self.file.set_len(data.len() as u64)?;
        self.file.sync_all()?;
        Ok(())
    }
}

// =============================================================================
// Read reporting
// =============================================================================

/// A line that could not be loaded, with its 1-based line number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line: usize,
    pub reason: String,
}

impl std::fmt::Display for SkippedLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Result of reading a line-record file
#[derive(Debug, Default)]
pub struct ReadReport {
    /// Tasks from the valid lines, in file order
    pub tasks: Vec<Task>,
    /// Lines that were skipped
    pub skipped: Vec<SkippedLine>,
}

// =============================================================================
// Codec
// =============================================================================

/// Reads and writes one task record per line, committing through the
/// configured strategy
pub struct LineCodec<S: CommitStrategy = AtomicRename> {
    strategy: S,
}

impl LineCodec {
    pub fn new() -> Self {
        LineCodec {
            strategy: AtomicRename,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        LineCodec::new()
    }
}

impl<S: CommitStrategy> LineCodec<S> {
    /// Build a codec committing through a caller-selected strategy
    pub fn with_strategy(strategy: S) -> Self {
        LineCodec { strategy }
    }

    /// Read all records from a file
    ///
    /// Returns an empty report if the file does not exist. Blank lines are
    /// ignored. Malformed lines are skipped and reported, never fatal.
    pub fn read(&self, path: &Path) -> Result<ReadReport> {
        if !path.exists() {
            return Ok(ReadReport::default());
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut report = ReadReport::default();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let number = idx + 1;

            let value: Value = match serde_json::from_str(&line) {
                Ok(value) => value,
                Err(e) => {
                    skip(&mut report, path, number, format!("invalid JSON: {e}"));
                    continue;
                }
            };

            if let Some(violation) = schema::explain(&value) {
                skip(&mut report, path, number, Error::from(violation).to_string());
                continue;
            }

            match serde_json::from_value::<Task>(value) {
                Ok(task) => report.tasks.push(task),
                Err(e) => skip(&mut report, path, number, format!("invalid record: {e}")),
            }
        }

        Ok(report)
    }

    /// Serialize the full collection and atomically replace the file
    ///
    /// Every record is validated first; any failure aborts before the
    /// replace, leaving the previous file intact.
    pub fn write(&mut self, path: &Path, tasks: &[Task]) -> Result<()> {
        let data = encode(tasks)?;
        self.strategy.commit(path, data.as_bytes())
    }

    /// Insert a record at the end of the file
    pub fn append(&mut self, path: &Path, task: &Task) -> Result<()> {
        check_task(task)?;
        let mut tasks = self.read(path)?.tasks;
        tasks.push(task.clone());
        self.write(path, &tasks)
    }

    /// Insert a record at the start of the file
    pub fn prepend(&mut self, path: &Path, task: &Task) -> Result<()> {
        check_task(task)?;
        let mut tasks = self.read(path)?.tasks;
        tasks.insert(0, task.clone());
        self.write(path, &tasks)
    }

    /// Overwrite the record with a matching id, keeping its position
    pub fn replace(&mut self, path: &Path, task: &Task) -> Result<()> {
        check_task(task)?;
        let mut tasks = self.read(path)?.tasks;
        let pos = tasks
            .iter()
            .position(|t| t.id == task.id)
            .ok_or(Error::NotFound(task.id))?;
        tasks[pos] = task.clone();
        self.write(path, &tasks)
    }

    /// Remove the record with a matching id and return it
    pub fn delete(&mut self, path: &Path, id: u64) -> Result<Task> {
        let mut tasks = self.read(path)?.tasks;
        let pos = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::NotFound(id))?;
        let removed = tasks.remove(pos);
        self.write(path, &tasks)?;
        Ok(removed)
    }
}

fn skip(report: &mut ReadReport, path: &Path, number: usize, reason: String) {
    tracing::warn!(
        file = %path.display(),
        line = number,
        "skipping malformed line: {reason}"
    );
    report.skipped.push(SkippedLine {
        line: number,
        reason,
    });
}

fn check_task(task: &Task) -> Result<()> {
    schema::check(&serde_json::to_value(task)?)
}

fn encode(tasks: &[Task]) -> Result<String> {
    let mut out = String::new();
    for task in tasks {
        let value = serde_json::to_value(task)?;
        schema::check(&value)?;
        out.push_str(&serde_json::to_string(&value)?);
        out.push('\n');
    }
    Ok(out)
}
