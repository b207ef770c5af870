//! In-memory indexed task store
//!
//! Mirrors one line-record file (the active set) plus optionally an archive
//! file for cross-reference. Mutation is in-memory; callers persist
//! explicitly with `save`, or through `move_task` for archival. The store is
//! single-threaded by design; when several processes share the files, wrap
//! the whole load-mutate-save sequence in a `lock::FileLock`.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde_json::{Map, Value};

use crate::codec::{LineCodec, SkippedLine};
use crate::error::{Error, Result};
use crate::schema;
use crate::task::{Status, Task, TaskType};

// =============================================================================
// Queries
// =============================================================================

/// Status mode for `find`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// Active tasks only, excluding closed
    Unspecified,
    /// Exact status, searching active and archived tasks
    Is(Status),
    /// No status filtering, searching active and archived tasks
    Any,
}

impl Default for StatusFilter {
    fn default() -> Self {
        StatusFilter::Unspecified
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("any") {
            Ok(StatusFilter::Any)
        } else {
            Ok(StatusFilter::Is(s.parse()?))
        }
    }
}

/// Filters for `find`, AND-combined; `None` fields do not filter
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    pub id: Option<u64>,
    pub category: Option<String>,
    pub parent_id: Option<u64>,
    /// Used as a regex when the pattern compiles as one, substring otherwise
    pub title: Option<String>,
    pub task_type: Option<TaskType>,
    pub status: StatusFilter,
}

enum TitleMatch {
    Pattern(Regex),
    Substring(String),
}

impl TitleMatch {
    fn new(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(re) => TitleMatch::Pattern(re),
            Err(_) => TitleMatch::Substring(pattern.to_string()),
        }
    }

    fn matches(&self, title: &str) -> bool {
        match self {
            TitleMatch::Pattern(re) => re.is_match(title),
            TitleMatch::Substring(s) => title.contains(s.as_str()),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Indexed task collection backed by line-record files
pub struct TaskStore {
    /// Active task ids in file order
    active_ids: Vec<u64>,
    /// Archived task ids in file order
    archived_ids: Vec<u64>,
    /// Every loaded task, active and archived
    by_id: HashMap<u64, Task>,
    children_of: HashMap<u64, HashSet<u64>>,
    parent_of: HashMap<u64, u64>,
    /// Smallest id guaranteed unused by any loaded task
    next_id: u64,
    /// Lines skipped by the most recent `load`
    skipped: Vec<SkippedLine>,
    codec: LineCodec,
}

impl TaskStore {
    pub fn new() -> Self {
        TaskStore {
            active_ids: Vec::new(),
            archived_ids: Vec::new(),
            by_id: HashMap::new(),
            children_of: HashMap::new(),
            parent_of: HashMap::new(),
            next_id: 1,
            skipped: Vec::new(),
            codec: LineCodec::new(),
        }
    }

    /// Reset all state and rebuild it from the backing files.
    ///
    /// `next_id` becomes one greater than the maximum id observed in either
    /// file. Returns the count of active records loaded.
    pub fn load(&mut self, active_path: &Path, archive_path: Option<&Path>) -> Result<usize> {
        self.reset();

        let report = self.codec.read(active_path)?;
        self.skipped = report.skipped;
        for task in report.tasks {
            self.active_ids.push(task.id);
            self.index_parent(&task);
            self.by_id.insert(task.id, task);
        }

        if let Some(archive_path) = archive_path {
            let report = self.codec.read(archive_path)?;
            self.skipped.extend(report.skipped);
            for task in report.tasks {
                self.archived_ids.push(task.id);
                self.index_parent(&task);
                self.by_id.insert(task.id, task);
            }
        }

        self.next_id = self.by_id.keys().max().map_or(1, |max| max + 1);
        Ok(self.active_ids.len())
    }

    /// Look up a task by id, active or archived
    pub fn get(&self, id: u64) -> Result<&Task> {
        self.by_id.get(&id).ok_or(Error::NotFound(id))
    }

    /// Like `get`, but without the error for callers probing existence
    pub fn lookup(&self, id: u64) -> Option<&Task> {
        self.by_id.get(&id)
    }

    /// Assign the next id and insert the task into the active set.
    ///
    /// In-memory only; call `save` to persist.
    pub fn add(&mut self, mut task: Task, prepend: bool) -> Result<Task> {
        task.id = self.next_id;
        schema::check(&serde_json::to_value(&task)?)?;

        if prepend {
            self.active_ids.insert(0, task.id);
        } else {
            self.active_ids.push(task.id);
        }
        self.index_parent(&task);
        self.by_id.insert(task.id, task.clone());
        self.next_id += 1;
        Ok(task)
    }

    /// Merge partial fields onto a task and re-validate.
    ///
    /// A `null` field value clears the field (optional fields fall back to
    /// their defaults; required fields then fail validation). The in-memory
    /// record is only replaced after the merged record validates, so a bad
    /// patch leaves the store untouched. Parent/child indices are rebuilt
    /// only when `parent_id` actually changed.
    pub fn update(&mut self, id: u64, fields: Map<String, Value>) -> Result<Task> {
        let existing = self.by_id.get(&id).ok_or(Error::NotFound(id))?;
        let old_parent = existing.parent_id;

        if let Some(new_id) = fields.get("id") {
            if new_id.as_u64() != Some(id) {
                return Err(Error::SchemaInvalid {
                    path: "id".to_string(),
                    expected: format!("{id} (ids are immutable)"),
                    actual: new_id.to_string(),
                });
            }
        }

        let mut merged = match serde_json::to_value(existing)? {
            Value::Object(obj) => obj,
            other => {
                return Err(Error::OperationFailed(format!(
                    "task {id} serialized to non-object {other}"
                )))
            }
        };
        for (key, value) in fields {
            if value.is_null() {
                merged.remove(&key);
            } else {
                merged.insert(key, value);
            }
        }

        let merged = Value::Object(merged);
        schema::check(&merged)?;
        let updated: Task = serde_json::from_value(merged)?;

        if updated.parent_id != old_parent {
            self.unindex_parent(id, old_parent);
            self.index_parent(&updated);
        }
        self.by_id.insert(id, updated.clone());
        Ok(updated)
    }

    /// Close a task, optionally appending a completion comment to its
    /// description
    pub fn mark_complete(&mut self, id: u64, comment: Option<&str>) -> Result<Task> {
        let mut fields = Map::new();
        fields.insert("status".to_string(), Value::String("closed".to_string()));

        if let Some(comment) = comment {
            let existing = self.get(id)?;
            let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC");
            let line = format!("[completed {stamp}] {comment}");
            let description = if existing.description.is_empty() {
                line
            } else {
                format!("{}\n{}", existing.description, line)
            };
            fields.insert("description".to_string(), Value::String(description));
        }

        self.update(id, fields)
    }

    /// Reopen a task
    pub fn mark_open(&mut self, id: u64) -> Result<Task> {
        let mut fields = Map::new();
        fields.insert("status".to_string(), Value::String("open".to_string()));
        self.update(id, fields)
    }

    /// Remove a task from the in-memory state and return it.
    ///
    /// The backing file is untouched. Children keep their `parent_id`
    /// fields, so their index entries stay (parent links are weak).
    pub fn delete(&mut self, id: u64) -> Result<Task> {
        let task = self.by_id.remove(&id).ok_or(Error::NotFound(id))?;
        self.active_ids.retain(|&t| t != id);
        self.archived_ids.retain(|&t| t != id);
        self.unindex_parent(id, task.parent_id);
        Ok(task)
    }

    /// Move a task's record from one file to the other and transfer it to
    /// the archived side of the store.
    ///
    /// The record is deleted from `from_path` and appended to `to_path` via
    /// the codec, so both files are rewritten atomically. In memory the id
    /// leaves `active_ids` and joins `archived_ids`, mirroring what a fresh
    /// `load` of both files would produce; default `find` no longer sees the
    /// task while status-filtered queries still do.
    pub fn move_task(&mut self, id: u64, from_path: &Path, to_path: &Path) -> Result<Task> {
        if !self.by_id.contains_key(&id) {
            return Err(Error::NotFound(id));
        }

        let moved = self.codec.delete(from_path, id)?;
        self.codec.append(to_path, &moved)?;

        self.active_ids.retain(|&t| t != id);
        self.archived_ids.retain(|&t| t != id);
        self.archived_ids.push(id);
        self.by_id.insert(id, moved.clone());
        Ok(moved)
    }

    /// Write the active tasks back to `path` in `active_ids` order.
    ///
    /// Returns the number of records written.
    pub fn save(&mut self, path: &Path) -> Result<usize> {
        let tasks: Vec<Task> = self
            .active_ids
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect();
        self.codec.write(path, &tasks)?;
        Ok(tasks.len())
    }

    /// Query tasks, AND-combining the query's filters.
    ///
    /// Iterates `active_ids` in file order; status-filtered and wildcard
    /// queries continue into `archived_ids`.
    pub fn find(&self, query: &TaskQuery) -> Vec<&Task> {
        let title = query.title.as_deref().map(TitleMatch::new);
        let include_archived = !matches!(query.status, StatusFilter::Unspecified);

        let mut out = Vec::new();
        let archived = if include_archived {
            self.archived_ids.as_slice()
        } else {
            &[]
        };
        for id in self.active_ids.iter().chain(archived) {
            if let Some(task) = self.by_id.get(id) {
                if self.matches(task, query, &title) {
                    out.push(task);
                }
            }
        }
        out
    }

    /// Exact-title match across active and archived tasks
    pub fn find_by_title(&self, title: &str) -> Vec<&Task> {
        self.active_ids
            .iter()
            .chain(&self.archived_ids)
            .filter_map(|id| self.by_id.get(id))
            .filter(|task| task.title == title)
            .collect()
    }

    fn matches(&self, task: &Task, query: &TaskQuery, title: &Option<TitleMatch>) -> bool {
        if let Some(id) = query.id {
            if task.id != id {
                return false;
            }
        }
        if let Some(category) = &query.category {
            if task.category != *category {
                return false;
            }
        }
        if let Some(parent_id) = query.parent_id {
            if task.parent_id != Some(parent_id) {
                return false;
            }
        }
        if let Some(task_type) = query.task_type {
            if task.task_type != task_type {
                return false;
            }
        }
        match query.status {
            StatusFilter::Unspecified => {
                if task.status == Status::Closed {
                    return false;
                }
            }
            StatusFilter::Is(status) => {
                if task.status != status {
                    return false;
                }
            }
            StatusFilter::Any => {}
        }
        if let Some(matcher) = title {
            if !matcher.matches(&task.title) {
                return false;
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn active_ids(&self) -> &[u64] {
        &self.active_ids
    }

    pub fn archived_ids(&self) -> &[u64] {
        &self.archived_ids
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Child ids of a parent, unordered
    pub fn children(&self, parent_id: u64) -> impl Iterator<Item = u64> + '_ {
        self.children_of.get(&parent_id).into_iter().flatten().copied()
    }

    pub fn parent(&self, child_id: u64) -> Option<u64> {
        self.parent_of.get(&child_id).copied()
    }

    pub fn is_active(&self, id: u64) -> bool {
        self.active_ids.contains(&id)
    }

    /// Lines the most recent `load` skipped
    pub fn skipped_lines(&self) -> &[SkippedLine] {
        &self.skipped
    }

    // ------------------------------------------------------------------
    // Index maintenance
    // ------------------------------------------------------------------

    fn reset(&mut self) {
        self.active_ids.clear();
        self.archived_ids.clear();
        self.by_id.clear();
        self.children_of.clear();
        self.parent_of.clear();
        self.next_id = 1;
        self.skipped.clear();
    }

    fn index_parent(&mut self, task: &Task) {
        if let Some(parent_id) = task.parent_id {
            self.children_of.entry(parent_id).or_default().insert(task.id);
            self.parent_of.insert(task.id, parent_id);
        }
    }

    fn unindex_parent(&mut self, id: u64, parent_id: Option<u64>) {
        let Some(parent_id) = parent_id else {
            return;
        };
        self.parent_of.remove(&id);
        if let Some(children) = self.children_of.get_mut(&parent_id) {
            children.remove(&id);
            if children.is_empty() {
                self.children_of.remove(&parent_id);
            }
        }
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        TaskStore::new()
    }
}
