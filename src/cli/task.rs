//! trak task command implementations
//!
//! Every mutating command takes the store lock, reloads both task files,
//! applies the change in memory and writes the active file back atomically.
//! Read-only commands skip the lock; atomic replace keeps their reads
//! consistent.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::FileLock;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::resolver::{self, BlockStatus};
use crate::store::{StatusFilter, TaskQuery, TaskStore};
use crate::task::{RelationType, Status, Task, TaskType};

/// Shared per-invocation state: resolved root, config and output mode
struct TaskContext {
    root: PathBuf,
    config: Config,
    options: OutputOptions,
}

impl TaskContext {
    fn new(root: Option<PathBuf>, json: bool, quiet: bool) -> Result<Self> {
        let root = match root {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        let config = Config::load_from_root(&root)?;
        Ok(TaskContext {
            root,
            config,
            options: OutputOptions { json, quiet },
        })
    }

    fn active_path(&self) -> PathBuf {
        self.config.active_path(&self.root)
    }

    fn archive_path(&self) -> PathBuf {
        self.config.archive_path(&self.root)
    }

    fn ensure_initialized(&self) -> Result<()> {
        let active = self.active_path();
        if !active.exists() {
            return Err(Error::StoreNotFound(active));
        }
        Ok(())
    }

    fn lock(&self) -> Result<FileLock> {
        FileLock::acquire(
            &self.config.lock_path(&self.root),
            self.config.store.lock_timeout_ms,
        )
    }

    fn load_store(&self) -> Result<TaskStore> {
        self.ensure_initialized()?;
        let mut store = TaskStore::new();
        store.load(&self.active_path(), Some(&self.archive_path()))?;
        Ok(store)
    }
}

/// A task must be in the active file for mutation; archived records are
/// read-only from the CLI
fn ensure_active(store: &TaskStore, id: u64) -> Result<()> {
    store.get(id)?;
    if !store.is_active(id) {
        return Err(Error::InvalidArgument(format!("Task {id} is archived")));
    }
    Ok(())
}

fn parse_meta(entries: &[String]) -> Result<Vec<(String, String)>> {
    entries
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(Error::InvalidArgument(format!(
                "Invalid meta entry '{entry}': expected key=value"
            ))),
        })
        .collect()
}

fn push_skip_warnings(human: &mut HumanOutput, store: &TaskStore) {
    for skipped in store.skipped_lines() {
        human.push_warning(format!("skipped {skipped}"));
    }
}

fn format_row(task: &Task) -> String {
    let mut row = format!(
        "#{} [{}] {}/{} {}",
        task.id, task.status, task.task_type, task.category, task.title
    );
    if let Some(parent_id) = task.parent_id {
        row.push_str(&format!(" (parent {parent_id})"));
    }
    row
}

fn format_cycle(cycle: &[u64]) -> String {
    let mut ids: Vec<String> = cycle.iter().map(u64::to_string).collect();
    if let Some(first) = cycle.first() {
        ids.push(first.to_string());
    }
    ids.join(" -> ")
}

// =============================================================================
// add
// =============================================================================

/// Options for the add command
pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub design: Option<String>,
    pub category: Option<String>,
    pub task_type: Option<String>,
    pub parent: Option<u64>,
    pub blocked_by: Vec<u64>,
    pub meta: Vec<String>,
    pub prepend: bool,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Run the add command
pub fn run_add(options: AddOptions) -> Result<()> {
    let ctx = TaskContext::new(options.root, options.json, options.quiet)?;
    ctx.ensure_initialized()?;
    let _lock = ctx.lock()?;
    let mut store = ctx.load_store()?;

    let category = options
        .category
        .unwrap_or_else(|| ctx.config.tasks.default_category.clone());
    let mut task = Task::new(&options.title, &category);
    task.task_type = match options.task_type {
        Some(raw) => raw.parse()?,
        None => ctx.config.tasks.default_type.parse()?,
    };
    if let Some(description) = options.description {
        task.description = description;
    }
    if let Some(design) = options.design {
        task.design = design;
    }
    if let Some(parent_id) = options.parent {
        if store.lookup(parent_id).is_none() {
            return Err(Error::NotFound(parent_id));
        }
        task.parent_id = Some(parent_id);
    }
    for (key, value) in parse_meta(&options.meta)? {
        task.meta.insert(key, value);
    }
    for target in options.blocked_by {
        task.push_relation(target, RelationType::BlockedBy);
    }

    let task = store.add(task, options.prepend)?;
    store.save(&ctx.active_path())?;

    let mut human = HumanOutput::new(format!("trak add: created task {}", task.id));
    human.push_summary("id", task.id.to_string());
    human.push_summary("title", task.title.clone());
    human.push_summary("category", task.category.clone());
    human.push_summary("type", task.task_type.to_string());
    if let Some(parent_id) = task.parent_id {
        human.push_summary("parent", parent_id.to_string());
    }
    push_skip_warnings(&mut human, &store);
    human.push_next_step(format!("trak show {}", task.id));

    emit_success(ctx.options, "add", &task, Some(&human))
}

// =============================================================================
// list
// =============================================================================

/// Options for the list command
pub struct ListOptions {
    pub id: Option<u64>,
    pub category: Option<String>,
    pub parent: Option<u64>,
    pub title: Option<String>,
    pub task_type: Option<String>,
    pub status: Option<String>,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct ListReport {
    tasks: Vec<Task>,
    total: usize,
}

/// Run the list command
pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = TaskContext::new(options.root, options.json, options.quiet)?;
    let store = ctx.load_store()?;

    let status = match options.status {
        Some(raw) => raw.parse::<StatusFilter>()?,
        None => StatusFilter::default(),
    };
    let task_type = match options.task_type {
        Some(raw) => Some(raw.parse::<TaskType>()?),
        None => None,
    };
    let query = TaskQuery {
        id: options.id,
        category: options.category,
        parent_id: options.parent,
        title: options.title,
        task_type,
        status,
    };

    let tasks: Vec<Task> = store.find(&query).into_iter().cloned().collect();
    let report = ListReport {
        total: tasks.len(),
        tasks,
    };

    let header = if report.total == 0 {
        "trak list: no matching tasks".to_string()
    } else {
        format!("trak list: {} task(s)", report.total)
    };
    let mut human = HumanOutput::new(header);
    for task in &report.tasks {
        human.push_detail(format_row(task));
    }
    push_skip_warnings(&mut human, &store);

    emit_success(ctx.options, "list", &report, Some(&human))
}

// =============================================================================
// show
// =============================================================================

/// Options for the show command
pub struct ShowOptions {
    pub target: String,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct ShowReport {
    task: Task,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<u64>,
    blocked: BlockStatus,
}

/// Resolve a command-line target that is either an id or an exact title
fn resolve_target(store: &TaskStore, target: &str) -> Result<u64> {
    let parsed = target.parse::<u64>().ok();
    if let Some(id) = parsed {
        if store.lookup(id).is_some() {
            return Ok(id);
        }
    }

    let matches = store.find_by_title(target);
    match matches.len() {
        0 => match parsed {
            Some(id) => Err(Error::NotFound(id)),
            None => Err(Error::InvalidArgument(format!(
                "No task titled '{target}'"
            ))),
        },
        1 => Ok(matches[0].id),
        _ => {
            let ids: Vec<String> = matches.iter().map(|t| t.id.to_string()).collect();
            Err(Error::InvalidArgument(format!(
                "Title '{target}' matches tasks {}. Use an id.",
                ids.join(", ")
            )))
        }
    }
}

/// Run the show command
pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = TaskContext::new(options.root, options.json, options.quiet)?;
    let store = ctx.load_store()?;

    let id = resolve_target(&store, &options.target)?;
    let task = store.get(id)?.clone();
    let mut children: Vec<u64> = store.children(id).collect();
    children.sort_unstable();
    let blocked = resolver::is_blocked(&store, id)?;

    let mut human = HumanOutput::new(format!("trak show: task {id}"));
    human.push_summary("title", task.title.clone());
    human.push_summary("status", task.status.to_string());
    human.push_summary("category", task.category.clone());
    human.push_summary("type", task.task_type.to_string());
    if !store.is_active(id) {
        human.push_summary("archived", "yes");
    }
    if let Some(parent_id) = task.parent_id {
        human.push_summary("parent", parent_id.to_string());
    }
    if !children.is_empty() {
        let ids: Vec<String> = children.iter().map(u64::to_string).collect();
        human.push_summary("children", ids.join(", "));
    }
    if blocked.blocked {
        let blockers: Vec<String> = blocked.blocking_ids.iter().map(u64::to_string).collect();
        let value = if blockers.is_empty() {
            "yes".to_string()
        } else {
            format!("yes (by {})", blockers.join(", "))
        };
        human.push_summary("blocked", value);
    } else {
        human.push_summary("blocked", "no");
    }
    if !task.description.is_empty() {
        human.push_detail(format!("description: {}", task.description));
    }
    if !task.design.is_empty() {
        human.push_detail(format!("design: {}", task.design));
    }
    for (key, value) in &task.meta {
        human.push_detail(format!("meta.{key}: {value}"));
    }
    for relation in &task.relations {
        human.push_detail(format!(
            "relation {}: {} {}",
            relation.id, relation.as_type, relation.relates_to
        ));
    }
    if let Some(error) = blocked.error() {
        human.push_warning(error);
    }
    if let Some(cycle) = &blocked.cycle {
        human.push_warning(format!("dependency cycle: {}", format_cycle(cycle)));
    }
    push_skip_warnings(&mut human, &store);

    let report = ShowReport {
        task,
        children,
        blocked,
    };
    emit_success(ctx.options, "show", &report, Some(&human))
}

// =============================================================================
// update
// =============================================================================

/// Options for the update command
pub struct UpdateOptions {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub design: Option<String>,
    pub category: Option<String>,
    pub task_type: Option<String>,
    pub status: Option<String>,
    pub parent: Option<String>,
    pub blocked_by: Vec<u64>,
    pub meta: Vec<String>,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Run the update command
pub fn run_update(options: UpdateOptions) -> Result<()> {
    let ctx = TaskContext::new(options.root, options.json, options.quiet)?;
    ctx.ensure_initialized()?;
    let _lock = ctx.lock()?;
    let mut store = ctx.load_store()?;
    ensure_active(&store, options.id)?;

    let mut fields = Map::new();
    if let Some(title) = options.title {
        fields.insert("title".to_string(), Value::String(title));
    }
    if let Some(description) = options.description {
        fields.insert("description".to_string(), Value::String(description));
    }
    if let Some(design) = options.design {
        fields.insert("design".to_string(), Value::String(design));
    }
    if let Some(category) = options.category {
        fields.insert("category".to_string(), Value::String(category));
    }
    if let Some(raw) = options.task_type {
        let task_type: TaskType = raw.parse()?;
        fields.insert("type".to_string(), Value::String(task_type.to_string()));
    }
    if let Some(raw) = options.status {
        let status: Status = raw.parse()?;
        fields.insert("status".to_string(), Value::String(status.to_string()));
    }
    if let Some(parent) = options.parent {
        if parent.eq_ignore_ascii_case("none") {
            fields.insert("parent_id".to_string(), Value::Null);
        } else {
            let parent_id: u64 = parent.parse().map_err(|_| {
                Error::InvalidArgument(format!(
                    "Invalid parent '{parent}': expected a task id or 'none'"
                ))
            })?;
            if parent_id == options.id {
                return Err(Error::InvalidArgument(
                    "A task cannot be its own parent".to_string(),
                ));
            }
            if store.lookup(parent_id).is_none() {
                return Err(Error::NotFound(parent_id));
            }
            fields.insert("parent_id".to_string(), Value::from(parent_id));
        }
    }
    if !options.meta.is_empty() {
        let mut merged = store.get(options.id)?.meta.clone();
        for (key, value) in parse_meta(&options.meta)? {
            if value.is_empty() {
                merged.remove(&key);
            } else {
                merged.insert(key, value);
            }
        }
        fields.insert("meta".to_string(), serde_json::to_value(merged)?);
    }
    if !options.blocked_by.is_empty() {
        let mut task = store.get(options.id)?.clone();
        for target in options.blocked_by {
            task.push_relation(target, RelationType::BlockedBy);
        }
        fields.insert("relations".to_string(), serde_json::to_value(&task.relations)?);
    }

    if fields.is_empty() {
        return Err(Error::InvalidArgument("No fields to update".to_string()));
    }

    let task = store.update(options.id, fields)?;
    store.save(&ctx.active_path())?;

    let mut human = HumanOutput::new(format!("trak update: updated task {}", task.id));
    human.push_summary("id", task.id.to_string());
    human.push_summary("title", task.title.clone());
    human.push_summary("status", task.status.to_string());
    push_skip_warnings(&mut human, &store);

    emit_success(ctx.options, "update", &task, Some(&human))
}

// =============================================================================
// complete / reopen / delete
// =============================================================================

/// Options for the complete command
pub struct CompleteOptions {
    pub id: u64,
    pub comment: Option<String>,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Run the complete command
pub fn run_complete(options: CompleteOptions) -> Result<()> {
    let ctx = TaskContext::new(options.root, options.json, options.quiet)?;
    ctx.ensure_initialized()?;
    let _lock = ctx.lock()?;
    let mut store = ctx.load_store()?;
    ensure_active(&store, options.id)?;

    store.mark_complete(options.id, options.comment.as_deref())?;
    store.save(&ctx.active_path())?;
    let task = store.move_task(options.id, &ctx.active_path(), &ctx.archive_path())?;

    let mut human = HumanOutput::new(format!("trak complete: closed task {}", task.id));
    human.push_summary("id", task.id.to_string());
    human.push_summary("title", task.title.clone());
    human.push_summary("archived to", ctx.archive_path().display().to_string());
    push_skip_warnings(&mut human, &store);

    emit_success(ctx.options, "complete", &task, Some(&human))
}

/// Options for the reopen command
pub struct ReopenOptions {
    pub id: u64,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Run the reopen command
pub fn run_reopen(options: ReopenOptions) -> Result<()> {
    let ctx = TaskContext::new(options.root, options.json, options.quiet)?;
    ctx.ensure_initialized()?;
    let _lock = ctx.lock()?;
    let mut store = ctx.load_store()?;
    ensure_active(&store, options.id)?;

    let task = store.mark_open(options.id)?;
    store.save(&ctx.active_path())?;

    let mut human = HumanOutput::new(format!("trak reopen: reopened task {}", task.id));
    human.push_summary("id", task.id.to_string());
    human.push_summary("title", task.title.clone());
    push_skip_warnings(&mut human, &store);

    emit_success(ctx.options, "reopen", &task, Some(&human))
}

/// Options for the delete command
pub struct DeleteOptions {
    pub id: u64,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Run the delete command
pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let ctx = TaskContext::new(options.root, options.json, options.quiet)?;
    ctx.ensure_initialized()?;
    let _lock = ctx.lock()?;
    let mut store = ctx.load_store()?;
    ensure_active(&store, options.id)?;

    let mut fields = Map::new();
    fields.insert("status".to_string(), Value::String("deleted".to_string()));
    store.update(options.id, fields)?;
    store.save(&ctx.active_path())?;
    let task = store.move_task(options.id, &ctx.active_path(), &ctx.archive_path())?;

    let mut human = HumanOutput::new(format!("trak delete: archived task {} as deleted", task.id));
    human.push_summary("id", task.id.to_string());
    human.push_summary("title", task.title.clone());
    push_skip_warnings(&mut human, &store);

    emit_success(ctx.options, "delete", &task, Some(&human))
}

// =============================================================================
// blocked
// =============================================================================

/// Options for the blocked command
pub struct BlockedOptions {
    pub ids: Vec<u64>,
    pub root: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Run the blocked command
pub fn run_blocked(options: BlockedOptions) -> Result<()> {
    let ctx = TaskContext::new(options.root, options.json, options.quiet)?;
    let store = ctx.load_store()?;

    let ids: Vec<u64> = if options.ids.is_empty() {
        store.active_ids().to_vec()
    } else {
        options.ids
    };

    // A single explicit id gets the strict variant so a bad id errors out
    let results: BTreeMap<u64, BlockStatus> = if ids.len() == 1 {
        let mut map = BTreeMap::new();
        map.insert(ids[0], resolver::is_blocked(&store, ids[0])?);
        map
    } else {
        resolver::is_blocked_batch(&store, &ids)
    };

    let blocked_count = results.values().filter(|status| status.blocked).count();
    let mut human = HumanOutput::new(format!(
        "trak blocked: {} of {} blocked",
        blocked_count,
        results.len()
    ));
    for (id, status) in &results {
        let line = if status.blocked {
            let blockers: Vec<String> = status.blocking_ids.iter().map(u64::to_string).collect();
            if blockers.is_empty() {
                format!("#{id} blocked")
            } else {
                format!("#{id} blocked by {}", blockers.join(", "))
            }
        } else {
            format!("#{id} ready")
        };
        human.push_detail(line);
        if let Some(error) = status.error() {
            human.push_warning(format!("#{id}: {error}"));
        }
        if let Some(cycle) = &status.cycle {
            human.push_warning(format!("#{id}: dependency cycle {}", format_cycle(cycle)));
        }
    }
    push_skip_warnings(&mut human, &store);

    emit_success(ctx.options, "blocked", &results, Some(&human))
}
