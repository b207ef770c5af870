//! Task records for trak
//!
//! A task is a unit of work with a monotonically assigned integer id, a
//! lifecycle status, free-form classification fields, and typed relations
//! to other tasks (parent/child, blocking dependencies).
//!
//! # Storage
//!
//! Tasks are stored one JSON record per line in `.trak/tasks.jsonl` (active)
//! and `.trak/complete.jsonl` (archived). See `codec` for the file format.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// Status
// =============================================================================

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Ready to be picked up
    Open,
    /// Actively being worked on
    InProgress,
    /// Waiting on a dependency
    Blocked,
    /// Finished
    Closed,
    /// Discarded without finishing
    Deleted,
}

impl Status {
    /// Terminal statuses no longer count as blocking dependents
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Closed | Status::Deleted)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Open => write!(f, "open"),
            Status::InProgress => write!(f, "in_progress"),
            Status::Blocked => write!(f, "blocked"),
            Status::Closed => write!(f, "closed"),
            Status::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "in_progress" => Ok(Status::InProgress),
            "blocked" => Ok(Status::Blocked),
            "closed" => Ok(Status::Closed),
            "deleted" => Ok(Status::Deleted),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid status '{}'. Expected: open, in_progress, blocked, closed, deleted",
                s
            ))),
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Open
    }
}

// =============================================================================
// Task Type
// =============================================================================

/// Kind of work a task represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// General work item
    Task,
    /// Defect to fix
    Bug,
    /// New functionality
    Feature,
    /// Larger unit tracked through child tasks
    Story,
    /// Maintenance with no user-facing change
    Chore,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Task => write!(f, "task"),
            TaskType::Bug => write!(f, "bug"),
            TaskType::Feature => write!(f, "feature"),
            TaskType::Story => write!(f, "story"),
            TaskType::Chore => write!(f, "chore"),
        }
    }
}

impl FromStr for TaskType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "task" => Ok(TaskType::Task),
            "bug" => Ok(TaskType::Bug),
            "feature" => Ok(TaskType::Feature),
            "story" => Ok(TaskType::Story),
            "chore" => Ok(TaskType::Chore),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid task type '{}'. Expected: task, bug, feature, story, chore",
                s
            ))),
        }
    }
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Task
    }
}

// =============================================================================
// Relations
// =============================================================================

/// How a relation's target relates to the owning task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// The target must close before the owner can proceed
    BlockedBy,
    /// Loose association
    Related,
    /// The owner was found while working on the target
    DiscoveredDuring,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationType::BlockedBy => write!(f, "blocked_by"),
            RelationType::Related => write!(f, "related"),
            RelationType::DiscoveredDuring => write!(f, "discovered_during"),
        }
    }
}

impl FromStr for RelationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "blocked_by" => Ok(RelationType::BlockedBy),
            "related" => Ok(RelationType::Related),
            "discovered_during" => Ok(RelationType::DiscoveredDuring),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid relation type '{}'. Expected: blocked_by, related, discovered_during",
                s
            ))),
        }
    }
}

/// A typed edge from the owning task to another task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Id of the relation entry itself, unique within the owning task
    pub id: u64,
    /// Id of the referenced task
    pub relates_to: u64,
    pub as_type: RelationType,
}

impl Relation {
    pub fn new(id: u64, relates_to: u64, as_type: RelationType) -> Self {
        Relation {
            id,
            relates_to,
            as_type,
        }
    }

    pub fn blocked_by(id: u64, relates_to: u64) -> Self {
        Relation::new(id, relates_to, RelationType::BlockedBy)
    }
}

// =============================================================================
// Task
// =============================================================================

/// A unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique, monotonically assigned, never reused
    pub id: u64,
    /// Weak reference to another task; relation only, not ownership
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,
    pub status: Status,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub design: String,
    /// Free-form workflow bucket, e.g. "simple"
    pub category: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// Arbitrary key/value annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
}

impl Task {
    /// Create a task with defaults. The id is a placeholder until the store
    /// assigns one in `add`.
    pub fn new(title: impl Into<String>, category: impl Into<String>) -> Self {
        Task {
            id: 0,
            parent_id: None,
            status: Status::default(),
            title: title.into(),
            description: String::new(),
            design: String::new(),
            category: category.into(),
            task_type: TaskType::default(),
            meta: BTreeMap::new(),
            relations: Vec::new(),
        }
    }

    /// Ids of tasks this one is blocked by, in relation order
    pub fn blocked_by_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.relations
            .iter()
            .filter(|r| r.as_type == RelationType::BlockedBy)
            .map(|r| r.relates_to)
    }

    /// Next unused relation id within this task
    pub fn next_relation_id(&self) -> u64 {
        self.relations.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// Append a relation, assigning its entry id
    pub fn push_relation(&mut self, relates_to: u64, as_type: RelationType) {
        let relation = Relation::new(self.next_relation_id(), relates_to, as_type);
        self.relations.push(relation);
    }
}
