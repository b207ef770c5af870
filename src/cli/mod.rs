//! Command-line interface for trak
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in the submodules.

use clap::{Parser, Subcommand};

use crate::error::Result;

mod init;
mod task;

/// trak - Task tracking for coding agents
///
/// A CLI that keeps a project's tasks in line-record files, with
/// parent/child structure, blocking dependencies and cycle detection.
#[derive(Parser, Debug)]
#[command(name = "trak")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Workspace root holding the task store (defaults to current directory)
    #[arg(long, global = true, env = "TRAK_ROOT")]
    pub root: Option<std::path::PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a task store in the workspace
    Init,

    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(long)]
        description: Option<String>,

        /// Design notes
        #[arg(long)]
        design: Option<String>,

        /// Workflow category (default from config, e.g. "simple")
        #[arg(long)]
        category: Option<String>,

        /// Task type: task, bug, feature, story, chore
        #[arg(long = "type")]
        task_type: Option<String>,

        /// Parent task id
        #[arg(long)]
        parent: Option<u64>,

        /// Ids of tasks this one is blocked by (repeatable)
        #[arg(long)]
        blocked_by: Vec<u64>,

        /// Metadata entries as key=value (repeatable)
        #[arg(long)]
        meta: Vec<String>,

        /// Insert at the top of the file instead of the bottom
        #[arg(long)]
        prepend: bool,
    },

    /// List tasks matching filters
    List {
        /// Exact task id
        #[arg(long)]
        id: Option<u64>,

        /// Exact category
        #[arg(long)]
        category: Option<String>,

        /// Exact parent id
        #[arg(long)]
        parent: Option<u64>,

        /// Title pattern (regex, or substring if not a valid regex)
        #[arg(long)]
        title: Option<String>,

        /// Task type: task, bug, feature, story, chore
        #[arg(long = "type")]
        task_type: Option<String>,

        /// Status filter: a status name, or "any" to include archived tasks
        #[arg(long)]
        status: Option<String>,
    },

    /// Show one task with children and blocking info
    Show {
        /// Task id, or an exact title
        target: String,
    },

    /// Update fields on a task
    Update {
        /// Task id
        id: u64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New design notes
        #[arg(long)]
        design: Option<String>,

        /// New category
        #[arg(long)]
        category: Option<String>,

        /// New type: task, bug, feature, story, chore
        #[arg(long = "type")]
        task_type: Option<String>,

        /// New status: open, in_progress, blocked, closed, deleted
        #[arg(long)]
        status: Option<String>,

        /// New parent id, or "none" to clear
        #[arg(long)]
        parent: Option<String>,

        /// Additional blocked-by task ids (repeatable, appended)
        #[arg(long)]
        blocked_by: Vec<u64>,

        /// Metadata entries as key=value; an empty value removes the key
        #[arg(long)]
        meta: Vec<String>,
    },

    /// Close a task and move it to the archive
    Complete {
        /// Task id
        id: u64,

        /// Completion comment appended to the description
        #[arg(long)]
        comment: Option<String>,
    },

    /// Reopen a closed task
    Reopen {
        /// Task id
        id: u64,
    },

    /// Mark a task deleted and move it to the archive
    Delete {
        /// Task id
        id: u64,
    },

    /// Report blocking status and dependency cycles
    Blocked {
        /// Task ids to check (defaults to every active task)
        ids: Vec<u64>,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => init::run(self.root, self.json, self.quiet),
            Commands::Add {
                title,
                description,
                design,
                category,
                task_type,
                parent,
                blocked_by,
                meta,
                prepend,
            } => task::run_add(task::AddOptions {
                title,
                description,
                design,
                category,
                task_type,
                parent,
                blocked_by,
                meta,
                prepend,
                root: self.root,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::List {
                id,
                category,
                parent,
                title,
                task_type,
                status,
            } => task::run_list(task::ListOptions {
                id,
                category,
                parent,
                title,
                task_type,
                status,
                root: self.root,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Show { target } => task::run_show(task::ShowOptions {
                target,
                root: self.root,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Update {
                id,
                title,
                description,
                design,
                category,
                task_type,
                status,
                parent,
                blocked_by,
                meta,
            } => task::run_update(task::UpdateOptions {
                id,
                title,
                description,
                design,
                category,
                task_type,
                status,
                parent,
                blocked_by,
                meta,
                root: self.root,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Complete { id, comment } => task::run_complete(task::CompleteOptions {
                id,
                comment,
                root: self.root,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Reopen { id } => task::run_reopen(task::ReopenOptions {
                id,
                root: self.root,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Delete { id } => task::run_delete(task::DeleteOptions {
                id,
                root: self.root,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Blocked { ids } => task::run_blocked(task::BlockedOptions {
                ids,
                root: self.root,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
