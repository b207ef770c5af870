//! Blocking-dependency resolution
//!
//! Walks `blocked_by` relations against a loaded `TaskStore`. A task is
//! blocked when any direct `blocked_by` target is still active (open,
//! in_progress or blocked) or does not resolve at all. Independently of
//! blocked status, a depth-first search over the `blocked_by` edges reports
//! the first dependency cycle reachable from the task.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::error::Result;
use crate::store::TaskStore;
use crate::task::Task;

/// Outcome of a blocking check for one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockStatus {
    pub blocked: bool,
    /// Direct blockers that resolved and are still active, in relation order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocking_ids: Vec<u64>,
    /// Direct `blocked_by` references that resolve to no loaded task
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid_refs: Vec<u64>,
    /// Ids forming a dependency loop, when one is reachable; the last entry
    /// links back to the first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<u64>>,
}

impl BlockStatus {
    /// Human-readable description of unresolvable references, if any
    pub fn error(&self) -> Option<String> {
        if self.invalid_refs.is_empty() {
            return None;
        }
        let ids: Vec<String> = self.invalid_refs.iter().map(u64::to_string).collect();
        Some(format!("invalid blocked_by references: {}", ids.join(", ")))
    }
}

/// Compute the blocking status of a single task.
///
/// Fails with not-found when `id` is absent from the store.
pub fn is_blocked(store: &TaskStore, id: u64) -> Result<BlockStatus> {
    let task = store.get(id)?;
    let mut cycles = HashMap::new();
    Ok(block_status(store, task, &mut cycles))
}

/// Compute blocking status for many tasks at once.
///
/// Ids absent from the store are left out of the result. Cycle detection
/// shares one memo table across the whole batch, so dependency sub-paths
/// common to several tasks are only walked once.
pub fn is_blocked_batch(store: &TaskStore, ids: &[u64]) -> BTreeMap<u64, BlockStatus> {
    let mut cycles = HashMap::new();
    let mut results = BTreeMap::new();
    for &id in ids {
        if let Some(task) = store.lookup(id) {
            results.insert(id, block_status(store, task, &mut cycles));
        }
    }
    results
}

fn block_status(
    store: &TaskStore,
    task: &Task,
    cycles: &mut HashMap<u64, Option<Vec<u64>>>,
) -> BlockStatus {
    let mut blocking_ids = Vec::new();
    let mut invalid_refs = Vec::new();
    for target in task.blocked_by_ids() {
        match store.lookup(target) {
            Some(blocker) if !blocker.status.is_terminal() => blocking_ids.push(target),
            Some(_) => {}
            None => invalid_refs.push(target),
        }
    }

    let cycle = find_cycle(store, task.id, &mut Vec::new(), cycles);
    BlockStatus {
        blocked: !blocking_ids.is_empty() || !invalid_refs.is_empty(),
        blocking_ids,
        invalid_refs,
        cycle,
    }
}

/// Depth-first search along `blocked_by` edges.
///
/// `path` holds the ids on the current descent; revisiting one closes a
/// loop, reported as the path slice from that id onward. Finished nodes are
/// memoized in `cycles`. A memoized entry is trusted because the edge set is
/// fixed for the duration of a batch: a node that ever sits on a loop finds
/// that loop from its own walk, so a cached `None` can never hide one.
fn find_cycle(
    store: &TaskStore,
    id: u64,
    path: &mut Vec<u64>,
    cycles: &mut HashMap<u64, Option<Vec<u64>>>,
) -> Option<Vec<u64>> {
    if let Some(pos) = path.iter().position(|&n| n == id) {
        return Some(path[pos..].to_vec());
    }
    if let Some(known) = cycles.get(&id) {
        return known.clone();
    }
    let task = store.lookup(id)?;

    path.push(id);
    let mut found = None;
    for target in task.blocked_by_ids() {
        if let Some(cycle) = find_cycle(store, target, path, cycles) {
            found = Some(cycle);
            break;
        }
    }
    path.pop();

    cycles.insert(id, found.clone());
    found
}
