//! Path-keyed in-memory work table.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use clipdrop_models::{ItemStatus, QueueItem};

use crate::error::{QueueError, QueueResult};

#[derive(Default)]
struct QueueState {
    items: HashMap<PathBuf, QueueItem>,
    /// Insertion order of live keys
    order: VecDeque<PathBuf>,
}

/// Table of discovered files keyed by absolute path.
///
/// At most one item exists per path. Status changes go through
/// [`IngestionQueue::transition`], which rejects anything but
/// `pending -> processing -> completed | failed`.
#[derive(Default)]
pub struct IngestionQueue {
    state: Mutex<QueueState>,
}

impl IngestionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a pending item unless its path is already queued.
    /// Returns `false` for duplicates.
    pub fn enqueue(&self, mut item: QueueItem) -> bool {
        let mut state = self.state();
        if state.items.contains_key(&item.path) {
            debug!(path = %item.path.display(), "Already queued");
            return false;
        }
        item.status = ItemStatus::Pending;
        state.order.push_back(item.path.clone());
        state.items.insert(item.path.clone(), item);
        true
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.state().items.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<QueueItem> {
        self.state().items.get(path).cloned()
    }

    /// Oldest pending item.
    pub fn next_pending(&self) -> Option<QueueItem> {
        let state = self.state();
        state
            .order
            .iter()
            .filter_map(|p| state.items.get(p))
            .find(|item| item.status == ItemStatus::Pending)
            .cloned()
    }

    /// Move an item to `next`, enforcing the status state machine.
    pub fn transition(&self, path: &Path, next: ItemStatus) -> QueueResult<QueueItem> {
        let mut state = self.state();
        let item = state.items.get_mut(path).ok_or_else(|| QueueError::not_found(path))?;

        if !item.status.can_transition_to(next) {
            return Err(QueueError::InvalidTransition {
                path: path.to_path_buf(),
                from: item.status,
                to: next,
            });
        }

        debug!(path = %path.display(), from = %item.status, to = %next, "Status change");
        item.status = next;
        Ok(item.clone())
    }

    /// Mark a processing item failed with `error`.
    pub fn fail(&self, path: &Path, error: impl Into<String>) -> QueueResult<QueueItem> {
        let error = error.into();
        self.update(path, |item| item.error = Some(error))?;
        self.transition(path, ItemStatus::Failed)
    }

    /// Mutate non-status fields of an item.
    pub fn update<F>(&self, path: &Path, f: F) -> QueueResult<()>
    where
        F: FnOnce(&mut QueueItem),
    {
        let mut state = self.state();
        let item = state.items.get_mut(path).ok_or_else(|| QueueError::not_found(path))?;
        let status = item.status;
        f(item);
        item.status = status;
        Ok(())
    }

    /// Evict an item, typically after it reached a terminal status.
    pub fn remove(&self, path: &Path) -> Option<QueueItem> {
        let mut state = self.state();
        let item = state.items.remove(path)?;
        state.order.retain(|p| p != path);
        Some(item)
    }
}
