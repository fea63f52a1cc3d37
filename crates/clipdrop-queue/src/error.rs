//! Queue error types.

use std::path::PathBuf;

use clipdrop_models::ItemStatus;
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Item not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Illegal transition {from} -> {to} for {}", path.display())]
    InvalidTransition {
        path: PathBuf,
        from: ItemStatus,
        to: ItemStatus,
    },
}

impl QueueError {
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }
}
