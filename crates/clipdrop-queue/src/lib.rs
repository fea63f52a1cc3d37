//! In-memory ingestion queue.
//!
//! This crate provides:
//! - [`IngestionQueue`]: the path-keyed work table with its status machine
//! - [`ProgressChannel`]: broadcast of pipeline events to any listeners

pub mod error;
pub mod progress;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use progress::{ProgressChannel, DEFAULT_CAPACITY};
pub use queue::IngestionQueue;
