//! Watch-folder ingestion worker.
//!
//! This crate provides:
//! - Environment configuration and directory layout
//! - Directory watching with de-dupe and folder category overrides
//! - The per-item stage pipeline with stage deadlines
//! - Publishing with compensating deletes
//! - The single sequential queue worker

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod publisher;
pub mod watcher;

pub use config::WorkerConfig;
pub use error::{PipelineError, WorkerResult};
pub use executor::QueueWorker;
pub use logging::{init_tracing, ItemLogger};
pub use pipeline::{Artifacts, ItemContext, ItemPipeline, StageFailure};
pub use publisher::{PublishRequest, PublishedAsset, Publisher};
pub use watcher::{is_supported_video, DirectoryWatcher, Intake, SUPPORTED_EXTENSIONS};
