//! Shared data models for the ClipDrop ingestion pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Queue items and their lifecycle
//! - Probed video metadata
//! - Content categories and classification results
//! - Watermark and encoding configuration
//! - Pipeline progress events and catalog records

pub mod asset;
pub mod category;
pub mod encoding;
pub mod event;
pub mod item;
pub mod video;
pub mod watermark;

// Re-export common types
pub use asset::{new_asset_id, NewVideoAsset};
pub use category::{
    BeautySubCategory, Category, CategoryClassification, CategoryFolderMap, CategoryParseError,
    ClassificationSource, KeywordSet, MAX_KEYWORDS,
};
pub use encoding::{EncodingConfig, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH};
pub use event::{PipelineEvent, Stage};
pub use item::{ItemStatus, QueueItem};
pub use video::{ResolutionTier, VideoMetadata};
pub use watermark::{ImageWatermark, TextWatermark, WatermarkConfig, WatermarkPosition};
