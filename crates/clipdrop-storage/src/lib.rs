//! Cloudflare R2 storage client.
//!
//! This crate provides:
//! - Byte uploads under a per-category key layout
//! - Public URL construction for uploaded objects
//! - Object deletion (used to compensate failed publishes)
//! - The [`MediaStore`] seam used by the publisher

pub mod client;
pub mod error;
pub mod keys;
pub mod payload;

pub use client::{public_url, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use keys::{content_type_for, thumbnail_key, video_key, ObjectKind};
pub use payload::{MediaStore, StoredObject, UploadPayload};
