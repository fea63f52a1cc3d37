//! Firestore REST catalog for published video assets.
//!
//! This crate provides:
//! - A Firestore client with token caching, retries and emulator support
//! - Typed video asset records behind the [`AssetCatalog`] seam

pub mod assets;
pub mod auth;
pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod types;

pub use assets::{asset_to_fields, AssetCatalog, VideoAssetRepository};
pub use auth::{AccessTokenSource, StaticToken, TokenCache};
pub use client::{FirestoreClient, FirestoreConfig, DEFAULT_COLLECTION};
pub use error::{CatalogError, CatalogResult};
pub use retry::RetryConfig;
pub use types::{Document, Value};
