//! Publishing: uploads plus the catalog record.
//!
//! Storage and the catalog are not transactional. A partial publish is
//! undone with compensating deletes, so a failed item never leaves an
//! orphaned object behind unless the delete itself fails (logged).

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use clipdrop_catalog::AssetCatalog;
use clipdrop_models::{new_asset_id, Category, CategoryClassification, NewVideoAsset, VideoMetadata};
use clipdrop_storage::{MediaStore, StoredObject, UploadPayload};

use crate::error::WorkerResult;

/// Keywords appended to the tags after the derived ones.
pub const MAX_KEYWORD_TAGS: usize = 5;

/// Everything the publisher needs for one item.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    pub source_file_name: &'a str,
    pub metadata: &'a VideoMetadata,
    pub classification: &'a CategoryClassification,
    /// Processed (watermarked) video
    pub video_path: &'a Path,
    pub thumbnail_path: &'a Path,
}

/// A published asset.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedAsset {
    pub asset_id: String,
    pub category: Category,
    pub video: StoredObject,
    pub thumbnail: StoredObject,
}

/// Uploads through a [`MediaStore`] and records through an [`AssetCatalog`].
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn MediaStore>,
    catalog: Arc<dyn AssetCatalog>,
}

impl Publisher {
    pub fn new(store: Arc<dyn MediaStore>, catalog: Arc<dyn AssetCatalog>) -> Self {
        Self { store, catalog }
    }

    pub async fn publish(&self, request: PublishRequest<'_>) -> WorkerResult<PublishedAsset> {
        let category = request.classification.category;

        // Read both files up front so a missing thumbnail fails before any upload.
        let video_payload = UploadPayload::from_file(request.video_path).await?;
        let thumbnail_payload = UploadPayload::from_file(request.thumbnail_path).await?;

        let video = self.store.upload_video(video_payload, category).await?;

        let thumbnail = match self.store.upload_thumbnail(thumbnail_payload, category).await {
            Ok(stored) => stored,
            Err(e) => {
                self.delete_objects(&[&video]).await;
                return Err(e.into());
            }
        };

        let asset = build_asset(&request, &video, &thumbnail);
        let asset_id = match self.catalog.create_video_asset(&asset).await {
            Ok(id) => id,
            Err(e) => {
                self.delete_objects(&[&video, &thumbnail]).await;
                return Err(e.into());
            }
        };

        info!(
            asset_id = %asset_id,
            category = %category,
            video_key = %video.key,
            "Published video asset"
        );

        Ok(PublishedAsset {
            asset_id,
            category,
            video,
            thumbnail,
        })
    }

    async fn delete_objects(&self, objects: &[&StoredObject]) {
        for object in objects {
            if let Err(e) = self.store.delete_object(&object.key).await {
                warn!(key = %object.key, error = %e, "Failed to delete object after a partial publish");
            }
        }
    }
}

/// Catalog record for a publish request and its uploaded objects.
pub fn build_asset(request: &PublishRequest<'_>, video: &StoredObject, thumbnail: &StoredObject) -> NewVideoAsset {
    let stem = Path::new(request.source_file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| request.source_file_name.to_string());
    let title = title_from_stem(&stem);
    let classification = request.classification;

    NewVideoAsset {
        id: new_asset_id(),
        description: build_description(&title, classification, request.metadata),
        title,
        category: classification.category,
        beauty_sub_category: classification.beauty_sub_category,
        tags: build_tags(request.metadata, classification),
        duration_secs: request.metadata.duration_secs,
        resolution: request.metadata.resolution.clone(),
        video_url: video.url.clone(),
        thumbnail_url: thumbnail.url.clone(),
        confidence: classification.confidence,
        classification_source: classification.source,
        source_file_name: request.source_file_name.to_string(),
        created_at: Utc::now(),
    }
}

/// "summer_glow-serum.v2" -> "Summer Glow Serum V2".
pub fn title_from_stem(stem: &str) -> String {
    stem.split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Category, sub-category, resolution tier, aspect ratio and duration, then
/// up to [`MAX_KEYWORD_TAGS`] keywords not already present.
pub fn build_tags(metadata: &VideoMetadata, classification: &CategoryClassification) -> Vec<String> {
    let mut tags: Vec<String> = vec![classification.category.as_str().to_string()];
    if let Some(sub) = classification.beauty_sub_category {
        tags.push(sub.label().to_string());
    }
    tags.push(metadata.resolution_tier().as_str().to_string());
    tags.push(metadata.aspect_tag());
    tags.push(format!("{}s", metadata.duration_secs));

    let extra: Vec<String> = classification
        .keywords
        .iter()
        .filter(|k| !tags.iter().any(|t| t.eq_ignore_ascii_case(k)))
        .take(MAX_KEYWORD_TAGS)
        .cloned()
        .collect();
    tags.extend(extra);
    tags
}

pub fn build_description(title: &str, classification: &CategoryClassification, metadata: &VideoMetadata) -> String {
    let subject = match classification.beauty_sub_category {
        Some(sub) => format!("{} / {}", classification.category.label(), sub.label()),
        None => classification.category.label().to_string(),
    };
    format!(
        "{} - {} clip, {}s at {}. Categorized with {}% confidence.",
        title,
        subject,
        metadata.duration_secs,
        metadata.resolution,
        classification.confidence_percent()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use clipdrop_catalog::{CatalogError, CatalogResult};
    use clipdrop_models::{BeautySubCategory, ClassificationSource, KeywordSet};
    use clipdrop_storage::{StorageError, StorageResult};
    use tempfile::TempDir;

    fn metadata() -> VideoMetadata {
        VideoMetadata::new(10.2, 1080, 1920, 30.0, 4_000_000, "h264", 15 * 1024 * 1024, "mov,mp4,m4a,3gp,3g2,mj2")
    }

    fn beauty() -> CategoryClassification {
        let mut keywords = KeywordSet::new();
        keywords.extend(["beauty", "serum", "ad", "skincare", "glow", "routine", "morning"]);
        let mut c = CategoryClassification::new(Category::Beauty, 0.95, ClassificationSource::Filename)
            .with_keywords(keywords);
        c.beauty_sub_category = Some(BeautySubCategory::Skincare);
        c
    }

    #[derive(Default)]
    struct RecordingStore {
        fail_thumbnail: bool,
        uploaded: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MediaStore for RecordingStore {
        async fn upload_video(&self, payload: UploadPayload, category: Category) -> StorageResult<StoredObject> {
            let key = format!("{}/videos/{}", category, payload.file_name);
            self.uploaded.lock().unwrap().push(key.clone());
            Ok(StoredObject {
                url: format!("https://cdn.test/{}", key),
                key,
            })
        }

        async fn upload_thumbnail(&self, payload: UploadPayload, category: Category) -> StorageResult<StoredObject> {
            if self.fail_thumbnail {
                return Err(StorageError::upload_failed("bucket unavailable"));
            }
            let key = format!("{}/thumbnails/{}", category, payload.file_name);
            self.uploaded.lock().unwrap().push(key.clone());
            Ok(StoredObject {
                url: format!("https://cdn.test/{}", key),
                key,
            })
        }

        async fn delete_object(&self, key: &str) -> StorageResult<()> {
            self.deleted.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingCatalog {
        fail: bool,
        created: Mutex<Vec<NewVideoAsset>>,
    }

    #[async_trait]
    impl AssetCatalog for RecordingCatalog {
        async fn create_video_asset(&self, asset: &NewVideoAsset) -> CatalogResult<String> {
            if self.fail {
                return Err(CatalogError::ServerError(503, "unavailable".into()));
            }
            self.created.lock().unwrap().push(asset.clone());
            Ok(asset.id.clone())
        }
    }

    async fn files(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        let video = dir.path().join("beauty_serum_ad-1.mp4");
        let thumb = dir.path().join("beauty_serum_ad-1.jpg");
        tokio::fs::write(&video, b"video").await.unwrap();
        tokio::fs::write(&thumb, b"thumb").await.unwrap();
        (video, thumb)
    }

    fn request<'a>(
        meta: &'a VideoMetadata,
        classification: &'a CategoryClassification,
        video: &'a Path,
        thumb: &'a Path,
    ) -> PublishRequest<'a> {
        PublishRequest {
            source_file_name: "beauty_serum_ad.mp4",
            metadata: meta,
            classification,
            video_path: video,
            thumbnail_path: thumb,
        }
    }

    #[test]
    fn test_title_from_stem() {
        assert_eq!(title_from_stem("beauty_serum_ad"), "Beauty Serum Ad");
        assert_eq!(title_from_stem("  morning--routine . v2 "), "Morning Routine V2");
        assert_eq!(title_from_stem("clip01"), "Clip01");
        assert_eq!(title_from_stem("___"), "");
    }

    #[test]
    fn test_tags() {
        let tags = build_tags(&metadata(), &beauty());
        assert_eq!(
            tags,
            vec!["beauty", "Skincare", "Full HD", "9:16", "10s", "serum", "ad", "glow", "routine", "morning"]
        );
    }

    #[test]
    fn test_description_has_confidence() {
        let description = build_description("Beauty Serum Ad", &beauty(), &metadata());
        assert!(description.contains("95%"));
        assert!(description.contains("Beauty / Skincare"));
    }

    #[tokio::test]
    async fn test_publish_success() {
        let dir = TempDir::new().unwrap();
        let (video, thumb) = files(&dir).await;
        let store = Arc::new(RecordingStore::default());
        let catalog = Arc::new(RecordingCatalog::default());
        let publisher = Publisher::new(store.clone(), catalog.clone());

        let meta = metadata();
        let classification = beauty();
        let published = publisher
            .publish(request(&meta, &classification, &video, &thumb))
            .await
            .unwrap();

        assert_eq!(published.category, Category::Beauty);
        let created = catalog.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].id, published.asset_id);
        assert_eq!(created[0].title, "Beauty Serum Ad");
        assert_eq!(created[0].video_url, published.video.url);
        assert_eq!(created[0].source_file_name, "beauty_serum_ad.mp4");
        assert!(store.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_thumbnail_failure_deletes_video() {
        let dir = TempDir::new().unwrap();
        let (video, thumb) = files(&dir).await;
        let store = Arc::new(RecordingStore {
            fail_thumbnail: true,
            ..Default::default()
        });
        let catalog = Arc::new(RecordingCatalog::default());
        let publisher = Publisher::new(store.clone(), catalog.clone());

        let meta = metadata();
        let classification = beauty();
        let err = publisher
            .publish(request(&meta, &classification, &video, &thumb))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "upload");
        assert_eq!(*store.deleted.lock().unwrap(), *store.uploaded.lock().unwrap());
        assert!(catalog.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_failure_deletes_both_objects() {
        let dir = TempDir::new().unwrap();
        let (video, thumb) = files(&dir).await;
        let store = Arc::new(RecordingStore::default());
        let catalog = Arc::new(RecordingCatalog {
            fail: true,
            ..Default::default()
        });
        let publisher = Publisher::new(store.clone(), catalog);

        let meta = metadata();
        let classification = beauty();
        let err = publisher
            .publish(request(&meta, &classification, &video, &thumb))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "catalog");
        assert_eq!(store.deleted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_thumbnail_uploads_nothing() {
        let dir = TempDir::new().unwrap();
        let (video, _) = files(&dir).await;
        let store = Arc::new(RecordingStore::default());
        let publisher = Publisher::new(store.clone(), Arc::new(RecordingCatalog::default()));

        let meta = metadata();
        let classification = beauty();
        let missing = dir.path().join("missing.jpg");
        assert!(publisher
            .publish(request(&meta, &classification, &video, &missing))
            .await
            .is_err());
        assert!(store.uploaded.lock().unwrap().is_empty());
    }
}
