//! Video asset records.

use std::collections::HashMap;

use async_trait::async_trait;
use metrics::counter;
use tracing::info;

use clipdrop_models::NewVideoAsset;

use crate::client::FirestoreClient;
use crate::error::CatalogResult;
use crate::types::{ToFirestoreValue, Value};

/// Catalog used by the publisher.
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Write the record and return its id.
    async fn create_video_asset(&self, asset: &NewVideoAsset) -> CatalogResult<String>;
}

/// Repository for video asset documents.
#[derive(Clone)]
pub struct VideoAssetRepository {
    client: FirestoreClient,
    collection: String,
}

impl VideoAssetRepository {
    /// Uses the collection from the client's configuration.
    pub fn new(client: FirestoreClient) -> Self {
        let collection = client.config().collection.clone();
        Self { client, collection }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn create(&self, asset: &NewVideoAsset) -> CatalogResult<String> {
        self.client
            .create_document(&self.collection, &asset.id, asset_to_fields(asset))
            .await?;

        counter!("clipdrop_assets_created_total", "category" => asset.category.as_str()).increment(1);
        info!(
            asset_id = %asset.id,
            category = %asset.category,
            "Created video asset record"
        );
        Ok(asset.id.clone())
    }
}

#[async_trait]
impl AssetCatalog for VideoAssetRepository {
    async fn create_video_asset(&self, asset: &NewVideoAsset) -> CatalogResult<String> {
        self.create(asset).await
    }
}

/// Firestore fields for an asset record (camelCase, like the JSON form).
pub fn asset_to_fields(asset: &NewVideoAsset) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("title".to_string(), asset.title.to_firestore_value());
    fields.insert("description".to_string(), asset.description.to_firestore_value());
    fields.insert("category".to_string(), asset.category.as_str().to_firestore_value());
    fields.insert(
        "beautySubCategory".to_string(),
        asset.beauty_sub_category.map(|s| s.as_str()).to_firestore_value(),
    );
    fields.insert("tags".to_string(), asset.tags.to_firestore_value());
    fields.insert("durationSecs".to_string(), asset.duration_secs.to_firestore_value());
    fields.insert("resolution".to_string(), asset.resolution.to_firestore_value());
    fields.insert("videoUrl".to_string(), asset.video_url.to_firestore_value());
    fields.insert("thumbnailUrl".to_string(), asset.thumbnail_url.to_firestore_value());
    fields.insert("confidence".to_string(), f64::from(asset.confidence).to_firestore_value());
    fields.insert(
        "classificationSource".to_string(),
        asset.classification_source.as_str().to_firestore_value(),
    );
    fields.insert("sourceFileName".to_string(), asset.source_file_name.to_firestore_value());
    fields.insert("createdAt".to_string(), asset.created_at.to_firestore_value());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use clipdrop_models::{new_asset_id, BeautySubCategory, Category, ClassificationSource};
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::auth::StaticToken;
    use crate::client::FirestoreConfig;
    use crate::retry::RetryConfig;

    const DOCS: &str = "/v1/projects/p/databases/(default)/documents";

    fn asset() -> NewVideoAsset {
        NewVideoAsset {
            id: new_asset_id(),
            title: "Serum Ad".into(),
            description: "Beauty clip".into(),
            category: Category::Beauty,
            beauty_sub_category: Some(BeautySubCategory::Skincare),
            tags: vec!["beauty".into(), "skincare".into()],
            duration_secs: 10,
            resolution: "1080x1920".into(),
            video_url: "https://cdn.example.com/beauty/videos/a.mp4".into(),
            thumbnail_url: "https://cdn.example.com/beauty/thumbnails/a.jpg".into(),
            confidence: 0.95,
            classification_source: ClassificationSource::Filename,
            source_file_name: "beauty_serum_ad.mp4".into(),
            created_at: Utc::now(),
        }
    }

    fn repo(server: &MockServer) -> VideoAssetRepository {
        let config = FirestoreConfig {
            retry: RetryConfig::none(),
            ..FirestoreConfig::new("p")
        };
        let client = FirestoreClient::with_token_source(
            config,
            Arc::new(StaticToken::emulator()),
            format!("{}{}", server.uri(), DOCS),
        )
        .unwrap();
        VideoAssetRepository::new(client)
    }

    #[test]
    fn test_asset_fields() {
        let fields = asset_to_fields(&asset());
        assert_eq!(fields["category"], Value::StringValue("beauty".into()));
        assert_eq!(fields["beautySubCategory"], Value::StringValue("skincare".into()));
        assert_eq!(fields["durationSecs"], Value::IntegerValue("10".into()));
        assert_eq!(fields["classificationSource"], Value::StringValue("filename".into()));
        assert!(matches!(fields["createdAt"], Value::TimestampValue(_)));
    }

    #[tokio::test]
    async fn test_create_returns_asset_id() {
        let server = MockServer::start().await;
        let asset = asset();
        Mock::given(method("POST"))
            .and(path(format!("{}/videoAssets", DOCS)))
            .and(query_param("documentId", asset.id.as_str()))
            .and(body_partial_json(serde_json::json!({
                "fields": {"category": {"stringValue": "beauty"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let id = repo(&server).create_video_asset(&asset).await.unwrap();
        assert_eq!(id, asset.id);
    }

    #[tokio::test]
    async fn test_create_uses_configured_collection() {
        let server = MockServer::start().await;
        let asset = asset();
        Mock::given(method("POST"))
            .and(path(format!("{}/clips", DOCS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let repo = repo(&server).with_collection("clips");
        assert_eq!(repo.collection(), "clips");
        repo.create_video_asset(&asset).await.unwrap();
    }
}
