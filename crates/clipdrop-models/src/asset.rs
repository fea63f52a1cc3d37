//! Catalog record for a published video.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::{BeautySubCategory, Category, ClassificationSource};

/// A video asset ready to be written to the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewVideoAsset {
    /// Document id, also used in the storage keys
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beauty_sub_category: Option<BeautySubCategory>,
    pub tags: Vec<String>,
    pub duration_secs: u32,
    pub resolution: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub confidence: f32,
    pub classification_source: ClassificationSource,
    pub source_file_name: String,
    pub created_at: DateTime<Utc>,
}

/// Generate a new asset id.
pub fn new_asset_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_serializes_camel_case() {
        let asset = NewVideoAsset {
            id: new_asset_id(),
            title: "Serum Ad".into(),
            description: String::new(),
            category: Category::Beauty,
            beauty_sub_category: Some(BeautySubCategory::Skincare),
            tags: vec!["beauty".into()],
            duration_secs: 10,
            resolution: "1080x1920".into(),
            video_url: "https://cdn/v.mp4".into(),
            thumbnail_url: "https://cdn/t.jpg".into(),
            confidence: 0.95,
            classification_source: ClassificationSource::Filename,
            source_file_name: "serum_ad.mp4".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["beautySubCategory"], "skincare");
        assert_eq!(json["classificationSource"], "filename");
        assert_eq!(json["durationSecs"], 10);
    }
}
