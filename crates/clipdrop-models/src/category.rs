//! Content categories and classification results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of keywords carried by a classification.
pub const MAX_KEYWORDS: usize = 10;

/// Content category taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Beauty,
    Fitness,
    Haircare,
    Business,
    /// Fallback when nothing else matches.
    #[default]
    Lifestyle,
}

impl Category {
    /// All categories, in scoring order.
    pub const ALL: &'static [Category] = &[
        Category::Beauty,
        Category::Fitness,
        Category::Haircare,
        Category::Business,
        Category::Lifestyle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Beauty => "beauty",
            Category::Fitness => "fitness",
            Category::Haircare => "haircare",
            Category::Business => "business",
            Category::Lifestyle => "lifestyle",
        }
    }

    /// Human readable label used in titles and descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Beauty => "Beauty",
            Category::Fitness => "Fitness",
            Category::Haircare => "Haircare",
            Category::Business => "Business",
            Category::Lifestyle => "Lifestyle",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beauty" => Ok(Category::Beauty),
            "fitness" => Ok(Category::Fitness),
            "haircare" => Ok(Category::Haircare),
            "business" => Ok(Category::Business),
            "lifestyle" => Ok(Category::Lifestyle),
            _ => Err(CategoryParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown category: {0}")]
pub struct CategoryParseError(pub String);

/// Sub-category resolved for beauty content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BeautySubCategory {
    Skincare,
    Haircare,
    Oralcare,
}

impl BeautySubCategory {
    /// Tie-break order: earlier entries win equal scores.
    pub const ALL: &'static [BeautySubCategory] = &[
        BeautySubCategory::Skincare,
        BeautySubCategory::Haircare,
        BeautySubCategory::Oralcare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BeautySubCategory::Skincare => "skincare",
            BeautySubCategory::Haircare => "haircare",
            BeautySubCategory::Oralcare => "oralcare",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BeautySubCategory::Skincare => "Skincare",
            BeautySubCategory::Haircare => "Haircare",
            BeautySubCategory::Oralcare => "Oral Care",
        }
    }
}

impl fmt::Display for BeautySubCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Filename,
    Model,
    Manual,
}

impl ClassificationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationSource::Filename => "filename",
            ClassificationSource::Model => "model",
            ClassificationSource::Manual => "manual",
        }
    }
}

impl fmt::Display for ClassificationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deduplicated, insertion-ordered keyword list capped at [`MAX_KEYWORDS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct KeywordSet(Vec<String>);

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a keyword. Returns false if it was empty, a duplicate, or the set is full.
    pub fn insert(&mut self, keyword: impl Into<String>) -> bool {
        let keyword = keyword.into();
        let keyword = keyword.trim();
        if keyword.is_empty() || self.0.len() >= MAX_KEYWORDS || self.contains(keyword) {
            return false;
        }
        self.0.push(keyword.to_string());
        true
    }

    pub fn extend<I, S>(&mut self, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for keyword in keywords {
            self.insert(keyword);
        }
    }

    /// Merge another set, keeping this set's entries first.
    pub fn merged(mut self, other: &KeywordSet) -> Self {
        self.extend(other.iter().cloned());
        self
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.iter().any(|k| k == keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = KeywordSet::new();
        set.extend(iter);
        set
    }
}

/// Result of classifying one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryClassification {
    pub category: Category,

    /// Confidence in [0, 1]
    pub confidence: f32,

    #[serde(default)]
    pub keywords: KeywordSet,

    pub source: ClassificationSource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub beauty_sub_category: Option<BeautySubCategory>,
}

impl CategoryClassification {
    pub fn new(category: Category, confidence: f32, source: ClassificationSource) -> Self {
        Self {
            category,
            confidence: confidence.clamp(0.0, 1.0),
            keywords: KeywordSet::new(),
            source,
            beauty_sub_category: None,
        }
    }

    pub fn with_keywords(mut self, keywords: KeywordSet) -> Self {
        self.keywords = keywords;
        self
    }

    /// Confidence as a whole percentage.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// Maps watched subfolder names (including localized names) to categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CategoryFolderMap(BTreeMap<String, Category>);

impl CategoryFolderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a JSON object such as `{"美妆": "beauty", "gym": "fitness"}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn insert(&mut self, folder: impl Into<String>, category: Category) {
        self.0.insert(folder.into(), category);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve one path segment: exact key, then case-insensitive key,
    /// then the segment itself when it names a category.
    pub fn resolve(&self, segment: &str) -> Option<Category> {
        if let Some(category) = self.0.get(segment) {
            return Some(*category);
        }

        let lowered = segment.to_lowercase();
        if let Some((_, category)) = self.0.iter().find(|(k, _)| k.to_lowercase() == lowered) {
            return Some(*category);
        }

        Category::ALL.iter().copied().find(|c| c.as_str() == lowered)
    }

    /// Resolve the nearest matching segment, scanning from the last one.
    pub fn resolve_nearest<S: AsRef<str>>(&self, segments: &[S]) -> Option<Category> {
        segments.iter().rev().find_map(|s| self.resolve(s.as_ref()))
    }

    /// Subfolder names to create under the watch root.
    pub fn folder_names(&self) -> Vec<String> {
        if self.0.is_empty() {
            Category::ALL.iter().map(|c| c.as_str().to_string()).collect()
        } else {
            self.0.keys().cloned().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!("beauty".parse::<Category>().unwrap(), Category::Beauty);
        assert_eq!("Business".parse::<Category>().unwrap(), Category::Business);
        assert!("cooking".parse::<Category>().is_err());
    }

    #[test]
    fn test_keyword_set_dedupes_and_caps() {
        let mut set = KeywordSet::new();
        assert!(set.insert("serum"));
        assert!(!set.insert("serum"));
        assert!(!set.insert("  "));
        for i in 0..20 {
            set.insert(format!("kw{}", i));
        }
        assert_eq!(set.len(), MAX_KEYWORDS);
        assert_eq!(set.as_slice()[0], "serum");
    }

    #[test]
    fn test_keyword_merge_keeps_order() {
        let a: KeywordSet = ["beauty", "serum"].into_iter().collect();
        let b: KeywordSet = ["serum", "skincare"].into_iter().collect();
        let merged = a.merged(&b);
        assert_eq!(merged.as_slice(), &["beauty", "serum", "skincare"]);
    }

    #[test]
    fn test_folder_map_resolution_order() {
        let map = CategoryFolderMap::from_json(r#"{"美妆": "beauty", "Gym": "fitness"}"#).unwrap();
        assert_eq!(map.resolve("美妆"), Some(Category::Beauty));
        assert_eq!(map.resolve("gym"), Some(Category::Fitness));
        assert_eq!(map.resolve("Business"), Some(Category::Business));
        assert_eq!(map.resolve("random"), None);
    }

    #[test]
    fn test_folder_map_nearest_segment_wins() {
        let map = CategoryFolderMap::new();
        let segments = vec!["fitness".to_string(), "business".to_string()];
        assert_eq!(map.resolve_nearest(&segments), Some(Category::Business));
    }

    #[test]
    fn test_default_folder_names() {
        let names = CategoryFolderMap::new().folder_names();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"lifestyle".to_string()));
    }

    #[test]
    fn test_confidence_clamped() {
        let c = CategoryClassification::new(Category::Beauty, 1.7, ClassificationSource::Model);
        assert_eq!(c.confidence, 1.0);
        assert_eq!(c.confidence_percent(), 100);
    }
}
