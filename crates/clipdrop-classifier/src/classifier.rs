//! Two-stage category classification.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use clipdrop_media::{extract_frames, remove_frames, Encoder, DEFAULT_SAMPLE_COUNT};
use clipdrop_models::{Category, CategoryClassification, ClassificationSource, KeywordSet};

use crate::error::{ClassifierError, ClassifierResult};
use crate::filename::{classify_filename, FilenameInput, DEFAULT_CONFIDENCE};
use crate::model::{accumulate_votes, ImageClassifier, LabelScore};
use crate::subcategory::resolve_sub_category;
use crate::tokens::parent_segments;

/// Filename results at or above this skip the image model.
pub const FAST_PATH_THRESHOLD: f32 = 0.7;

/// Filename results at or above this win a disagreement with the model.
pub const FILENAME_TRUST_THRESHOLD: f32 = 0.6;

/// Input for [`CategoryClassifier::classify`].
#[derive(Debug, Clone, Default)]
pub struct ClassifyRequest {
    pub file_name: String,
    pub file_path: Option<PathBuf>,
    /// Directory names between the watch root and the file
    pub path_segments: Option<Vec<String>>,
    /// Video to sample frames from
    pub video_path: Option<PathBuf>,
    pub duration: Option<f64>,
}

impl ClassifyRequest {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_segments(mut self, segments: Vec<String>) -> Self {
        self.path_segments = Some(segments);
        self
    }

    pub fn with_video(mut self, path: impl Into<PathBuf>, duration: f64) -> Self {
        self.video_path = Some(path.into());
        self.duration = Some(duration);
        self
    }

    /// Explicit segments win over those derived from `file_path`.
    fn segments(&self) -> Vec<String> {
        match (&self.path_segments, &self.file_path) {
            (Some(segments), _) => segments.clone(),
            (None, Some(path)) => parent_segments(path),
            (None, None) => Vec::new(),
        }
    }

    fn filename_input(&self) -> FilenameInput {
        FilenameInput::new(&self.file_name, &self.segments())
    }
}

/// Filename heuristics with an optional image-model fallback.
pub struct CategoryClassifier {
    encoder: Arc<dyn Encoder>,
    model: Option<Arc<dyn ImageClassifier>>,
    frames_dir: PathBuf,
    sample_count: usize,
}

impl CategoryClassifier {
    pub fn new(encoder: Arc<dyn Encoder>, frames_dir: impl Into<PathBuf>) -> Self {
        Self {
            encoder,
            model: None,
            frames_dir: frames_dir.into(),
            sample_count: DEFAULT_SAMPLE_COUNT,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn ImageClassifier>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_sample_count(mut self, count: usize) -> Self {
        self.sample_count = count.max(1);
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Classify one file. Never fails: model errors degrade to the filename guess.
    pub async fn classify(&self, request: &ClassifyRequest) -> CategoryClassification {
        let input = request.filename_input();
        let by_name = classify_filename(&input);

        debug!(
            file = %request.file_name,
            category = %by_name.category,
            confidence = by_name.confidence,
            "Filename classification"
        );

        let result = if by_name.confidence >= FAST_PATH_THRESHOLD {
            by_name
        } else {
            match self.fallback_inputs(request) {
                Some((model, video, duration)) => match self.classify_frames(model, video, duration).await {
                    Ok(by_model) => reconcile(by_name, by_model),
                    Err(e) => {
                        warn!(
                            file = %request.file_name,
                            error = %e,
                            "Image classification failed, keeping filename result"
                        );
                        by_name
                    }
                },
                None => by_name,
            }
        };

        let result = with_sub_category(result, &input);
        info!(
            file = %request.file_name,
            category = %result.category,
            confidence = result.confidence,
            source = ?result.source,
            sub_category = ?result.beauty_sub_category,
            "Classified"
        );
        result
    }

    fn fallback_inputs<'a>(
        &'a self,
        request: &'a ClassifyRequest,
    ) -> Option<(&'a Arc<dyn ImageClassifier>, &'a Path, f64)> {
        let model = self.model.as_ref()?;
        let video = request.video_path.as_deref()?;
        let duration = request.duration.filter(|d| d.is_finite() && *d > 0.0)?;
        Some((model, video, duration))
    }

    async fn classify_frames(
        &self,
        model: &Arc<dyn ImageClassifier>,
        video: &Path,
        duration: f64,
    ) -> ClassifierResult<CategoryClassification> {
        let prefix = format!("frame_{}", Uuid::new_v4().simple());
        let frames = extract_frames(
            self.encoder.as_ref(),
            video,
            &self.frames_dir,
            &prefix,
            duration,
            self.sample_count,
        )
        .await?;

        let predictions = infer_frames(model, &frames).await;
        remove_frames(&frames).await;
        let predictions = predictions?;

        let vote = accumulate_votes(&predictions);
        let classification = match vote.category {
            Some(category) => {
                let confidence = vote.score / predictions.len().max(1) as f32;
                CategoryClassification::new(category, confidence, ClassificationSource::Model)
                    .with_keywords(vote.keywords)
            }
            None => CategoryClassification::new(Category::Lifestyle, DEFAULT_CONFIDENCE, ClassificationSource::Model),
        };

        debug!(
            video = %video.display(),
            frames = predictions.len(),
            category = %classification.category,
            confidence = classification.confidence,
            "Model classification"
        );
        Ok(classification)
    }
}

async fn infer_frames(model: &Arc<dyn ImageClassifier>, frames: &[PathBuf]) -> ClassifierResult<Vec<Vec<LabelScore>>> {
    let mut predictions = Vec::with_capacity(frames.len());
    for frame in frames {
        let model = Arc::clone(model);
        let frame = frame.clone();
        let labels = tokio::task::spawn_blocking(move || model.classify_image(&frame))
            .await
            .map_err(|e| ClassifierError::Join(e.to_string()))??;
        predictions.push(labels);
    }
    Ok(predictions)
}

/// A confident filename guess keeps its category when the model disagrees.
pub(crate) fn reconcile(by_name: CategoryClassification, by_model: CategoryClassification) -> CategoryClassification {
    if by_name.confidence >= FILENAME_TRUST_THRESHOLD && by_name.category != by_model.category {
        let confidence = by_name.confidence.max(by_model.confidence);
        let keywords = by_name.keywords.merged(&by_model.keywords);
        CategoryClassification::new(by_name.category, confidence, ClassificationSource::Filename).with_keywords(keywords)
    } else {
        let keywords = by_model.keywords.clone().merged(&by_name.keywords);
        by_model.with_keywords(keywords)
    }
}

/// Resolve the beauty sub-category for beauty results; clear it otherwise.
fn with_sub_category(mut classification: CategoryClassification, input: &FilenameInput) -> CategoryClassification {
    classification.beauty_sub_category = None;
    if classification.category != Category::Beauty {
        return classification;
    }

    let tokens: Vec<&str> = input
        .tokens
        .iter()
        .chain(input.segment_tokens.iter())
        .chain(classification.keywords.iter())
        .map(String::as_str)
        .collect();

    if let Some(found) = resolve_sub_category(&tokens) {
        classification.beauty_sub_category = Some(found.sub_category);
        classification.keywords.insert(found.sub_category.as_str());
        classification.keywords.extend(found.matched_hints);
    }
    classification
}

/// Apply a folder override: the override category wins with full confidence.
pub fn apply_override(
    classification: CategoryClassification,
    category: Category,
    request: &ClassifyRequest,
) -> CategoryClassification {
    // Seeded first so a full prior set cannot crowd out the override name.
    let keywords = std::iter::once(category.as_str())
        .collect::<KeywordSet>()
        .merged(&classification.keywords);

    let merged = CategoryClassification::new(category, 1.0, ClassificationSource::Manual).with_keywords(keywords);
    with_sub_category(merged, &request.filename_input())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use clipdrop_media::FakeEncoder;
    use clipdrop_models::{BeautySubCategory, MAX_KEYWORDS};
    use tempfile::TempDir;

    struct ScriptedModel {
        labels: Vec<LabelScore>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(labels: &[(&str, f32)]) -> Arc<Self> {
            Arc::new(Self {
                labels: labels.iter().map(|(l, p)| LabelScore::new(*l, *p)).collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ImageClassifier for ScriptedModel {
        fn classify_image(&self, _path: &Path) -> ClassifierResult<Vec<LabelScore>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.labels.clone())
        }
    }

    struct BrokenModel;

    impl ImageClassifier for BrokenModel {
        fn classify_image(&self, _path: &Path) -> ClassifierResult<Vec<LabelScore>> {
            Err(ClassifierError::inference("model exploded"))
        }
    }

    fn classifier(dir: &TempDir, encoder: FakeEncoder) -> CategoryClassifier {
        CategoryClassifier::new(Arc::new(encoder), dir.path().join("frames"))
    }

    fn frames_left(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("frames"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_fast_path_skips_model() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new(&[("dumbbell", 0.9)]);
        let classifier = classifier(&dir, FakeEncoder::new()).with_model(model.clone());

        let request = ClassifyRequest::new("beauty_serum_ad.mp4").with_video(dir.path().join("v.mp4"), 10.0);
        let result = classifier.classify(&request).await;

        assert_eq!(result.category, Category::Beauty);
        assert!(result.confidence >= 0.9);
        assert!(result.keywords.contains("beauty"));
        assert_eq!(result.source, ClassificationSource::Filename);
        assert_eq!(result.beauty_sub_category, Some(BeautySubCategory::Skincare));
        assert!(result.keywords.contains("skincare"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model_fallback_wins_over_weak_filename() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new(&[("dumbbell", 0.6), ("tabby cat", 0.3)]);
        let classifier = classifier(&dir, FakeEncoder::new()).with_model(model.clone());

        let request = ClassifyRequest::new("IMG_0042.mp4").with_video(dir.path().join("v.mp4"), 10.0);
        let result = classifier.classify(&request).await;

        assert_eq!(result.category, Category::Fitness);
        assert_eq!(result.source, ClassificationSource::Model);
        assert!((result.confidence - 0.6).abs() < 1e-5);
        assert_eq!(result.keywords.as_slice(), &["dumbbell", "img", "0042"]);
        assert_eq!(result.beauty_sub_category, None);
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        assert_eq!(frames_left(&dir), 0);
    }

    #[tokio::test]
    async fn test_model_beauty_gets_sub_category() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new(&[("lotion", 0.8)]);
        let classifier = classifier(&dir, FakeEncoder::new()).with_model(model);

        let request = ClassifyRequest::new("clip.mp4").with_video(dir.path().join("v.mp4"), 10.0);
        let result = classifier.classify(&request).await;

        assert_eq!(result.category, Category::Beauty);
        assert_eq!(result.beauty_sub_category, Some(BeautySubCategory::Skincare));
    }

    #[tokio::test]
    async fn test_unmatched_labels_fall_back_to_lifestyle() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new(&[("tabby cat", 0.9)]);
        let classifier = classifier(&dir, FakeEncoder::new()).with_model(model);

        let request = ClassifyRequest::new("clip.mp4").with_video(dir.path().join("v.mp4"), 10.0);
        let result = classifier.classify(&request).await;

        assert_eq!(result.category, Category::Lifestyle);
        assert_eq!(result.source, ClassificationSource::Model);
        assert!((result.confidence - DEFAULT_CONFIDENCE).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_model_error_degrades_to_filename() {
        let dir = TempDir::new().unwrap();
        let classifier = classifier(&dir, FakeEncoder::new()).with_model(Arc::new(BrokenModel));

        let request = ClassifyRequest::new("IMG_0042.mp4").with_video(dir.path().join("v.mp4"), 10.0);
        let result = classifier.classify(&request).await;

        assert_eq!(result.category, Category::Lifestyle);
        assert_eq!(result.source, ClassificationSource::Filename);
        assert_eq!(frames_left(&dir), 0);
    }

    #[tokio::test]
    async fn test_frame_extraction_failure_degrades() {
        let dir = TempDir::new().unwrap();
        let model = ScriptedModel::new(&[("dumbbell", 0.9)]);
        let encoder = FakeEncoder::new().fail_outputs_containing("frame_");
        let classifier = classifier(&dir, encoder).with_model(model.clone());

        let request = ClassifyRequest::new("IMG_0042.mp4").with_video(dir.path().join("v.mp4"), 10.0);
        let result = classifier.classify(&request).await;

        assert_eq!(result.source, ClassificationSource::Filename);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_model_or_no_video_uses_filename() {
        let dir = TempDir::new().unwrap();
        let plain = classifier(&dir, FakeEncoder::new());
        let request = ClassifyRequest::new("IMG_0042.mp4").with_video(dir.path().join("v.mp4"), 10.0);
        assert_eq!(plain.classify(&request).await.source, ClassificationSource::Filename);

        let model = ScriptedModel::new(&[("dumbbell", 0.9)]);
        let with_model = classifier(&dir, FakeEncoder::new()).with_model(model.clone());
        let result = with_model.classify(&ClassifyRequest::new("IMG_0042.mp4")).await;
        assert_eq!(result.source, ClassificationSource::Filename);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reconcile_keeps_confident_filename() {
        let by_name = CategoryClassification::new(Category::Business, 0.65, ClassificationSource::Filename)
            .with_keywords(["office"].into_iter().collect());
        let by_model = CategoryClassification::new(Category::Fitness, 0.8, ClassificationSource::Model)
            .with_keywords(["dumbbell"].into_iter().collect());

        let result = reconcile(by_name, by_model);
        assert_eq!(result.category, Category::Business);
        assert_eq!(result.source, ClassificationSource::Filename);
        assert!((result.confidence - 0.8).abs() < f32::EPSILON);
        assert_eq!(result.keywords.as_slice(), &["office", "dumbbell"]);
    }

    #[test]
    fn test_reconcile_prefers_model_for_weak_filename() {
        let by_name = CategoryClassification::new(Category::Lifestyle, 0.5, ClassificationSource::Filename);
        let by_model = CategoryClassification::new(Category::Fitness, 0.4, ClassificationSource::Model);
        let result = reconcile(by_name, by_model);
        assert_eq!(result.category, Category::Fitness);
        assert_eq!(result.source, ClassificationSource::Model);
    }

    #[tokio::test]
    async fn test_override_from_business_folder() {
        let dir = TempDir::new().unwrap();
        let classifier = classifier(&dir, FakeEncoder::new());
        let request = ClassifyRequest::new("clip01.mp4").with_segments(vec!["business".to_string()]);

        let base = classifier.classify(&request).await;
        let base_keywords = base.keywords.clone();
        let result = apply_override(base, Category::Business, &request);

        assert_eq!(result.category, Category::Business);
        assert_eq!(result.source, ClassificationSource::Manual);
        assert_eq!(result.confidence, 1.0);
        assert!(result.keywords.contains("business"));
        for keyword in base_keywords.iter() {
            assert!(result.keywords.contains(keyword));
        }
    }

    #[test]
    fn test_override_keyword_survives_full_set() {
        let request = ClassifyRequest::new("clip.mp4");
        let prior: KeywordSet = (0..MAX_KEYWORDS).map(|i| format!("tag{}", i)).collect();
        assert_eq!(prior.len(), MAX_KEYWORDS);
        let classification =
            CategoryClassification::new(Category::Lifestyle, 0.6, ClassificationSource::Filename).with_keywords(prior);

        let result = apply_override(classification, Category::Business, &request);

        assert_eq!(result.keywords.len(), MAX_KEYWORDS);
        assert_eq!(result.keywords.as_slice()[0], "business");
        assert!(result.keywords.contains("tag0"));
        assert!(!result.keywords.contains(&format!("tag{}", MAX_KEYWORDS - 1)));
    }

    #[test]
    fn test_override_clears_or_recomputes_sub_category() {
        let request = ClassifyRequest::new("whitening_toothpaste.mp4");
        let mut beauty = CategoryClassification::new(Category::Beauty, 0.85, ClassificationSource::Filename);
        beauty.beauty_sub_category = Some(BeautySubCategory::Oralcare);

        let to_fitness = apply_override(beauty.clone(), Category::Fitness, &request);
        assert_eq!(to_fitness.beauty_sub_category, None);

        let plain = CategoryClassification::new(Category::Lifestyle, 0.5, ClassificationSource::Filename);
        let to_beauty = apply_override(plain, Category::Beauty, &request);
        assert_eq!(to_beauty.beauty_sub_category, Some(BeautySubCategory::Oralcare));
        assert!(to_beauty.keywords.contains("oralcare"));
    }

    #[test]
    fn test_segments_derived_from_file_path() {
        let request = ClassifyRequest::new("clip.mp4").with_file_path("/watch/gym/clip.mp4");
        assert_eq!(request.segments(), vec!["watch", "gym"]);

        let explicit = request.clone().with_segments(vec!["business".to_string()]);
        assert_eq!(explicit.segments(), vec!["business"]);
    }
}
