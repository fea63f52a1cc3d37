//! Generic ImageNet-style image classifier and label-to-category mapping.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::DynamicImage;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use clipdrop_models::{Category, KeywordSet};

use crate::error::{ClassifierError, ClassifierResult};
use crate::hints::category_hints;
use crate::tokens::label_words;

/// One predicted label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub probability: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, probability: f32) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }
}

/// Classifies a single still image. Implementations may block; callers run
/// them on a blocking thread.
pub trait ImageClassifier: Send + Sync {
    fn classify_image(&self, path: &Path) -> ClassifierResult<Vec<LabelScore>>;
}

// ===== ONNX Runtime implementation =====

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Configuration for [`OrtImageClassifier`].
#[derive(Debug, Clone)]
pub struct OrtClassifierConfig {
    pub model_path: PathBuf,
    /// One label per line, in output index order
    pub labels_path: PathBuf,
    /// Square input edge
    pub input_size: u32,
    pub input_name: Option<String>,
    pub output_name: String,
    pub top_k: usize,
}

impl OrtClassifierConfig {
    pub fn new(model_path: impl Into<PathBuf>, labels_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            labels_path: labels_path.into(),
            input_size: 224,
            input_name: None,
            output_name: "output".to_string(),
            top_k: 5,
        }
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    pub fn with_input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = Some(name.into());
        self
    }
}

/// MobileNet/ResNet-style classifier loaded once at startup.
pub struct OrtImageClassifier {
    session: Mutex<Session>,
    labels: Vec<String>,
    config: OrtClassifierConfig,
}

impl OrtImageClassifier {
    pub fn load(config: OrtClassifierConfig) -> ClassifierResult<Self> {
        if !config.model_path.exists() {
            return Err(ClassifierError::ModelNotFound(config.model_path.clone()));
        }

        let labels = load_labels(&config.labels_path)?;
        let model_bytes = std::fs::read(&config.model_path)?;
        let session = Session::builder()
            .map_err(|e| ClassifierError::model_load(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::model_load(format!("Failed to set optimization level: {}", e)))?
            .commit_from_memory(&model_bytes)
            .map_err(|e| ClassifierError::model_load(format!("Failed to load ONNX model: {}", e)))?;

        info!(
            model_path = %config.model_path.display(),
            labels = labels.len(),
            input_size = config.input_size,
            "Image classifier initialized"
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            config,
        })
    }

    /// Resize, ImageNet-normalize and lay out as NCHW.
    fn preprocess(&self, img: &DynamicImage) -> ClassifierResult<Value> {
        let size = self.config.input_size;
        let rgb = img
            .resize_exact(size, size, image::imageops::FilterType::Triangle)
            .to_rgb8();
        let (w, h) = (size as usize, size as usize);

        let mut chw: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = rgb.get_pixel(x as u32, y as u32);
                    chw.push((pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c]);
                }
            }
        }

        Tensor::from_array((vec![1usize, 3, h, w], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| ClassifierError::inference(format!("Failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> ClassifierResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::inference("Session lock poisoned"))?;

        let outputs = match &self.config.input_name {
            Some(name) => session.run(ort::inputs![name.as_str() => input]),
            None => session.run(ort::inputs![input]),
        }
        .map_err(|e| ClassifierError::inference(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get(self.config.output_name.as_str())
            .ok_or_else(|| ClassifierError::inference(format!("Missing {} tensor", self.config.output_name)))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::inference(format!("Failed to extract tensor: {}", e)))?;

        Ok(data.to_vec())
    }
}

impl ImageClassifier for OrtImageClassifier {
    fn classify_image(&self, path: &Path) -> ClassifierResult<Vec<LabelScore>> {
        let img = image::open(path)?;
        let logits = self.run_inference(self.preprocess(&img)?)?;
        let labels = top_k(&softmax(&logits), &self.labels, self.config.top_k);
        debug!(frame = %path.display(), top = ?labels.first(), "Classified frame");
        Ok(labels)
    }
}

fn load_labels(path: &Path) -> ClassifierResult<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ClassifierError::Labels(format!("{}: {}", path.display(), e)))?;
    let labels: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if labels.is_empty() {
        return Err(ClassifierError::Labels(format!("{} has no labels", path.display())));
    }
    Ok(labels)
}

pub(crate) fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|v| v / sum).collect()
}

pub(crate) fn top_k(probs: &[f32], labels: &[String], k: usize) -> Vec<LabelScore> {
    let mut indexed: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed
        .into_iter()
        .take(k)
        .map(|(i, p)| {
            let label = labels.get(i).cloned().unwrap_or_else(|| format!("class_{}", i));
            LabelScore::new(label, p)
        })
        .collect()
}

// ===== Label -> category accumulation =====

/// Accumulated model vote.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVote {
    /// `None` when no label matched any category
    pub category: Option<Category>,
    /// Accumulated probability of the winning category
    pub score: f32,
    pub keywords: KeywordSet,
}

fn word_matches_hint(word: &str, hint: &str) -> bool {
    word.contains(hint) || hint.contains(word)
}

/// Add each label's probability to every category whose hints overlap the
/// label's words. A label counts at most once per category.
pub fn accumulate_votes(frames: &[Vec<LabelScore>]) -> ModelVote {
    let mut scores = [0.0f32; 5];
    let mut matched: [Vec<&'static str>; 5] = Default::default();

    for labels in frames {
        for label in labels {
            let words = label_words(&label.label);
            for (i, category) in Category::ALL.iter().enumerate() {
                let hit = category_hints(*category)
                    .iter()
                    .find(|hint| words.iter().any(|w| word_matches_hint(w, hint)));
                if let Some(hint) = hit {
                    scores[i] += label.probability.max(0.0);
                    if !matched[i].contains(hint) {
                        matched[i].push(hint);
                    }
                }
            }
        }
    }

    let mut best: Option<usize> = None;
    for (i, score) in scores.iter().enumerate() {
        if *score > 0.0 && best.map_or(true, |b| *score > scores[b]) {
            best = Some(i);
        }
    }

    match best {
        Some(i) => ModelVote {
            category: Some(Category::ALL[i]),
            score: scores[i],
            keywords: matched[i].iter().copied().collect(),
        },
        None => ModelVote {
            category: None,
            score: 0.0,
            keywords: KeywordSet::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_top_k_orders_by_probability() {
        let labels: Vec<String> = ["cat", "lipstick", "dumbbell"].iter().map(|s| s.to_string()).collect();
        let top = top_k(&[0.1, 0.7, 0.2], &labels, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].label, "lipstick");
        assert_eq!(top[1].label, "dumbbell");
    }

    #[test]
    fn test_accumulate_votes_picks_highest() {
        let frames = vec![
            vec![LabelScore::new("lipstick, lip rouge", 0.6), LabelScore::new("dumbbell", 0.2)],
            vec![LabelScore::new("lotion", 0.5)],
            vec![LabelScore::new("barbell", 0.3)],
        ];
        let vote = accumulate_votes(&frames);
        assert_eq!(vote.category, Some(Category::Beauty));
        assert!((vote.score - 1.1).abs() < 1e-5);
        assert!(vote.keywords.contains("lipstick"));
        assert!(vote.keywords.contains("lotion"));
    }

    #[test]
    fn test_label_counts_once_per_category() {
        // "face cream lotion" hits two beauty hints but adds its probability once
        let vote = accumulate_votes(&[vec![LabelScore::new("face cream lotion", 0.4)]]);
        assert!((vote.score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_no_matching_labels() {
        let vote = accumulate_votes(&[vec![LabelScore::new("tabby cat", 0.9)]]);
        assert_eq!(vote.category, None);
        assert_eq!(vote.score, 0.0);
    }

    #[test]
    fn test_missing_model_file() {
        let config = OrtClassifierConfig::new("/no/model.onnx", "/no/labels.txt");
        assert!(matches!(
            OrtImageClassifier::load(config),
            Err(ClassifierError::ModelNotFound(_))
        ));
    }
}
