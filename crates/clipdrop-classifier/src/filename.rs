//! Filename and path heuristics.

use clipdrop_models::{Category, CategoryClassification, ClassificationSource, KeywordSet};

use crate::hints::category_hints;
use crate::tokens::{normalized_stem, tokenize};

// ===== Scores =====

pub const SCORE_FIRST_TOKEN: f32 = 0.95;
pub const SCORE_NAME_TOKEN: f32 = 0.90;
pub const SCORE_HINT_TOKEN: f32 = 0.85;
pub const SCORE_HINT_IN_SEGMENT: f32 = 0.80;
pub const SCORE_HINT_IN_NAME: f32 = 0.75;

/// Confidence of the lifestyle fallback.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Raw filename tokens appended to the keywords.
pub const MAX_RAW_TOKENS: usize = 6;

/// Tokenized inputs for scoring.
#[derive(Debug, Clone, Default)]
pub struct FilenameInput {
    /// Lowercased stem
    pub stem: String,
    pub tokens: Vec<String>,
    /// Raw (lowercased) path segments, nearest last
    pub segments: Vec<String>,
    pub segment_tokens: Vec<String>,
}

impl FilenameInput {
    pub fn new<S: AsRef<str>>(file_name: &str, segments: &[S]) -> Self {
        let stem = normalized_stem(file_name);
        let tokens = tokenize(&stem);
        let segments: Vec<String> = segments.iter().map(|s| s.as_ref().to_lowercase()).collect();
        let segment_tokens = segments.iter().flat_map(|s| tokenize(s)).collect();
        Self {
            stem,
            tokens,
            segments,
            segment_tokens,
        }
    }
}

#[derive(Debug, Clone)]
struct CategoryScore {
    category: Category,
    score: f32,
    keywords: Vec<String>,
}

fn bump(score: &mut f32, value: f32) {
    if value > *score {
        *score = value;
    }
}

fn score_category(category: Category, input: &FilenameInput) -> CategoryScore {
    let name = category.as_str();
    let mut score = 0.0f32;
    let mut keywords = Vec::new();

    if input.tokens.first().is_some_and(|t| t == name) {
        bump(&mut score, SCORE_FIRST_TOKEN);
    }
    if input.tokens.iter().chain(input.segment_tokens.iter()).any(|t| t == name) {
        bump(&mut score, SCORE_NAME_TOKEN);
    }
    if score > 0.0 {
        keywords.push(name.to_string());
    }

    for hint in category_hints(category) {
        let mut hint_score = 0.0f32;
        if input.tokens.iter().any(|t| t == hint) {
            bump(&mut hint_score, SCORE_HINT_TOKEN);
        }
        if input.segments.iter().any(|s| s.contains(hint)) {
            bump(&mut hint_score, SCORE_HINT_IN_SEGMENT);
        }
        if input.stem.contains(hint) {
            bump(&mut hint_score, SCORE_HINT_IN_NAME);
        }
        if hint_score > 0.0 {
            bump(&mut score, hint_score);
            keywords.push(hint.to_string());
        }
    }

    CategoryScore {
        category,
        score,
        keywords,
    }
}

/// Score every category and keep the best; all-zero falls back to lifestyle.
pub fn classify_filename(input: &FilenameInput) -> CategoryClassification {
    let best = Category::ALL
        .iter()
        .map(|c| score_category(*c, input))
        .fold(None::<CategoryScore>, |best, candidate| match best {
            Some(b) if b.score >= candidate.score => Some(b),
            _ => Some(candidate),
        });

    let mut keywords = KeywordSet::new();
    let classification = match best {
        Some(best) if best.score > 0.0 => {
            keywords.extend(best.keywords);
            CategoryClassification::new(best.category, best.score, ClassificationSource::Filename)
        }
        _ => CategoryClassification::new(Category::Lifestyle, DEFAULT_CONFIDENCE, ClassificationSource::Filename),
    };

    keywords.extend(input.tokens.iter().take(MAX_RAW_TOKENS).cloned());
    classification.with_keywords(keywords)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str, segments: &[&str]) -> CategoryClassification {
        classify_filename(&FilenameInput::new(name, segments))
    }

    #[test]
    fn test_first_token_category() {
        let c = classify("beauty_serum_ad.mp4", &[]);
        assert_eq!(c.category, Category::Beauty);
        assert!(c.confidence >= 0.9);
        assert!((c.confidence - 0.95).abs() < f32::EPSILON);
        assert!(c.keywords.contains("beauty"));
        assert!(c.keywords.contains("serum"));
        assert_eq!(c.source, ClassificationSource::Filename);
    }

    #[test]
    fn test_category_token_anywhere() {
        let c = classify("my_fitness_journey.mp4", &[]);
        assert_eq!(c.category, Category::Fitness);
        assert!((c.confidence - 0.90).abs() < f32::EPSILON);
    }

    #[test]
    fn test_segment_category_token() {
        let c = classify("clip01.mp4", &["Business"]);
        assert_eq!(c.category, Category::Business);
        assert!((c.confidence - 0.90).abs() < f32::EPSILON);
    }

    #[test]
    fn test_hint_scores() {
        let c = classify("new_shampoo_review.mp4", &[]);
        assert_eq!(c.category, Category::Haircare);
        assert!((c.confidence - 0.85).abs() < f32::EPSILON);

        let c = classify("clip.mp4", &["gym sessions"]);
        assert_eq!(c.category, Category::Fitness);
        assert!((c.confidence - 0.80).abs() < f32::EPSILON);

        let c = classify("lipstickreview.mp4", &[]);
        assert_eq!(c.category, Category::Beauty);
        assert!((c.confidence - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_chinese_hint_in_name() {
        let c = classify("今日美妆教程.mp4", &[]);
        assert_eq!(c.category, Category::Beauty);
        assert!(c.keywords.contains("美妆"));
    }

    #[test]
    fn test_default_lifestyle() {
        let c = classify("IMG_0042.mp4", &[]);
        assert_eq!(c.category, Category::Lifestyle);
        assert!((c.confidence - DEFAULT_CONFIDENCE).abs() < f32::EPSILON);
        assert_eq!(c.keywords.as_slice(), &["img", "0042"]);
    }

    #[test]
    fn test_raw_tokens_capped() {
        let c = classify("a1_b2_c3_d4_e5_f6_g7_h8.mp4", &[]);
        assert_eq!(c.keywords.len(), MAX_RAW_TOKENS);
        assert!(!c.keywords.contains("g7"));
    }
}
