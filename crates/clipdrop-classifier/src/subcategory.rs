//! Beauty sub-category resolution.

use clipdrop_models::BeautySubCategory;

use crate::hints::sub_category_hints;

const EXACT: f32 = 1.0;
const AFFIX: f32 = 0.85;
const SUBSTRING: f32 = 0.75;

/// Winning sub-category and the hints that matched it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubCategoryMatch {
    pub sub_category: BeautySubCategory,
    pub score: f32,
    pub matched_hints: Vec<&'static str>,
}

fn token_score(token: &str, hint: &str) -> f32 {
    if token == hint {
        EXACT
    } else if token.starts_with(hint) || token.ends_with(hint) {
        AFFIX
    } else if token.contains(hint) || (token.chars().count() >= 3 && hint.contains(token)) {
        SUBSTRING
    } else {
        0.0
    }
}

/// Score each sub-category's hints against `tokens` (best token per hint,
/// summed per sub-category). Ties keep the earlier sub-category.
pub fn resolve_sub_category<S: AsRef<str>>(tokens: &[S]) -> Option<SubCategoryMatch> {
    let mut best: Option<SubCategoryMatch> = None;

    for sub in BeautySubCategory::ALL {
        let mut total = 0.0f32;
        let mut matched = Vec::new();

        for hint in sub_category_hints(*sub) {
            let hint_best = tokens
                .iter()
                .map(|t| token_score(&t.as_ref().to_lowercase(), hint))
                .fold(0.0f32, f32::max);
            if hint_best > 0.0 {
                total += hint_best;
                matched.push(*hint);
            }
        }

        if total > 0.0 && best.as_ref().map_or(true, |b| total > b.score) {
            best = Some(SubCategoryMatch {
                sub_category: *sub,
                score: total,
                matched_hints: matched,
            });
        }
    }

    best
}
