//! Content categorization for ingested clips.
//!
//! Classification runs in two stages:
//! 1. Filename and folder token scoring against bilingual hint tables
//! 2. When that is inconclusive, frame sampling plus a generic ImageNet-style
//!    ONNX classifier whose labels are mapped back onto the same hints
//!
//! Beauty results additionally resolve a sub-category, and folder overrides
//! are merged with [`apply_override`].

pub mod classifier;
pub mod error;
pub mod filename;
pub mod hints;
pub mod model;
pub mod subcategory;
pub mod tokens;

pub use classifier::{
    apply_override, CategoryClassifier, ClassifyRequest, FAST_PATH_THRESHOLD, FILENAME_TRUST_THRESHOLD,
};
pub use error::{ClassifierError, ClassifierResult};
pub use filename::{classify_filename, FilenameInput};
pub use model::{accumulate_votes, ImageClassifier, LabelScore, ModelVote, OrtClassifierConfig, OrtImageClassifier};
pub use subcategory::{resolve_sub_category, SubCategoryMatch};
pub use tokens::{filename_tokens, segments_between};
