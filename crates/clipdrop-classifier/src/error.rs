//! Error types for classification.

use std::path::PathBuf;
use thiserror::Error;

use clipdrop_media::MediaError;

pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Errors raised by the image-model fallback.
///
/// None of these fail an item: the classifier degrades to the filename guess.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid labels file: {0}")]
    Labels(String),

    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Frame sampling failed: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Blocking task failed: {0}")]
    Join(String),
}

impl ClassifierError {
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    pub fn model_load(message: impl Into<String>) -> Self {
        Self::ModelLoad(message.into())
    }
}
