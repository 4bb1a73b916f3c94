//! Text recognition through an external OCR program.

use crate::domain::models::{CapturedImage, RecognizedText};
use crate::infrastructure::process::{self, ProcessError};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error(transparent)]
    Process(#[from] ProcessError),
}

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Ordered text lines found in the image
    async fn recognize(&self, image: &CapturedImage) -> Result<RecognizedText, OcrError>;
}

/// Runs a recognizer such as `tesseract {image} stdout` and reads lines from stdout
pub struct CommandRecognizer {
    command: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl TextRecognizer for CommandRecognizer {
    async fn recognize(&self, image: &CapturedImage) -> Result<RecognizedText, OcrError> {
        let path = image.path().to_string_lossy();
        let stdout = process::run(&self.command, &[("image", path.as_ref())]).await?;
        let text = RecognizedText::from_output(&stdout);
        debug!("Recognized {} lines in {}", text.lines.len(), path);
        Ok(text)
    }
}
