//! Still image capture through an external camera program.

use crate::domain::models::CapturedImage;
use crate::infrastructure::process::{self, ProcessError};
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("camera produced no image at {0}")]
    NoImage(PathBuf),
    #[error("could not prepare capture directory: {0}")]
    Directory(#[source] std::io::Error),
}

/// Options for a single capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOptions {
    pub shutter_sound: bool,
    pub post_processing: bool,
    /// Low-resolution viewfinder frame instead of a full still
    pub preview: bool,
}

impl CaptureOptions {
    /// Silent capture, image used as delivered by the sensor
    pub const fn still() -> Self {
        Self {
            shutter_sound: false,
            post_processing: false,
            preview: false,
        }
    }

    pub const fn preview() -> Self {
        Self {
            preview: true,
            ..Self::still()
        }
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::still()
    }
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn capture(&self, options: CaptureOptions) -> Result<CapturedImage, CaptureError>;
}

/// Runs a configured capture program that writes one image to `{output}`.
///
/// Desktop capture programs neither play a shutter sound nor post-process
/// unless asked to, so [`CaptureOptions::still`] needs no extra arguments.
///
/// Preview frames use `preview_command` when one is set, otherwise the
/// still command.
pub struct CommandCamera {
    command: Vec<String>,
    preview_command: Vec<String>,
    output_dir: PathBuf,
}

impl CommandCamera {
    pub fn new(command: Vec<String>, output_dir: PathBuf) -> Self {
        Self {
            command,
            preview_command: Vec::new(),
            output_dir,
        }
    }

    pub fn with_preview_command(mut self, preview_command: Vec<String>) -> Self {
        self.preview_command = preview_command;
        self
    }

    /// Camera writing into a per-process directory under the system temp dir
    pub fn with_temp_dir(command: Vec<String>) -> Self {
        let dir = std::env::temp_dir().join(format!("serial_capture-{}", std::process::id()));
        Self::new(command, dir)
    }

    /// Program that will be started, if any
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    fn command_for(&self, options: CaptureOptions) -> &[String] {
        if options.preview && !self.preview_command.is_empty() {
            &self.preview_command
        } else {
            &self.command
        }
    }

    fn next_path(&self, options: CaptureOptions) -> PathBuf {
        let kind = if options.preview { "preview" } else { "capture" };
        self.output_dir
            .join(format!("{}-{}.jpg", kind, uuid::Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn capture(&self, options: CaptureOptions) -> Result<CapturedImage, CaptureError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(CaptureError::Directory)?;

        let path = self.next_path(options);
        let output = path.to_string_lossy().into_owned();
        debug!("Capturing ({:?}) to {}", options, output);

        let image = CapturedImage::new(path.clone());
        let command = self.command_for(options);
        if let Err(e) = process::run(command, &[("output", output.as_str())]).await {
            image.discard();
            return Err(e.into());
        }

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() > 0 => {
                if !options.preview {
                    info!("Captured image {}", output);
                }
                Ok(image)
            }
            _ => {
                // an empty file may have been left behind
                image.discard();
                Err(CaptureError::NoImage(path))
            }
        }
    }
}
