use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A still photo written to local storage by the camera service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    path: PathBuf,
}

impl CapturedImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// URI understood by the egui file loader
    pub fn uri(&self) -> String {
        format!("file://{}", self.path.display())
    }

    /// Remove the backing file. Missing files are fine.
    pub fn discard(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!("Could not remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Ordered text lines returned by the recognizer for one image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizedText {
    pub lines: Vec<String>,
}

impl RecognizedText {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Split raw recognizer output into non-empty trimmed lines
    pub fn from_output(output: &str) -> Self {
        Self::new(
            output
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerialNumber(String);

impl SerialNumber {
    /// Only the extractor constructs serials, so the pattern invariant holds.
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded webhook response. Only `password` is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmissionReceipt {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDevice {
    pub name: String,
    pub id: String,
    pub signal_strength: Option<i16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>, severity: MessageSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// Which permissions were granted by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionOutcome {
    pub camera: bool,
    /// `None` when the platform does not require Bluetooth permissions
    pub bluetooth: Option<bool>,
}

impl PermissionOutcome {
    pub fn granted(&self) -> bool {
        self.camera && self.bluetooth.unwrap_or(true)
    }
}

/// Failure kinds reported by the worker. The notice board decides what the
/// user sees for each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    CaptureFailed(String),
    ExtractionFailed,
    EmptyCustomerCode,
    SubmissionFailed(String),
    ScanFailed(String),
    ConnectFailed(String),
    CredentialWriteFailed(String),
    UntypeableCredential(Vec<char>),
}

/// Commands sent from the screen to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    RequestPermissions,
    Capture,
    Submit {
        serial: SerialNumber,
        customer: String,
    },
    StartPairing,
    Disconnect,
    /// Grab one low-resolution viewfinder frame
    Preview,
    Shutdown,
}

/// Kinds of work the worker runs, at most one of each at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Permissions,
    Capture,
    Preview,
    Submit,
    Pairing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralEvent {
    ScanStarted,
    Found,
    Connecting,
    Connected,
    Disconnected,
    ScanStopped,
}

/// Events reported by the worker back to the screen
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Permissions(PermissionOutcome),
    PreviewFrame(CapturedImage),
    Captured(CapturedImage),
    SerialExtracted(SerialNumber),
    Submitted(SubmissionReceipt),
    CredentialSent,
    Peripheral(PeripheralEvent),
    DeviceFound(ScannedDevice),
    Failed(Failure),
    /// A trigger arrived while a chain of the same kind was still running
    Rejected(Chain),
    LogMessage(StatusMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognized_text_from_output() {
        let text = RecognizedText::from_output("Model X200\n\n  SN: 5CG1234567  \nOther\n");
        assert_eq!(text.lines, vec!["Model X200", "SN: 5CG1234567", "Other"]);
    }

    #[test]
    fn test_receipt_ignores_unknown_fields() {
        let receipt: SubmissionReceipt =
            serde_json::from_str(r#"{"password":"hunter2","status":"ok"}"#).unwrap();
        assert_eq!(receipt.password.as_deref(), Some("hunter2"));

        let empty: SubmissionReceipt = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.password, None);
    }

    #[test]
    fn test_permission_outcome() {
        let camera_only = PermissionOutcome {
            camera: true,
            bluetooth: None,
        };
        assert!(camera_only.granted());

        let bt_denied = PermissionOutcome {
            camera: true,
            bluetooth: Some(false),
        };
        assert!(!bt_denied.granted());
    }
}
