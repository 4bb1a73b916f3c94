use crate::domain::serial::SerialNormalization;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "serial_capture".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Where the bytes written to the peripheral come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadSource {
    /// The `password` field of the webhook response
    ResponsePassword,
    /// A fixed base64-encoded payload
    Fixed { base64: String },
}

impl Default for PayloadSource {
    fn default() -> Self {
        Self::ResponsePassword
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,

    // Capture
    /// Program and arguments used to take a still photo. `{output}` is
    /// replaced with the destination path.
    #[serde(default = "default_capture_command")]
    pub capture_command: Vec<String>,
    /// Like `capture_command`, for low-resolution viewfinder frames
    #[serde(default = "default_preview_command")]
    pub preview_command: Vec<String>,
    /// Viewfinder refresh period; 0 turns the live feed off
    #[serde(default = "default_preview_interval_ms")]
    pub preview_interval_ms: u64,
    /// Program and arguments used for text recognition. `{image}` is
    /// replaced with the photo path; lines are read from stdout.
    #[serde(default = "default_ocr_command")]
    pub ocr_command: Vec<String>,
    #[serde(default)]
    pub serial_normalization: SerialNormalization,

    // Submission
    #[serde(default = "default_webhook_url")]
    pub webhook_url: String,
    #[serde(default = "default_webhook_timeout_ms")]
    pub webhook_timeout_ms: u64,
    #[serde(default)]
    pub access_token: Option<String>,

    // Notices
    #[serde(default = "default_notice_duration_ms")]
    pub notice_duration_ms: u64,

    // Platform
    #[serde(default = "default_false")]
    pub require_bluetooth_permissions: bool,

    // Peripheral Pairing
    #[serde(default = "default_false")]
    pub pairing_enabled: bool,
    #[serde(default = "default_peripheral_name")]
    pub peripheral_name_fragment: String,
    #[serde(default = "default_service_uuid")]
    pub ble_service_uuid: String,
    #[serde(default = "default_credential_uuid")]
    pub ble_credential_char_uuid: String,
    #[serde(default)]
    pub payload_source: PayloadSource,
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            capture_command: default_capture_command(),
            preview_command: default_preview_command(),
            preview_interval_ms: default_preview_interval_ms(),
            ocr_command: default_ocr_command(),
            serial_normalization: SerialNormalization::default(),
            webhook_url: default_webhook_url(),
            webhook_timeout_ms: default_webhook_timeout_ms(),
            access_token: None,
            notice_duration_ms: default_notice_duration_ms(),
            require_bluetooth_permissions: false,
            pairing_enabled: false,
            peripheral_name_fragment: default_peripheral_name(),
            ble_service_uuid: default_service_uuid(),
            ble_credential_char_uuid: default_credential_uuid(),
            payload_source: PayloadSource::default(),
            scan_timeout_secs: default_scan_timeout_secs(),
        }
    }
}

fn default_capture_command() -> Vec<String> {
    ["fswebcam", "--no-banner", "-r", "1280x720", "{output}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_preview_command() -> Vec<String> {
    ["fswebcam", "--no-banner", "-q", "-r", "320x240", "{output}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_preview_interval_ms() -> u64 {
    500
}
fn default_ocr_command() -> Vec<String> {
    ["tesseract", "{image}", "stdout"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_webhook_url() -> String {
    "http://192.168.1.17:5678/webhook/1653088f-94d9-4919-b763-d5f66870c30a".to_string()
}
fn default_webhook_timeout_ms() -> u64 {
    3000
}
fn default_notice_duration_ms() -> u64 {
    3000
}
fn default_peripheral_name() -> String {
    "ESP32".to_string()
}
fn default_service_uuid() -> String {
    "180A".to_string()
}
fn default_credential_uuid() -> String {
    "2A57".to_string()
}
fn default_scan_timeout_secs() -> u64 {
    30
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::with_path(settings_path))
    }

    /// Load from `path`, falling back to defaults when the file is missing or invalid
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = match Self::load_from_file(&settings_path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::debug!(
                    "Using default settings ({}): {}",
                    settings_path.display(),
                    e
                );
                Settings::default()
            }
        };

        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("SerialCapture");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
