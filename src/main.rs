mod domain;
mod infrastructure;
mod presentation;

use domain::settings::SettingsService;
use eframe::egui;
use presentation::app::SerialCaptureApp;

fn main() -> anyhow::Result<()> {
    let settings = SettingsService::new()?;

    let logging_guard = infrastructure::logging::init_logger(&settings.get().log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    tracing::info!("Starting Serial Capture");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 820.0])
            .with_min_inner_size([360.0, 560.0])
            .with_title("Serial Capture"),
        ..Default::default()
    };

    eframe::run_native(
        "Serial Capture",
        options,
        Box::new(move |cc| {
            let app = SerialCaptureApp::new(cc, settings, logging_guard)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))
}
