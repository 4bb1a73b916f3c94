use crate::domain::screen::ScreenState;
use crate::presentation::app::SerialCaptureApp;
use crate::presentation::components::Components;
use crate::presentation::theme::Palette;
use eframe::egui;

/// Viewfinder: the latest preview frame, frozen while a still is taken
pub fn render(app: &mut SerialCaptureApp, ui: &mut egui::Ui) {
    let capturing = matches!(app.controller.screen().state(), ScreenState::Capturing);
    let frame_uri = app.controller.preview().map(|frame| frame.uri());
    let palette = Palette::new();

    let frame_height = (ui.available_height() - 80.0).max(120.0);
    egui::Frame::none()
        .fill(egui::Color32::BLACK)
        .stroke(egui::Stroke::new(2.0, palette.accent))
        .rounding(egui::Rounding::same(8.0))
        .show(ui, |ui| {
            ui.set_min_size(egui::vec2(ui.available_width(), frame_height));
            ui.centered_and_justified(|ui| match &frame_uri {
                Some(uri) => {
                    ui.add(
                        egui::Image::new(uri.as_str())
                            .max_height(frame_height)
                            .maintain_aspect_ratio(true)
                            .show_loading_spinner(false),
                    );
                }
                None if capturing => {
                    ui.spinner();
                }
                None => {
                    ui.label("Point the camera at the serial number label");
                }
            });
        });

    ui.add_space(12.0);
    let label = if capturing { "Capturing…" } else { "Take Picture" };
    if Components::primary_button(ui, label, !capturing).clicked() {
        app.controller.capture();
    }
}
