use crate::presentation::app::SerialCaptureApp;
use crate::presentation::components::Components;
use eframe::egui;

pub fn render(app: &mut SerialCaptureApp, ui: &mut egui::Ui) {
    ui.vertical_centered(|ui| {
        ui.add_space(ui.available_height() / 3.0);
        Components::heading(ui, "Camera access");
        ui.add_space(6.0);
        ui.label("We need your permission to show the camera");
        ui.add_space(12.0);
        if Components::primary_button(ui, "Grant permission", true).clicked() {
            app.controller.grant_permission();
        }
    });
}
