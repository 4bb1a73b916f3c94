use crate::domain::screen::ScreenState;
use crate::presentation::app::SerialCaptureApp;
use crate::presentation::components::Components;
use crate::presentation::theme::Palette;
use eframe::egui;
use std::time::Instant;

/// Captured photo, extracted serial and the submission form
pub fn render(app: &mut SerialCaptureApp, ui: &mut egui::Ui, now: Instant) {
    let state = app.controller.screen().state();
    let extracting = matches!(state, ScreenState::Extracting(_));
    let submitting = matches!(state, ScreenState::Submitting(_));
    let submitted = matches!(state, ScreenState::Submitted(_));
    let uri = app.controller.screen().image().map(|image| image.uri());
    let serial = app.controller.screen().serial().map(|s| s.to_string());

    if let Some(uri) = &uri {
        ui.add(
            egui::Image::new(uri.as_str())
                .max_height(ui.available_height() * 0.5)
                .maintain_aspect_ratio(true)
                .rounding(egui::Rounding::same(8.0)),
        );
    }

    Components::card(ui, "Serial Number", |ui| match &serial {
        Some(serial) => {
            ui.label(egui::RichText::new(serial).monospace().size(22.0).strong());
        }
        None => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Reading serial number…");
            });
        }
    });

    ui.add_space(8.0);

    if submitted {
        let palette = Palette::new();
        Components::status_banner(ui, "Submitted", palette.success, egui::Color32::BLACK);
        ui.add_space(8.0);
    }

    if let Some(customer) = app.controller.customer_mut() {
        let response = ui.add(
            egui::TextEdit::singleline(customer)
                .hint_text("Customer code")
                .desired_width(f32::INFINITY),
        );
        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            app.controller.submit(now);
        }
    }

    if serial.is_some() {
        let label = if submitting {
            "Submitting…"
        } else if submitted {
            "Submit again"
        } else {
            "Submit"
        };
        if Components::primary_button(ui, label, !submitting).clicked() {
            app.controller.submit(now);
        }
        if !submitting && !app.controller.screen().can_submit() {
            ui.label(egui::RichText::new("Enter a customer code to submit").weak());
        }
    }

    ui.add_space(8.0);
    if ui
        .add_enabled(!extracting && !submitting, egui::Button::new("Retake"))
        .clicked()
    {
        app.controller.retake();
        if let Some(uri) = uri {
            ui.ctx().forget_image(&uri);
        }
    }
}
