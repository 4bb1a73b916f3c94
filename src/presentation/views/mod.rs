//! Screen views. Each renders one group of screen states.

pub mod camera;
pub mod permission;
pub mod picture;
pub mod settings;

use crate::domain::screen::ScreenState;
use crate::presentation::app::SerialCaptureApp;
use crate::presentation::components::Components;
use crate::presentation::theme::Palette;
use eframe::egui;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Pending,
    Permission,
    Camera,
    Picture,
}

impl View {
    fn for_state(state: &ScreenState) -> Self {
        match state {
            ScreenState::PermissionPending => Self::Pending,
            ScreenState::PermissionDenied => Self::Permission,
            ScreenState::Viewfinder | ScreenState::Capturing => Self::Camera,
            ScreenState::Extracting(_)
            | ScreenState::Captured(_)
            | ScreenState::Submitting(_)
            | ScreenState::Submitted(_) => Self::Picture,
        }
    }
}

pub fn render(app: &mut SerialCaptureApp, ctx: &egui::Context, now: Instant) {
    top_bar(app, ctx);

    let view = View::for_state(app.controller.screen().state());
    egui::CentralPanel::default().show(ctx, |ui| match view {
        View::Pending => {
            ui.centered_and_justified(|ui| {
                ui.spinner();
            });
        }
        View::Permission => permission::render(app, ui),
        View::Camera => camera::render(app, ui),
        View::Picture => picture::render(app, ui, now),
    });

    if app.show_settings {
        settings::render(app, ctx, now);
    }

    if let Some(message) = app.controller.notices().current() {
        Components::notice(ctx, message);
    }
}

fn top_bar(app: &mut SerialCaptureApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
        ui.horizontal(|ui| {
            Components::sub_heading(ui, "Serial Capture");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("⚙").on_hover_text("Settings").clicked() {
                    app.show_settings = !app.show_settings;
                }
                if app.controller.pairing_enabled() {
                    peripheral_badge(app, ui);
                }
            });
        });
    });
}

fn peripheral_badge(app: &mut SerialCaptureApp, ui: &mut egui::Ui) {
    let palette = Palette::new();
    let peripheral = app.controller.peripheral();
    let color = if peripheral.is_connected() {
        palette.success
    } else {
        palette.stroke
    };
    let text = match peripheral.device() {
        Some(device) => format!("{} {}", peripheral.label(), device.name),
        None => peripheral.label().to_string(),
    };
    ui.label(
        egui::RichText::new(text)
            .color(egui::Color32::BLACK)
            .background_color(color)
            .small(),
    );

    if peripheral.is_connected() {
        if ui.small_button("Disconnect").clicked() {
            app.controller.disconnect_peripheral();
        }
    } else if peripheral.can_scan() && ui.small_button("Pair").clicked() {
        app.controller.pair();
    }
}
