use crate::domain::models::{MessageSeverity, StatusMessage};
use crate::domain::serial::SerialNormalization;
use crate::domain::settings::PayloadSource;
use crate::presentation::app::SerialCaptureApp;
use crate::presentation::components::Components;
use eframe::egui;
use std::time::Instant;

pub fn render(app: &mut SerialCaptureApp, ctx: &egui::Context, now: Instant) {
    let mut open = app.show_settings;
    let mut save_clicked = false;

    egui::Window::new("Settings")
        .open(&mut open)
        .collapsible(false)
        .resizable(true)
        .default_width(420.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                let settings = app.settings.get_mut();

                Components::card(ui, "Submission", |ui| {
                    egui::Grid::new("submission_grid")
                        .num_columns(2)
                        .spacing([10.0, 10.0])
                        .show(ui, |ui| {
                            ui.label("Webhook URL:");
                            ui.text_edit_singleline(&mut settings.webhook_url);
                            ui.end_row();

                            ui.label("Timeout (ms):");
                            ui.add(
                                egui::DragValue::new(&mut settings.webhook_timeout_ms)
                                    .range(100..=60_000)
                                    .speed(100),
                            );
                            ui.end_row();

                            ui.label("Access token:");
                            let token = settings.access_token.get_or_insert_with(String::new);
                            ui.add(egui::TextEdit::singleline(token).password(true));
                            ui.end_row();
                        });
                    if settings.access_token.as_deref() == Some("") {
                        settings.access_token = None;
                    }
                });

                ui.add_space(10.0);

                Components::card(ui, "Camera", |ui| {
                    ui.horizontal(|ui| {
                        ui.label("Viewfinder refresh (ms, 0 = off):");
                        ui.add(
                            egui::DragValue::new(&mut settings.preview_interval_ms)
                                .range(0..=5_000)
                                .speed(50),
                        );
                    });
                });

                ui.add_space(10.0);

                Components::card(ui, "Recognition", |ui| {
                    ui.radio_value(
                        &mut settings.serial_normalization,
                        SerialNormalization::Preserve,
                        "Keep serial as read",
                    );
                    ui.radio_value(
                        &mut settings.serial_normalization,
                        SerialNormalization::LeadingSToFive,
                        "Read a leading 'S' as '5'",
                    );
                    ui.horizontal(|ui| {
                        ui.label("Notice duration (ms):");
                        ui.add(
                            egui::DragValue::new(&mut settings.notice_duration_ms)
                                .range(500..=30_000)
                                .speed(100),
                        );
                    });
                });

                ui.add_space(10.0);

                Components::card(ui, "Keyboard Peripheral", |ui| {
                    ui.checkbox(&mut settings.pairing_enabled, "Pair on start");
                    ui.add_enabled_ui(settings.pairing_enabled, |ui| {
                        egui::Grid::new("pairing_grid")
                            .num_columns(2)
                            .spacing([10.0, 10.0])
                            .show(ui, |ui| {
                                ui.label("Name contains:");
                                ui.text_edit_singleline(&mut settings.peripheral_name_fragment);
                                ui.end_row();

                                ui.label("Scan timeout (s):");
                                ui.add(
                                    egui::DragValue::new(&mut settings.scan_timeout_secs)
                                        .range(5..=300),
                                );
                                ui.end_row();
                            });

                        let mut fixed =
                            matches!(settings.payload_source, PayloadSource::Fixed { .. });
                        if ui.checkbox(&mut fixed, "Send a fixed payload").changed() {
                            settings.payload_source = if fixed {
                                PayloadSource::Fixed {
                                    base64: String::new(),
                                }
                            } else {
                                PayloadSource::ResponsePassword
                            };
                        }
                        if let PayloadSource::Fixed { base64 } = &mut settings.payload_source {
                            ui.horizontal(|ui| {
                                ui.label("Payload (base64):");
                                ui.text_edit_singleline(base64);
                            });
                        }

                        ui.collapsing("Override GATT UUIDs", |ui| {
                            egui::Grid::new("ble_uuids")
                                .spacing([10.0, 10.0])
                                .show(ui, |ui| {
                                    ui.label("Service:");
                                    ui.text_edit_singleline(&mut settings.ble_service_uuid);
                                    ui.end_row();
                                    ui.label("Characteristic:");
                                    ui.text_edit_singleline(&mut settings.ble_credential_char_uuid);
                                    ui.end_row();
                                });
                        });
                    });
                });

                ui.add_space(10.0);
                ui.label(
                    egui::RichText::new("Changes take effect after a restart.")
                        .small()
                        .weak(),
                );
                if ui.button("Save").clicked() {
                    save_clicked = true;
                }
            });
        });

    if save_clicked {
        let message = match app.settings.save() {
            Ok(()) => StatusMessage::new("Settings saved", MessageSeverity::Success),
            Err(e) => {
                tracing::error!("Failed to save settings: {}", e);
                StatusMessage::new("Could not save settings", MessageSeverity::Error)
            }
        };
        app.controller.notify(message, now);
    }
    app.show_settings = open;
}
