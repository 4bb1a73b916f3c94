use crate::domain::models::StatusMessage;
use crate::presentation::theme::Palette;
use eframe::egui;

pub struct Components;

impl Components {
    pub fn heading(ui: &mut egui::Ui, text: &str) {
        ui.label(egui::RichText::new(text).heading().strong());
    }

    pub fn sub_heading(ui: &mut egui::Ui, text: &str) {
        ui.label(egui::RichText::new(text).strong().size(17.0));
    }

    pub fn card<R>(
        ui: &mut egui::Ui,
        title: &str,
        add_contents: impl FnOnce(&mut egui::Ui) -> R,
    ) -> R {
        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let bg = ui.style().visuals.widgets.noninteractive.bg_fill;

        egui::Frame::none()
            .inner_margin(egui::Margin::same(15.0))
            .rounding(egui::Rounding::same(8.0))
            .stroke(stroke)
            .fill(bg)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(title).strong().size(18.0));
                    ui.add_space(8.0);
                    add_contents(ui)
                })
                .inner
            })
            .inner
    }

    /// Full-width action button in the accent colour
    pub fn primary_button(ui: &mut egui::Ui, text: &str, enabled: bool) -> egui::Response {
        let palette = Palette::new();
        ui.add_enabled(
            enabled,
            egui::Button::new(
                egui::RichText::new(text)
                    .color(egui::Color32::BLACK)
                    .strong(),
            )
            .fill(palette.accent)
            .min_size(egui::vec2(ui.available_width(), 48.0)),
        )
    }

    pub fn status_banner(
        ui: &mut egui::Ui,
        text: &str,
        bg_color: egui::Color32,
        text_color: egui::Color32,
    ) {
        ui.add_sized(
            [ui.available_width(), 35.0],
            egui::Label::new(
                egui::RichText::new(text)
                    .color(text_color)
                    .background_color(bg_color)
                    .size(16.0)
                    .strong(),
            )
            .wrap_mode(egui::TextWrapMode::Extend),
        );
    }

    /// Transient notice pinned to the bottom of the window
    pub fn notice(ctx: &egui::Context, message: &StatusMessage) {
        let palette = Palette::new();
        egui::Area::new(egui::Id::new("notice"))
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -24.0))
            .order(egui::Order::Foreground)
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::none()
                    .fill(palette.severity(message.severity))
                    .rounding(egui::Rounding::same(6.0))
                    .inner_margin(egui::Margin::symmetric(16.0, 10.0))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(&message.message)
                                .color(egui::Color32::BLACK)
                                .strong(),
                        );
                    });
            });
    }
}
