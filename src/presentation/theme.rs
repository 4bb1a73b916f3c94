use crate::domain::models::MessageSeverity;
use eframe::egui;

pub struct Palette {
    pub bg: egui::Color32,
    pub surface: egui::Color32,
    pub fg: egui::Color32,
    pub stroke: egui::Color32,
    pub accent: egui::Color32,
    pub success: egui::Color32,
    pub warning: egui::Color32,
    pub error: egui::Color32,
    pub info: egui::Color32,
}

impl Palette {
    pub fn new() -> Self {
        Self {
            bg: egui::Color32::from_rgb(0x18, 0x1c, 0x20),
            surface: egui::Color32::from_rgb(0x22, 0x27, 0x2d),
            fg: egui::Color32::WHITE,
            stroke: egui::Color32::from_gray(90),
            accent: egui::Color32::from_rgb(0xff, 0x87, 0x00),
            success: egui::Color32::from_rgb(0, 200, 100),
            warning: egui::Color32::from_rgb(255, 200, 0),
            error: egui::Color32::from_rgb(255, 80, 80),
            info: egui::Color32::from_rgb(80, 160, 255),
        }
    }

    /// Banner background for a notice
    pub fn severity(&self, severity: MessageSeverity) -> egui::Color32 {
        match severity {
            MessageSeverity::Info => self.info,
            MessageSeverity::Success => self.success,
            MessageSeverity::Warning => self.warning,
            MessageSeverity::Error => self.error,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}

pub fn configure(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();
    let palette = Palette::new();

    // Typography
    style
        .text_styles
        .iter_mut()
        .for_each(|(text_style, font_id)| {
            font_id.size = match text_style {
                egui::TextStyle::Heading => 26.0,
                egui::TextStyle::Body => 16.0,
                egui::TextStyle::Button => 16.0,
                _ => font_id.size,
            };
        });

    // Spacing
    style.spacing.item_spacing = egui::vec2(12.0, 12.0);
    style.spacing.button_padding = egui::vec2(18.0, 12.0);

    // Visuals
    style.visuals = egui::Visuals::dark();
    style.visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(1.0, palette.stroke);
    style.visuals.widgets.noninteractive.bg_fill = palette.surface;
    style.visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, palette.fg);

    style.visuals.widgets.inactive.bg_fill = palette.surface;
    style.visuals.widgets.inactive.weak_bg_fill = palette.surface;
    style.visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);

    style.visuals.widgets.hovered.bg_fill = palette.accent;
    style.visuals.widgets.hovered.weak_bg_fill = palette.accent;
    style.visuals.widgets.hovered.fg_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);
    style.visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);

    style.visuals.widgets.active.bg_fill = palette.accent;
    style.visuals.widgets.active.weak_bg_fill = palette.accent;
    style.visuals.widgets.active.fg_stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);
    style.visuals.widgets.active.rounding = egui::Rounding::same(6.0);

    style.visuals.selection.bg_fill = palette.accent;
    style.visuals.selection.stroke = egui::Stroke::new(1.0, egui::Color32::BLACK);

    style.visuals.window_fill = palette.bg;
    style.visuals.panel_fill = palette.bg;
    style.visuals.override_text_color = Some(palette.fg);

    ctx.set_style(style);
}
