//! Control Panel Widget
//! Left side panel with display toggles, data source and export controls.

use crate::config::DisplayDefaults;
use crate::data::{TableKind, Unit};
use egui::{Color32, ComboBox, RichText};
use std::path::PathBuf;

/// Display settings chosen in the sidebar
#[derive(Debug, Clone, PartialEq)]
pub struct UserSettings {
    pub unit: Unit,
    pub show_unknowns: bool,
    pub age_smoothing: usize,
    pub export_table: TableKind,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self::from(&DisplayDefaults::default())
    }
}

impl From<&DisplayDefaults> for UserSettings {
    fn from(d: &DisplayDefaults) -> Self {
        let mut settings = Self {
            unit: d.unit,
            show_unknowns: d.show_unknowns,
            age_smoothing: d.age_smoothing,
            export_table: TableKind::HouseholdSize,
        };
        settings.normalize();
        settings
    }
}

impl UserSettings {
    /// Keep the smoothing window odd and within 1..=9.
    pub fn normalize(&mut self) {
        let w = self.age_smoothing.clamp(1, 9);
        self.age_smoothing = if w % 2 == 0 { w + 1 } else { w };
    }
}

/// Left side control panel.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub source_description: String,
    pub last_export: Option<PathBuf>,
    pub progress: f32,
    pub status: String,
    pub busy: bool,
}

impl ControlPanel {
    pub fn new(settings: UserSettings) -> Self {
        Self {
            settings,
            source_description: String::new(),
            last_export: None,
            progress: 0.0,
            status: "Ready".to_string(),
            busy: false,
        }
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📊 Household Dashboard")
                    .size(20.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Display Controls =====
        ui.label(RichText::new("⚙️ Controls").size(14.0).strong());
        ui.add_space(5.0);

        ui.label("Show values as");
        ui.horizontal(|ui| {
            ui.radio_value(&mut self.settings.unit, Unit::Percent, Unit::Percent.label());
            ui.radio_value(&mut self.settings.unit, Unit::Count, Unit::Count.label());
        });

        ui.add_space(5.0);
        ui.checkbox(
            &mut self.settings.show_unknowns,
            "Show 'Unknown' segments where present",
        );

        ui.add_space(5.0);
        ui.label("Age trend smoothing (rolling window)");
        ui.add(egui::Slider::new(&mut self.settings.age_smoothing, 1..=9).step_by(2.0))
            .on_hover_text("Apply a centered rolling mean to the age line.");
        self.settings.normalize();

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Data Source =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(&self.source_description).size(12.0));
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.add_enabled_ui(!self.busy, |ui| {
                            if ui.button("🔄 Reload data").clicked() {
                                action = ControlPanelAction::Reload;
                            }
                        });
                    });
                });
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Export =====
        ui.label(RichText::new("💾 Export Data").size(14.0).strong());
        ui.add_space(5.0);

        ComboBox::from_id_salt("export_table")
            .width(220.0)
            .selected_text(self.settings.export_table.file_name())
            .show_ui(ui, |ui| {
                for kind in TableKind::ALL {
                    ui.selectable_value(&mut self.settings.export_table, kind, kind.file_name());
                }
            });

        ui.add_space(8.0);
        ui.add_enabled_ui(!self.busy, |ui| {
            ui.vertical_centered(|ui| {
                let button = egui::Button::new(RichText::new("⬇ Download CSV").size(14.0))
                    .min_size(egui::vec2(200.0, 28.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::DownloadCsv(self.settings.export_table);
                }
                ui.add_space(4.0);
                if ui
                    .add(egui::Button::new("🗜 Export all (zip)").min_size(egui::vec2(200.0, 24.0)))
                    .clicked()
                {
                    action = ControlPanelAction::ExportZip;
                }
                ui.add_space(4.0);
                if ui
                    .add(egui::Button::new("🖼 Save charts (PNG)").min_size(egui::vec2(200.0, 24.0)))
                    .clicked()
                {
                    action = ControlPanelAction::SaveCharts;
                }
            });
        });

        ui.add_space(4.0);
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.last_export.is_some(), |ui| {
                if ui.small_button("📂 Open last export").clicked() {
                    action = ControlPanelAction::OpenLastExport;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status =====
        if self.busy {
            ui.add(egui::ProgressBar::new(self.progress / 100.0).animate(true));
            ui.add_space(5.0);
        }

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.contains("Exported") || self.status.contains("Loaded") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Set progress and status
    pub fn set_progress(&mut self, progress: f32, status: &str) {
        self.progress = progress;
        self.status = status.to_string();
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    Reload,
    DownloadCsv(TableKind),
    ExportZip,
    SaveCharts,
    OpenLastExport,
}
