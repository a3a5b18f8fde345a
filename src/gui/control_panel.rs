//! Control Panel Widget
//! Left side panel with data sources, filters, exports and status.

use crate::data::{FilterOptions, FilterSelection};
use egui::{Color32, ComboBox, RichText};
use std::path::{Path, PathBuf};

const ALL: &str = "All";

/// User settings for the dashboard
#[derive(Default, Clone)]
pub struct UserSettings {
    pub transactions_path: Option<PathBuf>,
    pub towns_path: Option<PathBuf>,
    pub selection: FilterSelection,
}

/// Left side control panel with file selection, filters and exports.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub prefectures: Vec<String>,
    pub options: FilterOptions,
    pub status: String,
    pub charts_ready: bool,
    pub figure_export_enabled: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            prefectures: Vec::new(),
            options: FilterOptions::default(),
            status: "Ready".to_string(),
            charts_ready: false,
            figure_export_enabled: false,
        }
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefectures of a freshly loaded table; an unknown selection falls back to "All".
    pub fn set_prefectures(&mut self, prefectures: Vec<String>) {
        let selection = &mut self.settings.selection;
        if !contains(&prefectures, &selection.prefecture) {
            selection.prefecture = None;
        }
        self.prefectures = prefectures;
    }

    /// Selector values for the current prefecture.
    ///
    /// The period falls back to the earliest one; purpose and city fall back to "All".
    pub fn set_options(&mut self, options: FilterOptions) {
        let selection = &mut self.settings.selection;
        if selection.period.is_none() || !contains(&options.periods, &selection.period) {
            selection.period = options.periods.first().cloned();
        }
        if !contains(&options.purposes, &selection.purpose_of_use) {
            selection.purpose_of_use = None;
        }
        if !contains(&options.cities, &selection.city) {
            selection.city = None;
        }
        self.options = options;
    }

    pub fn clear_data(&mut self) {
        self.prefectures.clear();
        self.options = FilterOptions::default();
        self.charts_ready = false;
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🏠 Japan Real Estate")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("Transactions Dashboard")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                if file_row(ui, "Transactions", self.settings.transactions_path.as_deref()) {
                    action = ControlPanelAction::BrowseTransactions;
                }
                ui.add_space(4.0);
                if file_row(ui, "Towns", self.settings.towns_path.as_deref()) {
                    action = ControlPanelAction::BrowseTowns;
                }
            });

        ui.add_space(8.0);
        ui.vertical_centered(|ui| {
            let ready = self.settings.transactions_path.is_some() && self.settings.towns_path.is_some();
            ui.add_enabled_ui(ready, |ui| {
                let button = egui::Button::new(RichText::new("▶ Load & Clean").size(16.0))
                    .min_size(egui::vec2(200.0, 35.0));
                if ui.add(button).clicked() {
                    action = ControlPanelAction::Load;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Filter Section =====
        ui.label(RichText::new("🔧 Filters").size(14.0).strong());
        ui.add_space(8.0);

        let selection = &mut self.settings.selection;
        if filter_combo(ui, "prefecture", "Prefecture:", &mut selection.prefecture, &self.prefectures, true) {
            action = ControlPanelAction::PrefectureChanged;
        }
        ui.add_space(5.0);
        if filter_combo(ui, "period", "Quarter:", &mut selection.period, &self.options.periods, false) {
            action = ControlPanelAction::FiltersChanged;
        }
        ui.add_space(5.0);
        if filter_combo(ui, "purpose", "Purpose of Use:", &mut selection.purpose_of_use, &self.options.purposes, true) {
            action = ControlPanelAction::FiltersChanged;
        }
        ui.add_space(5.0);
        if filter_combo(ui, "city", "City:", &mut selection.city, &self.options.cities, true) {
            action = ControlPanelAction::FiltersChanged;
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Export Section =====
        ui.label(RichText::new("💾 Export").size(14.0).strong());
        ui.add_space(5.0);

        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.charts_ready, |ui| {
                let size = egui::vec2(200.0, 28.0);
                if ui
                    .add(egui::Button::new("🗺 Point Map PNG").min_size(size))
                    .clicked()
                {
                    action = ControlPanelAction::ExportScatterPng;
                }
                if ui
                    .add(egui::Button::new("⬡ Hexbin Frame PNG").min_size(size))
                    .clicked()
                {
                    action = ControlPanelAction::ExportHexbinPng;
                }
                ui.add_enabled_ui(self.figure_export_enabled, |ui| {
                    if ui
                        .add(egui::Button::new("📄 Plotly Figures (JSON)").min_size(size))
                        .on_disabled_hover_text("Set MAPBOX_SECRET and MAPBOX_STYLE")
                        .clicked()
                    {
                        action = ControlPanelAction::ExportFigures;
                    }
                });
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status Section =====
        ui.label(RichText::new("📊 Status").size(14.0).strong());
        ui.add_space(5.0);

        let status_color = if self.status.contains("Error") {
            Color32::from_rgb(220, 53, 69)
        } else if self.status.starts_with("Loaded") || self.status.starts_with("Exported") {
            Color32::from_rgb(40, 167, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }
}

fn contains(values: &[String], selected: &Option<String>) -> bool {
    match selected {
        Some(value) => values.contains(value),
        None => true,
    }
}

/// File name with a Browse button; true when the button was clicked.
fn file_row(ui: &mut egui::Ui, label: &str, path: Option<&Path>) -> bool {
    let mut clicked = false;
    ui.horizontal(|ui| {
        let path_text = path
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "No file selected".to_string());

        ui.label(RichText::new(format!("{label}:")).size(12.0).strong());
        ui.label(RichText::new(&path_text).size(12.0).color(if path.is_some() {
            Color32::WHITE
        } else {
            Color32::GRAY
        }));

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button("📂 Browse").clicked() {
                clicked = true;
            }
        });
    });
    clicked
}

/// Labelled combo box; `None` is shown as "All". Returns true when the value changed.
fn filter_combo(
    ui: &mut egui::Ui,
    id: &str,
    label: &str,
    value: &mut Option<String>,
    options: &[String],
    allow_all: bool,
) -> bool {
    let label_width = 110.0;
    let combo_width = 150.0;
    let mut changed = false;

    ui.horizontal(|ui| {
        ui.add_sized([label_width, 20.0], egui::Label::new(label));
        ComboBox::from_id_salt(id)
            .width(combo_width)
            .selected_text(value.as_deref().unwrap_or(ALL))
            .show_ui(ui, |ui| {
                if allow_all && ui.selectable_label(value.is_none(), ALL).clicked() {
                    changed |= value.take().is_some();
                }
                for option in options {
                    let selected = value.as_deref() == Some(option.as_str());
                    if ui.selectable_label(selected, option).clicked() && !selected {
                        *value = Some(option.clone());
                        changed = true;
                    }
                }
            });
    });
    changed
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseTransactions,
    BrowseTowns,
    Load,
    PrefectureChanged,
    FiltersChanged,
    ExportScatterPng,
    ExportHexbinPng,
    ExportFigures,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn options_default_to_earliest_period() {
        let mut panel = ControlPanel::new();
        panel.set_options(FilterOptions {
            periods: strings(&["2021-1", "2021-2"]),
            purposes: strings(&["House"]),
            cities: strings(&["Chiyoda Ward"]),
        });
        assert_eq!(panel.settings.selection.period.as_deref(), Some("2021-1"));
        assert_eq!(panel.settings.selection.purpose_of_use, None);
    }

    #[test]
    fn stale_selections_reset() {
        let mut panel = ControlPanel::new();
        panel.settings.selection = FilterSelection {
            prefecture: Some("Kyoto".into()),
            period: Some("2021-2".into()),
            purpose_of_use: Some("Office".into()),
            city: Some("Minato Ward".into()),
        };
        panel.set_prefectures(strings(&["Osaka", "Tokyo"]));
        assert_eq!(panel.settings.selection.prefecture, None);

        panel.set_options(FilterOptions {
            periods: strings(&["2020-4", "2021-2"]),
            purposes: strings(&["House"]),
            cities: strings(&["Minato Ward"]),
        });
        let selection = &panel.settings.selection;
        assert_eq!(selection.period.as_deref(), Some("2021-2"));
        assert_eq!(selection.purpose_of_use, None);
        assert_eq!(selection.city.as_deref(), Some("Minato Ward"));
    }
}
