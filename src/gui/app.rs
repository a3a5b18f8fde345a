//! Dashboard Main Application
//! Main window with control panel and chart viewer.

use crate::charts::{figure, DashboardCharts, StaticChartRenderer};
use crate::config::AppConfig;
use crate::data::{CleanedTable, Preprocessor, TransactionView, HEXBIN_HEXAGONS, HEXBIN_ZOOM};
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use anyhow::{anyhow, Context, Result};
use egui::SidePanel;
use std::path::{Path, PathBuf};
use tracing::{error, info};

const PNG_WIDTH: u32 = 1400;
const PNG_HEIGHT: u32 = 1000;

/// Main application window.
pub struct RealEstateApp {
    config: AppConfig,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
    /// Cleaned table of the last successful load.
    table: Option<CleanedTable>,
}

impl RealEstateApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let mut app = Self {
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
            table: None,
            config,
        };
        app.control_panel.figure_export_enabled = app.config.mapbox.is_some();

        if let Some((transactions, towns)) = app.config.default_sources() {
            app.control_panel.settings.transactions_path = Some(transactions);
            app.control_panel.settings.towns_path = Some(towns);
            app.handle_load();
        }
        app
    }

    fn handle_browse(&mut self, transactions: bool) {
        let title = if transactions {
            "Transactions CSV (Shift_JIS)"
        } else {
            "Towns CSV"
        };
        if let Some(path) = rfd::FileDialog::new()
            .set_title(title)
            .add_filter("CSV Files", &["csv"])
            .pick_file()
        {
            let settings = &mut self.control_panel.settings;
            if transactions {
                settings.transactions_path = Some(path);
            } else {
                settings.towns_path = Some(path);
            }
        }
    }

    /// Run the cleaning pipeline on the selected files. A failed load leaves no data.
    fn handle_load(&mut self) {
        let settings = &self.control_panel.settings;
        let (Some(transactions), Some(towns)) =
            (settings.transactions_path.clone(), settings.towns_path.clone())
        else {
            self.control_panel.set_status("Select both CSV files first");
            return;
        };

        self.table = None;
        self.chart_viewer.clear();
        self.control_panel.clear_data();

        match Preprocessor::new(transactions, towns).process() {
            Ok(table) => {
                let status = format!(
                    "Loaded {} transactions ({} without coordinates dropped)",
                    table.height(),
                    table.unmatched_rows()
                );
                self.table = Some(table);
                match self.refresh_options().and_then(|_| self.refresh_charts()) {
                    Ok(()) => self.control_panel.set_status(status),
                    Err(e) => self.report_error("Error preparing charts", &e),
                }
            }
            Err(e) => self.report_error("Error loading data", &anyhow!(e)),
        }
    }

    /// Refill the prefecture and filter selectors from the loaded table.
    fn refresh_options(&mut self) -> Result<()> {
        let Some(table) = &self.table else {
            return Ok(());
        };
        let view = TransactionView::new(&table.frame);
        self.control_panel.set_prefectures(view.prefectures()?);
        let prefecture = self.control_panel.settings.selection.prefecture.clone();
        self.control_panel.set_options(view.options(prefecture.as_deref())?);
        Ok(())
    }

    /// Rebuild every chart for the current selection.
    fn refresh_charts(&mut self) -> Result<()> {
        let Some(table) = &self.table else {
            return Ok(());
        };
        let selection = &self.control_panel.settings.selection;
        let filtered = TransactionView::new(&table.frame).select(selection)?;
        let charts = DashboardCharts::from_view(&filtered, selection, HEXBIN_ZOOM, HEXBIN_HEXAGONS)?;
        self.chart_viewer.set_charts(charts);
        self.control_panel.charts_ready = true;
        Ok(())
    }

    fn export_scatter_png(&self) -> Result<Option<PathBuf>> {
        let scatter = self
            .chart_viewer
            .charts
            .as_ref()
            .and_then(|c| c.scatter.as_ref())
            .context("No point map to export")?;
        let Some(path) = save_dialog("PNG Image", "png", "point_map.png") else {
            return Ok(None);
        };
        let title = self.chart_viewer.charts.as_ref().map(|c| c.title.as_str());
        let image = StaticChartRenderer::render_scatter(scatter, PNG_WIDTH, PNG_HEIGHT, title)
            .context("Failed to render point map")?;
        StaticChartRenderer::save_png(&image, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(Some(path))
    }

    fn export_hexbin_png(&self) -> Result<Option<PathBuf>> {
        let hexbin = self
            .chart_viewer
            .charts
            .as_ref()
            .and_then(|c| c.hexbin.as_ref())
            .context("No hexbin map to export")?;
        let frame = self.chart_viewer.frame_index;
        let Some(path) = save_dialog("PNG Image", "png", "hexbin_map.png") else {
            return Ok(None);
        };
        let image = StaticChartRenderer::render_hexbin_frame(
            hexbin,
            frame,
            PNG_WIDTH,
            PNG_HEIGHT,
            Some("Mean Price per M²"),
        )
        .context("Failed to render hexbin map")?;
        StaticChartRenderer::save_png(&image, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(Some(path))
    }

    /// Write both maps as Plotly figure JSON into a chosen folder.
    fn export_figures(&self) -> Result<Option<PathBuf>> {
        let mapbox = self
            .config
            .mapbox
            .as_ref()
            .context("MAPBOX_SECRET and MAPBOX_STYLE are not configured")?;
        let charts = self
            .chart_viewer
            .charts
            .as_ref()
            .context("No charts to export")?;
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return Ok(None);
        };

        if let Some(scatter) = &charts.scatter {
            write_figure(&figure::scatter_figure(scatter, mapbox), &dir.join("point_map.json"))?;
        }
        if let Some(hexbin) = &charts.hexbin {
            write_figure(&figure::hexbin_figure(hexbin, mapbox), &dir.join("hexbin_map.json"))?;
        }
        Ok(Some(dir))
    }

    fn handle_export(&mut self, result: Result<Option<PathBuf>>) {
        match result {
            Ok(Some(path)) => {
                info!(path = %path.display(), "Export complete");
                self.control_panel
                    .set_status(format!("Exported to {}", path.display()));
            }
            Ok(None) => {}
            Err(e) => self.report_error("Export error", &e),
        }
    }

    fn report_error(&mut self, context: &str, e: &anyhow::Error) {
        error!("{context}: {e:#}");
        self.control_panel.set_status(format!("{context}: {e:#}"));
    }
}

fn save_dialog(filter: &str, extension: &str, file_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(filter, &[extension])
        .set_file_name(file_name)
        .save_file()
}

fn write_figure(figure: &figure::Figure, path: &Path) -> Result<()> {
    let json = figure.to_json().context("Failed to serialize figure")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

impl eframe::App for RealEstateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseTransactions => self.handle_browse(true),
                        ControlPanelAction::BrowseTowns => self.handle_browse(false),
                        ControlPanelAction::Load => self.handle_load(),
                        ControlPanelAction::PrefectureChanged => {
                            if let Err(e) = self.refresh_options().and_then(|_| self.refresh_charts()) {
                                self.report_error("Error applying filters", &e);
                            }
                        }
                        ControlPanelAction::FiltersChanged => {
                            if let Err(e) = self.refresh_charts() {
                                self.report_error("Error applying filters", &e);
                            }
                        }
                        ControlPanelAction::ExportScatterPng => {
                            let result = self.export_scatter_png();
                            self.handle_export(result);
                        }
                        ControlPanelAction::ExportHexbinPng => {
                            let result = self.export_hexbin_png();
                            self.handle_export(result);
                        }
                        ControlPanelAction::ExportFigures => {
                            let result = self.export_figures();
                            self.handle_export(result);
                        }
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Chart Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ctx, ui);
        });
    }
}
