//! Chart Viewer Widget
//! Central scrollable panel: title, animated hexbin, point map, layout bars and trends.

use crate::charts::{ChartPlotter, DashboardCharts};
use egui::{Color32, RichText, ScrollArea};
use std::time::Duration;

const CHART_SPACING: f32 = 15.0;
/// Time each hexbin period stays on screen while playing.
const FRAME_DURATION: Duration = Duration::from_millis(800);

/// Scrollable dashboard for the current filter selection.
#[derive(Default)]
pub struct ChartViewer {
    pub charts: Option<DashboardCharts>,
    /// Hexbin period currently shown.
    pub frame_index: usize,
    playing: bool,
    last_step: Option<f64>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.charts = None;
        self.frame_index = 0;
        self.playing = false;
        self.last_step = None;
    }

    /// Replace the charts, keeping the hexbin period when it still exists.
    pub fn set_charts(&mut self, charts: DashboardCharts) {
        let frames = charts.hexbin.as_ref().map_or(0, |h| h.frames.len());
        if self.frame_index >= frames {
            self.frame_index = 0;
        }
        self.charts = Some(charts);
    }

    fn frame_count(&self) -> usize {
        self.charts
            .as_ref()
            .and_then(|c| c.hexbin.as_ref())
            .map_or(0, |h| h.frames.len())
    }

    /// Advance the animation when a frame has been shown long enough.
    fn tick(&mut self, ctx: &egui::Context) {
        if !self.playing {
            self.last_step = None;
            return;
        }
        let frames = self.frame_count();
        if frames < 2 {
            self.playing = false;
            return;
        }

        let now = ctx.input(|i| i.time);
        let last = *self.last_step.get_or_insert(now);
        if now - last >= FRAME_DURATION.as_secs_f64() {
            self.frame_index = (self.frame_index + 1) % frames;
            self.last_step = Some(now);
        }
        ctx.request_repaint_after(FRAME_DURATION);
    }

    pub fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        self.tick(ctx);

        let Some(charts) = &self.charts else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        let mut frame_index = self.frame_index;
        let mut playing = self.playing;

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(
                        RichText::new("Japan Real Estate Transactions")
                            .size(24.0)
                            .strong(),
                    );
                    ui.label(
                        RichText::new(&charts.title)
                            .size(15.0)
                            .color(Color32::from_rgb(100, 149, 237)),
                    );
                });
                ui.add_space(CHART_SPACING);

                // Hexbin animation over the whole prefecture
                card(ui, "Mean Price per M² by Period", |ui| match &charts.hexbin {
                    Some(hexbin) => {
                        let last = hexbin.frames.len().saturating_sub(1);
                        ui.horizontal(|ui| {
                            let label = if playing { "⏸ Pause" } else { "▶ Play" };
                            if ui.button(label).clicked() {
                                playing = !playing;
                            }
                            ui.add(
                                egui::Slider::new(&mut frame_index, 0..=last)
                                    .custom_formatter(|v, _| {
                                        hexbin
                                            .frames
                                            .get(v as usize)
                                            .map(|f| f.period.clone())
                                            .unwrap_or_default()
                                    })
                                    .text("Period"),
                            );
                        });
                        if let Some(frame) = hexbin.frames.get(frame_index) {
                            ChartPlotter::draw_hexbin_frame(ui, hexbin, frame);
                        }
                    }
                    None => {
                        ui.label("No transactions in this prefecture");
                    }
                });

                // Point map of the filtered quarter
                card(ui, "Transactions", |ui| {
                    match &charts.scatter {
                        Some(scatter) => ChartPlotter::draw_scatter_map(ui, scatter),
                        None => {
                            ui.label("No transactions match the current filters");
                        }
                    }
                    ui.add_space(8.0);
                    ChartPlotter::draw_summary_table(ui, &charts.summary);
                });

                let half = ((ui.available_width() - CHART_SPACING) / 2.0).max(200.0);
                ui.horizontal_top(|ui| {
                    ui.vertical(|ui| {
                        ui.set_width(half);
                        card(ui, "Layout Vs Unit Price per Meter Square", |ui| {
                            ChartPlotter::draw_layout_bars(ui, &charts.layout_means);
                        });
                    });
                    ui.vertical(|ui| {
                        ui.set_width(half);
                        card(ui, "Purpose of Use Vs Unit Price per Meter Square", |ui| {
                            ChartPlotter::draw_purpose_trends(ui, &charts.trends);
                        });
                    });
                });
            });

        if playing != self.playing {
            self.last_step = None;
        }
        self.frame_index = frame_index;
        self.playing = playing;
    }
}

/// Framed chart card with a heading.
fn card(ui: &mut egui::Ui, heading: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .rounding(8.0)
        .stroke(egui::Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color))
        .fill(ui.visuals().widgets.noninteractive.bg_fill)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.label(RichText::new(heading).size(16.0).strong());
            ui.add_space(8.0);
            add_contents(ui);
        });
    ui.add_space(CHART_SPACING);
}
