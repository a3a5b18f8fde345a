//! Japan Real Estate Transactions - cleaning pipeline & interactive map dashboard
//!
//! Cleans the Shift_JIS transaction export, joins town coordinates and shows the result
//! as filterable maps and charts.

mod charts;
mod config;
mod data;
mod gui;
mod stats;

use anyhow::{anyhow, Context};
use config::AppConfig;
use eframe::egui;
use gui::RealEstateApp;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1200.0, 700.0])
            .with_title("Japan Real Estate Transactions"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Japan Real Estate Transactions",
        options,
        Box::new(|cc| Ok(Box::new(RealEstateApp::new(cc, config)))),
    )
    .map_err(|e| anyhow!("Failed to start the dashboard: {e}"))
}
