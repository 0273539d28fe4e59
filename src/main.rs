mod app;
mod color;
mod config;
mod data;
mod state;
mod tooltip;
mod ui;

use app::VoyageMapApp;
use config::ViewerConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = ViewerConfig::from_args_or_env().unwrap_or_else(|e| {
        log::error!("{e:#}; using the built-in configuration");
        ViewerConfig::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Voyage Map",
        options,
        Box::new(|cc| Ok(Box::new(VoyageMapApp::new(cc, config)?))),
    )
}
