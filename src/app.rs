use std::path::Path;

use eframe::egui;

use crate::config::{ConfigError, ViewerConfig};
use crate::data::worker::BackgroundLoader;
use crate::state::{LoadRequest, ViewEvent, ViewState};
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct VoyageMapApp {
    pub state: ViewState,
    loader: BackgroundLoader,
    plot: plot::PlotMemory,
    ctx: egui::Context,
    /// UI-level message (bad config file, rejected input).
    status_message: Option<String>,
}

impl VoyageMapApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Result<Self, ConfigError> {
        let mut state = ViewState::new(&config)?;
        let ctx = cc.egui_ctx.clone();
        let mut loader = repainting_loader(&ctx);
        start_loads(&mut loader, state.bootstrap());
        Ok(Self {
            state,
            loader,
            plot: plot::PlotMemory::default(),
            ctx,
            status_message: None,
        })
    }

    fn dispatch(&mut self, event: ViewEvent) {
        match self.state.apply(event) {
            Ok(requests) => start_loads(&mut self.loader, requests),
            Err(e) => {
                log::warn!("Rejected input: {e}");
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Replace the whole view with one built from another config file.
    /// Loads still running for the old view are dropped with its loader.
    fn open_config(&mut self, path: &Path) {
        let rebuilt = ViewerConfig::load(path).and_then(|config| Ok(ViewState::new(&config)?));
        match rebuilt {
            Ok(mut state) => {
                let mut loader = repainting_loader(&self.ctx);
                start_loads(&mut loader, state.bootstrap());
                self.state = state;
                self.loader = loader;
                self.plot = plot::PlotMemory::default();
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to open config: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

fn repainting_loader(ctx: &egui::Context) -> BackgroundLoader {
    let ctx = ctx.clone();
    BackgroundLoader::with_notifier(move || ctx.request_repaint())
}

fn start_loads(loader: &mut BackgroundLoader, requests: Vec<LoadRequest>) {
    for request in requests {
        loader.request(request);
    }
}

impl eframe::App for VoyageMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        for outcome in self.loader.drain() {
            self.dispatch(outcome.into());
        }

        let mut events = Vec::new();
        let mut open_config = None;

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            open_config = panels::top_bar(ui, &self.state, self.status_message.as_deref());
        });

        // ---- Left side panel: categories, temperature, month ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &self.state, &mut events);
            });

        // ---- Central panel: map plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::map_plot(ui, &self.state, &mut self.plot, &mut events);
        });

        for event in events {
            self.dispatch(event);
        }
        if let Some(path) = open_config {
            self.open_config(&path);
        }
    }
}
