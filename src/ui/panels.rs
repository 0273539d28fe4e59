use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use super::MONTH_NAMES;
use crate::color::{TemperatureMode, to_color32};
use crate::data::model::DatasetState;
use crate::state::{ViewEvent, ViewState};

// ---------------------------------------------------------------------------
// Left side panel – category, temperature and month controls
// ---------------------------------------------------------------------------

/// Render the left control panel. Changes are pushed to `events` rather than
/// applied directly, so the state is only touched through `ViewState::apply`.
pub fn side_panel(ui: &mut Ui, state: &ViewState, events: &mut Vec<ViewEvent>) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Categories");
            ui.separator();
            for (_, spec, active, dataset) in state.category_states() {
                ui.horizontal(|ui: &mut Ui| {
                    let mut checked = active;
                    let text = format!("{} {}", spec.glyph, spec.label);
                    if ui.checkbox(&mut checked, text.trim()).changed() {
                        events.push(ViewEvent::SetCategoryActive {
                            category: spec.id.clone(),
                            active: checked,
                        });
                    }
                    match dataset {
                        DatasetState::Loading => {
                            ui.spinner();
                        }
                        DatasetState::Loaded(rows) => {
                            ui.weak(format!("{}", rows.len()));
                        }
                        DatasetState::NotRequested => {}
                    }
                });
            }

            ui.add_space(8.0);
            ui.heading("Temperature");
            ui.separator();
            temperature_controls(ui, state, events);

            ui.add_space(8.0);
            ui.heading("Datasets");
            ui.separator();
            dataset_table(ui, state);
        });
}

fn temperature_controls(ui: &mut Ui, state: &ViewState, events: &mut Vec<ViewEvent>) {
    let mode = state.mode();
    if ui
        .radio(mode == TemperatureMode::Absolute, "Absolute")
        .clicked()
    {
        events.push(ViewEvent::SetTemperatureMode(TemperatureMode::Absolute));
    }
    for (label, target) in state.presets() {
        let preset = TemperatureMode::Relative { target: *target };
        if ui.radio(mode == preset, label.as_str()).clicked() {
            events.push(ViewEvent::SetTemperatureMode(preset));
        }
    }

    ui.add_space(4.0);
    let mut month = state.month();
    let slider = egui::Slider::new(&mut month, 0..=11)
        .text("Month")
        .custom_formatter(|v, _| MONTH_NAMES[(v as usize).min(11)].to_string());
    if ui.add(slider).changed() {
        events.push(ViewEvent::SetMonth(month));
    }

    // Legend for the ramp in effect.
    let scale = state.temperature_scale();
    let unit = match scale.mode {
        TemperatureMode::Absolute => "°C",
        TemperatureMode::Relative { .. } => "°C off",
    };
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for (breakpoint, color) in scale.ramp().stops() {
            ui.label(RichText::new(format!("■ {breakpoint} {unit}")).color(to_color32(*color)));
        }
    });
}

fn dataset_table(ui: &mut Ui, state: &ViewState) {
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto())
        .column(Column::remainder())
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Category");
            });
            header.col(|ui| {
                ui.strong("Status");
            });
        })
        .body(|mut body| {
            for (_, spec, _, dataset) in state.category_states() {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(spec.id.as_str());
                    });
                    row.col(|ui| {
                        ui.label(dataset.label());
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar. Returns a config file the user picked.
pub fn top_bar(ui: &mut Ui, state: &ViewState, status: Option<&str>) -> Option<PathBuf> {
    let mut picked = None;
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open configuration…").clicked() {
                picked = open_config_dialog();
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label(format!(
            "{} points loaded, {} visible",
            state.loaded_row_count(),
            state.combined().len()
        ));
        if state.loads_in_flight() > 0 {
            ui.separator();
            ui.spinner();
        }

        if let Some(msg) = status.or(state.last_error()) {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
    picked
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

fn open_config_dialog() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open viewer configuration")
        .add_filter("JSON", &["json"])
        .pick_file()
}
