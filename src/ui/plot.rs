use std::f64::consts::PI;

use eframe::egui::{Align2, Color32, RichText, Stroke, Ui};
use egui_plot::{Legend, Plot, PlotBounds, PlotPoint, PlotResponse, Points, Polygon, Text};

use crate::color::{generate_palette, to_color32};
use crate::config::ViewParams;
use crate::data::bins::{Bin, bin_rows, cell_size_for_zoom, nearest};
use crate::data::filter::RowRef;
use crate::data::model::PointRow;
use crate::state::{ViewEvent, ViewState};
use crate::tooltip::{HoverTarget, format_tooltip};

/// Glyph labels drawn per frame; beyond this only the colored markers show.
const MAX_GLYPHS: usize = 400;

/// Plot bookkeeping that outlives a frame.
#[derive(Debug, Default)]
pub struct PlotMemory {
    bounds_set: bool,
}

#[derive(Debug, Clone, Copy)]
enum Hovered {
    Bin(usize),
    Row(RowRef),
}

// ---------------------------------------------------------------------------
// Map plot (central panel)
// ---------------------------------------------------------------------------

/// Render the combined collection: temperature cells as hexagons, other rows
/// as aggregated bins (zoomed out) or per-category markers (zoomed in).
pub fn map_plot(ui: &mut Ui, state: &ViewState, memory: &mut PlotMemory, events: &mut Vec<ViewEvent>) {
    let scale = state.temperature_scale();
    let view = state.view();
    let icons = state.icons_visible();
    let hex_radius = state.hex_radius();

    let mut cells: Vec<(RowRef, [f64; 2], Color32)> = Vec::new();
    let mut markers: Vec<(RowRef, [f64; 2])> = Vec::new();
    for (r, row) in state.combined_rows() {
        let Some(pos) = row.position() else {
            continue;
        };
        match scale.fill_color(row) {
            Some(fill) => cells.push((r, pos, to_color32(fill))),
            None => markers.push((r, pos)),
        }
    }

    let cell = cell_size_for_zoom(view.zoom);
    let bins = if icons {
        Vec::new()
    } else {
        bin_rows(
            markers
                .iter()
                .filter_map(|&(r, _)| state.row(r).map(|row| (r, row))),
            cell,
        )
    };

    let PlotResponse {
        inner: (hovered, bounds),
        response,
        ..
    } = Plot::new("voyage_map")
        .data_aspect(1.0)
        .x_axis_label("Longitude")
        .y_axis_label("Latitude")
        .show_x(false)
        .show_y(false)
        .legend(Legend::default())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if !memory.bounds_set {
                let span = ViewParams::span_for_zoom(view.zoom);
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                    [view.longitude - span / 2.0, view.latitude - span / 4.0],
                    [view.longitude + span / 2.0, view.latitude + span / 4.0],
                ));
                memory.bounds_set = true;
            }

            for (_, pos, fill) in &cells {
                plot_ui.polygon(
                    Polygon::new(hexagon(*pos, hex_radius))
                        .fill_color(fill.gamma_multiply(0.7))
                        .stroke(Stroke::new(0.5, *fill)),
                );
            }

            if icons {
                draw_markers(plot_ui, state, &markers);
            } else {
                draw_bins(plot_ui, state, &bins);
            }

            let bounds = plot_ui.plot_bounds();
            let hovered = plot_ui.pointer_coordinate().and_then(|p| {
                let at = [p.x, p.y];
                let direct = if icons {
                    nearest(&markers, at, bounds.width() / 80.0, |m| m.1)
                        .map(|i| Hovered::Row(markers[i].0))
                } else {
                    nearest(&bins, at, cell * 0.75, |b| b.center).map(Hovered::Bin)
                };
                direct.or_else(|| {
                    nearest(&cells, at, hex_radius, |c| c.1).map(|i| Hovered::Row(cells[i].0))
                })
            });
            (hovered, bounds)
        });

    if let Some(text) = hovered.and_then(|h| hover_text(state, &bins, h)) {
        response.on_hover_text_at_pointer(text);
    }

    let center = bounds.center();
    let zoom = ViewParams::zoom_for_span(bounds.width());
    let moved = (center.x - view.longitude).abs() > 1e-9
        || (center.y - view.latitude).abs() > 1e-9
        || (zoom - view.zoom).abs() > 1e-6;
    if moved {
        events.push(ViewEvent::SetView(ViewParams {
            longitude: center.x,
            latitude: center.y,
            zoom,
            ..view
        }));
    }
}

fn draw_bins(plot_ui: &mut egui_plot::PlotUi, state: &ViewState, bins: &[Bin]) {
    let max_count = bins.iter().map(|b| b.members.len()).max().unwrap_or(1) as f64;
    let density = &state.ramps().density;
    for bin in bins {
        let share = bin.members.len() as f64 / max_count;
        plot_ui.points(
            Points::new(vec![bin.center])
                .radius((3.0 + 9.0 * share.sqrt()) as f32)
                .color(to_color32(density.sample(share)))
                .filled(true),
        );
    }
}

fn draw_markers(plot_ui: &mut egui_plot::PlotUi, state: &ViewState, markers: &[(RowRef, [f64; 2])]) {
    let categories = state.categories();
    let palette = generate_palette(categories.len());
    let mut by_slot: Vec<Vec<[f64; 2]>> = vec![Vec::new(); categories.len()];
    let mut glyphs = 0;

    for &(r, pos) in markers {
        let tag = state.row(r).and_then(PointRow::category);
        let (spec, _) = categories.presentation_for(tag.as_deref());
        let slot = categories.slot_of(&spec.id).unwrap_or(r.slot);
        by_slot[slot].push(pos);
        if glyphs < MAX_GLYPHS && !spec.glyph.is_empty() {
            plot_ui.text(
                Text::new(PlotPoint::new(pos[0], pos[1]), RichText::new(&spec.glyph).size(16.0))
                    .anchor(Align2::CENTER_BOTTOM),
            );
            glyphs += 1;
        }
    }

    for (slot, points) in by_slot.into_iter().enumerate() {
        if points.is_empty() {
            continue;
        }
        let (Some(spec), Some(color)) = (categories.get(slot), palette.get(slot)) else {
            continue;
        };
        plot_ui.points(
            Points::new(points)
                .name(&spec.label)
                .radius(4.0)
                .color(to_color32(*color))
                .filled(true),
        );
    }
}

fn hover_text(state: &ViewState, bins: &[Bin], hovered: Hovered) -> Option<String> {
    let categories = state.categories();
    let month = state.month();
    match hovered {
        Hovered::Bin(i) => {
            let rows: Vec<&PointRow> = bins
                .get(i)?
                .members
                .iter()
                .filter_map(|&r| state.row(r))
                .collect();
            Some(format_tooltip(HoverTarget::Aggregated(&rows), categories, month))
        }
        Hovered::Row(r) => state
            .row(r)
            .map(|row| format_tooltip(HoverTarget::Single(row), categories, month)),
    }
}

/// Pointy-top hexagon vertices around `center`.
fn hexagon(center: [f64; 2], radius: f64) -> Vec<[f64; 2]> {
    (0..6)
        .map(|k| {
            let angle = PI / 3.0 * f64::from(k) + PI / 6.0;
            [center[0] + radius * angle.cos(), center[1] + radius * angle.sin()]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hexagon_vertices_sit_on_the_radius() {
        let hex = hexagon([10.0, -5.0], 2.0);
        assert_eq!(hex.len(), 6);
        for [x, y] in hex {
            assert!(((x - 10.0).hypot(y + 5.0) - 2.0).abs() < 1e-12);
        }
    }
}
