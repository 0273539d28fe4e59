use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::color::{ColorRamps, TemperatureMode, TemperatureScale};
use crate::config::{CategorySpec, CategoryTable, ConfigError, ViewParams, ViewerConfig};
use crate::data::filter::{RowRef, combine};
use crate::data::model::{DatasetState, PointRow};

// ---------------------------------------------------------------------------
// Events, effects and errors
// ---------------------------------------------------------------------------

/// A failed category load, as reported by the loader.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to load category `{category}`: {message}")]
pub struct DataLoadError {
    pub category: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error("unknown category `{0}`")]
    UnknownCategory(String),
    #[error("month {0} is out of range 0..=11")]
    InvalidMonth(u8),
    #[error("preferred temperature {0} is not a finite number")]
    InvalidTarget(f64),
}

/// Everything that can change the view state.
#[derive(Debug, Clone)]
pub enum ViewEvent {
    SetCategoryActive { category: String, active: bool },
    DataLoaded {
        category: String,
        result: Result<Vec<PointRow>, DataLoadError>,
    },
    SetMonth(u8),
    SetTemperatureMode(TemperatureMode),
    SetView(ViewParams),
}

/// A load the caller must start on the controller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub category: String,
    pub locator: PathBuf,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full view state, independent of rendering.
///
/// All mutation goes through [`ViewState::apply`]; loads are not started
/// here but returned as [`LoadRequest`]s.
pub struct ViewState {
    categories: CategoryTable,
    ramps: ColorRamps,
    data_root: PathBuf,
    icon_zoom_threshold: f64,
    hex_radius: f64,
    presets: Vec<(String, f64)>,

    /// Per-category load state, indexed by category slot.
    datasets: Vec<DatasetState>,
    /// Per-category "wanted" flag, indexed by category slot.
    active: Vec<bool>,
    /// Rows of active, loaded categories (cached).
    combined: Vec<RowRef>,

    month: u8,
    mode: TemperatureMode,
    view: ViewParams,

    /// Last load failure, shown in the UI.
    /// Most recent load failure and the slot it belongs to; cleared once
    /// that category is requested again or delivers rows.
    last_error: Option<(usize, String)>,
}

impl ViewState {
    pub fn new(config: &ViewerConfig) -> Result<Self, ConfigError> {
        let categories = config.category_table()?;
        let ramps = ColorRamps::from_config(config)?;
        let active = categories.iter().map(|c| c.enabled_by_default).collect();
        Ok(ViewState {
            datasets: vec![DatasetState::NotRequested; categories.len()],
            categories,
            ramps,
            data_root: config.data_root.clone(),
            icon_zoom_threshold: config.icon_zoom_threshold,
            hex_radius: config.hex_radius,
            presets: config
                .temperature_presets
                .iter()
                .map(|p| (p.label.clone(), p.target))
                .collect(),
            active,
            combined: Vec::new(),
            month: 0,
            mode: TemperatureMode::Absolute,
            view: config.initial_view,
            last_error: None,
        })
    }

    /// Load requests for the categories that start out active.
    pub fn bootstrap(&mut self) -> Vec<LoadRequest> {
        let mut requests = Vec::new();
        for slot in 0..self.categories.len() {
            if self.active[slot] {
                requests.extend(self.request_load(slot));
            }
        }
        requests
    }

    /// Apply one event and return the loads it requires.
    pub fn apply(&mut self, event: ViewEvent) -> Result<Vec<LoadRequest>, ViewError> {
        match event {
            ViewEvent::SetCategoryActive { category, active } => {
                let slot = self.slot(&category)?;
                self.active[slot] = active;
                let request = if active { self.request_load(slot) } else { None };
                self.recompute();
                Ok(request.into_iter().collect())
            }
            ViewEvent::DataLoaded { category, result } => {
                let slot = self.slot(&category)?;
                self.absorb(slot, result);
                Ok(Vec::new())
            }
            ViewEvent::SetMonth(month) => {
                if month > 11 {
                    return Err(ViewError::InvalidMonth(month));
                }
                self.month = month;
                Ok(Vec::new())
            }
            ViewEvent::SetTemperatureMode(mode) => {
                if let TemperatureMode::Relative { target } = mode {
                    if !target.is_finite() {
                        return Err(ViewError::InvalidTarget(target));
                    }
                }
                self.mode = mode;
                Ok(Vec::new())
            }
            ViewEvent::SetView(view) => {
                self.view = view;
                Ok(Vec::new())
            }
        }
    }

    fn slot(&self, category: &str) -> Result<usize, ViewError> {
        self.categories
            .slot_of(category)
            .ok_or_else(|| ViewError::UnknownCategory(category.to_string()))
    }

    /// Move a not-yet-requested dataset to `Loading`. In-flight and loaded
    /// datasets never produce a second request.
    fn request_load(&mut self, slot: usize) -> Option<LoadRequest> {
        if !matches!(self.datasets[slot], DatasetState::NotRequested) {
            return None;
        }
        let spec = self.categories.get(slot)?;
        let request = LoadRequest {
            category: spec.id.clone(),
            locator: self.data_root.join(&spec.resource),
        };
        log::debug!("Requesting {} for `{}`", request.locator.display(), spec.id);
        self.datasets[slot] = DatasetState::Loading;
        self.clear_error(slot);
        Some(request)
    }

    fn absorb(&mut self, slot: usize, result: Result<Vec<PointRow>, DataLoadError>) {
        match result {
            Ok(rows) => {
                if let DatasetState::Loaded(_) = self.datasets[slot] {
                    log::debug!(
                        "Ignoring duplicate rows for `{}`",
                        self.categories.get(slot).map_or("?", |c| c.id.as_str())
                    );
                    return;
                }
                self.warn_unrecognized(slot, &rows);
                log::info!(
                    "Loaded {} rows for `{}`",
                    rows.len(),
                    self.categories.get(slot).map_or("?", |c| c.id.as_str())
                );
                self.datasets[slot] = DatasetState::Loaded(Arc::new(rows));
                self.clear_error(slot);
                self.recompute();
            }
            Err(err) => {
                log::warn!("{err}");
                if self.datasets[slot].is_loading() {
                    self.datasets[slot] = DatasetState::NotRequested;
                }
                self.last_error = Some((slot, err.to_string()));
            }
        }
    }

    fn clear_error(&mut self, slot: usize) {
        if self.last_error.as_ref().is_some_and(|(failed, _)| *failed == slot) {
            self.last_error = None;
        }
    }

    /// Rows whose tag has no registered category are drawn with the fallback
    /// category's presentation; report each such tag once per dataset.
    fn warn_unrecognized(&self, slot: usize, rows: &[PointRow]) {
        let mut unknown: BTreeMap<String, usize> = BTreeMap::new();
        for row in rows {
            if let Some(tag) = row.category() {
                if self.categories.by_id(&tag).is_none() {
                    *unknown.entry(tag).or_default() += 1;
                }
            }
        }
        let dataset = self.categories.get(slot).map_or("?", |c| c.id.as_str());
        for (tag, count) in unknown {
            log::warn!(
                "Unrecognized category `{tag}` on {count} rows of `{dataset}`; using `{}`",
                self.categories.fallback().id
            );
        }
    }

    fn recompute(&mut self) {
        self.combined = combine(&self.datasets, &self.active);
    }

    // -- read access ------------------------------------------------------

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    pub fn ramps(&self) -> &ColorRamps {
        &self.ramps
    }

    pub fn dataset(&self, slot: usize) -> Option<&DatasetState> {
        self.datasets.get(slot)
    }

    pub fn is_active(&self, slot: usize) -> bool {
        self.active.get(slot).copied().unwrap_or(false)
    }

    /// Categories with their slot, active flag and load state, in declaration order.
    pub fn category_states(&self) -> impl Iterator<Item = (usize, &CategorySpec, bool, &DatasetState)> {
        self.categories
            .iter()
            .enumerate()
            .map(|(slot, spec)| (slot, spec, self.active[slot], &self.datasets[slot]))
    }

    pub fn combined(&self) -> &[RowRef] {
        &self.combined
    }

    pub fn row(&self, r: RowRef) -> Option<&PointRow> {
        self.datasets.get(r.slot)?.rows()?.get(r.index)
    }

    /// The combined collection, resolved to rows.
    pub fn combined_rows(&self) -> impl Iterator<Item = (RowRef, &PointRow)> + '_ {
        self.combined
            .iter()
            .filter_map(move |&r| self.row(r).map(|row| (r, row)))
    }

    pub fn loaded_row_count(&self) -> usize {
        self.datasets
            .iter()
            .filter_map(DatasetState::rows)
            .map(|rows| rows.len())
            .sum()
    }

    pub fn loads_in_flight(&self) -> usize {
        self.datasets.iter().filter(|d| d.is_loading()).count()
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn mode(&self) -> TemperatureMode {
        self.mode
    }

    pub fn presets(&self) -> &[(String, f64)] {
        &self.presets
    }

    pub fn temperature_scale(&self) -> TemperatureScale<'_> {
        TemperatureScale::new(self.month, self.mode, &self.ramps)
    }

    pub fn view(&self) -> ViewParams {
        self.view
    }

    pub fn icons_visible(&self) -> bool {
        self.view.zoom > self.icon_zoom_threshold
    }

    pub fn hex_radius(&self) -> f64 {
        self.hex_radius
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_ref().map(|(_, message)| message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::FieldValue;

    fn fixture() -> ViewState {
        let mut config = ViewerConfig::default();
        config.data_root = PathBuf::from("fixtures");
        config.categories = vec![
            CategorySpec::new("a", "Alpha", "", false, "a.csv"),
            CategorySpec::new("b", "Beta", "", false, "b.csv"),
            CategorySpec::new("c", "Gamma", "", false, "c.json"),
        ];
        config.fallback_category = "a".to_string();
        ViewState::new(&config).unwrap()
    }

    fn rows(cat: &str, titles: &[&str]) -> Vec<PointRow> {
        titles
            .iter()
            .map(|t| {
                PointRow::default()
                    .with("cat", FieldValue::String(cat.into()))
                    .with("title", FieldValue::String(t.to_string()))
                    .with("tavg_4", FieldValue::Float(5.0))
                    .with("tavg_8", FieldValue::Float(25.0))
            })
            .collect()
    }

    fn activate(state: &mut ViewState, cat: &str, active: bool) -> Vec<LoadRequest> {
        state
            .apply(ViewEvent::SetCategoryActive {
                category: cat.into(),
                active,
            })
            .unwrap()
    }

    fn loaded(state: &mut ViewState, cat: &str, titles: &[&str]) {
        state
            .apply(ViewEvent::DataLoaded {
                category: cat.into(),
                result: Ok(rows(cat, titles)),
            })
            .unwrap();
    }

    fn failed(state: &mut ViewState, cat: &str) {
        state
            .apply(ViewEvent::DataLoaded {
                category: cat.into(),
                result: Err(DataLoadError {
                    category: cat.into(),
                    message: "404".into(),
                }),
            })
            .unwrap();
    }

    fn titles(state: &ViewState) -> Vec<String> {
        state
            .combined_rows()
            .filter_map(|(_, row)| row.title())
            .collect()
    }

    #[test]
    fn activation_requests_a_single_load() {
        let mut state = fixture();
        let first = activate(&mut state, "b", true);
        assert_eq!(
            first,
            vec![LoadRequest {
                category: "b".into(),
                locator: PathBuf::from("fixtures").join("b.csv"),
            }]
        );
        assert!(activate(&mut state, "b", true).is_empty());
        assert!(state.dataset(1).unwrap().is_loading());

        // Toggling off and on while in flight keeps the original request.
        assert!(activate(&mut state, "b", false).is_empty());
        assert!(activate(&mut state, "b", true).is_empty());

        loaded(&mut state, "b", &["b1"]);
        assert!(activate(&mut state, "b", true).is_empty());
    }

    #[test]
    fn combined_follows_declaration_order_and_flags() {
        let mut state = fixture();
        activate(&mut state, "c", true);
        activate(&mut state, "a", true);
        activate(&mut state, "b", true);
        loaded(&mut state, "c", &["c1"]);
        loaded(&mut state, "a", &["a1", "a2"]);
        assert_eq!(titles(&state), ["a1", "a2", "c1"]);

        loaded(&mut state, "b", &["b1"]);
        assert_eq!(titles(&state), ["a1", "a2", "b1", "c1"]);

        activate(&mut state, "a", false);
        assert_eq!(titles(&state), ["b1", "c1"]);
    }

    #[test]
    fn filter_matches_every_subset() {
        let mut state = fixture();
        for cat in ["a", "b", "c"] {
            activate(&mut state, cat, true);
        }
        loaded(&mut state, "a", &["a1"]);
        loaded(&mut state, "c", &["c1", "c2"]);
        // "b" stays in flight.
        for mask in 0u8..8 {
            for (bit, cat) in ["a", "b", "c"].iter().enumerate() {
                activate(&mut state, cat, mask & (1 << bit) != 0);
            }
            let mut expected = Vec::new();
            if mask & 1 != 0 {
                expected.push("a1");
            }
            if mask & 4 != 0 {
                expected.extend(["c1", "c2"]);
            }
            assert_eq!(titles(&state), expected, "mask {mask:03b}");
        }
    }

    #[test]
    fn rows_for_a_deactivated_category_are_kept_for_later() {
        let mut state = fixture();
        activate(&mut state, "a", true);
        activate(&mut state, "a", false);
        loaded(&mut state, "a", &["late"]);
        assert!(state.combined().is_empty());
        assert_eq!(state.loaded_row_count(), 1);
        assert!(activate(&mut state, "a", true).is_empty());
        assert_eq!(titles(&state), ["late"]);
    }

    #[test]
    fn load_failure_is_isolated_and_retryable() {
        let mut state = fixture();
        activate(&mut state, "a", true);
        activate(&mut state, "b", true);
        loaded(&mut state, "a", &["a1"]);
        failed(&mut state, "b");

        assert_eq!(titles(&state), ["a1"]);
        assert!(matches!(state.dataset(1), Some(DatasetState::NotRequested)));
        assert!(state.last_error().unwrap().contains("`b`"));

        let retry = activate(&mut state, "b", true);
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].category, "b");
        assert!(state.last_error().is_none());
        assert!(activate(&mut state, "b", true).is_empty());

        loaded(&mut state, "b", &["b1"]);
        assert!(state.last_error().is_none());
        assert_eq!(titles(&state), ["a1", "b1"]);
    }

    #[test]
    fn error_of_another_category_survives_unrelated_loads() {
        let mut state = fixture();
        activate(&mut state, "a", true);
        activate(&mut state, "b", true);
        failed(&mut state, "b");
        activate(&mut state, "b", false);

        loaded(&mut state, "a", &["a1"]);
        assert!(state.last_error().unwrap().contains("`b`"));
        assert!(!activate(&mut state, "c", true).is_empty());
        assert!(state.last_error().unwrap().contains("`b`"));

        // A late failure for a loaded category is reported and then cleared
        // by a success for that same category only.
        failed(&mut state, "a");
        assert!(state.last_error().unwrap().contains("`a`"));
        loaded(&mut state, "c", &["c1"]);
        assert!(state.last_error().unwrap().contains("`a`"));
    }

    #[test]
    fn rows_with_unrecognized_tags_are_still_combined() {
        let mut state = fixture();
        activate(&mut state, "a", true);
        let mut batch = rows("a", &["a1"]);
        batch.extend(rows("zzz", &["stray"]));
        batch.push(PointRow::default().with("title", FieldValue::String("untagged".into())));
        state
            .apply(ViewEvent::DataLoaded {
                category: "a".into(),
                result: Ok(batch),
            })
            .unwrap();

        assert_eq!(titles(&state), ["a1", "stray", "untagged"]);
        let stray = state.combined_rows().nth(1).unwrap().1;
        assert_eq!(stray.category().as_deref(), Some("zzz"));
        let (spec, is_fallback) = state.categories().presentation_for(stray.category().as_deref());
        assert_eq!(spec.id, "a");
        assert!(is_fallback);
    }

    #[test]
    fn data_for_an_undeclared_category_is_rejected() {
        let mut state = fixture();
        let err = state
            .apply(ViewEvent::DataLoaded {
                category: "nope".into(),
                result: Ok(rows("nope", &["x"])),
            })
            .unwrap_err();
        assert_eq!(err, ViewError::UnknownCategory("nope".into()));
        assert!(state.combined().is_empty());
        assert_eq!(state.loaded_row_count(), 0);
    }

    #[test]
    fn duplicate_rows_for_loaded_category_are_ignored() {
        let mut state = fixture();
        activate(&mut state, "a", true);
        loaded(&mut state, "a", &["first"]);
        loaded(&mut state, "a", &["second"]);
        assert_eq!(titles(&state), ["first"]);
        failed(&mut state, "a");
        assert_eq!(titles(&state), ["first"]);
    }

    #[test]
    fn month_switch_changes_only_fill() {
        let mut state = fixture();
        activate(&mut state, "a", true);
        loaded(&mut state, "a", &["a1"]);
        state.apply(ViewEvent::SetMonth(3)).unwrap();
        let before_rows = state.combined().to_vec();
        let row = state.combined_rows().next().unwrap().1.clone();
        let april = state.temperature_scale().fill_color(&row);

        state.apply(ViewEvent::SetMonth(7)).unwrap();
        assert_eq!(state.combined(), before_rows.as_slice());
        assert!(state.is_active(0));
        assert_ne!(state.temperature_scale().fill_color(&row), april);
    }

    #[test]
    fn rejects_bad_input() {
        let mut state = fixture();
        assert_eq!(
            state.apply(ViewEvent::SetMonth(12)).unwrap_err(),
            ViewError::InvalidMonth(12)
        );
        assert_eq!(
            state
                .apply(ViewEvent::SetCategoryActive {
                    category: "zzz".into(),
                    active: true
                })
                .unwrap_err(),
            ViewError::UnknownCategory("zzz".into())
        );
        assert!(matches!(
            state.apply(ViewEvent::SetTemperatureMode(TemperatureMode::Relative {
                target: f64::NAN
            })),
            Err(ViewError::InvalidTarget(_))
        ));
        assert_eq!(state.month(), 0);
        assert_eq!(state.mode(), TemperatureMode::Absolute);
    }

    #[test]
    fn bootstrap_loads_default_categories() {
        let mut state = ViewState::new(&ViewerConfig::default()).unwrap();
        let requested: Vec<String> = state.bootstrap().into_iter().map(|r| r.category).collect();
        assert_eq!(requested, ["see", "climate"]);
        assert!(state.bootstrap().is_empty());
        assert_eq!(state.loads_in_flight(), 2);
    }
}
