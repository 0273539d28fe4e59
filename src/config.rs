use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable consulted when no config path is given on the command line.
pub const CONFIG_ENV: &str = "VOYAGE_MAP_CONFIG";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no categories configured")]
    NoCategories,
    #[error("category `{0}` is declared more than once")]
    DuplicateCategory(String),
    #[error("fallback category `{0}` is not a declared category")]
    UnknownFallback(String),
    #[error("unknown color `{0}` (expected a CSS color name or #rrggbb)")]
    UnknownColor(String),
    #[error("ramp `{name}` has {breakpoints} breakpoints but {colors} colors")]
    RampShape {
        name: String,
        breakpoints: usize,
        colors: usize,
    },
    #[error("ramp `{0}` breakpoints must be finite and strictly increasing")]
    RampOrder(String),
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// One user-toggleable point category and the resource backing it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategorySpec {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub glyph: String,
    #[serde(default)]
    pub enabled_by_default: bool,
    /// Resource path, relative to [`ViewerConfig::data_root`].
    pub resource: String,
}

impl CategorySpec {
    pub fn new(id: &str, label: &str, glyph: &str, enabled_by_default: bool, resource: &str) -> Self {
        CategorySpec {
            id: id.to_string(),
            label: label.to_string(),
            glyph: glyph.to_string(),
            enabled_by_default,
            resource: resource.to_string(),
        }
    }

    /// The glyph, or the id when no glyph is configured.
    pub fn glyph_or_id(&self) -> &str {
        if self.glyph.is_empty() {
            &self.id
        } else {
            &self.glyph
        }
    }
}

/// The fixed, ordered category set. Slot numbers are declaration order and
/// are used as indices by the view state.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    categories: Vec<CategorySpec>,
    fallback: usize,
}

impl CategoryTable {
    pub fn new(categories: Vec<CategorySpec>, fallback: &str) -> Result<Self, ConfigError> {
        if categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }
        let mut seen = BTreeSet::new();
        for cat in &categories {
            if !seen.insert(cat.id.as_str()) {
                return Err(ConfigError::DuplicateCategory(cat.id.clone()));
            }
        }
        let fallback = categories
            .iter()
            .position(|c| c.id == fallback)
            .ok_or_else(|| ConfigError::UnknownFallback(fallback.to_string()))?;
        Ok(CategoryTable {
            categories,
            fallback,
        })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategorySpec> {
        self.categories.iter()
    }

    pub fn slot_of(&self, id: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.id == id)
    }

    pub fn get(&self, slot: usize) -> Option<&CategorySpec> {
        self.categories.get(slot)
    }

    pub fn by_id(&self, id: &str) -> Option<&CategorySpec> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn fallback(&self) -> &CategorySpec {
        &self.categories[self.fallback]
    }

    /// Presentation for a row's category tag. Unknown or missing tags get the
    /// fallback category; the flag reports whether that happened.
    pub fn presentation_for(&self, tag: Option<&str>) -> (&CategorySpec, bool) {
        match tag.and_then(|t| self.by_id(t)) {
            Some(cat) => (cat, false),
            None => (self.fallback(), true),
        }
    }
}

// ---------------------------------------------------------------------------
// Color ramps and view
// ---------------------------------------------------------------------------

/// Breakpoints and the colors pinned to them (CSS names or `#rrggbb`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RampSpec {
    pub breakpoints: Vec<f64>,
    pub colors: Vec<String>,
}

impl RampSpec {
    fn new(breakpoints: &[f64], colors: &[&str]) -> Self {
        RampSpec {
            breakpoints: breakpoints.to_vec(),
            colors: colors.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// A preferred-temperature choice offered next to the absolute mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemperaturePreset {
    pub label: String,
    pub target: f64,
}

/// Camera parameters. Pitch and bearing are carried for the renderer but the
/// flat plot only honours center and zoom.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewParams {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

impl Default for ViewParams {
    fn default() -> Self {
        ViewParams {
            longitude: -1.415727,
            latitude: 52.232395,
            zoom: 3.5,
            pitch: 40.5,
            bearing: 0.0,
        }
    }
}

impl ViewParams {
    /// Longitude span in degrees visible at `zoom`.
    pub fn span_for_zoom(zoom: f64) -> f64 {
        360.0 / zoom.exp2()
    }

    /// Inverse of [`ViewParams::span_for_zoom`].
    pub fn zoom_for_span(span: f64) -> f64 {
        (360.0 / span.max(f64::EPSILON)).log2()
    }
}

// ---------------------------------------------------------------------------
// ViewerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub data_root: PathBuf,
    pub categories: Vec<CategorySpec>,
    pub fallback_category: String,
    pub absolute_ramp: RampSpec,
    pub relative_ramp: RampSpec,
    /// Colors for aggregated point counts; breakpoints are fractions of the
    /// largest bin.
    pub density_ramp: RampSpec,
    pub temperature_presets: Vec<TemperaturePreset>,
    pub initial_view: ViewParams,
    /// Above this zoom individual points replace the aggregated bins.
    pub icon_zoom_threshold: f64,
    /// Hex-grid cell radius in degrees.
    pub hex_radius: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            data_root: PathBuf::from("data"),
            categories: vec![
                CategorySpec::new("see", "Sightseeing", "👁", true, "see.csv"),
                CategorySpec::new("city", "Cities", "🏙", false, "city.csv"),
                CategorySpec::new("camping", "Camping", "⛺", false, "camping.csv"),
                CategorySpec::new("climbing", "Climbing", "🧗", false, "climbing.parquet"),
                CategorySpec::new("do", "Things to do", "🎭", false, "do.csv"),
                CategorySpec::new("go", "Getting around", "🚆", false, "go.csv"),
                CategorySpec::new("climate", "Climate grid", "🌡", true, "temperature_grid.json"),
            ],
            fallback_category: "see".to_string(),
            absolute_ramp: RampSpec::new(
                &[-20.0, 0.0, 10.0, 20.0, 30.0, 50.0],
                &["darkblue", "steelblue", "lightskyblue", "khaki", "orange", "firebrick"],
            ),
            relative_ramp: RampSpec::new(
                &[0.0, 5.0, 10.0, 40.0, 60.0],
                &["forestgreen", "yellowgreen", "gold", "orangered", "darkred"],
            ),
            density_ramp: RampSpec::new(
                &[0.0, 0.2, 0.4, 0.6, 0.8, 1.0],
                &["#0198bd", "#49e3ce", "#d8feb5", "#feedb1", "#fead54", "#d1374e"],
            ),
            temperature_presets: vec![
                TemperaturePreset {
                    label: "Cool (12 °C)".to_string(),
                    target: 12.0,
                },
                TemperaturePreset {
                    label: "Mild (20 °C)".to_string(),
                    target: 20.0,
                },
                TemperaturePreset {
                    label: "Warm (27 °C)".to_string(),
                    target: 27.0,
                },
            ],
            initial_view: ViewParams::default(),
            icon_zoom_threshold: 6.0,
            hex_radius: 0.5,
        }
    }
}

impl ViewerConfig {
    /// Read a JSON config. Missing keys take their built-in defaults and a
    /// relative `data_root` is resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: ViewerConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if config.data_root.is_relative() {
            if let Some(dir) = path.parent() {
                config.data_root = dir.join(&config.data_root);
            }
        }
        log::info!(
            "Loaded config {} ({} categories, data root {})",
            path.display(),
            config.categories.len(),
            config.data_root.display()
        );
        Ok(config)
    }

    /// Config from the first command-line argument or [`CONFIG_ENV`], else
    /// the built-in defaults.
    pub fn from_args_or_env() -> Result<Self> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_ENV).ok());
        match path {
            Some(p) => Self::load(Path::new(&p)),
            None => Ok(Self::default()),
        }
    }

    pub fn category_table(&self) -> Result<CategoryTable, ConfigError> {
        CategoryTable::new(self.categories.clone(), &self.fallback_category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_a_category_table() {
        let config = ViewerConfig::default();
        let table = config.category_table().unwrap();
        assert_eq!(table.len(), 7);
        assert_eq!(table.fallback().id, "see");
        assert_eq!(table.slot_of("climate"), Some(6));
    }

    #[test]
    fn unknown_tag_uses_fallback_presentation() {
        let table = ViewerConfig::default().category_table().unwrap();
        let (cat, fell_back) = table.presentation_for(Some("buy"));
        assert_eq!(cat.id, "see");
        assert!(fell_back);
        let (cat, fell_back) = table.presentation_for(Some("camping"));
        assert_eq!(cat.id, "camping");
        assert!(!fell_back);
        assert!(table.presentation_for(None).1);
    }

    #[test]
    fn rejects_duplicates_and_missing_fallback() {
        let a = CategorySpec::new("a", "A", "", true, "a.csv");
        let err = CategoryTable::new(vec![a.clone(), a.clone()], "a").unwrap_err();
        assert_eq!(err, ConfigError::DuplicateCategory("a".into()));
        let err = CategoryTable::new(vec![a], "z").unwrap_err();
        assert_eq!(err, ConfigError::UnknownFallback("z".into()));
        assert_eq!(
            CategoryTable::new(Vec::new(), "a").unwrap_err(),
            ConfigError::NoCategories
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ViewerConfig = serde_json::from_str(
            r#"{
                "categories": [
                    {"id": "hut", "label": "Huts", "resource": "huts.csv", "enabled_by_default": true}
                ],
                "fallback_category": "hut",
                "icon_zoom_threshold": 7.5
            }"#,
        )
        .unwrap();
        assert_eq!(config.categories.len(), 1);
        assert_eq!(config.categories[0].glyph_or_id(), "hut");
        assert_eq!(config.icon_zoom_threshold, 7.5);
        assert_eq!(config.absolute_ramp, ViewerConfig::default().absolute_ramp);
    }

    #[test]
    fn zoom_and_span_are_inverse() {
        let span = ViewParams::span_for_zoom(3.0);
        assert_eq!(span, 45.0);
        assert!((ViewParams::zoom_for_span(span) - 3.0).abs() < 1e-12);
    }
}
