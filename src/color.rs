use std::str::FromStr;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Mix, Srgb};

use crate::config::{ConfigError, RampSpec, ViewerConfig};
use crate::data::model::PointRow;

/// 8-bit sRGB color as handed to the renderer.
pub type Rgb8 = Srgb<u8>;

pub fn to_color32(c: Rgb8) -> Color32 {
    Color32::from_rgb(c.red, c.green, c.blue)
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb8> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            rgb.into_format::<u8>()
        })
        .collect()
}

/// Parse a CSS color name (`steelblue`) or hex triplet (`#4682b4`).
pub fn parse_color(name: &str) -> Result<Rgb8, ConfigError> {
    let trimmed = name.trim();
    palette::named::from_str(&trimmed.to_ascii_lowercase())
        .or_else(|| Srgb::<u8>::from_str(trimmed).ok())
        .ok_or_else(|| ConfigError::UnknownColor(name.to_string()))
}

// ---------------------------------------------------------------------------
// ColorRamp – piecewise-linear scale over fixed breakpoints
// ---------------------------------------------------------------------------

/// Maps a scalar onto colors pinned at strictly increasing breakpoints,
/// blending linearly in between and clamping outside the range.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<(f64, Rgb8)>,
}

impl ColorRamp {
    pub fn from_spec(name: &str, spec: &RampSpec) -> Result<Self, ConfigError> {
        if spec.breakpoints.len() != spec.colors.len() || spec.breakpoints.is_empty() {
            return Err(ConfigError::RampShape {
                name: name.to_string(),
                breakpoints: spec.breakpoints.len(),
                colors: spec.colors.len(),
            });
        }
        let ordered = spec.breakpoints.iter().all(|b| b.is_finite())
            && spec.breakpoints.windows(2).all(|w| w[0] < w[1]);
        if !ordered {
            return Err(ConfigError::RampOrder(name.to_string()));
        }
        let stops = spec
            .breakpoints
            .iter()
            .zip(&spec.colors)
            .map(|(&b, c)| parse_color(c).map(|rgb| (b, rgb)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ColorRamp { stops })
    }

    pub fn stops(&self) -> &[(f64, Rgb8)] {
        &self.stops
    }

    pub fn sample(&self, value: f64) -> Rgb8 {
        let (first, last) = (self.stops[0], self.stops[self.stops.len() - 1]);
        if value.is_nan() || value <= first.0 {
            return first.1;
        }
        if value >= last.0 {
            return last.1;
        }
        for pair in self.stops.windows(2) {
            let ((lo, lo_color), (hi, hi_color)) = (pair[0], pair[1]);
            if value == lo {
                return lo_color;
            }
            if value < hi {
                let t = ((value - lo) / (hi - lo)) as f32;
                return lo_color
                    .into_format::<f32>()
                    .mix(hi_color.into_format::<f32>(), t)
                    .into_format::<u8>();
            }
        }
        last.1
    }
}

/// The three ramps the viewer draws with.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamps {
    pub absolute: ColorRamp,
    pub relative: ColorRamp,
    pub density: ColorRamp,
}

impl ColorRamps {
    pub fn from_config(config: &ViewerConfig) -> Result<Self, ConfigError> {
        Ok(ColorRamps {
            absolute: ColorRamp::from_spec("absolute", &config.absolute_ramp)?,
            relative: ColorRamp::from_spec("relative", &config.relative_ramp)?,
            density: ColorRamp::from_spec("density", &config.density_ramp)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Temperature coloring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TemperatureMode {
    /// Color by the month's temperature.
    Absolute,
    /// Color by distance from a preferred temperature, in either direction.
    Relative { target: f64 },
}

impl Default for TemperatureMode {
    fn default() -> Self {
        TemperatureMode::Absolute
    }
}

/// Fill color of `row` for `month` under `mode`; `None` when the row has no
/// temperature for that month.
pub fn fill_color(row: &PointRow, month: u8, mode: TemperatureMode, ramps: &ColorRamps) -> Option<Rgb8> {
    let value = row.temperature(month)?.value()?;
    Some(match mode {
        TemperatureMode::Absolute => ramps.absolute.sample(value),
        TemperatureMode::Relative { target } => ramps.relative.sample((target - value).abs()),
    })
}

/// The fill function currently selected by the view state.
#[derive(Debug, Clone, Copy)]
pub struct TemperatureScale<'a> {
    pub month: u8,
    pub mode: TemperatureMode,
    ramps: &'a ColorRamps,
}

impl<'a> TemperatureScale<'a> {
    pub fn new(month: u8, mode: TemperatureMode, ramps: &'a ColorRamps) -> Self {
        TemperatureScale { month, mode, ramps }
    }

    pub fn fill_color(&self, row: &PointRow) -> Option<Rgb8> {
        fill_color(row, self.month, self.mode, self.ramps)
    }

    /// Ramp in effect, for legends.
    pub fn ramp(&self) -> &'a ColorRamp {
        match self.mode {
            TemperatureMode::Absolute => &self.ramps.absolute,
            TemperatureMode::Relative { .. } => &self.ramps.relative,
        }
    }
}
