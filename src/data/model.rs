use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// FieldValue – a single cell of a point row
// ---------------------------------------------------------------------------

/// A dynamically-typed field value as produced by the CSV / JSON / Parquet readers.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{s}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Null => write!(f, ""),
        }
    }
}

impl FieldValue {
    /// Interpret the value as an `f64`. Numeric strings are accepted since
    /// CSV exports frequently quote coordinates.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| v.is_finite())
    }

    /// Text view of the value; `None` for nulls and blank strings.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::String(s) if s.trim().is_empty() => None,
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// PointRow – one geotagged record
// ---------------------------------------------------------------------------

/// Field carrying the category tag of a row.
pub const CATEGORY_FIELD: &str = "cat";

/// A single point of interest. Fields are kept as-is; accessors pick out the
/// handful the viewer understands and everything else rides along untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointRow {
    pub fields: BTreeMap<String, FieldValue>,
}

/// Temperature statistics of one row for one month, in °C.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemperatureReading {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

impl TemperatureReading {
    /// Representative value: the average, else the min/max midpoint.
    pub fn value(&self) -> Option<f64> {
        self.avg.or(match (self.min, self.max) {
            (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.avg.is_none()
    }
}

impl PointRow {
    pub fn new(fields: BTreeMap<String, FieldValue>) -> Self {
        PointRow { fields }
    }

    /// Builder used by the loaders' tests and the sample generator.
    pub fn with(mut self, key: &str, value: FieldValue) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(FieldValue::as_text)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_f64)
    }

    pub fn category(&self) -> Option<String> {
        self.text(CATEGORY_FIELD)
    }

    /// `[lon, lat]`, accepting either `lon` or `lng` for the longitude.
    pub fn position(&self) -> Option<[f64; 2]> {
        let lon = self.number("lon").or_else(|| self.number("lng"))?;
        let lat = self.number("lat")?;
        Some([lon, lat])
    }

    pub fn title(&self) -> Option<String> {
        self.text("title")
    }

    pub fn description(&self) -> Option<String> {
        self.text("description")
    }

    pub fn phone(&self) -> Option<String> {
        self.text("phone")
    }

    pub fn url(&self) -> Option<String> {
        self.text("url")
    }

    /// Temperature statistics for month index `month` (0 = January), read
    /// from the `tmin_N` / `tmax_N` / `tavg_N` fields with N = month + 1.
    pub fn temperature(&self, month: u8) -> Option<TemperatureReading> {
        let n = u32::from(month) + 1;
        let reading = TemperatureReading {
            min: self.number(&format!("tmin_{n}")),
            max: self.number(&format!("tmax_{n}")),
            avg: self.number(&format!("tavg_{n}")),
        };
        (!reading.is_empty()).then_some(reading)
    }
}

/// Rows of one category, shared between the controller and the renderer.
pub type Rows = Arc<Vec<PointRow>>;

// ---------------------------------------------------------------------------
// DatasetState – load lifecycle of one category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub enum DatasetState {
    #[default]
    NotRequested,
    Loading,
    Loaded(Rows),
}

impl DatasetState {
    pub fn rows(&self) -> Option<&Rows> {
        match self {
            DatasetState::Loaded(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DatasetState::Loading)
    }

    pub fn label(&self) -> String {
        match self {
            DatasetState::NotRequested => "not loaded".to_string(),
            DatasetState::Loading => "loading…".to_string(),
            DatasetState::Loaded(rows) => format!("{} rows", rows.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_accepts_lng_and_numeric_strings() {
        let row = PointRow::default()
            .with("lng", FieldValue::String("-1.5".into()))
            .with("lat", FieldValue::Float(52.25));
        assert_eq!(row.position(), Some([-1.5, 52.25]));

        let missing = PointRow::default().with("lat", FieldValue::Float(1.0));
        assert_eq!(missing.position(), None);
    }

    #[test]
    fn temperature_uses_one_based_field_suffix() {
        let row = PointRow::default()
            .with("tmin_4", FieldValue::Integer(2))
            .with("tmax_4", FieldValue::Integer(14));
        let april = row.temperature(3).unwrap();
        assert_eq!(april.min, Some(2.0));
        assert_eq!(april.avg, None);
        assert_eq!(april.value(), Some(8.0));
        assert!(row.temperature(4).is_none());
    }

    #[test]
    fn blank_text_fields_count_as_absent() {
        let row = PointRow::default()
            .with("phone", FieldValue::String("  ".into()))
            .with("url", FieldValue::Null)
            .with("title", FieldValue::String("Bath".into()));
        assert_eq!(row.phone(), None);
        assert_eq!(row.url(), None);
        assert_eq!(row.title().as_deref(), Some("Bath"));
    }
}
