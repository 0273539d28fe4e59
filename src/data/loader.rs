use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value as JsonValue};

use super::model::{FieldValue, PointRow};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the rows of one category resource.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one field per column
/// * `.json`    – `[{...}, ...]`, `{"rows": [...]}` or a GeoJSON
///   `FeatureCollection` of points
/// * `.parquet` – scalar columns, one field per column
pub fn load_file(path: &Path) -> Result<Vec<PointRow>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "csv" => load_csv(path),
        "json" | "geojson" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::debug!("Parsed {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<Vec<PointRow>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;
    rows_from_json(&root)
}

/// Accepts a bare array of records, an object wrapping one under `rows`, or
/// a GeoJSON feature collection whose point geometry supplies `lon`/`lat`.
pub fn rows_from_json(root: &JsonValue) -> Result<Vec<PointRow>> {
    if let Some(features) = root.get("features").and_then(JsonValue::as_array) {
        return features
            .iter()
            .enumerate()
            .map(|(i, f)| feature_to_row(f).with_context(|| format!("Feature {i}")))
            .collect();
    }

    let records = root
        .as_array()
        .or_else(|| root.get("rows").and_then(JsonValue::as_array))
        .context("Expected a JSON array, a `rows` array or a GeoJSON FeatureCollection")?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            Ok(object_to_row(obj))
        })
        .collect()
}

fn object_to_row(obj: &Map<String, JsonValue>) -> PointRow {
    PointRow::new(
        obj.iter()
            .map(|(k, v)| (k.clone(), json_to_field(v)))
            .collect(),
    )
}

fn feature_to_row(feature: &JsonValue) -> Result<PointRow> {
    let mut row = feature
        .get("properties")
        .and_then(JsonValue::as_object)
        .map(object_to_row)
        .unwrap_or_default();

    let coords = feature
        .get("geometry")
        .filter(|g| g.get("type").and_then(JsonValue::as_str) == Some("Point"))
        .and_then(|g| g.get("coordinates"))
        .and_then(JsonValue::as_array)
        .context("missing Point geometry")?;
    let (Some(lon), Some(lat)) = (
        coords.first().and_then(JsonValue::as_f64),
        coords.get(1).and_then(JsonValue::as_f64),
    ) else {
        bail!("Point coordinates are not numeric");
    };
    row.fields.insert("lon".to_string(), FieldValue::Float(lon));
    row.fields.insert("lat".to_string(), FieldValue::Float(lat));
    Ok(row)
}

fn json_to_field(val: &JsonValue) -> FieldValue {
    match val {
        JsonValue::String(s) => FieldValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FieldValue::Float(f)
            } else {
                FieldValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => FieldValue::Bool(*b),
        JsonValue::Null => FieldValue::Null,
        other => FieldValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with field names, every column becomes a field.
fn load_csv(path: &Path) -> Result<Vec<PointRow>> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    rows_from_csv(reader)
}

pub fn rows_from_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<PointRow>> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let fields: BTreeMap<String, FieldValue> = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.clone(), csv_cell(value)))
            .collect();
        rows.push(PointRow::new(fields));
    }
    Ok(rows)
}

/// CSV cells stay text so phone numbers, zero-padded codes and titles
/// like `Infinity` survive verbatim. Numeric accessors parse on demand.
fn csv_cell(s: &str) -> FieldValue {
    if s.is_empty() {
        FieldValue::Null
    } else {
        FieldValue::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of points. Every scalar column becomes a field;
/// nested columns are carried as their debug type name.
fn load_parquet(path: &Path) -> Result<Vec<PointRow>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        let names: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

        for row in 0..batch.num_rows() {
            let fields = names
                .iter()
                .enumerate()
                .map(|(col_idx, name)| (name.clone(), extract_field(batch.column(col_idx), row)))
                .collect();
            rows.push(PointRow::new(fields));
        }
    }
    Ok(rows)
}

/// Extract a single field value from an Arrow column at a given row.
fn extract_field(col: &Arc<dyn Array>, row: usize) -> FieldValue {
    if col.is_null(row) {
        return FieldValue::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| FieldValue::String(s.value(row).to_string()))
            .unwrap_or(FieldValue::Null),
        DataType::LargeUtf8 => FieldValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| FieldValue::Integer(i64::from(a.value(row))))
            .unwrap_or(FieldValue::Null),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| FieldValue::Integer(a.value(row)))
            .unwrap_or(FieldValue::Null),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| FieldValue::Float(f64::from(a.value(row))))
            .unwrap_or(FieldValue::Null),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| FieldValue::Float(a.value(row)))
            .unwrap_or(FieldValue::Null),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| FieldValue::Bool(a.value(row)))
            .unwrap_or(FieldValue::Null),
        other => FieldValue::String(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::tooltip::{HoverTarget, format_tooltip};
    use serde_json::json;

    #[test]
    fn csv_cells_are_text_with_numeric_access() {
        let data = "cat,title,lon,lat,phone\nsee,Tower,-0.0761,51.5081,\ncamping,Site,2,50.1,+44 1\n";
        let rows = rows_from_csv(csv::Reader::from_reader(data.as_bytes())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category().as_deref(), Some("see"));
        assert_eq!(rows[0].position(), Some([-0.0761, 51.5081]));
        assert_eq!(rows[0].get("phone"), Some(&FieldValue::Null));
        assert_eq!(rows[1].get("lon"), Some(&FieldValue::String("2".into())));
        assert_eq!(rows[1].position(), Some([2.0, 50.1]));
        assert_eq!(rows[1].phone().as_deref(), Some("+44 1"));
    }

    #[test]
    fn csv_text_survives_into_tooltips() {
        let data = "cat,title,phone,lon,lat\n\
                    see,007,+441632960000,-1,52\n\
                    city,Infinity,07700900123,0,51\n";
        let rows = rows_from_csv(csv::Reader::from_reader(data.as_bytes())).unwrap();
        let categories = ViewerConfig::default().category_table().unwrap();

        let first = format_tooltip(HoverTarget::Single(&rows[0]), &categories, 0);
        assert!(first.starts_with("007\n"), "{first}");
        assert!(first.contains("tel: +441632960000"), "{first}");

        let second = format_tooltip(HoverTarget::Single(&rows[1]), &categories, 0);
        assert!(second.starts_with("Infinity\n"), "{second}");
        assert!(second.contains("tel: 07700900123"), "{second}");
        assert_eq!(rows[1].position(), Some([0.0, 51.0]));
    }

    #[test]
    fn json_array_and_rows_wrapper() {
        let arr = json!([{"cat": "city", "lat": 1.5, "lng": 2, "capital": true}]);
        let rows = rows_from_json(&arr).unwrap();
        assert_eq!(rows[0].position(), Some([2.0, 1.5]));
        assert_eq!(rows[0].get("capital"), Some(&FieldValue::Bool(true)));

        let wrapped = json!({"rows": [{"cat": "city"}, {"cat": "go"}]});
        assert_eq!(rows_from_json(&wrapped).unwrap().len(), 2);

        assert!(rows_from_json(&json!({"nope": 1})).is_err());
        assert!(rows_from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn geojson_points_supply_position() {
        let fc = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-3.2, 55.95]},
                "properties": {"cat": "city", "title": "Edinburgh"}
            }]
        });
        let rows = rows_from_json(&fc).unwrap();
        assert_eq!(rows[0].position(), Some([-3.2, 55.95]));
        assert_eq!(rows[0].title().as_deref(), Some("Edinburgh"));
    }

    #[test]
    fn missing_file_and_unknown_extension_fail() {
        let err = load_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(format!("{err:#}").contains("here.csv"));
        assert!(load_file(Path::new("points.xlsx")).is_err());
    }

    #[test]
    fn loads_csv_from_disk() {
        let path = std::env::temp_dir().join(format!("voyage_map_loader_{}.csv", std::process::id()));
        std::fs::write(&path, "cat,lat,lon\ndo,10,20\n").unwrap();
        let rows = load_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].position(), Some([20.0, 10.0]));
    }
}
