//! Writes a deterministic sample data set for the default configuration:
//! one CSV per point category, a Parquet file for `climbing` and a JSON
//! monthly temperature grid, all under `data/` (or the first argument).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Value, json};

/// Rough bounding box of Great Britain: (lon_min, lon_max, lat_min, lat_max).
const BOUNDS: (f64, f64, f64, f64) = (-5.8, 1.7, 50.1, 58.4);

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Place {
    cat: String,
    title: String,
    description: String,
    phone: String,
    url: String,
    lon: f64,
    lat: f64,
}

fn places(rng: &mut SimpleRng, cat: &str, noun: &str, n: usize) -> Vec<Place> {
    let (lon_min, lon_max, lat_min, lat_max) = BOUNDS;
    (0..n)
        .map(|i| {
            // Every 25th "do" row carries a tag the default config doesn't know.
            let tag = if cat == "do" && i % 25 == 24 { "buy" } else { cat };
            Place {
                cat: tag.to_string(),
                title: format!("{noun} {}", i + 1),
                description: if i % 3 == 0 {
                    format!("A sample {} entry", noun.to_lowercase())
                } else {
                    String::new()
                },
                phone: if i % 4 == 0 {
                    format!("+44 1632 {:06}", rng.next_u64() % 1_000_000)
                } else {
                    String::new()
                },
                url: if i % 5 == 0 {
                    format!("https://example.org/{cat}/{}", i + 1)
                } else {
                    String::new()
                },
                lon: rng.range(lon_min, lon_max),
                lat: rng.range(lat_min, lat_max),
            }
        })
        .collect()
}

fn write_csv(path: &Path, rows: &[Place]) {
    let mut writer = csv::Writer::from_path(path).expect("Failed to create CSV");
    writer
        .write_record(["cat", "title", "description", "phone", "url", "lon", "lat"])
        .expect("Failed to write header");
    for p in rows {
        let lon = format!("{:.5}", p.lon);
        let lat = format!("{:.5}", p.lat);
        writer
            .write_record([
                p.cat.as_str(),
                p.title.as_str(),
                p.description.as_str(),
                p.phone.as_str(),
                p.url.as_str(),
                lon.as_str(),
                lat.as_str(),
            ])
            .expect("Failed to write row");
    }
    writer.flush().expect("Failed to flush CSV");
}

fn write_parquet(path: &Path, rows: &[Place]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("cat", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("lon", DataType::Float64, false),
        Field::new("lat", DataType::Float64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(rows.iter().map(|p| p.cat.as_str()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(rows.iter().map(|p| p.title.as_str()).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|p| p.lon).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(rows.iter().map(|p| p.lat).collect::<Vec<_>>())),
        ],
    )
    .expect("Failed to create RecordBatch");

    let file = std::fs::File::create(path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
}

/// Monthly climate on a 1° grid: colder northwards, seasonal swing peaking
/// in July, plus per-cell noise.
fn temperature_grid(rng: &mut SimpleRng) -> Vec<Value> {
    let (lon_min, lon_max, lat_min, lat_max) = BOUNDS;
    let mut cells = Vec::new();
    let mut lat = lat_min.floor() + 0.5;
    while lat < lat_max {
        let mut lon = lon_min.floor() + 0.5;
        while lon < lon_max {
            let base = 15.0 - (lat - 50.0) * 0.6 + rng.gauss(0.0, 0.8);
            let mut cell = Map::new();
            cell.insert("cat".into(), json!("climate"));
            cell.insert("title".into(), json!(format!("Grid cell {lat:.1}°N {lon:.1}°E")));
            cell.insert("lon".into(), json!(lon));
            cell.insert("lat".into(), json!(lat));
            for month in 1..=12 {
                let season = -(2.0 * std::f64::consts::PI * (month as f64 - 1.0) / 12.0).cos();
                let avg = base - 5.0 + 8.0 * season;
                let spread = 3.0 + rng.range(0.0, 2.0);
                cell.insert(format!("tavg_{month}"), json!((avg * 10.0).round() / 10.0));
                cell.insert(format!("tmin_{month}"), json!(((avg - spread) * 10.0).round() / 10.0));
                cell.insert(format!("tmax_{month}"), json!(((avg + spread) * 10.0).round() / 10.0));
            }
            cells.push(Value::Object(cell));
            lon += 1.0;
        }
        lat += 1.0;
    }
    cells
}

fn main() {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));
    std::fs::create_dir_all(&out_dir).expect("Failed to create output directory");

    let mut rng = SimpleRng::new(42);

    let csv_categories = [
        ("see", "Sight", 120),
        ("city", "City", 40),
        ("camping", "Campsite", 60),
        ("do", "Activity", 100),
        ("go", "Station", 50),
    ];
    for (cat, noun, n) in csv_categories {
        let rows = places(&mut rng, cat, noun, n);
        let path = out_dir.join(format!("{cat}.csv"));
        write_csv(&path, &rows);
        println!("Wrote {} rows to {}", rows.len(), path.display());
    }

    let crags = places(&mut rng, "climbing", "Crag", 30);
    let path = out_dir.join("climbing.parquet");
    write_parquet(&path, &crags);
    println!("Wrote {} rows to {}", crags.len(), path.display());

    let grid = temperature_grid(&mut rng);
    let path = out_dir.join("temperature_grid.json");
    let text = serde_json::to_string_pretty(&grid).expect("Failed to serialize grid");
    std::fs::write(&path, text).expect("Failed to write grid");
    println!("Wrote {} grid cells to {}", grid.len(), path.display());
}
