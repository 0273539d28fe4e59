/// Data layer: row model, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet   (one resource per category)
///        │
///        ▼
///   ┌──────────────┐
///   │ loader/worker │  parse file → Vec<PointRow>, off the UI thread
///   └──────────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ DatasetState  │  NotRequested → Loading → Loaded(rows)
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  active + loaded categories → combined RowRefs
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │   bins    │  combined rows → aggregated cells for the zoomed-out view
///   └──────────┘
/// ```

pub mod bins;
pub mod filter;
pub mod loader;
pub mod model;
pub mod worker;
