/// Data layer: core types, loading, reshaping and filtering.
///
/// Architecture:
/// ```text
///  synthetic / http(s) / .csv .json .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  source → Dataset (empty + LoadError on failure)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Schema, Vec<Record>, unique values per column
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  criteria → matching rows | NoData
///   └──────────┘
/// ```

pub mod columnar;
pub mod filter;
pub mod loader;
pub mod model;
pub mod remote;
pub mod reshape;
pub mod synthetic;
