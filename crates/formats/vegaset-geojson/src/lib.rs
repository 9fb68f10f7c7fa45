//! `GeoJSON` support for spatial catalog artifacts.
//!
//! Features are flattened into one row each: the feature's properties become
//! columns, and the `id` and `geometry` columns carry the identifier and the
//! geometry as `GeoJSON` text.
#![allow(clippy::result_large_err)]

pub mod factory;
pub mod parser;
pub mod table;

pub use factory::GeoJsonReader;
pub use parser::{FeatureRecord, parse_geojson_bytes};
pub use table::records_to_batch;
