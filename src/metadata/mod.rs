// src/metadata/mod.rs
pub mod config;
pub mod enrich;
pub mod generate;

pub use config::ExportConfig;
pub use enrich::{enrich_fmu, fix_meta, sidecar_path, Aggregation, ExportMetadata, Workflow};
pub use generate::{generate_metadata, set_name, CONTENT_TIMESERIES};
