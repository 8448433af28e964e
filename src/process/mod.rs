// src/process/mod.rs
pub mod dedup;
pub mod split;

pub use dedup::remove_duplicates;
pub use split::{group_by_ensemble, split_sum, EnsembleGroup, ReservedColumns, SplitReport};

/// Column names with fixed meaning in an ensemble table.
pub mod columns {
    pub const REAL: &str = "REAL";
    pub const ENSEMBLE: &str = "ENSEMBLE";
    pub const DATE: &str = "DATE";
    pub const YEARS: &str = "YEARS";
    pub const SECONDS: &str = "SECONDS";
}
