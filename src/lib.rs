pub mod cli;
pub mod error;
pub mod export;
pub mod load;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod process;
pub mod upload;

pub use error::{ExportError, Result};
