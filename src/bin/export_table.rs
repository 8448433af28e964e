use anyhow::{Context, Result};
use clap::Parser;
use ensemble_export::{
    cli::ExportTableArgs,
    export::{export_with_metadata, FileExporter},
    load::{read_summary_csv, VectorFilter},
    logging,
    metadata::{ExportConfig, ExportMetadata},
};
use tracing::{debug, info};

/// Export one realization's summary table with metadata.
fn main() -> Result<()> {
    let args = ExportTableArgs::parse();
    logging::init(args.debug);
    debug!(?args, "parsed arguments");

    let filter = VectorFilter::from_patterns(&args.vectors)
        .with_context(|| format!("parsing vector filter {:?}", args.vectors))?;
    let table = read_summary_csv(&args.table_path, &filter)
        .with_context(|| format!("reading {}", args.table_path.display()))?;
    let vectors: Vec<String> = table
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    info!(vectors = ?vectors, "exporting vectors");

    let config = ExportConfig::from_global_config(&args.config_path)
        .with_context(|| format!("reading config {}", args.config_path.display()))?;
    let exporter = FileExporter::new(&args.output_root, config, args.format);

    let path = export_with_metadata(&exporter, &table, &args.name, &ExportMetadata::single("", ""))
        .with_context(|| format!("exporting {}", args.name))?;
    info!(path = %path.display(), rows = table.num_rows(), "exported");
    Ok(())
}
