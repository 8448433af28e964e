use anyhow::{Context, Result};
use clap::Parser;
use ensemble_export::{
    cli::{normalize_legacy_flags, AggregateArgs},
    load::VectorFilter,
    logging,
    pipeline::{run_aggregation, AggregateOptions},
};
use tracing::{debug, info};

fn main() -> Result<()> {
    // ─── 1) args + logging ───────────────────────────────────────────
    let args = AggregateArgs::parse_from(normalize_legacy_flags(std::env::args()));
    logging::init(args.debug);
    debug!(?args, "parsed arguments");

    // ─── 2) options ──────────────────────────────────────────────────
    let filter = VectorFilter::parse(&args.vector_filter)
        .with_context(|| format!("parsing vector filter {:?}", args.vector_filter))?;
    let opts = AggregateOptions {
        scratch_path: args.scratch_path.clone(),
        filter,
        summary_csv: args.summary_csv.clone(),
        format: args.format,
        keep_aggregated: args.keep_aggregated,
        env: args.env.clone(),
        upload_command: (!args.skip_upload).then(|| args.upload_command.clone()),
    };

    // ─── 3) split, export, upload ────────────────────────────────────
    let summary = run_aggregation(&opts)
        .with_context(|| format!("aggregating {}", args.scratch_path.display()))?;

    summary.ensure_success()?;

    info!("all done splitting");
    Ok(())
}
