use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use larder_catalog::{borough_facets, normalize_records};
use larder_source::parse_rows;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Dataset file to check (header-first CSV)
    pub file: PathBuf,

    /// Region slug used when deriving record identifiers
    #[arg(long, default_value = "validate")]
    pub region: String,
}

/// Parse and normalize a dataset file, reporting what a real load would
/// adopt and drop.
pub fn run(args: &ValidateArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let rows = parse_rows(&bytes)?;
    let batch = normalize_records(&args.region, &rows);

    println!("rows parsed:   {}", rows.len());
    println!("rows adopted:  {}", batch.records.len());
    println!("rows dropped:  {}", batch.dropped);

    let boroughs = borough_facets(&batch.records);
    if !boroughs.is_empty() {
        println!("boroughs:      {}", boroughs.join(", "));
    }

    let missing_hours = batch
        .records
        .iter()
        .filter(|r| r.opening_time.is_none() || r.closing_time.is_none())
        .count();
    if missing_hours > 0 {
        println!("without hours: {missing_hours} (always shown as closed)");
    }

    if batch.dropped > 0 {
        anyhow::bail!("{} rows failed validation", batch.dropped);
    }
    Ok(())
}
