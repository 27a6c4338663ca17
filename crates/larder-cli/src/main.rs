mod query;
mod regions;
mod validate;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "larder-cli")]
#[command(about = "Community food-support directory command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the configured regions
    Regions,
    /// Query a region's directory with the same filters as the website
    Query(query::QueryArgs),
    /// Parse a dataset file and report adopted/dropped rows
    Validate(validate::ValidateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Regions => regions::run(),
        Commands::Query(args) => query::run(args).await,
        Commands::Validate(args) => validate::run(&args),
    }
}
