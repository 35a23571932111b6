mod commands;
mod output;
mod xml_output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "keywordtool")]
#[command(about = "Expand and rank Naver search keywords by monthly search volume")]
struct Cli {
    /// Output format: table, json, csv, md, or xml
    #[arg(long, default_value = "table", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand seed keywords and rank the related keywords
    Analyze(Box<commands::analyze::AnalyzeArgs>),
    /// Manage stored API credentials
    Credentials(commands::credentials::CredentialsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("keywordtool=info".parse()?)
                .add_directive("keywordtool_lib=info".parse()?)
                .add_directive("searchad_api=warn".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.output)?;

    match &cli.command {
        Commands::Analyze(args) => commands::analyze::run(args.as_ref(), &format).await?,
        Commands::Credentials(args) => commands::credentials::run(args, &format).await?,
    }

    Ok(())
}
