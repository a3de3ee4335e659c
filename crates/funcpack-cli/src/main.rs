mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "funcpack",
    about = "Package Python apps into AWS Lambda deployment zips"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the deployment zip (cleanup, install, assemble, package)
    Package {
        /// Project directory
        #[arg(long, short = 'C', default_value = ".")]
        dir: PathBuf,
        /// Exit 2 when dependency staging fails, 3 when the hard size limit is exceeded
        #[arg(long)]
        strict: bool,
        /// Print the report as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Remove the staging directory and archive from a previous run
    Clean {
        /// Project directory
        #[arg(long, short = 'C', default_value = ".")]
        dir: PathBuf,
    },
    /// Check container runtime, manifest, and configuration
    Doctor {
        /// Project directory
        #[arg(long, short = 'C', default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Package { dir, strict, json } => commands::package(&dir, strict, json).await?,
        Commands::Clean { dir } => {
            commands::clean(&dir)?;
            ExitCode::SUCCESS
        }
        Commands::Doctor { dir } => {
            commands::doctor(&dir).await?;
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}
