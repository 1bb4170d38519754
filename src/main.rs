use clap::{Parser, Subcommand};
use shelf::core::{CompressionAlgorithm, ShelfError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Publish and install versioned package archives")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an archive from a directory and publish it with its manifest
    Publish {
        /// Directory to package
        dir: PathBuf,
        /// Package name
        #[arg(short, long)]
        name: String,
        /// Package version
        #[arg(short = 'V', long = "version")]
        package_version: String,
        /// Remote prefix (e.g. file:///srv/packages, https://host/packages)
        #[arg(short, long)]
        remote: String,
        /// Compression: zstd, gzip, zip or none (defaults to the configured one)
        #[arg(short, long)]
        compression: Option<CompressionAlgorithm>,
    },
    /// Install every dependency in shelf.yaml that is missing, stale or damaged
    Install {
        /// Dependency listing (defaults to the nearest shelf.yaml)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Compare file sizes only, skipping content hashes
        #[arg(short, long)]
        quick: bool,
    },
    /// Check installed dependencies without contacting remote storage
    Verify {
        /// Dependency listing (defaults to the nearest shelf.yaml)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Compare file sizes only, skipping content hashes
        #[arg(short, long)]
        quick: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Publish {
            dir,
            name,
            package_version,
            remote,
            compression,
        } => {
            cli::publish::run(cli::publish::PublishOptions {
                dir,
                name,
                version: package_version,
                remote,
                compression,
            })
            .await
        }
        Commands::Install { file, quick } => cli::install::run(file, quick).await,
        Commands::Verify { file, quick } => cli::verify::run(file, quick).await,
    };

    // Handle result and exit codes
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match &e {
                ShelfError::PartialFailure { .. } => {
                    // Individual failures were already printed
                    eprintln!("\n{}", e);
                }
                _ => eprintln!("\nError: {}", e),
            }
            ExitCode::FAILURE
        }
    }
}
