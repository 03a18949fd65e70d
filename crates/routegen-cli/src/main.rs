// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use clap::{Parser, Subcommand};
use routegen_cli::commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "routegen")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Feature-package route discovery and typegen for monorepos", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Verbose mode: log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: only show errors (useful for CI)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate route types for every feature package of the current app
    Build,
    /// Keep route types of every feature package in sync until Ctrl+C
    Dev,
    /// Generate route types for one feature package
    Typegen {
        /// Package id (defaults to the package containing the current directory)
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Re-run typegen for changed dependencies of an app until Ctrl+C
    TypegenWatch {
        /// Application package id (defaults to the current package)
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Print the merged route manifest of the current app
    Manifest {
        /// Rewrite ids and keys to canonical `routes/...` form
        #[arg(long)]
        normalize: bool,
    },
    /// List the feature packages of the current app
    Features,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let level = if cli.verbose { "debug" } else { cli.log_level.as_str() };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build => commands::build::run(cli.quiet).await,
        Commands::Dev => commands::dev::run(cli.quiet).await,
        Commands::Typegen { project } => commands::typegen::run(project, cli.quiet)
            .await
            .map(|_| ()),
        Commands::TypegenWatch { project } => commands::watch::run(project, cli.quiet).await,
        Commands::Manifest { normalize } => commands::manifest::run(normalize).await,
        Commands::Features => commands::features::run().await,
    }
}
