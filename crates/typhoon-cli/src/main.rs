// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use typhoon_cli::commands;
use typhoon_cli::config::Config;

#[derive(Parser)]
#[command(name = "typhoon")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Render and inspect typhoon templates", long_about = None)]
struct Cli {
    /// Path to the configuration file (default: ./typhoon.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template to stdout
    Render {
        /// Template name relative to the template directories
        name: String,
        /// Parameters as a JSON object
        #[arg(short, long)]
        params: Option<String>,
        /// Read parameters from a JSON file
        #[arg(long)]
        params_file: Option<PathBuf>,
    },
    /// Compile templates and report errors (all templates when none given)
    Check {
        /// Template names
        names: Vec<String>,
    },
    /// Print the token stream of a template
    Tokens {
        /// Template name
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            name,
            params,
            params_file,
        } => commands::render::run(&config, &name, params.as_deref(), params_file.as_deref()),
        Commands::Check { names } => commands::check::run(&config, names),
        Commands::Tokens { name } => commands::tokens::run(&config, &name),
    }
}
