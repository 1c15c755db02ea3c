// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Courier - webhook ingestion and message delivery service.
//!
//! This is the binary entry point for the Courier daemon.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use courier_config::model::CourierConfig;

mod serve;

/// Courier - webhook ingestion and message delivery service.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults to the standard search
    /// locations and `COURIER_*` environment overrides.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook gateway and delivery scheduler.
    Serve,
    /// Print the resolved configuration as TOML.
    Config,
}

fn load(path: Option<&Path>) -> Result<CourierConfig, figment::Error> {
    match path {
        Some(path) => courier_config::load_config_from_path(path),
        None => courier_config::load_config(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("courier: invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Config => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                println!("{rendered}");
                Ok(())
            }
            Err(e) => Err(courier_core::CourierError::Internal(format!(
                "rendering configuration: {e}"
            ))),
        },
    };

    if let Err(e) = result {
        eprintln!("courier: {e}");
        std::process::exit(1);
    }
}
