// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info};

use potline_app::{init_logging, ConfigFile};
use potline_bridge::{BridgeConfig, BridgeRuntime, LineController};
use potline_core::{Component, DynResult, Line, LotId};

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - potting line operator tool");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Path to configuration file
    #[arg(long = "config", short = 'C', value_name = "FILE")]
    config: Option<PathBuf>,
    /// Gateway endpoint, overrides the configuration
    #[arg(short = 'e', long = "endpoint")]
    endpoint: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reset both lines to lot 0
    Init,
    /// Write the active lot of a line
    Set {
        /// Line number (1 or 2)
        line: u8,
        /// Lot id, 0 clears the line
        lot: LotId,
        /// Component register (PC or OS)
        #[arg(short = 'c', long = "component", default_value = "PC")]
        component: String,
    },
    /// Read the active lot of a line
    Get {
        /// Line number (1 or 2)
        line: u8,
        /// Component register (PC or OS)
        #[arg(short = 'c', long = "component", default_value = "PC")]
        component: String,
    },
    /// Read all registers and print the controller status as JSON
    Status,
    /// Print the effective configuration and exit
    PrintConfig,
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("potline-ctl: {e}");
            ExitCode::from(2)
        }
    }
}

fn run() -> DynResult<bool> {
    let cli = Cli::parse();

    let (mut cfg, config_path) = BridgeConfig::load_layered(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        cfg.connection.endpoint = endpoint;
        ConfigFile::validate(&cfg)?;
    }
    init_logging(cfg.general.log_level.as_deref());
    if let Some(ref path) = config_path {
        info!("Loaded configuration from {}", path.display());
    }

    if matches!(cli.command, Command::PrintConfig) {
        print!("{}", cfg.to_toml_string()?);
        return Ok(true);
    }

    let runtime = BridgeRuntime::new()?;
    let controller = LineController::tcp(cfg.connection.clone(), &cfg.retry);

    let ok = runtime.block_on(async {
        match cli.command {
            Command::Init => {
                let report = controller.initialize_lines_detailed().await;
                println!("{}", json!(report));
                report.all_succeeded()
            }
            Command::Set {
                line,
                lot,
                component,
            } => controller.set_active_lot_raw(line, &component, lot).await,
            Command::Get { line, component } => {
                match controller.get_active_lot_raw(line, &component).await {
                    Some(lot) => {
                        println!("{lot}");
                        true
                    }
                    None => false,
                }
            }
            Command::Status => {
                let mut registers = serde_json::Map::new();
                for line in Line::ALL {
                    for component in Component::ALL {
                        let value = controller.get_component_lot(line, component).await;
                        registers.insert(format!("line{}_{}", line, component), json!(value));
                    }
                }
                let last_updated = controller.last_updated().await;
                let status = controller.status();
                println!(
                    "{:#}",
                    json!({
                        "endpoint": cfg.connection.endpoint,
                        "registers": registers,
                        "last_updated": last_updated,
                        "status": status,
                    })
                );
                status.failures == 0
            }
            Command::PrintConfig => true,
        }
    });

    if !ok {
        let status = controller.status();
        error!(
            "Operation failed: {}",
            status.last_error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(ok)
}
