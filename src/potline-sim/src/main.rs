// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::net::SocketAddr;

use clap::Parser;
use tracing::info;

use potline_app::init_logging;
use potline_core::DynResult;
use potline_sim::{GatewaySimulator, SimulatorConfig};

const PKG_DESCRIPTION: &str = concat!(env!("CARGO_PKG_NAME"), " - line gateway simulator");

#[derive(Debug, Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = PKG_DESCRIPTION,
)]
struct Cli {
    /// Address to listen on
    #[arg(short = 'l', long = "listen", default_value = "127.0.0.1:4840")]
    listen: SocketAddr,
    /// Namespace URI the line values are published under
    #[arg(long = "namespace-uri", default_value = "urn:potline:lines")]
    namespace_uri: String,
    /// Require this user name in the session handshake
    #[arg(long = "username", requires = "password")]
    username: Option<String>,
    /// Password for --username
    #[arg(long = "password", requires = "username")]
    password: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> DynResult<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = SimulatorConfig {
        namespace_uri: cli.namespace_uri,
        credentials: cli.username.zip(cli.password),
    };
    let simulator = GatewaySimulator::bind(cli.listen, config).await?;

    tokio::select! {
        result = simulator.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(())
}
