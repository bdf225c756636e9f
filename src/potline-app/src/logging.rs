// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging with optional level from config.
/// Falls back to INFO if level is None or invalid.
pub fn init_logging(log_level: Option<&str>) {
    let level = parse_level(log_level);

    // A host application may already have installed a subscriber.
    let _ = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level)
        .try_init();
}

fn parse_level(log_level: Option<&str>) -> Level {
    log_level
        .and_then(|s| s.trim().parse::<Level>().ok())
        .unwrap_or(Level::INFO)
}
