// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod config;
pub mod logging;

pub use config::{parse_env, ConfigError, ConfigFile};
pub use logging::init_logging;
