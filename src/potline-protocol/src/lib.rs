// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Field-bus gateway wire protocol.
//!
//! Requests and responses are JSON objects, one per line, exchanged over a
//! TCP connection to the line gateway. This crate holds the DTOs, the line
//! codec and endpoint URL parsing shared by the bridge and the simulator.

pub mod codec;
pub mod endpoint;
pub mod types;

pub use codec::{encode_line, parse_envelope, read_limited_line, MAX_LINE_BYTES};
pub use endpoint::{parse_endpoint, Endpoint, DEFAULT_PORT};
pub use types::{GatewayEnvelope, GatewayRequest, GatewayResponse, StatusCode};
