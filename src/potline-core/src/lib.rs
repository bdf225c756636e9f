// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

pub mod address;
pub mod controller;
pub mod error;
pub mod line;
pub mod lot;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use address::{address_for, key_for, NodeKey, ResolvedAddress};
pub use error::{AddressError, BridgeError, BridgeResult};
pub use line::{Component, Line};
pub use lot::{unix_millis, ActiveLot, LotId, LotRecord};
