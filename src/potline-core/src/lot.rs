// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::line::Line;

/// Production lot identifier. `0` on the equipment means "no lot".
pub type LotId = u32;

/// Lot record as returned by the production database.
///
/// Only `id` is interpreted here; the remaining columns are carried along
/// for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotRecord {
    pub id: LotId,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl LotRecord {
    pub fn new(id: LotId) -> Self {
        Self {
            id,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// The lot currently assigned to a line.
///
/// `lot_snapshot` is copied at activation time and never refreshed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveLot {
    pub line: Line,
    pub lot_id: LotId,
    pub lot_snapshot: LotRecord,
    pub activated_at_ms: u64,
}

impl ActiveLot {
    pub fn new(line: Line, lot_snapshot: LotRecord) -> Self {
        Self {
            line,
            lot_id: lot_snapshot.id,
            lot_snapshot,
            activated_at_ms: unix_millis(),
        }
    }
}

/// Milliseconds since the Unix epoch, 0 if the clock is before it.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
