// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Lot lookup.
//!
//! The production database lives outside the bridge; it is reached through
//! [`LotRepository`]. [`InMemoryLotRepository`] serves tests and bench setups.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use potline_core::{LotId, LotRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("lot {0} not found")]
    NotFound(LotId),

    #[error("lot repository unavailable: {0}")]
    Unavailable(String),
}

pub trait LotRepository: Send + Sync {
    fn get_by_id(&self, lot_id: LotId) -> Result<LotRecord, RepositoryError>;
}

#[derive(Default)]
pub struct InMemoryLotRepository {
    lots: RwLock<HashMap<LotId, LotRecord>>,
}

impl InMemoryLotRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = LotRecord>) -> Self {
        let repository = Self::new();
        for record in records {
            repository.insert(record);
        }
        repository
    }

    /// Insert or replace a lot record.
    pub fn insert(&self, record: LotRecord) {
        self.lots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.id, record);
    }

    pub fn len(&self) -> usize {
        self.lots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LotRepository for InMemoryLotRepository {
    fn get_by_id(&self, lot_id: LotId) -> Result<LotRecord, RepositoryError> {
        self.lots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&lot_id)
            .cloned()
            .ok_or(RepositoryError::NotFound(lot_id))
    }
}
