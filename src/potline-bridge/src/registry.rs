// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Authoritative record of the lot running on each line.
//!
//! Local state changes first and listeners hear about it synchronously; the
//! equipment is updated in the background. A failed remote write is logged
//! and never rolls back local state.
//!
//! Changes to one line are serialized by that line's turn lock. The slot
//! lock only guards the value itself and is never held while listeners run,
//! so listeners may read any line.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

use potline_core::controller::{ListenerId, LotEventEmitter, LotListener};
use potline_core::{ActiveLot, Line, LotId};

use crate::completion::{CompletionEvent, CompletionSink};
use crate::dispatch::LotDispatch;
use crate::repository::{LotRepository, RepositoryError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("cannot activate lot {lot_id}: {source}")]
    LotLookup {
        lot_id: LotId,
        #[source]
        source: RepositoryError,
    },

    #[error("cannot activate lot {requested}: repository returned lot {returned}")]
    LotMismatch { requested: LotId, returned: LotId },
}

pub struct ActiveLotRegistry {
    turns: [Mutex<()>; 2],
    slots: [Mutex<Option<ActiveLot>>; 2],
    listeners: Mutex<LotEventEmitter>,
    repository: Arc<dyn LotRepository>,
    dispatch: Arc<dyn LotDispatch>,
    completions: Arc<dyn CompletionSink>,
}

impl ActiveLotRegistry {
    pub fn new(
        repository: Arc<dyn LotRepository>,
        dispatch: Arc<dyn LotDispatch>,
        completions: Arc<dyn CompletionSink>,
    ) -> Self {
        Self {
            turns: [Mutex::new(()), Mutex::new(())],
            slots: [Mutex::new(None), Mutex::new(None)],
            listeners: Mutex::new(LotEventEmitter::new()),
            repository,
            dispatch,
            completions,
        }
    }

    /// Make `lot_id` the active lot of `line`, replacing any previous one.
    ///
    /// The remote write is queued, not awaited. Listeners may read the
    /// registry but must not change it.
    pub fn activate(&self, line: Line, lot_id: LotId) -> Result<ActiveLot, RegistryError> {
        let record = self
            .repository
            .get_by_id(lot_id)
            .map_err(|source| RegistryError::LotLookup { lot_id, source })?;
        if record.id != lot_id {
            warn!("Line {} lot {} lookup returned lot {}", line, lot_id, record.id);
            return Err(RegistryError::LotMismatch {
                requested: lot_id,
                returned: record.id,
            });
        }
        let lot = ActiveLot::new(line, record);

        let _turn = self.turn(line);
        let previous = self.slot(line).replace(lot.clone());
        // Enqueued within the turn so remote order matches local order.
        self.dispatch.dispatch(line, lot.lot_id);
        match &previous {
            Some(prev) => info!("Line {} active lot {} -> {}", line, prev.lot_id, lot.lot_id),
            None => info!("Line {} active lot {}", line, lot.lot_id),
        }
        self.listeners().notify_activated(&lot, previous.as_ref());
        Ok(lot)
    }

    /// Clear `line`. False when nothing was active.
    pub fn deactivate(&self, line: Line) -> bool {
        let _turn = self.turn(line);
        self.deactivate_in_turn(line)
    }

    /// Record a completion for the active lot of `line` and deactivate it.
    /// False when nothing was active.
    pub fn complete(&self, line: Line, actual_count: u32) -> bool {
        let _turn = self.turn(line);
        let Some(lot) = self.active_lot_for_line(line) else {
            debug!("Line {} complete ignored: no active lot", line);
            return false;
        };
        self.completions
            .record(&CompletionEvent::new(&lot, actual_count));
        self.listeners().notify_completed(&lot, actual_count);
        self.deactivate_in_turn(line)
    }

    pub fn active_lot_for_line(&self, line: Line) -> Option<ActiveLot> {
        self.slot(line).clone()
    }

    /// Snapshot of all active lots, line 1 first.
    pub fn active_lots(&self) -> Vec<ActiveLot> {
        Line::ALL
            .into_iter()
            .filter_map(|line| self.active_lot_for_line(line))
            .collect()
    }

    pub fn register(&self, listener: Arc<dyn LotListener>) -> ListenerId {
        self.emitter().register(listener)
    }

    pub fn unregister(&self, id: ListenerId) {
        self.emitter().unregister(id);
    }

    /// Caller holds the turn of `line`.
    fn deactivate_in_turn(&self, line: Line) -> bool {
        let Some(lot) = self.slot(line).take() else {
            return false;
        };
        self.dispatch.dispatch(line, 0);
        info!("Line {} lot {} deactivated", line, lot.lot_id);
        self.listeners().notify_deactivated(line, &lot);
        true
    }

    fn turn(&self, line: Line) -> MutexGuard<'_, ()> {
        self.turns[line.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, line: Line) -> MutexGuard<'_, Option<ActiveLot>> {
        self.slots[line.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emitter(&self) -> MutexGuard<'_, LotEventEmitter> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Listeners registered right now, notified without any registry lock
    /// other than the caller's turn.
    fn listeners(&self) -> LotEventEmitter {
        self.emitter().clone()
    }
}
