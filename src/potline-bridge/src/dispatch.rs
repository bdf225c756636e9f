// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Background propagation of active-lot changes.
//!
//! Each line has one worker task draining its own queue, so writes for a
//! line reach the equipment in the order they were enqueued while the two
//! lines proceed independently. Enqueueing never blocks and works from
//! threads without a reactor.

use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use potline_core::{Component, Line, LotId};

use crate::controller::LineController;

const OUTCOME_CAPACITY: usize = 64;

/// Result of one background write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub line: Line,
    pub lot_id: LotId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fire-and-forget sink for active-lot changes.
pub trait LotDispatch: Send + Sync {
    fn dispatch(&self, line: Line, lot_id: LotId);
}

#[derive(Debug)]
struct LineWork {
    lot_id: LotId,
}

pub struct LineDispatcher {
    queues: [mpsc::UnboundedSender<LineWork>; 2],
    outcomes: broadcast::Sender<DispatchOutcome>,
}

impl LineDispatcher {
    /// Spawn one worker per line on `handle`.
    pub fn spawn(handle: &Handle, controller: Arc<LineController>) -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_CAPACITY);
        let queues = Line::ALL.map(|line| {
            let (tx, rx) = mpsc::unbounded_channel();
            handle.spawn(run_line_worker(
                line,
                rx,
                Arc::clone(&controller),
                outcomes.clone(),
            ));
            tx
        });
        Self { queues, outcomes }
    }

    /// Outcomes of writes completed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchOutcome> {
        self.outcomes.subscribe()
    }

    /// Queue a write of `lot_id` for `line`. Returns false when the worker
    /// is gone (runtime shut down).
    pub fn enqueue(&self, line: Line, lot_id: LotId) -> bool {
        match self.queues[line.index()].send(LineWork { lot_id }) {
            Ok(()) => true,
            Err(_) => {
                warn!("Line {} dispatcher stopped; lot {} not sent", line, lot_id);
                false
            }
        }
    }
}

impl LotDispatch for LineDispatcher {
    fn dispatch(&self, line: Line, lot_id: LotId) {
        self.enqueue(line, lot_id);
    }
}

async fn run_line_worker(
    line: Line,
    mut rx: mpsc::UnboundedReceiver<LineWork>,
    controller: Arc<LineController>,
    outcomes: broadcast::Sender<DispatchOutcome>,
) {
    while let Some(work) = rx.recv().await {
        let result = controller
            .try_set_active_lot(line, Component::default(), work.lot_id)
            .await;
        let outcome = match result {
            Ok(()) => {
                info!("Line {} active lot {} sent", line, work.lot_id);
                DispatchOutcome {
                    line,
                    lot_id: work.lot_id,
                    success: true,
                    error: None,
                }
            }
            Err(err) => {
                warn!("Line {} active lot {} not sent: {}", line, work.lot_id, err);
                DispatchOutcome {
                    line,
                    lot_id: work.lot_id,
                    success: false,
                    error: Some(err.to_string()),
                }
            }
        };
        // No subscribers is fine.
        let _ = outcomes.send(outcome);
    }
    debug!("Line {} dispatcher stopped", line);
}
