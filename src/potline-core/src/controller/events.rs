// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Active-lot change notifications.
//!
//! Listeners are called synchronously on the thread that changed the
//! registry, so UI code can re-render before the change reaches the line
//! equipment.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::line::Line;
use crate::lot::ActiveLot;

/// Unique identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Trait for components that want to receive active-lot events.
///
/// All methods have default no-op implementations, so listeners can
/// selectively override only the events they care about.
pub trait LotListener: Send + Sync {
    /// A lot became active on a line, replacing `previous` if there was one.
    fn on_activated(&self, _lot: &ActiveLot, _previous: Option<&ActiveLot>) {}

    /// The active lot was removed from its line.
    fn on_deactivated(&self, _line: Line, _lot: &ActiveLot) {}

    /// A lot was finished with `actual_count` units produced.
    fn on_completed(&self, _lot: &ActiveLot, _actual_count: u32) {}
}

/// Manages registered listeners and dispatches events.
///
/// Cloning copies the listener handles, so a snapshot can notify without
/// holding the lock that guards registration.
#[derive(Default, Clone)]
pub struct LotEventEmitter {
    listeners: Vec<(ListenerId, Arc<dyn LotListener>)>,
}

impl LotEventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener to receive events.
    /// Returns an ID that can be used to unregister the listener.
    pub fn register(&mut self, listener: Arc<dyn LotListener>) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.push((id, listener));
        id
    }

    pub fn unregister(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn notify_activated(&self, lot: &ActiveLot, previous: Option<&ActiveLot>) {
        for (_, listener) in &self.listeners {
            listener.on_activated(lot, previous);
        }
    }

    pub fn notify_deactivated(&self, line: Line, lot: &ActiveLot) {
        for (_, listener) in &self.listeners {
            listener.on_deactivated(line, lot);
        }
    }

    pub fn notify_completed(&self, lot: &ActiveLot, actual_count: u32) {
        for (_, listener) in &self.listeners {
            listener.on_completed(lot, actual_count);
        }
    }
}
