// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus

use super::{EventBus, ProcessFilter, ProcessReceiver, SubscriberId};
use colony_core::Process;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::mpsc;

type ProcessSender = mpsc::UnboundedSender<Process>;

/// Routes process changes to subscribers over unbounded channels
#[derive(Default)]
pub struct ProcessBus {
    subscribers: RwLock<HashMap<SubscriberId, (ProcessFilter, ProcessSender)>>,
    next_id: AtomicU64,
}

impl ProcessBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl EventBus for ProcessBus {
    fn publish(&self, process: &Process) {
        let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
        for (filter, tx) in subs.values() {
            if filter.matches(process) {
                // A receiver that already went away unsubscribes itself
                let _ = tx.send(process.clone());
            }
        }
    }

    fn subscribe(&self, filter: ProcessFilter) -> (SubscriberId, ProcessReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::SeqCst));

        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.insert(id, (filter, tx));
        tracing::trace!(subscriber = %id, "subscribed");

        (id, rx)
    }

    fn unsubscribe(&self, id: SubscriberId) {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subs.remove(&id);
        tracing::trace!(subscriber = %id, "unsubscribed");
    }
}

#[cfg(test)]
#[path = "process_bus_tests.rs"]
mod tests;
