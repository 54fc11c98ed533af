// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-thread event injection.
//!
//! The engine mutates the data model only on the host loop thread; other
//! threads post events through a shared queue that `step()` drains first.

use std::sync::Arc;

use mote_core::Path;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HostEvent {
    /// A resource changed outside the engine; re-evaluate observations.
    ResourceChanged { path: Path },
    /// Ask for a registration Update on every registered server.
    UpdateTrigger,
}

#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    inner: Arc<Mutex<Vec<HostEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> EventHandle {
        EventHandle { inner: Arc::clone(&self.inner) }
    }

    pub fn drain(&self) -> Vec<HostEvent> {
        std::mem::take(&mut *self.inner.lock())
    }
}

/// Clonable, thread-safe handle for posting events into the engine.
#[derive(Debug, Clone)]
pub struct EventHandle {
    inner: Arc<Mutex<Vec<HostEvent>>>,
}

impl EventHandle {
    pub fn resource_changed(&self, path: Path) {
        self.inner.lock().push(HostEvent::ResourceChanged { path });
    }

    pub fn trigger_update(&self) {
        self.inner.lock().push(HostEvent::UpdateTrigger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_drain_in_post_order() {
        let queue = EventQueue::new();
        let handle = queue.handle();
        handle.resource_changed(Path::resource(3, 0, 9));
        handle.trigger_update();

        let drained = queue.drain();
        assert_eq!(
            drained,
            vec![
                HostEvent::ResourceChanged { path: Path::resource(3, 0, 9) },
                HostEvent::UpdateTrigger,
            ]
        );
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn handle_posts_from_another_thread() {
        let queue = EventQueue::new();
        let handle = queue.handle();
        std::thread::spawn(move || handle.trigger_update())
            .join()
            .unwrap();
        assert_eq!(queue.drain(), vec![HostEvent::UpdateTrigger]);
    }
}
