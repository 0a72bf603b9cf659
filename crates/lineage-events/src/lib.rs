use crossbeam_channel::{Receiver, Sender, unbounded};
use lineage_core::{NodeId, ViewLevel};
use serde::{Deserialize, Serialize};

pub mod notifications;

pub use notifications::{NotificationLevel, Notifier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Graph lifecycle
    GraphLoading {
        level: ViewLevel,
        entity_id: NodeId,
    },
    GraphLoaded {
        level: ViewLevel,
        node_count: usize,
        edge_count: usize,
    },
    /// The backend answered with zero nodes. Rendered as an explicit empty state.
    GraphEmpty {
        level: ViewLevel,
    },
    GraphReset {
        level: ViewLevel,
    },

    // Search
    SearchComplete {
        level: ViewLevel,
        query: String,
        result_count: usize,
    },

    // Interaction
    NodeSelected {
        level: ViewLevel,
        node_id: NodeId,
    },
    ActiveLevelChanged {
        level: ViewLevel,
    },

    // Export
    ExportCompleted {
        file_name: String,
        byte_count: usize,
    },

    // Notifications
    ShowInfo {
        message: String,
    },
    ShowSuccess {
        message: String,
    },
    ShowWarning {
        message: String,
    },
    ShowError {
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Drains everything published so far without blocking.
    pub fn drain(&self) -> Vec<Event> {
        self.rx.try_iter().collect()
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the host's UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Trait for components that respond to events.
/// Implement this to receive events from the EventBus.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}
