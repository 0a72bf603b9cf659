use crate::{Event, EventBus};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Notification severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Publishes user-visible notifications on the bus, dropping repeats of the
/// same message inside the dedup window.
#[derive(Clone)]
pub struct Notifier {
    bus: EventBus,
    recent: Arc<Mutex<Vec<(String, Instant)>>>,
    max_recent: usize,
    dedup_window: Duration,
}

impl Notifier {
    pub fn new(bus: EventBus, dedup_window: Duration) -> Self {
        Self {
            bus,
            recent: Arc::new(Mutex::new(Vec::new())),
            max_recent: 50,
            dedup_window,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Show a notification
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();

        if !self.remember(&message) {
            tracing::debug!("Suppressing duplicate notification: {}", message);
            return;
        }

        let event = match level {
            NotificationLevel::Info => Event::ShowInfo { message },
            NotificationLevel::Success => Event::ShowSuccess { message },
            NotificationLevel::Warning => Event::ShowWarning { message },
            NotificationLevel::Error => Event::ShowError { message },
        };
        self.bus.publish(event);
    }

    /// Records `message` unless it repeats one inside the dedup window.
    /// Check and record happen under one lock, so concurrent repeats publish
    /// once.
    fn remember(&self, message: &str) -> bool {
        let now = Instant::now();
        let mut recent = self.recent.lock();

        // Clean old entries (older than 60 seconds)
        recent.retain(|(_, timestamp)| now.duration_since(*timestamp) < Duration::from_secs(60));

        if recent
            .iter()
            .any(|(msg, timestamp)| msg == message && now.duration_since(*timestamp) < self.dedup_window)
        {
            return false;
        }
        recent.push((message.to_string(), now));
        if recent.len() > self.max_recent {
            recent.remove(0);
        }
        true
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message);
    }

    pub fn clear_recent(&self) {
        self.recent.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_map_to_events() {
        let bus = EventBus::new();
        let notifier = Notifier::new(bus.clone(), Duration::from_secs(2));
        notifier.info("a");
        notifier.success("b");
        notifier.warning("c");
        notifier.error("d");

        let events = bus.drain();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[3], Event::ShowError { ref message } if message == "d"));
    }

    #[test]
    fn test_deduplication() {
        let bus = EventBus::new();
        let notifier = Notifier::new(bus.clone(), Duration::from_secs(2));
        notifier.error("Failed to load lineage graph");
        notifier.error("Failed to load lineage graph");
        assert_eq!(bus.drain().len(), 1);

        notifier.clear_recent();
        notifier.error("Failed to load lineage graph");
        assert_eq!(bus.drain().len(), 1);
    }

    #[test]
    fn test_concurrent_repeats_publish_once() {
        let bus = EventBus::new();
        let notifier = Notifier::new(bus.clone(), Duration::from_secs(2));
        let barrier = std::sync::Barrier::new(8);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    barrier.wait();
                    notifier.error("Failed to load lineage graph");
                });
            }
        });

        assert_eq!(bus.drain().len(), 1);
    }

    #[test]
    fn test_zero_window_disables_deduplication() {
        let bus = EventBus::new();
        let notifier = Notifier::new(bus.clone(), Duration::ZERO);
        notifier.warning("same");
        notifier.warning("same");
        assert_eq!(bus.drain().len(), 2);
    }
}
