//! Notification fan-out from the simulation engine.
//!
//! Engines publish `SimEvent`s on an `EventBus`; subscribers register per
//! event kind. `NotificationDeduper` suppresses repeated message text within
//! a time window so the toast layer is not flooded.

use ahash::AHashMap;

use crate::core::types::WorldPos;

/// Fixed set of notification kinds an engine may publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ConstructionComplete,
    ColonistHired,
    ColonistDeath,
    ResearchComplete,
    ResourceShortage,
    SeasonChange,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::ConstructionComplete,
        EventKind::ColonistHired,
        EventKind::ColonistDeath,
        EventKind::ResearchComplete,
        EventKind::ResourceShortage,
        EventKind::SeasonChange,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimEvent {
    pub kind: EventKind,
    pub message: String,
    /// Simulation time the event happened at
    pub time: f64,
    /// Where it happened, when the event is tied to a place
    pub position: Option<WorldPos>,
}

impl SimEvent {
    pub fn new(kind: EventKind, message: impl Into<String>, time: f64) -> Self {
        Self {
            kind,
            message: message.into(),
            time,
            position: None,
        }
    }

    pub fn at(mut self, position: WorldPos) -> Self {
        self.position = Some(position);
        self
    }
}

pub type EventHandler = Box<dyn FnMut(&SimEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Publish/subscribe channel keyed by event kind.
#[derive(Default)]
pub struct EventBus {
    handlers: AHashMap<EventKind, Vec<(SubscriptionId, EventHandler)>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.handlers.entry(kind).or_default().push((id, handler));
        id
    }

    /// Returns false if the subscription was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for handlers in self.handlers.values_mut() {
            if let Some(idx) = handlers.iter().position(|(sub, _)| *sub == id) {
                handlers.remove(idx);
                return true;
            }
        }
        false
    }

    /// Deliver to every handler of the event's kind, in subscription order.
    /// Returns the number of handlers invoked.
    pub fn publish(&mut self, event: &SimEvent) -> usize {
        match self.handlers.get_mut(&event.kind) {
            Some(handlers) => {
                for (_, handler) in handlers.iter_mut() {
                    handler(event);
                }
                handlers.len()
            }
            None => 0,
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

/// Time-to-live cache keyed by message text.
#[derive(Debug, Clone)]
pub struct NotificationDeduper {
    window: f64,
    last_seen: AHashMap<String, f64>,
}

impl NotificationDeduper {
    pub fn new(window_seconds: f64) -> Self {
        Self {
            window: window_seconds,
            last_seen: AHashMap::new(),
        }
    }

    /// True if `message` should be shown at `now`; records it when shown.
    pub fn admit(&mut self, message: &str, now: f64) -> bool {
        self.prune(now);
        if self.last_seen.contains_key(message) {
            return false;
        }
        self.last_seen.insert(message.to_owned(), now);
        true
    }

    /// Drop entries older than the window.
    pub fn prune(&mut self, now: f64) {
        let window = self.window;
        self.last_seen.retain(|_, seen| now - *seen < window);
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}
