//! External simulation interfaces.
//!
//! The colony simulation itself lives outside this crate. The viewer reads
//! `SimulationSnapshot`s and listens to `EventBus` notifications.

pub mod engine;
pub mod events;
pub mod scripted;
pub mod snapshot;

pub use engine::{QueueOutcome, SimulationEngine};
pub use events::{EventBus, EventHandler, EventKind, NotificationDeduper, SimEvent, SubscriptionId};
pub use scripted::ScriptedColony;
pub use snapshot::{Building, Colonist, ConstructionItem, SimulationSnapshot, Structure};
