//! Interface to the external colony simulation.
//!
//! The viewer only ever reads snapshots; the mutating calls exist so UI
//! handlers wired through the renderer (ground clicks, hire buttons) have
//! one contract to talk to.

use crate::core::types::BuildingKind;

use super::events::{EventHandler, EventKind, SubscriptionId};
use super::snapshot::SimulationSnapshot;

/// Result of a mutating request against the simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueOutcome {
    pub ok: bool,
    /// Why the request was refused, when it was
    pub reason: Option<String>,
}

impl QueueOutcome {
    pub fn accepted() -> Self {
        Self { ok: true, reason: None }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

pub trait SimulationEngine {
    /// Frozen copy of the current state.
    fn snapshot(&self) -> SimulationSnapshot;

    /// Advance the simulation by `dt` seconds.
    fn step(&mut self, dt: f64);

    fn queue_building(&mut self, kind: BuildingKind, x: i32, z: i32) -> QueueOutcome;

    fn hire_colonist(&mut self) -> QueueOutcome;

    fn begin_research(&mut self, tech_id: &str) -> QueueOutcome;

    /// Subscribe to one kind of notification.
    fn on(&mut self, kind: EventKind, handler: EventHandler) -> SubscriptionId;
}
