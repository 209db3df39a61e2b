//! Deterministic in-memory colony used by the profiling binary and tests.
//!
//! It follows just enough rules to produce churn for the viewer: queued
//! buildings progress and complete, colonists wander between buildings,
//! stockpiles grow. None of this is the real economy.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::types::{
    BuildingId, BuildingKind, ColonistId, ColonistTask, ConstructionId, ResourceKind, WorldPos,
};

use super::engine::{QueueOutcome, SimulationEngine};
use super::events::{EventBus, EventHandler, EventKind, SimEvent, SubscriptionId};
use super::snapshot::{Building, Colonist, ConstructionItem, SimulationSnapshot};

const BUILD_TIME: f32 = 8.0;
const COLONIST_SPEED: f32 = 1.5;
const DAY_LENGTH: f64 = 240.0;

pub struct ScriptedColony {
    state: SimulationSnapshot,
    targets: BTreeMap<ColonistId, WorldPos>,
    research: Option<(String, f64)>,
    bus: EventBus,
    rng: ChaCha8Rng,
    next_id: u32,
}

impl ScriptedColony {
    pub fn new(seed: u64, world_radius: i32) -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(ResourceKind::Food, 40.0);
        resources.insert(ResourceKind::Wood, 25.0);
        resources.insert(ResourceKind::Stone, 10.0);

        Self {
            state: SimulationSnapshot {
                resources,
                world_radius,
                ..Default::default()
            },
            targets: BTreeMap::new(),
            research: None,
            bus: EventBus::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// A small starting settlement: a few finished buildings and colonists.
    pub fn founded(seed: u64, world_radius: i32) -> Self {
        let mut colony = Self::new(seed, world_radius);
        let layout = [
            (BuildingKind::House, 0.0, 0.0),
            (BuildingKind::Farm, 3.0, 1.0),
            (BuildingKind::LumberMill, -4.0, 2.0),
            (BuildingKind::Shrine, 1.0, -5.0),
            (BuildingKind::Forge, 5.0, -3.0),
        ];
        for (kind, x, z) in layout {
            let id = BuildingId(colony.allocate_id());
            colony.state.buildings.push(Building {
                id,
                kind,
                position: WorldPos::new(x, z),
            });
        }
        for _ in 0..6 {
            colony.hire_colonist();
        }
        colony
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn pick_destination(&mut self) -> WorldPos {
        if self.state.buildings.is_empty() {
            return WorldPos::ORIGIN;
        }
        let idx = self.rng.gen_range(0..self.state.buildings.len());
        self.state.buildings[idx].position
    }

    fn advance_construction(&mut self, dt: f32) {
        let mut finished = Vec::new();
        for item in &mut self.state.construction {
            item.progress += dt;
            if item.progress >= item.build_time {
                finished.push(item.clone());
            }
        }
        self.state.construction.retain(|c| c.progress < c.build_time);

        for item in finished {
            let id = BuildingId(self.allocate_id());
            self.state.buildings.push(Building {
                id,
                kind: item.kind,
                position: item.position,
            });
            let event = SimEvent::new(
                EventKind::ConstructionComplete,
                format!("{} completed", item.kind.as_str()),
                self.state.elapsed,
            )
            .at(item.position);
            self.bus.publish(&event);
        }
    }

    fn advance_colonists(&mut self, dt: f32) {
        let mut arrived = Vec::new();
        for colonist in &mut self.state.colonists {
            let Some(target) = self.targets.get(&colonist.id).copied() else {
                continue;
            };
            let distance = colonist.position.distance(target);
            let stride = COLONIST_SPEED * dt;
            if distance <= stride {
                colonist.position = target;
                colonist.task = ColonistTask::Idle;
                arrived.push(colonist.id);
            } else {
                colonist.position = colonist.position.lerp(target, stride / distance);
                colonist.task = ColonistTask::Hauling;
            }
        }
        for id in arrived {
            let destination = self.pick_destination();
            self.targets.insert(id, destination);
        }
    }

    fn advance_stockpiles(&mut self, dt: f64) {
        for building in &self.state.buildings {
            let (kind, rate) = match building.kind {
                BuildingKind::Farm => (ResourceKind::Food, 0.8),
                BuildingKind::LumberMill => (ResourceKind::Wood, 0.6),
                BuildingKind::Quarry => (ResourceKind::Stone, 0.4),
                BuildingKind::Mine => (ResourceKind::Ore, 0.3),
                BuildingKind::Forge => (ResourceKind::Tools, 0.1),
                BuildingKind::Library => (ResourceKind::Knowledge, 0.2),
                _ => continue,
            };
            *self.state.resources.entry(kind).or_insert(0.0) += rate * dt;
        }
    }

    fn advance_research(&mut self, dt: f64) {
        let Some((tech, remaining)) = self.research.as_mut() else {
            return;
        };
        *remaining -= dt;
        if *remaining <= 0.0 {
            let event = SimEvent::new(
                EventKind::ResearchComplete,
                format!("Research complete: {}", tech),
                self.state.elapsed,
            );
            self.research = None;
            self.bus.publish(&event);
        }
    }
}

impl SimulationEngine for ScriptedColony {
    fn snapshot(&self) -> SimulationSnapshot {
        self.state.clone()
    }

    fn step(&mut self, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let previous_day = self.state.day;
        self.state.elapsed += dt;
        self.state.day = (self.state.elapsed / DAY_LENGTH) as u32;

        self.advance_construction(dt as f32);
        self.advance_colonists(dt as f32);
        self.advance_stockpiles(dt);
        self.advance_research(dt);

        if self.state.day != previous_day {
            let event = SimEvent::new(
                EventKind::SeasonChange,
                format!("Day {}", self.state.day),
                self.state.elapsed,
            );
            self.bus.publish(&event);
        }
    }

    fn queue_building(&mut self, kind: BuildingKind, x: i32, z: i32) -> QueueOutcome {
        let radius = self.state.world_radius;
        if x * x + z * z > radius * radius {
            return QueueOutcome::rejected("outside the settlement");
        }
        let position = WorldPos::new(x as f32, z as f32);
        let occupied = self
            .state
            .structures()
            .iter()
            .any(|s| s.position.rounded() == (x, z));
        if occupied {
            return QueueOutcome::rejected("tile occupied");
        }
        let id = ConstructionId(self.allocate_id());
        self.state.construction.push(ConstructionItem {
            id,
            kind,
            position,
            progress: 0.0,
            build_time: BUILD_TIME,
        });
        QueueOutcome::accepted()
    }

    fn hire_colonist(&mut self) -> QueueOutcome {
        let food = self.state.resource(ResourceKind::Food);
        if food < 5.0 {
            return QueueOutcome::rejected("not enough food");
        }
        self.state.resources.insert(ResourceKind::Food, food - 5.0);

        let id = ColonistId(self.allocate_id());
        let age = self.rng.gen_range(16.0..60.0);
        self.state.colonists.push(Colonist {
            id,
            position: WorldPos::ORIGIN,
            alive: true,
            task: ColonistTask::Idle,
            age,
        });
        let destination = self.pick_destination();
        self.targets.insert(id, destination);

        let event = SimEvent::new(EventKind::ColonistHired, "A colonist joined", self.state.elapsed);
        self.bus.publish(&event);
        QueueOutcome::accepted()
    }

    fn begin_research(&mut self, tech_id: &str) -> QueueOutcome {
        if self.research.is_some() {
            return QueueOutcome::rejected("research already in progress");
        }
        self.research = Some((tech_id.to_owned(), 30.0));
        QueueOutcome::accepted()
    }

    fn on(&mut self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        self.bus.subscribe(kind, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_queued_building_completes_and_notifies() {
        let mut colony = ScriptedColony::new(7, 10);
        let done = Rc::new(RefCell::new(0));
        let counter = done.clone();
        colony.on(
            EventKind::ConstructionComplete,
            Box::new(move |_| *counter.borrow_mut() += 1),
        );

        assert!(colony.queue_building(BuildingKind::Well, 2, 2).ok);
        assert_eq!(colony.snapshot().construction.len(), 1);

        for _ in 0..10 {
            colony.step(1.0);
        }
        let snapshot = colony.snapshot();
        assert!(snapshot.construction.is_empty());
        assert_eq!(snapshot.buildings.len(), 1);
        assert_eq!(*done.borrow(), 1);
    }

    #[test]
    fn test_queue_rejects_occupied_and_far_tiles() {
        let mut colony = ScriptedColony::new(1, 5);
        assert!(colony.queue_building(BuildingKind::House, 0, 0).ok);
        assert!(!colony.queue_building(BuildingKind::Farm, 0, 0).ok);
        assert!(!colony.queue_building(BuildingKind::Farm, 9, 0).ok);
    }

    #[test]
    fn test_same_seed_same_history() {
        let mut a = ScriptedColony::founded(42, 12);
        let mut b = ScriptedColony::founded(42, 12);
        for _ in 0..50 {
            a.step(0.1);
            b.step(0.1);
        }
        assert_eq!(a.snapshot().colonists, b.snapshot().colonists);
    }
}
