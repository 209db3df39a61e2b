//! Simulation snapshot types - frozen, read-only input to every frame.
//!
//! The simulation owns these values; the renderer never mutates them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{
    BuildingId, BuildingKind, ColonistId, ColonistTask, ConstructionId, ResourceKind, WorldPos,
};

/// Frozen snapshot of simulation state for one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSnapshot {
    pub buildings: Vec<Building>,
    pub colonists: Vec<Colonist>,
    pub construction: Vec<ConstructionItem>,
    pub resources: BTreeMap<ResourceKind, f64>,
    /// Simulation seconds since the colony was founded
    pub elapsed: f64,
    pub day: u32,
    /// Radius (tiles) of the playable world around the origin
    pub world_radius: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub kind: BuildingKind,
    pub position: WorldPos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionItem {
    pub id: ConstructionId,
    pub kind: BuildingKind,
    pub position: WorldPos,
    /// Work applied so far (seconds)
    pub progress: f32,
    /// Work required (seconds)
    pub build_time: f32,
}

impl ConstructionItem {
    /// Completion ratio in [0, 1]; a zero build time never divides by zero.
    pub fn completion(&self) -> f32 {
        let ratio = self.progress / self.build_time.max(f32::EPSILON);
        if ratio.is_nan() {
            0.0
        } else {
            ratio.clamp(0.0, 1.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colonist {
    pub id: ColonistId,
    pub position: WorldPos,
    pub alive: bool,
    #[serde(default)]
    pub task: ColonistTask,
    /// Years lived; also used as a per-colonist animation phase offset
    #[serde(default)]
    pub age: f32,
}

/// One structure as the terrain layer sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Structure {
    pub position: WorldPos,
    pub kind: BuildingKind,
}

impl SimulationSnapshot {
    /// Buildings followed by construction-queue entries.
    pub fn structures(&self) -> Vec<Structure> {
        self.buildings
            .iter()
            .map(|b| Structure { position: b.position, kind: b.kind })
            .chain(
                self.construction
                    .iter()
                    .map(|c| Structure { position: c.position, kind: c.kind }),
            )
            .collect()
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn resource(&self, kind: ResourceKind) -> f64 {
        self.resources.get(&kind).copied().unwrap_or(0.0)
    }
}
