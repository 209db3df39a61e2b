//! Core type definitions shared by the simulation interfaces and the renderer

use serde::{Deserialize, Serialize};

/// Identifier of a completed building in the simulation snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildingId(pub u32);

/// Identifier of a construction-queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstructionId(pub u32);

/// Identifier of a colonist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColonistId(pub u32);

/// Anything the pointer can hover or select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Building(BuildingId),
    Construction(ConstructionId),
    Colonist(ColonistId),
}

/// Position on the ground plane in world tile units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub z: f32,
}

impl WorldPos {
    pub const ORIGIN: WorldPos = WorldPos { x: 0.0, z: 0.0 };

    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn distance(&self, other: WorldPos) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.z.is_finite()
    }

    /// Integer tile containing this point (rounded to nearest).
    pub fn rounded(&self) -> (i32, i32) {
        (self.x.round() as i32, self.z.round() as i32)
    }

    pub fn lerp(self, target: WorldPos, t: f32) -> WorldPos {
        WorldPos {
            x: self.x + (target.x - self.x) * t,
            z: self.z + (target.z - self.z) * t,
        }
    }
}

/// Building types known to the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    House,
    Farm,
    Well,
    LumberMill,
    Quarry,
    Mine,
    Workshop,
    Forge,
    Smelter,
    Warehouse,
    Market,
    Tavern,
    Watchtower,
    Library,
    Shrine,
    Temple,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 16] = [
        BuildingKind::House,
        BuildingKind::Farm,
        BuildingKind::Well,
        BuildingKind::LumberMill,
        BuildingKind::Quarry,
        BuildingKind::Mine,
        BuildingKind::Workshop,
        BuildingKind::Forge,
        BuildingKind::Smelter,
        BuildingKind::Warehouse,
        BuildingKind::Market,
        BuildingKind::Tavern,
        BuildingKind::Watchtower,
        BuildingKind::Library,
        BuildingKind::Shrine,
        BuildingKind::Temple,
    ];

    /// Stable type name, also fed into the terrain signature hash.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildingKind::House => "house",
            BuildingKind::Farm => "farm",
            BuildingKind::Well => "well",
            BuildingKind::LumberMill => "lumber_mill",
            BuildingKind::Quarry => "quarry",
            BuildingKind::Mine => "mine",
            BuildingKind::Workshop => "workshop",
            BuildingKind::Forge => "forge",
            BuildingKind::Smelter => "smelter",
            BuildingKind::Warehouse => "warehouse",
            BuildingKind::Market => "market",
            BuildingKind::Tavern => "tavern",
            BuildingKind::Watchtower => "watchtower",
            BuildingKind::Library => "library",
            BuildingKind::Shrine => "shrine",
            BuildingKind::Temple => "temple",
        }
    }
}

/// What a colonist is currently doing, as far as animation cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColonistTask {
    #[default]
    Idle,
    Hauling,
    Building,
    Farming,
    Crafting,
    Researching,
}

impl ColonistTask {
    pub fn is_active(&self) -> bool {
        !matches!(self, ColonistTask::Idle)
    }
}

/// Stockpiled resources tracked by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Wood,
    Stone,
    Ore,
    Tools,
    Gold,
    Knowledge,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Food => "food",
            ResourceKind::Wood => "wood",
            ResourceKind::Stone => "stone",
            ResourceKind::Ore => "ore",
            ResourceKind::Tools => "tools",
            ResourceKind::Gold => "gold",
            ResourceKind::Knowledge => "knowledge",
        }
    }
}

/// Seasons cycle in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn from_day(day: u32, season_length_days: u32) -> Self {
        let length = season_length_days.max(1);
        match (day / length) % 4 {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Autumn,
            _ => Season::Winter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounded_tile() {
        assert_eq!(WorldPos::new(2.4, -1.6).rounded(), (2, -2));
        assert_eq!(WorldPos::new(0.5, 0.49).rounded(), (1, 0));
    }

    #[test]
    fn test_season_cycle() {
        assert_eq!(Season::from_day(0, 10), Season::Spring);
        assert_eq!(Season::from_day(15, 10), Season::Summer);
        assert_eq!(Season::from_day(39, 10), Season::Winter);
        assert_eq!(Season::from_day(40, 10), Season::Spring);
        // zero-length seasons fall back to one day each
        assert_eq!(Season::from_day(1, 0), Season::Summer);
    }

    #[test]
    fn test_building_kind_names_unique() {
        let mut names: Vec<_> = BuildingKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), BuildingKind::ALL.len());
    }
}
