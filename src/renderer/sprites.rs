//! Sprite identities, draw sizes and colonist animation.
//!
//! Image assets are loaded by the host; the renderer only names sprites and
//! decides where they go.

use glam::Vec2;

use crate::core::types::BuildingKind;

/// Which sprite to draw. Hosts map these to their loaded images.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpriteKey {
    Building(BuildingKind),
    /// Scaffolding ghost shown under a construction site
    Unbuilt(BuildingKind),
    /// Lit windows overlay for buildings on the night allow-list
    WindowGlow(BuildingKind),
    Colonist { frame: u32, active: bool },
}

/// Sine bob applied to colonist sprites.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bob {
    /// Radians per second
    pub frequency: f32,
    /// Pixels at zoom 1
    pub amplitude: f32,
}

/// Walk-cycle animation for colonists.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColonistAnimation {
    pub frame_count: u32,
    pub fps: f32,
    pub idle_bob: Bob,
    pub active_bob: Bob,
}

impl Default for ColonistAnimation {
    fn default() -> Self {
        Self {
            frame_count: 4,
            fps: 6.0,
            idle_bob: Bob {
                frequency: 2.0,
                amplitude: 1.0,
            },
            active_bob: Bob {
                frequency: 9.0,
                amplitude: 2.5,
            },
        }
    }
}

impl ColonistAnimation {
    /// Frame for a colonist; `age` offsets the phase so colonists don't
    /// animate in lockstep.
    pub fn frame_index(&self, time: f64, age: f32) -> u32 {
        if self.frame_count == 0 {
            return 0;
        }
        let raw = time * self.fps as f64 + age as f64;
        let frame = raw.rem_euclid(self.frame_count as f64).floor();
        if frame.is_finite() {
            (frame as u32).min(self.frame_count - 1)
        } else {
            0
        }
    }

    /// Vertical bob in pixels at zoom 1.
    pub fn bob_offset(&self, time: f64, age: f32, active: bool) -> f32 {
        let bob = if active { self.active_bob } else { self.idle_bob };
        ((time + age as f64) * bob.frequency as f64).sin() as f32 * bob.amplitude
    }
}

#[derive(Clone, Debug, Default)]
pub struct SpriteCatalog {
    pub colonist: ColonistAnimation,
}

impl SpriteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sprite size in pixels at zoom 1. The sprite's anchor is its
    /// bottom-center, placed on the tile center.
    pub fn building_size(&self, kind: BuildingKind) -> Vec2 {
        match kind {
            BuildingKind::House => Vec2::new(72.0, 64.0),
            BuildingKind::Farm => Vec2::new(96.0, 52.0),
            BuildingKind::Well => Vec2::new(40.0, 44.0),
            BuildingKind::LumberMill => Vec2::new(88.0, 72.0),
            BuildingKind::Quarry => Vec2::new(84.0, 56.0),
            BuildingKind::Mine => Vec2::new(80.0, 64.0),
            BuildingKind::Workshop => Vec2::new(76.0, 68.0),
            BuildingKind::Forge => Vec2::new(76.0, 80.0),
            BuildingKind::Smelter => Vec2::new(72.0, 88.0),
            BuildingKind::Warehouse => Vec2::new(96.0, 72.0),
            BuildingKind::Market => Vec2::new(96.0, 64.0),
            BuildingKind::Tavern => Vec2::new(84.0, 76.0),
            BuildingKind::Watchtower => Vec2::new(48.0, 112.0),
            BuildingKind::Library => Vec2::new(80.0, 84.0),
            BuildingKind::Shrine => Vec2::new(52.0, 60.0),
            BuildingKind::Temple => Vec2::new(96.0, 104.0),
        }
    }

    pub fn colonist_size(&self) -> Vec2 {
        Vec2::new(22.0, 30.0)
    }

    /// Building types whose windows light up at night.
    pub fn lit_at_night(&self, kind: BuildingKind) -> bool {
        matches!(
            kind,
            BuildingKind::House
                | BuildingKind::Tavern
                | BuildingKind::Library
                | BuildingKind::Temple
                | BuildingKind::Workshop
                | BuildingKind::Market
        )
    }
}
