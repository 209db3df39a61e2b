//! Per-entity render state kept between ticks.
//!
//! Both registries are keyed by simulation id and pruned against the
//! current snapshot every tick, so entities that vanish don't leave
//! entries behind.

use std::hash::Hash;

use ahash::{AHashMap, AHashSet};

use crate::core::types::{BuildingId, ColonistId, WorldPos};
use crate::sim::snapshot::SimulationSnapshot;

/// Colonists farther than this from their render position snap instead of
/// gliding (teleports, respawns).
const SNAP_DISTANCE: f32 = 4.0;

/// Drop every entry whose key is not in `present`. Returns how many went.
fn retain_present<K: Eq + Hash, V>(map: &mut AHashMap<K, V>, present: &AHashSet<K>) -> usize {
    let before = map.len();
    map.retain(|id, _| present.contains(id));
    before - map.len()
}

/// Ease-out with a small overshoot, 0 at t=0 and 1 at t=1.
fn ease_out_back(t: f32) -> f32 {
    const C1: f32 = 1.701_58;
    const C3: f32 = C1 + 1.0;
    let u = t.clamp(0.0, 1.0) - 1.0;
    1.0 + C3 * u * u * u + C1 * u * u
}

/// Scale-in timers for freshly placed buildings.
#[derive(Debug, Clone)]
pub struct PlacementTimers {
    starts: AHashMap<BuildingId, f64>,
    duration: f32,
}

impl PlacementTimers {
    pub fn new(duration: f32) -> Self {
        Self {
            starts: AHashMap::new(),
            duration: duration.max(f32::EPSILON),
        }
    }

    pub fn start(&mut self, id: BuildingId, now: f64) {
        self.starts.insert(id, now);
    }

    /// Sprite scale multiplier; 1.0 once the animation is over or when the
    /// building never had one.
    pub fn scale(&self, id: BuildingId, now: f64) -> f32 {
        match self.starts.get(&id) {
            Some(start) => {
                let t = ((now - start) / self.duration as f64) as f32;
                if t >= 1.0 {
                    1.0
                } else {
                    0.2 + 0.8 * ease_out_back(t)
                }
            }
            None => 1.0,
        }
    }

    /// Forget timers for buildings that are gone or finished animating.
    pub fn prune(&mut self, snapshot: &SimulationSnapshot, now: f64) -> usize {
        let present: AHashSet<BuildingId> = snapshot.buildings.iter().map(|b| b.id).collect();
        let removed = retain_present(&mut self.starts, &present);
        let duration = self.duration as f64;
        self.starts.retain(|_, start| now - *start < duration);
        removed
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Smoothed render positions for colonists.
#[derive(Debug, Clone)]
pub struct ColonistInterpolation {
    positions: AHashMap<ColonistId, WorldPos>,
    smoothing: f32,
}

impl ColonistInterpolation {
    pub fn new(smoothing_seconds: f32) -> Self {
        Self {
            positions: AHashMap::new(),
            smoothing: smoothing_seconds,
        }
    }

    /// Move every alive colonist's render position toward its snapshot
    /// position and drop entries for colonists no longer alive. Colonists
    /// with non-finite positions get no entry and are skipped when drawing.
    pub fn update(&mut self, snapshot: &SimulationSnapshot, dt: f32) -> usize {
        let t = if self.smoothing <= 0.0 {
            1.0
        } else {
            1.0 - (-dt.max(0.0) / self.smoothing).exp()
        };

        let mut present = AHashSet::with_capacity(snapshot.colonists.len());
        for colonist in snapshot.colonists.iter().filter(|c| c.alive) {
            if !colonist.position.is_finite() {
                continue;
            }
            present.insert(colonist.id);
            self.positions
                .entry(colonist.id)
                .and_modify(|pos| {
                    if pos.distance(colonist.position) > SNAP_DISTANCE {
                        *pos = colonist.position;
                    } else {
                        *pos = pos.lerp(colonist.position, t);
                    }
                })
                .or_insert(colonist.position);
        }

        let removed = retain_present(&mut self.positions, &present);
        if removed > 0 {
            tracing::debug!(removed, "Pruned colonist render positions");
        }
        removed
    }

    pub fn get(&self, id: ColonistId) -> Option<WorldPos> {
        self.positions.get(&id).copied()
    }

    pub fn insert(&mut self, id: ColonistId, pos: WorldPos) {
        self.positions.insert(id, pos);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
