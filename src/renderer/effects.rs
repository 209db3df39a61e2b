//! Particles and floating text.
//!
//! Everything lives in fixed-capacity pools. When a pool is full the oldest
//! record is evicted, so under load the longest-lived noise goes first and
//! fresh feedback (placement dust, resource labels) always shows.

use std::collections::{BTreeMap, VecDeque};

use ahash::AHashSet;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::ViewConfig;
use crate::core::types::{BuildingId, BuildingKind, ResourceKind, WorldPos};
use crate::sim::events::{EventKind, SimEvent};
use crate::sim::snapshot::SimulationSnapshot;

use super::camera::IsoCamera;
use super::registry::PlacementTimers;
use super::state::Color;
use super::surface::{with_saved_state, DrawSurface};

const GRAVITY: f32 = -3.5;
const MIN_QUALITY: f32 = 0.3;
const QUALITY_DROP: f32 = 0.9;
const QUALITY_RECOVERY: f32 = 0.05;
const DUST_PARTICLES: f32 = 12.0;
const SPARKLE_PARTICLES: f32 = 16.0;
const TEXT_RISE_PX: f32 = 36.0;
const TEXT_LIFETIME: f32 = 1.6;
const TEXT_SIZE: f32 = 14.0;

/// Source of uniform samples in `[0, 1)`. Injected so effect emission can be
/// driven deterministically in tests.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;

    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f64() as f32
    }

    /// Uniform index below `len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        ((self.next_f64() * len as f64) as usize).min(len.saturating_sub(1))
    }
}

/// Seeded ChaCha stream, the production source.
#[derive(Clone, Debug)]
pub struct ChaChaSource(ChaCha8Rng);

impl ChaChaSource {
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

impl RandomSource for ChaChaSource {
    fn next_f64(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Replays a fixed list of samples, cycling when exhausted.
#[derive(Clone, Debug, Default)]
pub struct SequenceSource {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceSource {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, cursor: 0 }
    }
}

impl RandomSource for SequenceSource {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

/// Bounded queue that evicts its oldest entry on overflow.
#[derive(Clone, Debug)]
pub struct FifoPool<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> FifoPool<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert `item`, returning the evicted entry if the pool was full.
    /// A zero-capacity pool hands the item straight back.
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.items.retain(keep);
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub position: WorldPos,
    /// World units above ground
    pub height: f32,
    /// x/z in world units per second, y is vertical
    pub velocity: Vec3,
    pub age: f32,
    pub lifetime: f32,
    pub radius: f32,
    pub color: Color,
    /// Whether gravity pulls this particle down
    pub falls: bool,
}

impl Particle {
    pub fn alive(&self) -> bool {
        self.age < self.lifetime
    }

    pub fn fade(&self) -> f32 {
        (1.0 - self.age / self.lifetime.max(f32::EPSILON)).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FloatingText {
    pub text: String,
    pub position: WorldPos,
    pub age: f32,
    pub lifetime: f32,
    pub color: Color,
}

/// Which ambient effect a building kind gets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmbientPolicy {
    /// Smoke from chimneys and furnaces
    Industrial,
    /// Drifting motes, at half the industrial rate
    Mystic,
    None,
}

pub fn ambient_policy(kind: BuildingKind) -> AmbientPolicy {
    match kind {
        BuildingKind::LumberMill
        | BuildingKind::Quarry
        | BuildingKind::Mine
        | BuildingKind::Workshop
        | BuildingKind::Forge
        | BuildingKind::Smelter => AmbientPolicy::Industrial,
        BuildingKind::Shrine | BuildingKind::Temple | BuildingKind::Library => AmbientPolicy::Mystic,
        _ => AmbientPolicy::None,
    }
}

/// Probability of one ambient emission this tick.
pub fn ambient_probability(policy: AmbientPolicy, dt: f32, base_rate: f32, quality: f32) -> f64 {
    let p = (dt * base_rate * quality) as f64;
    let p = match policy {
        AmbientPolicy::Industrial => p,
        AmbientPolicy::Mystic => p * 0.5,
        AmbientPolicy::None => 0.0,
    };
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Pick the resource with the largest floored gain of at least one unit.
pub fn largest_gain(
    baseline: &BTreeMap<ResourceKind, f64>,
    current: &BTreeMap<ResourceKind, f64>,
) -> Option<(ResourceKind, i64)> {
    let mut best: Option<(ResourceKind, i64)> = None;
    for (kind, amount) in current {
        let before = baseline.get(kind).copied().unwrap_or(0.0);
        let delta = (amount - before).floor();
        if !delta.is_finite() || delta < 1.0 {
            continue;
        }
        let delta = delta as i64;
        if best.map_or(true, |(_, d)| delta > d) {
            best = Some((*kind, delta));
        }
    }
    best
}

pub fn format_gain(kind: ResourceKind, delta: i64) -> String {
    format!("+{} {}", delta, kind.as_str())
}

pub struct EffectsEngine {
    particles: FifoPool<Particle>,
    texts: FifoPool<FloatingText>,
    rng: Box<dyn RandomSource>,
    enabled: bool,
    quality: f32,
    base_rate: f32,
    low_fps: f32,
    high_fps: f32,
    sample_interval: f32,
    since_sample: f32,
    resource_baseline: Option<BTreeMap<ResourceKind, f64>>,
    /// `None` until the first snapshot has been seen
    seen_buildings: Option<AHashSet<BuildingId>>,
}

impl EffectsEngine {
    pub fn new(config: &ViewConfig, rng: Box<dyn RandomSource>) -> Self {
        Self {
            particles: FifoPool::new(config.particle_capacity),
            texts: FifoPool::new(config.text_capacity),
            rng,
            enabled: config.effects_enabled,
            quality: 1.0,
            base_rate: config.ambient_base_rate,
            low_fps: config.quality_low_fps,
            high_fps: config.quality_high_fps,
            sample_interval: config.resource_sample_interval,
            since_sample: 0.0,
            resource_baseline: None,
            seen_buildings: None,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.particles.clear();
            self.texts.clear();
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn quality(&self) -> f32 {
        self.quality
    }

    pub fn particles(&self) -> &FifoPool<Particle> {
        &self.particles
    }

    pub fn texts(&self) -> &FifoPool<FloatingText> {
        &self.texts
    }

    /// Lower quality while the frame rate is poor, recover slowly once it
    /// is comfortably high again.
    pub fn update_quality(&mut self, fps: f32) {
        if !fps.is_finite() {
            return;
        }
        if fps < self.low_fps {
            self.quality = (self.quality * QUALITY_DROP).max(MIN_QUALITY);
        } else if fps > self.high_fps {
            self.quality = (self.quality + QUALITY_RECOVERY).min(1.0);
        }
    }

    /// Age and integrate every particle and label, dropping expired ones.
    pub fn advance(&mut self, dt: f32) {
        for p in self.particles.iter_mut() {
            p.age += dt;
            if p.falls {
                p.velocity.y += GRAVITY * dt;
            }
            p.position.x += p.velocity.x * dt;
            p.position.z += p.velocity.z * dt;
            p.height = (p.height + p.velocity.y * dt).max(0.0);
        }
        self.particles.retain(Particle::alive);

        for t in self.texts.iter_mut() {
            t.age += dt;
        }
        self.texts.retain(|t| t.age < t.lifetime);
    }

    /// Diff building ids against the previous snapshot. New ids get a
    /// scale-in timer and, with effects on, a dust burst. The first
    /// snapshot only primes the seen set.
    pub fn detect_placements(
        &mut self,
        snapshot: &SimulationSnapshot,
        now: f64,
        timers: &mut PlacementTimers,
    ) -> Vec<BuildingId> {
        let current: AHashSet<BuildingId> = snapshot.buildings.iter().map(|b| b.id).collect();
        let Some(seen) = self.seen_buildings.replace(current) else {
            return Vec::new();
        };

        let mut placed = Vec::new();
        for building in &snapshot.buildings {
            if seen.contains(&building.id) {
                continue;
            }
            timers.start(building.id, now);
            if self.enabled {
                self.burst(building.position, DUST_PARTICLES, Color::rgba(0.62, 0.52, 0.4, 0.8), true);
            }
            placed.push(building.id);
        }
        if !placed.is_empty() {
            tracing::debug!(count = placed.len(), "New buildings placed");
        }
        placed
    }

    /// One Bernoulli trial per building with an ambient policy.
    pub fn emit_ambient(&mut self, snapshot: &SimulationSnapshot, dt: f32) -> usize {
        if !self.enabled || dt <= 0.0 {
            return 0;
        }
        let mut emitted = 0;
        for building in &snapshot.buildings {
            let policy = ambient_policy(building.kind);
            if policy == AmbientPolicy::None {
                continue;
            }
            let p = ambient_probability(policy, dt, self.base_rate, self.quality);
            if self.rng.next_f64() >= p {
                continue;
            }
            let particle = match policy {
                AmbientPolicy::Industrial => Particle {
                    position: building.position,
                    height: 1.6,
                    velocity: Vec3::new(self.rng.range(-0.1, 0.1), 0.6, self.rng.range(-0.1, 0.1)),
                    age: 0.0,
                    lifetime: self.rng.range(1.6, 2.6),
                    radius: self.rng.range(3.0, 6.0),
                    color: Color::rgba(0.55, 0.55, 0.58, 0.6),
                    falls: false,
                },
                _ => Particle {
                    position: WorldPos::new(
                        building.position.x + self.rng.range(-0.4, 0.4),
                        building.position.z + self.rng.range(-0.4, 0.4),
                    ),
                    height: 1.0,
                    velocity: Vec3::new(0.0, 0.3, 0.0),
                    age: 0.0,
                    lifetime: self.rng.range(1.2, 2.0),
                    radius: 2.0,
                    color: Color::rgba(0.7, 0.8, 1.0, 0.85),
                    falls: false,
                },
            };
            self.particles.push(particle);
            emitted += 1;
        }
        emitted
    }

    /// Every sample interval, emit at most one label for the resource that
    /// grew the most, anchored to a random building or `fallback`.
    pub fn sample_resources(
        &mut self,
        snapshot: &SimulationSnapshot,
        dt: f32,
        fallback: WorldPos,
    ) -> Option<String> {
        let Some(baseline) = self.resource_baseline.as_ref() else {
            self.resource_baseline = Some(snapshot.resources.clone());
            return None;
        };
        self.since_sample += dt.max(0.0);
        if self.since_sample < self.sample_interval {
            return None;
        }
        self.since_sample = 0.0;

        let gain = largest_gain(baseline, &snapshot.resources);
        self.resource_baseline = Some(snapshot.resources.clone());
        let (kind, delta) = gain?;
        if !self.enabled {
            return None;
        }

        let anchor = if snapshot.buildings.is_empty() {
            fallback
        } else {
            snapshot.buildings[self.rng.index(snapshot.buildings.len())].position
        };
        let text = format_gain(kind, delta);
        self.texts.push(FloatingText {
            text: text.clone(),
            position: anchor,
            age: 0.0,
            lifetime: TEXT_LIFETIME,
            color: Color::rgb(1.0, 0.92, 0.55),
        });
        Some(text)
    }

    /// React to simulation events. Only completed construction has a visual.
    pub fn on_event(&mut self, event: &SimEvent) {
        if !self.enabled || event.kind != EventKind::ConstructionComplete {
            return;
        }
        if let Some(position) = event.position {
            self.burst(position, SPARKLE_PARTICLES, Color::rgba(1.0, 0.9, 0.45, 0.95), false);
        }
    }

    fn burst(&mut self, at: WorldPos, base_count: f32, color: Color, falls: bool) {
        let count = (base_count * self.quality).ceil().max(1.0) as usize;
        for _ in 0..count {
            let angle = self.rng.range(0.0, std::f32::consts::TAU);
            let speed = self.rng.range(0.4, 1.2);
            let particle = Particle {
                position: at,
                height: 0.2,
                velocity: Vec3::new(angle.cos() * speed, self.rng.range(0.8, 1.8), angle.sin() * speed),
                age: 0.0,
                lifetime: self.rng.range(0.5, 0.9),
                radius: self.rng.range(1.5, 3.5),
                color,
                falls,
            };
            self.particles.push(particle);
        }
    }

    pub fn draw(&self, surface: &mut dyn DrawSurface, camera: &IsoCamera) {
        if self.particles.is_empty() && self.texts.is_empty() {
            return;
        }
        for p in self.particles.iter() {
            let center = camera.world_to_screen_elevated(p.position, p.height);
            let color = p.color.with_alpha(p.color.a * p.fade());
            surface.fill_circle(center, p.radius * camera.zoom, color);
        }
        for t in self.texts.iter() {
            let progress = (t.age / t.lifetime.max(f32::EPSILON)).clamp(0.0, 1.0);
            let mut pos = camera.world_to_screen_elevated(t.position, 1.5);
            pos.y -= TEXT_RISE_PX * progress;
            with_saved_state(surface, |surface| {
                surface.set_alpha(1.0 - progress);
                surface.draw_text(&t.text, pos, TEXT_SIZE, t.color);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::snapshot::Building;
    use proptest::prelude::*;

    fn engine(values: Vec<f64>) -> EffectsEngine {
        EffectsEngine::new(&ViewConfig::default(), Box::new(SequenceSource::new(values)))
    }

    fn with_building(kind: BuildingKind) -> SimulationSnapshot {
        SimulationSnapshot {
            buildings: vec![Building {
                id: BuildingId(1),
                kind,
                position: WorldPos::new(3.0, 4.0),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_pool_evicts_oldest() {
        let mut pool = FifoPool::new(3);
        for i in 0..3 {
            assert_eq!(pool.push(i), None);
        }
        assert_eq!(pool.push(3), Some(0));
        assert_eq!(pool.push(4), Some(1));
        assert_eq!(pool.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_zero_capacity_pool_stays_empty() {
        let mut pool = FifoPool::new(0);
        assert_eq!(pool.push(7), Some(7));
        assert!(pool.is_empty());
    }

    proptest! {
        #[test]
        fn prop_pool_keeps_newest(capacity in 1usize..64, extra in 0usize..64) {
            let mut pool = FifoPool::new(capacity);
            let total = capacity + extra;
            for i in 0..total {
                pool.push(i);
            }
            prop_assert_eq!(pool.len(), capacity);
            let kept: Vec<usize> = pool.iter().copied().collect();
            let expected: Vec<usize> = (extra..total).collect();
            prop_assert_eq!(kept, expected);
        }
    }

    #[test]
    fn test_policy_table() {
        assert_eq!(ambient_policy(BuildingKind::Forge), AmbientPolicy::Industrial);
        assert_eq!(ambient_policy(BuildingKind::Temple), AmbientPolicy::Mystic);
        assert_eq!(ambient_policy(BuildingKind::House), AmbientPolicy::None);
    }

    #[test]
    fn test_ambient_probability() {
        let p = ambient_probability(AmbientPolicy::Industrial, 0.1, 1.6, 1.0);
        assert!((p - 0.16).abs() < 1e-6);
        let half = ambient_probability(AmbientPolicy::Mystic, 0.1, 1.6, 1.0);
        assert!((half - 0.08).abs() < 1e-6);
        assert_eq!(ambient_probability(AmbientPolicy::Industrial, 10.0, 1.6, 1.0), 1.0);
        assert_eq!(ambient_probability(AmbientPolicy::None, 0.1, 1.6, 1.0), 0.0);
    }

    #[test]
    fn test_industrial_trial_uses_injected_source() {
        let snapshot = with_building(BuildingKind::Forge);

        let mut hit = engine(vec![0.1]);
        assert_eq!(hit.emit_ambient(&snapshot, 0.1), 1);
        assert_eq!(hit.particles().len(), 1);

        let mut miss = engine(vec![0.2]);
        assert_eq!(miss.emit_ambient(&snapshot, 0.1), 0);
        assert!(miss.particles().is_empty());
    }

    #[test]
    fn test_mystic_trial_at_half_rate() {
        let snapshot = with_building(BuildingKind::Shrine);
        assert_eq!(engine(vec![0.1]).emit_ambient(&snapshot, 0.1), 0);
        assert_eq!(engine(vec![0.05]).emit_ambient(&snapshot, 0.1), 1);
    }

    #[test]
    fn test_disabled_effects_emit_nothing() {
        let mut fx = engine(vec![0.0]);
        fx.set_enabled(false);
        assert_eq!(fx.emit_ambient(&with_building(BuildingKind::Mine), 0.1), 0);
    }

    #[test]
    fn test_first_snapshot_primes_placements() {
        let mut fx = engine(vec![0.5]);
        let mut timers = PlacementTimers::new(0.45);
        let mut snapshot = with_building(BuildingKind::House);

        assert!(fx.detect_placements(&snapshot, 0.0, &mut timers).is_empty());
        assert!(timers.is_empty());
        assert!(fx.particles().is_empty());

        snapshot.buildings.push(Building {
            id: BuildingId(2),
            kind: BuildingKind::Farm,
            position: WorldPos::ORIGIN,
        });
        let placed = fx.detect_placements(&snapshot, 1.0, &mut timers);
        assert_eq!(placed, vec![BuildingId(2)]);
        assert_eq!(timers.len(), 1);
        assert_eq!(fx.particles().len(), 12);
    }

    #[test]
    fn test_resource_label_for_largest_gain() {
        let mut fx = engine(vec![0.0]);
        let mut snapshot = with_building(BuildingKind::Farm);
        snapshot.resources.insert(ResourceKind::Food, 10.0);
        snapshot.resources.insert(ResourceKind::Wood, 4.0);
        assert_eq!(fx.sample_resources(&snapshot, 0.5, WorldPos::ORIGIN), None);

        snapshot.resources.insert(ResourceKind::Food, 15.7);
        snapshot.resources.insert(ResourceKind::Wood, 6.0);
        assert_eq!(fx.sample_resources(&snapshot, 0.5, WorldPos::ORIGIN), None);
        let label = fx.sample_resources(&snapshot, 0.6, WorldPos::ORIGIN);
        assert_eq!(label.as_deref(), Some("+5 food"));
        assert_eq!(fx.texts().len(), 1);
        assert_eq!(fx.texts().iter().next().unwrap().position, WorldPos::new(3.0, 4.0));

        // baseline reset: no further gain, no label
        assert_eq!(fx.sample_resources(&snapshot, 2.0, WorldPos::ORIGIN), None);
    }

    #[test]
    fn test_resource_label_falls_back_to_camera_center() {
        let mut fx = engine(vec![0.0]);
        let mut snapshot = SimulationSnapshot::default();
        fx.sample_resources(&snapshot, 0.0, WorldPos::ORIGIN);
        snapshot.resources.insert(ResourceKind::Stone, 3.0);
        let center = WorldPos::new(-2.0, 7.0);
        assert_eq!(fx.sample_resources(&snapshot, 1.5, center).as_deref(), Some("+3 stone"));
        assert_eq!(fx.texts().iter().next().unwrap().position, center);
    }

    #[test]
    fn test_quality_adapts_to_fps() {
        let mut fx = engine(vec![0.0]);
        for _ in 0..50 {
            fx.update_quality(20.0);
        }
        assert_eq!(fx.quality(), MIN_QUALITY);
        fx.update_quality(50.0);
        assert_eq!(fx.quality(), MIN_QUALITY);
        fx.update_quality(60.0);
        assert!(fx.quality() > MIN_QUALITY);
    }

    #[test]
    fn test_construction_complete_sparkles() {
        let mut fx = engine(vec![0.3]);
        fx.on_event(&SimEvent::new(EventKind::ResearchComplete, "Masonry", 1.0));
        assert!(fx.particles().is_empty());
        fx.on_event(&SimEvent::new(EventKind::ConstructionComplete, "House built", 1.0).at(WorldPos::ORIGIN));
        assert_eq!(fx.particles().len(), 16);
    }

    #[test]
    fn test_advance_expires_particles() {
        let mut fx = engine(vec![0.5]);
        fx.on_event(&SimEvent::new(EventKind::ConstructionComplete, "done", 0.0).at(WorldPos::ORIGIN));
        fx.advance(0.3);
        assert_eq!(fx.particles().len(), 16);
        fx.advance(1.0);
        assert!(fx.particles().is_empty());
    }
}
