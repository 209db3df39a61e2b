//! Per-tick orchestration for the primary backend.
//!
//! A tick runs Dynamics to completion before Draw starts, and both read
//! the same `FrameContext`:
//!
//! 1. Dynamics: camera follow, particle quality and motion, resource
//!    sampling, placement and interpolation registries, ambient effects.
//! 2. Draw: background, terrain blit, entities by depth, particles,
//!    placement preview, hover ring, selection ring, screen tints.

use ahash::AHashMap;

use crate::core::config::ViewConfig;
use crate::core::error::Result;
use crate::core::types::{BuildingId, EntityRef, WorldPos};
use crate::sim::events::SimEvent;
use crate::sim::snapshot::SimulationSnapshot;

use super::camera::IsoCamera;
use super::clock::{FrameClock, FrameContext};
use super::compositor::{EntityCompositor, InteractiveEntity, SceneInputs};
use super::effects::{EffectsEngine, RandomSource};
use super::interaction::SelectionState;
use super::metrics::{DebugStats, RenderMetrics};
use super::overlays::{self, HOVER_RING, SELECTED_RING};
use super::registry::{ColonistInterpolation, PlacementTimers};
use super::sprites::SpriteCatalog;
use super::state::Viewport;
use super::surface::DrawSurface;
use super::terrain::{RefreshReason, TerrainCache};

/// Pointer-driven state the Draw stage needs.
#[derive(Clone, Copy, Debug, Default)]
pub struct OverlayInputs {
    pub preview: Option<(i32, i32)>,
    pub selection: SelectionState,
}

/// What one tick did, for hosts and tests.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub context: FrameContext,
    pub terrain_refresh: Option<RefreshReason>,
    pub drawables: usize,
    pub interactives: usize,
    pub culled: usize,
    pub placed: Vec<BuildingId>,
    pub resource_label: Option<String>,
    pub ambient_emitted: usize,
}

pub struct FramePipeline {
    config: ViewConfig,
    clock: FrameClock,
    camera: IsoCamera,
    terrain: TerrainCache,
    compositor: EntityCompositor,
    effects: EffectsEngine,
    placement: PlacementTimers,
    colonists: ColonistInterpolation,
    interactives: Vec<InteractiveEntity>,
    building_positions: AHashMap<BuildingId, WorldPos>,
    pending_events: Vec<SimEvent>,
    metrics: RenderMetrics,
}

impl FramePipeline {
    pub fn new(config: &ViewConfig, viewport: Viewport, rng: Box<dyn RandomSource>) -> Result<Self> {
        config.validate()?;
        let terrain = TerrainCache::new(config, viewport)?;
        Ok(Self {
            config: config.clone(),
            clock: FrameClock::new(config),
            camera: IsoCamera::new(config, viewport),
            terrain,
            compositor: EntityCompositor::new(config, SpriteCatalog::new()),
            effects: EffectsEngine::new(config, rng),
            placement: PlacementTimers::new(config.placement_duration),
            colonists: ColonistInterpolation::new(config.colonist_smoothing),
            interactives: Vec::new(),
            building_positions: AHashMap::new(),
            pending_events: Vec::new(),
            metrics: RenderMetrics::new(),
        })
    }

    pub fn camera(&self) -> &IsoCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut IsoCamera {
        &mut self.camera
    }

    /// Hit regions from the last completed tick.
    pub fn interactives(&self) -> &[InteractiveEntity] {
        &self.interactives
    }

    /// Last tick's hit regions alongside the camera, for pointer routing.
    pub fn hits_and_camera(&mut self) -> (&[InteractiveEntity], &mut IsoCamera) {
        (&self.interactives, &mut self.camera)
    }

    pub fn effects(&self) -> &EffectsEngine {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectsEngine {
        &mut self.effects
    }

    pub fn terrain(&self) -> &TerrainCache {
        &self.terrain
    }

    pub fn placement(&self) -> &PlacementTimers {
        &self.placement
    }

    pub fn colonists(&self) -> &ColonistInterpolation {
        &self.colonists
    }

    /// Position of a building as of the last tick.
    pub fn building_position(&self, id: BuildingId) -> Option<WorldPos> {
        self.building_positions.get(&id).copied()
    }

    /// Queue a simulation event for the next tick's Dynamics stage.
    pub fn queue_event(&mut self, event: SimEvent) {
        self.pending_events.push(event);
    }

    /// Reallocate for a new viewport. On failure the camera keeps the old
    /// viewport so it stays consistent with the raster.
    pub fn resize(&mut self, viewport: Viewport) -> Result<()> {
        self.terrain.resize(viewport)?;
        self.camera.set_viewport(viewport);
        Ok(())
    }

    /// Release the terrain raster when the owning backend shuts down.
    pub fn release_terrain(&mut self) {
        self.terrain.release();
    }

    pub fn debug_stats(&self) -> DebugStats {
        self.metrics.stats()
    }

    /// Run Dynamics then Draw for one tick.
    pub fn tick(
        &mut self,
        snapshot: &SimulationSnapshot,
        now_ms: f64,
        overlay: &OverlayInputs,
        surface: &mut dyn DrawSurface,
    ) -> FrameReport {
        self.metrics.begin_frame();
        let ctx = self.clock.tick(now_ms, snapshot, self.camera.viewport);
        let now = ctx.now_ms / 1000.0;

        // Dynamics
        self.camera.update(ctx.delta);
        self.effects.update_quality(ctx.fps);
        self.effects.advance(ctx.delta);
        for event in self.pending_events.drain(..) {
            self.effects.on_event(&event);
        }
        let resource_label = self.effects.sample_resources(snapshot, ctx.delta, self.camera.center);
        let placed = self.effects.detect_placements(snapshot, now, &mut self.placement);
        self.placement.prune(snapshot, now);
        self.colonists.update(snapshot, ctx.delta);
        let ambient_emitted = self.effects.emit_ambient(snapshot, ctx.delta);
        self.building_positions.clear();
        self.building_positions
            .extend(snapshot.buildings.iter().map(|b| (b.id, b.position)));

        // Draw
        overlays::draw_background(surface, &ctx.viewport, ctx.daylight);
        let terrain_refresh = self.terrain.prepare(&self.camera, snapshot);
        self.terrain.blit(surface, &self.camera);

        let composition = self.compositor.compose(&SceneInputs {
            snapshot,
            camera: &self.camera,
            ctx: &ctx,
            placement: &self.placement,
            colonists: &self.colonists,
        });
        composition.draw_all(surface);
        self.effects.draw(surface, &self.camera);

        overlays::draw_preview(surface, &self.camera, overlay.preview);
        let pulse = overlays::pulse_offset(now, self.config.selection_pulse);
        let hover_pulse = pulse * self.config.hover_pulse_ratio;
        let find = |entity: Option<EntityRef>| {
            entity.and_then(|e| composition.interactives.iter().find(|h| h.entity == e))
        };
        let selected = overlay.selection.selected;
        let hovered = overlay.selection.hovered.filter(|h| Some(*h) != selected);
        overlays::draw_ring(surface, find(hovered), hover_pulse, HOVER_RING);
        overlays::draw_ring(surface, find(selected), pulse, SELECTED_RING);
        overlays::draw_tints(surface, &ctx);

        let report = FrameReport {
            context: ctx,
            terrain_refresh,
            drawables: composition.renderables.len(),
            interactives: composition.interactives.len(),
            culled: composition.culled,
            placed,
            resource_label,
            ambient_emitted,
        };
        self.interactives = composition.interactives;
        self.record_metrics(&report);
        report
    }

    fn record_metrics(&mut self, report: &FrameReport) {
        let terrain = self.terrain.stats();
        let metrics = &mut self.metrics;
        metrics.fps = report.context.fps;
        metrics.drawables = report.drawables;
        metrics.interactives = report.interactives;
        metrics.culled = report.culled;
        metrics.terrain_rebuilds = terrain.rebuilds;
        metrics.terrain_reuses = terrain.reuses;
        metrics.terrain_tiles = terrain.tiles_drawn;
        metrics.particles = self.effects.particles().len();
        metrics.floating_texts = self.effects.texts().len();
        metrics.particle_quality = self.effects.quality();
        metrics.end_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BuildingKind;
    use crate::renderer::effects::SequenceSource;
    use crate::renderer::surface::{DisplayList, DrawCommand};
    use crate::sim::snapshot::Building;

    fn pipeline() -> FramePipeline {
        FramePipeline::new(
            &ViewConfig::default(),
            Viewport::new(640, 480, 1.0),
            Box::new(SequenceSource::new(vec![0.9])),
        )
        .unwrap()
    }

    fn snapshot() -> SimulationSnapshot {
        SimulationSnapshot {
            buildings: vec![Building {
                id: BuildingId(1),
                kind: BuildingKind::House,
                position: WorldPos::new(1.0, 0.0),
            }],
            world_radius: 12,
            ..Default::default()
        }
    }

    #[test]
    fn test_draw_order() {
        let mut pipeline = pipeline();
        let mut list = DisplayList::new();
        let overlay = OverlayInputs {
            selection: SelectionState {
                selected: Some(EntityRef::Building(BuildingId(1))),
                hovered: None,
            },
            ..Default::default()
        };
        pipeline.tick(&snapshot(), 0.0, &overlay, &mut list);

        let commands = list.commands();
        let blit = commands.iter().position(|c| matches!(c, DrawCommand::Blit { .. })).unwrap();
        let sprite = commands.iter().position(|c| matches!(c, DrawCommand::Sprite { .. })).unwrap();
        let ring = commands
            .iter()
            .position(|c| matches!(c, DrawCommand::StrokeEllipse { .. }))
            .unwrap();
        assert!(matches!(commands[0], DrawCommand::FillRect { .. }));
        assert!(blit < sprite && sprite < ring);
        assert!(matches!(commands.last(), Some(DrawCommand::FillRect { .. })));
        assert_eq!(list.save_depth(), 0);
        assert_eq!(list.unbalanced_restores(), 0);
    }

    #[test]
    fn test_terrain_reused_while_still() {
        let mut pipeline = pipeline();
        let snapshot = snapshot();
        let overlay = OverlayInputs::default();
        let mut list = DisplayList::new();

        let first = pipeline.tick(&snapshot, 0.0, &overlay, &mut list);
        assert_eq!(first.terrain_refresh, Some(RefreshReason::NeverBuilt));
        let second = pipeline.tick(&snapshot, 16.0, &overlay, &mut list);
        assert_eq!(second.terrain_refresh, None);
        assert_eq!(pipeline.debug_stats().terrain_reuses, 1);
    }

    #[test]
    fn test_new_building_gets_placement_animation() {
        let mut pipeline = pipeline();
        let mut snapshot = snapshot();
        let overlay = OverlayInputs::default();
        let mut list = DisplayList::new();
        pipeline.tick(&snapshot, 0.0, &overlay, &mut list);

        snapshot.buildings.push(Building {
            id: BuildingId(2),
            kind: BuildingKind::Farm,
            position: WorldPos::new(-1.0, 2.0),
        });
        let report = pipeline.tick(&snapshot, 16.0, &overlay, &mut list);
        assert_eq!(report.placed, vec![BuildingId(2)]);
        assert_eq!(pipeline.placement().len(), 1);
        assert_eq!(report.terrain_refresh, Some(RefreshReason::StructuresChanged));
        assert_eq!(pipeline.building_position(BuildingId(2)), Some(WorldPos::new(-1.0, 2.0)));
    }

    #[test]
    fn test_interactives_replaced_each_tick() {
        let mut pipeline = pipeline();
        let mut snapshot = snapshot();
        let overlay = OverlayInputs::default();
        let mut list = DisplayList::new();
        pipeline.tick(&snapshot, 0.0, &overlay, &mut list);
        assert_eq!(pipeline.interactives().len(), 1);

        snapshot.buildings.clear();
        pipeline.tick(&snapshot, 16.0, &overlay, &mut list);
        assert!(pipeline.interactives().is_empty());
    }

    #[test]
    fn test_hover_ring_pulses_at_fraction_of_selected() {
        let mut pipeline = pipeline();
        let mut snapshot = snapshot();
        snapshot.buildings.push(Building {
            id: BuildingId(2),
            kind: BuildingKind::Farm,
            position: WorldPos::new(-2.0, 2.0),
        });
        let overlay = OverlayInputs {
            selection: SelectionState {
                selected: Some(EntityRef::Building(BuildingId(1))),
                hovered: Some(EntityRef::Building(BuildingId(2))),
            },
            ..Default::default()
        };
        let mut list = DisplayList::new();
        pipeline.tick(&snapshot, 250.0, &overlay, &mut list);

        let hit = |id: u32| {
            *pipeline
                .interactives()
                .iter()
                .find(|h| h.entity == EntityRef::Building(BuildingId(id)))
                .unwrap()
        };
        let ring_growth = |target: InteractiveEntity| {
            let anchor = glam::Vec2::new(target.center_x, target.center_y + target.half_height);
            list.commands()
                .iter()
                .find_map(|c| match c {
                    DrawCommand::StrokeEllipse { center, radius_x, .. }
                        if center.distance(anchor) < 1e-3 =>
                    {
                        Some(radius_x - target.half_width)
                    }
                    _ => None,
                })
                .unwrap()
        };

        let selected = ring_growth(hit(1));
        let hovered = ring_growth(hit(2));
        assert!(selected > 0.0);
        assert!((hovered - selected * 0.75).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ViewConfig {
            particle_capacity: 0,
            ..Default::default()
        };
        let result = FramePipeline::new(
            &config,
            Viewport::new(640, 480, 1.0),
            Box::new(SequenceSource::default()),
        );
        assert!(result.is_err());
    }
}
