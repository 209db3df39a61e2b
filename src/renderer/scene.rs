//! Reduced fallback backend.
//!
//! Keeps a scene graph keyed by entity, synchronised from each snapshot,
//! and projects it through an orbit camera. There is no terrain raster and
//! no depth sort: nodes draw in scene order.

use ahash::{AHashMap, AHashSet};
use glam::{Vec2, Vec3};

use crate::core::config::ViewConfig;
use crate::core::types::{BuildingId, BuildingKind, EntityRef, WorldPos};
use crate::sim::events::SimEvent;
use crate::sim::snapshot::SimulationSnapshot;

use super::backend::{RenderBackend, RendererMode};
use super::camera::{CameraSnapshot, OrbitCamera};
use super::clock::FrameClock;
use super::compositor::{building_hit_extents, InteractiveEntity};
use super::interaction::{
    EntitySelectHandler, GestureCamera, GroundClickHandler, InteractionRouter,
    PlacementPreviewHandler, SelectionState,
};
use super::metrics::DebugStats;
use super::overlays::{self, HOVER_RING, SELECTED_RING};
use super::sprites::{SpriteCatalog, SpriteKey};
use super::state::{Color, Rect, Viewport};
use super::surface::DrawSurface;

/// Radians of orbit per pixel of drag.
const ORBIT_RATE: f32 = 0.005;
/// Sprites are drawn at catalog size when this far from the eye.
const REFERENCE_DISTANCE: f32 = 36.0;
const PREVIEW_MARKER: Color = Color::rgba(0.45, 0.85, 1.0, 0.6);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeShape {
    Building(BuildingKind),
    Scaffold(BuildingKind),
    Figure { active: bool },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneNode {
    pub entity: EntityRef,
    pub position: Vec3,
    pub shape: NodeShape,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub added: usize,
    pub removed: usize,
}

/// Entity nodes in insertion order.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: AHashMap<EntityRef, SceneNode>,
    order: Vec<EntityRef>,
}

fn ground(pos: WorldPos) -> Vec3 {
    Vec3::new(pos.x, 0.0, pos.z)
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a node for every entity in the snapshot and drop the rest.
    pub fn sync(&mut self, snapshot: &SimulationSnapshot) -> SyncStats {
        let mut present = AHashSet::with_capacity(self.order.len());
        let mut stats = SyncStats::default();

        let buildings = snapshot
            .buildings
            .iter()
            .map(|b| (EntityRef::Building(b.id), b.position, NodeShape::Building(b.kind)));
        let construction = snapshot
            .construction
            .iter()
            .map(|c| (EntityRef::Construction(c.id), c.position, NodeShape::Scaffold(c.kind)));
        let colonists = snapshot
            .colonists
            .iter()
            .filter(|c| c.alive && c.position.is_finite())
            .map(|c| {
                (
                    EntityRef::Colonist(c.id),
                    c.position,
                    NodeShape::Figure {
                        active: c.task.is_active(),
                    },
                )
            });

        for (entity, position, shape) in buildings.chain(construction).chain(colonists) {
            present.insert(entity);
            let node = SceneNode {
                entity,
                position: ground(position),
                shape,
            };
            if self.nodes.insert(entity, node).is_none() {
                self.order.push(entity);
                stats.added += 1;
            }
        }

        let before = self.order.len();
        self.order.retain(|e| present.contains(e));
        self.nodes.retain(|e, _| present.contains(e));
        stats.removed = before - self.order.len();
        stats
    }

    pub fn get(&self, entity: EntityRef) -> Option<&SceneNode> {
        self.nodes.get(&entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneNode> {
        self.order.iter().filter_map(|e| self.nodes.get(e))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Orbit camera bound to a viewport so the router can drive it.
#[derive(Clone, Debug)]
pub struct OrbitRig {
    pub camera: OrbitCamera,
    pub viewport: Viewport,
}

impl GestureCamera for OrbitRig {
    fn drag(&mut self, delta: Vec2) {
        self.camera.orbit(-delta.x * ORBIT_RATE, delta.y * ORBIT_RATE);
    }

    fn zoom_at(&mut self, _screen: Vec2, factor: f32) {
        self.camera.zoom_by(factor);
    }

    fn ground_at(&self, screen: Vec2) -> Option<WorldPos> {
        self.camera.ground_at(screen, &self.viewport)
    }
}

pub struct SceneBackend {
    graph: SceneGraph,
    rig: OrbitRig,
    clock: FrameClock,
    catalog: SpriteCatalog,
    router: InteractionRouter,
    interactives: Vec<InteractiveEntity>,
    selection_pulse: f32,
    hover_pulse: f32,
    drag_threshold: f32,
    disposed: bool,
}

impl SceneBackend {
    /// Always succeeds; this is what the factory falls back to.
    pub fn new(config: &ViewConfig, viewport: Viewport) -> Self {
        Self {
            graph: SceneGraph::new(),
            rig: OrbitRig {
                camera: OrbitCamera::default(),
                viewport,
            },
            clock: FrameClock::new(config),
            catalog: SpriteCatalog::new(),
            router: InteractionRouter::new(config.drag_threshold),
            interactives: Vec::new(),
            selection_pulse: config.selection_pulse,
            hover_pulse: config.hover_pulse(),
            drag_threshold: config.drag_threshold,
            disposed: false,
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn orbit(&self) -> &OrbitCamera {
        &self.rig.camera
    }

    fn node_rect(&self, node: &SceneNode, foot: Vec2, scale: f32) -> (SpriteKey, Rect) {
        let (sprite, size) = match node.shape {
            NodeShape::Building(kind) => (SpriteKey::Building(kind), self.catalog.building_size(kind)),
            NodeShape::Scaffold(kind) => (SpriteKey::Unbuilt(kind), self.catalog.building_size(kind)),
            NodeShape::Figure { active } => (
                SpriteKey::Colonist { frame: 0, active },
                self.catalog.colonist_size(),
            ),
        };
        let size = size * scale;
        (sprite, Rect::new(foot.x - size.x * 0.5, foot.y - size.y, size.x, size.y))
    }
}

impl RenderBackend for SceneBackend {
    fn mode(&self) -> RendererMode {
        RendererMode::Scene3d
    }

    fn render(&mut self, snapshot: &SimulationSnapshot, now_ms: f64, surface: &mut dyn DrawSurface) {
        if self.disposed {
            return;
        }
        let ctx = self.clock.tick(now_ms, snapshot, self.rig.viewport);
        let stats = self.graph.sync(snapshot);
        if stats.removed > 0 {
            tracing::debug!(removed = stats.removed, "Dropped scene nodes");
        }

        overlays::draw_background(surface, &self.rig.viewport, ctx.daylight);

        let view = self.rig.viewport.bounds();
        let eye_camera = &self.rig.camera;
        let mut interactives = Vec::new();
        for node in self.graph.iter() {
            let Some(foot) = eye_camera.project(node.position, &self.rig.viewport) else {
                continue;
            };
            let distance = eye_camera.depth_of(node.position).max(f32::EPSILON);
            let scale = REFERENCE_DISTANCE / distance;
            let (sprite, rect) = self.node_rect(node, foot, scale);
            if !rect.intersects(&view) {
                continue;
            }
            surface.draw_sprite(sprite, rect);

            if let NodeShape::Building(_) = node.shape {
                let (half_width, half_height) = building_hit_extents(Vec2::new(rect.width, rect.height));
                interactives.push(InteractiveEntity {
                    entity: node.entity,
                    center_x: foot.x,
                    center_y: foot.y - rect.height * 0.25,
                    half_width,
                    half_height,
                    // nearer nodes win picks
                    depth: -(distance as f64),
                });
            }
        }

        if let Some((x, z)) = self.router.preview() {
            if let Some(at) = eye_camera.project(Vec3::new(x as f32, 0.0, z as f32), &self.rig.viewport) {
                surface.fill_circle(at, 6.0, PREVIEW_MARKER);
            }
        }

        let now = ctx.now_ms / 1000.0;
        let pulse = overlays::pulse_offset(now, self.selection_pulse);
        let hover_pulse = overlays::pulse_offset(now, self.hover_pulse);
        let selection = self.router.selection();
        let find = |entity: Option<EntityRef>| {
            entity.and_then(|e| interactives.iter().find(|h: &&InteractiveEntity| h.entity == e))
        };
        let hovered = selection.hovered.filter(|h| Some(*h) != selection.selected);
        overlays::draw_ring(surface, find(hovered), hover_pulse, HOVER_RING);
        overlays::draw_ring(surface, find(selection.selected), pulse, SELECTED_RING);
        overlays::draw_tints(surface, &ctx);

        self.interactives = interactives;
    }

    fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            tracing::warn!(width = viewport.width, height = viewport.height, "Ignoring empty viewport");
            return;
        }
        self.rig.viewport = viewport;
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.graph = SceneGraph::new();
        self.interactives.clear();
        self.router = InteractionRouter::new(self.drag_threshold);
        tracing::debug!("Scene renderer disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    // The reduced backend has no effects engine.
    fn notify(&mut self, _event: &SimEvent) {}

    fn set_ground_click_handler(&mut self, handler: GroundClickHandler) {
        self.router.set_ground_click_handler(handler);
    }

    fn set_placement_preview_handler(&mut self, handler: PlacementPreviewHandler) {
        self.router.set_placement_preview_handler(handler);
    }

    fn set_entity_select_handler(&mut self, handler: EntitySelectHandler) {
        self.router.set_entity_select_handler(handler);
    }

    fn set_preview_position(&mut self, tile: (i32, i32)) {
        self.router.set_preview_position(tile);
    }

    fn clear_preview(&mut self) {
        self.router.clear_preview();
    }

    fn set_placement_type(&mut self, kind: Option<BuildingKind>) {
        self.router.set_placement_type(kind);
    }

    fn center_on_building(&mut self, id: BuildingId) -> bool {
        if self.disposed {
            return false;
        }
        let entity = EntityRef::Building(id);
        let Some(node) = self.graph.get(entity) else {
            return false;
        };
        self.rig.camera.target = node.position;
        self.router.select(Some(entity));
        true
    }

    fn pointer_move(&mut self, x: f32, y: f32) {
        if self.disposed {
            return;
        }
        self.router.pointer_move(x, y, &self.interactives, &mut self.rig);
    }

    fn pointer_down(&mut self, x: f32, y: f32) {
        if self.disposed {
            return;
        }
        self.router.pointer_down(x, y);
    }

    fn pointer_up(&mut self, x: f32, y: f32) {
        if self.disposed {
            return;
        }
        self.router.pointer_up(x, y, &self.interactives, &mut self.rig);
    }

    fn wheel(&mut self, x: f32, y: f32, delta_y: f32) {
        if self.disposed {
            return;
        }
        self.router.wheel(x, y, delta_y, &mut self.rig);
    }

    fn pinch(&mut self, x: f32, y: f32, scale: f32) {
        if self.disposed {
            return;
        }
        self.router.pinch(x, y, scale, &mut self.rig);
    }

    fn selection(&self) -> SelectionState {
        self.router.selection()
    }

    fn camera_state(&self) -> CameraSnapshot {
        self.rig.camera.snapshot(self.rig.viewport)
    }

    fn debug_stats(&self) -> Option<DebugStats> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ColonistId, ColonistTask, ConstructionId};
    use crate::renderer::surface::DisplayList;
    use crate::sim::snapshot::{Building, Colonist, ConstructionItem};

    fn snapshot() -> SimulationSnapshot {
        SimulationSnapshot {
            buildings: vec![Building {
                id: BuildingId(1),
                kind: BuildingKind::Library,
                position: WorldPos::ORIGIN,
            }],
            construction: vec![ConstructionItem {
                id: ConstructionId(2),
                kind: BuildingKind::Well,
                position: WorldPos::new(2.0, 1.0),
                progress: 0.5,
                build_time: 2.0,
            }],
            colonists: vec![Colonist {
                id: ColonistId(3),
                position: WorldPos::new(-1.0, 1.0),
                alive: true,
                task: ColonistTask::Hauling,
                age: 4.0,
            }],
            ..Default::default()
        }
    }

    fn backend() -> SceneBackend {
        SceneBackend::new(&ViewConfig::default(), Viewport::new(800, 600, 1.0))
    }

    #[test]
    fn test_graph_sync_adds_and_removes() {
        let mut graph = SceneGraph::new();
        let mut snapshot = snapshot();
        assert_eq!(graph.sync(&snapshot), SyncStats { added: 3, removed: 0 });
        assert_eq!(graph.sync(&snapshot), SyncStats::default());

        snapshot.colonists[0].alive = false;
        snapshot.construction.clear();
        assert_eq!(graph.sync(&snapshot), SyncStats { added: 0, removed: 2 });
        assert_eq!(graph.len(), 1);
        assert!(graph.get(EntityRef::Building(BuildingId(1))).is_some());
    }

    #[test]
    fn test_render_draws_in_scene_order() {
        let mut backend = backend();
        let mut list = DisplayList::new();
        backend.render(&snapshot(), 0.0, &mut list);
        let sprites: Vec<SpriteKey> = list.sprites().into_iter().map(|(s, _)| s).collect();
        assert_eq!(sprites.len(), 3);
        assert_eq!(sprites[0], SpriteKey::Building(BuildingKind::Library));
        assert_eq!(sprites[1], SpriteKey::Unbuilt(BuildingKind::Well));
        assert!(matches!(sprites[2], SpriteKey::Colonist { active: true, .. }));
        assert_eq!(list.count(|c| matches!(c, crate::renderer::surface::DrawCommand::Blit { .. })), 0);
        assert_eq!(list.save_depth(), 0);
    }

    #[test]
    fn test_click_selects_building_and_drag_orbits() {
        let mut backend = backend();
        let mut list = DisplayList::new();
        backend.render(&snapshot(), 0.0, &mut list);

        let hit = backend.interactives[0];
        backend.pointer_down(hit.center_x, hit.center_y);
        backend.pointer_up(hit.center_x, hit.center_y);
        assert_eq!(backend.selection().selected, Some(EntityRef::Building(BuildingId(1))));

        let yaw = backend.orbit().yaw;
        backend.pointer_down(100.0, 100.0);
        backend.pointer_move(160.0, 100.0);
        backend.pointer_up(160.0, 100.0);
        assert!(backend.orbit().yaw != yaw);
        assert_eq!(backend.selection().selected, Some(EntityRef::Building(BuildingId(1))));
    }

    #[test]
    fn test_wheel_changes_distance_only() {
        let mut backend = backend();
        let before = backend.orbit().clone();
        backend.wheel(400.0, 300.0, -300.0);
        assert!(backend.orbit().distance < before.distance);
        assert_eq!(backend.orbit().yaw, before.yaw);
        assert!(backend.camera_state().yaw.is_some());
    }

    #[test]
    fn test_center_on_building() {
        let mut backend = backend();
        assert!(!backend.center_on_building(BuildingId(1)));
        let mut list = DisplayList::new();
        backend.render(&snapshot(), 0.0, &mut list);
        assert!(backend.center_on_building(BuildingId(1)));
        assert_eq!(backend.orbit().target, Vec3::ZERO);
        assert!(backend.debug_stats().is_none());
    }

    #[test]
    fn test_disposed_backend_ignores_input() {
        let mut backend = backend();
        let mut list = DisplayList::new();
        backend.render(&snapshot(), 0.0, &mut list);
        let hit = backend.interactives[0];
        let camera = backend.camera_state();

        backend.dispose();
        backend.pointer_down(hit.center_x, hit.center_y);
        backend.pointer_up(hit.center_x, hit.center_y);
        backend.pointer_down(100.0, 100.0);
        backend.pointer_move(180.0, 140.0);
        backend.pointer_up(180.0, 140.0);
        backend.wheel(400.0, 300.0, -300.0);
        backend.pinch(400.0, 300.0, 0.5);

        assert!(!backend.center_on_building(BuildingId(1)));
        assert_eq!(backend.selection(), SelectionState::default());
        assert_eq!(backend.camera_state(), camera);
    }
}
