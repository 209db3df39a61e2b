//! Entity compositor: snapshot → depth-sorted drawables + hit regions.
//!
//! Both lists are rebuilt from scratch every tick. Depth is `x + z` plus a
//! fixed per-category offset so that on a shared tile colonists draw over
//! buildings and buildings over construction ghosts. This is a painter's
//! approximation, not a topological sort.

use glam::Vec2;

use crate::core::config::ViewConfig;
use crate::core::types::{EntityRef, WorldPos};
use crate::sim::snapshot::{Building, Colonist, ConstructionItem, SimulationSnapshot};

use super::camera::IsoCamera;
use super::clock::FrameContext;
use super::registry::{ColonistInterpolation, PlacementTimers};
use super::sprites::{SpriteCatalog, SpriteKey};
use super::state::{Color, Rect};
use super::surface::{with_saved_state, DrawSurface};

pub const CONSTRUCTION_DEPTH_OFFSET: f64 = 0.04;
pub const BUILDING_DEPTH_OFFSET: f64 = 0.15;
pub const COLONIST_DEPTH_OFFSET: f64 = 0.28;

const MIN_HIT_HALF_WIDTH: f32 = 14.0;
const MIN_HIT_HALF_HEIGHT: f32 = 12.0;
const HIT_BOX_FRACTION: f32 = 0.2;
/// Hit box center sits this fraction of the sprite height above its foot.
const HIT_BOX_LIFT: f32 = 0.25;

const PROGRESS_BAR_HEIGHT: f32 = 4.0;
const PROGRESS_TRACK: Color = Color::rgba(0.1, 0.1, 0.1, 0.7);
const PROGRESS_FILL: Color = Color::rgb(0.95, 0.78, 0.25);

pub type DrawFn = Box<dyn Fn(&mut dyn DrawSurface)>;

/// One deferred draw, ordered by `depth`.
pub struct RenderableItem {
    pub depth: f64,
    pub draw: DrawFn,
}

impl std::fmt::Debug for RenderableItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderableItem").field("depth", &self.depth).finish()
    }
}

/// Screen-space hit box for pointer picking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractiveEntity {
    pub entity: EntityRef,
    pub center_x: f32,
    pub center_y: f32,
    pub half_width: f32,
    pub half_height: f32,
    pub depth: f64,
}

impl InteractiveEntity {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (x - self.center_x).abs() <= self.half_width && (y - self.center_y).abs() <= self.half_height
    }
}

/// Compositor output for one tick.
#[derive(Debug, Default)]
pub struct Composition {
    pub renderables: Vec<RenderableItem>,
    pub interactives: Vec<InteractiveEntity>,
    /// Entities rejected by viewport culling
    pub culled: usize,
    /// Colonists skipped because they have no render position yet
    pub skipped: usize,
}

impl Composition {
    /// Run every draw in depth order.
    pub fn draw_all(&self, surface: &mut dyn DrawSurface) {
        for item in &self.renderables {
            (item.draw)(surface);
        }
    }
}

/// Read-only inputs for one composition pass.
pub struct SceneInputs<'a> {
    pub snapshot: &'a SimulationSnapshot,
    pub camera: &'a IsoCamera,
    pub ctx: &'a FrameContext,
    pub placement: &'a PlacementTimers,
    pub colonists: &'a ColonistInterpolation,
}

pub fn depth_of(pos: WorldPos, offset: f64) -> f64 {
    pos.x as f64 + pos.z as f64 + offset
}

/// Hit box half extents for a building drawn at `draw_size`.
pub fn building_hit_extents(draw_size: Vec2) -> (f32, f32) {
    (
        MIN_HIT_HALF_WIDTH.max(draw_size.x * HIT_BOX_FRACTION),
        MIN_HIT_HALF_HEIGHT.max(draw_size.y * HIT_BOX_FRACTION),
    )
}

/// Rectangle of a sprite whose bottom-center sits on `foot`.
fn sprite_rect(foot: Vec2, size: Vec2) -> Rect {
    Rect::new(foot.x - size.x * 0.5, foot.y - size.y, size.x, size.y)
}

#[derive(Clone, Debug)]
pub struct EntityCompositor {
    catalog: SpriteCatalog,
    cull_padding: f32,
    night_glow_threshold: f32,
}

impl EntityCompositor {
    pub fn new(config: &ViewConfig, catalog: SpriteCatalog) -> Self {
        Self {
            catalog,
            cull_padding: config.cull_padding,
            night_glow_threshold: config.night_glow_threshold,
        }
    }

    pub fn catalog(&self) -> &SpriteCatalog {
        &self.catalog
    }

    fn visible(&self, rect: &Rect, view: &Rect) -> bool {
        rect.expand(self.cull_padding).intersects(view)
    }

    pub fn compose(&self, scene: &SceneInputs<'_>) -> Composition {
        let snapshot = scene.snapshot;
        let mut out = Composition {
            renderables: Vec::with_capacity(
                snapshot.buildings.len() + snapshot.colonists.len() + snapshot.construction.len(),
            ),
            interactives: Vec::with_capacity(snapshot.buildings.len()),
            ..Default::default()
        };

        for item in &snapshot.construction {
            self.compose_construction(scene, item, &mut out);
        }
        for building in &snapshot.buildings {
            self.compose_building(scene, building, &mut out);
        }
        for colonist in &snapshot.colonists {
            self.compose_colonist(scene, colonist, &mut out);
        }

        // stable: equal depths keep snapshot order
        out.renderables.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        out
    }

    fn compose_construction(&self, scene: &SceneInputs<'_>, item: &ConstructionItem, out: &mut Composition) {
        let camera = scene.camera;
        let foot = camera.world_to_screen(item.position);
        let size = self.catalog.building_size(item.kind) * camera.zoom;
        let rect = sprite_rect(foot, size);
        if !self.visible(&rect, &camera.viewport.bounds()) {
            out.culled += 1;
            return;
        }

        let ratio = item.completion();
        let kind = item.kind;
        out.renderables.push(RenderableItem {
            depth: depth_of(item.position, CONSTRUCTION_DEPTH_OFFSET),
            draw: Box::new(move |surface| {
                surface.draw_sprite(SpriteKey::Unbuilt(kind), rect);
                if ratio > 0.0 {
                    let built_height = rect.height * ratio;
                    let clip = Rect::new(rect.x, rect.bottom() - built_height, rect.width, built_height);
                    with_saved_state(surface, |surface| {
                        surface.clip(clip);
                        surface.draw_sprite(SpriteKey::Building(kind), rect);
                    });
                }
                let track = Rect::new(
                    rect.x + rect.width * 0.2,
                    rect.y - PROGRESS_BAR_HEIGHT * 2.0,
                    rect.width * 0.6,
                    PROGRESS_BAR_HEIGHT,
                );
                surface.fill_rect(track, PROGRESS_TRACK);
                surface.fill_rect(Rect::new(track.x, track.y, track.width * ratio, track.height), PROGRESS_FILL);
            }),
        });
    }

    fn compose_building(&self, scene: &SceneInputs<'_>, building: &Building, out: &mut Composition) {
        let camera = scene.camera;
        let foot = camera.world_to_screen(building.position);
        let scale = scene.placement.scale(building.id, scene.ctx.now_ms / 1000.0);
        let size = self.catalog.building_size(building.kind) * camera.zoom * scale;
        let rect = sprite_rect(foot, size);
        if !self.visible(&rect, &camera.viewport.bounds()) {
            out.culled += 1;
            return;
        }

        let depth = depth_of(building.position, BUILDING_DEPTH_OFFSET);
        let kind = building.kind;
        let night = scene.ctx.night();
        let glow = if self.catalog.lit_at_night(kind) && night > self.night_glow_threshold {
            Some(((night - self.night_glow_threshold) / (1.0 - self.night_glow_threshold)).min(1.0))
        } else {
            None
        };

        out.renderables.push(RenderableItem {
            depth,
            draw: Box::new(move |surface| {
                surface.draw_sprite(SpriteKey::Building(kind), rect);
                if let Some(alpha) = glow {
                    with_saved_state(surface, |surface| {
                        surface.set_alpha(alpha);
                        surface.draw_sprite(SpriteKey::WindowGlow(kind), rect);
                    });
                }
            }),
        });

        let (half_width, half_height) = building_hit_extents(size);
        out.interactives.push(InteractiveEntity {
            entity: EntityRef::Building(building.id),
            center_x: foot.x,
            center_y: foot.y - size.y * HIT_BOX_LIFT,
            half_width,
            half_height,
            depth,
        });
    }

    fn compose_colonist(&self, scene: &SceneInputs<'_>, colonist: &Colonist, out: &mut Composition) {
        if !colonist.alive {
            return;
        }
        let Some(position) = scene.colonists.get(colonist.id) else {
            out.skipped += 1;
            return;
        };

        let camera = scene.camera;
        let time = scene.ctx.now_ms / 1000.0;
        let anim = &self.catalog.colonist;
        let active = colonist.task.is_active();
        let frame = anim.frame_index(time, colonist.age);
        let bob = anim.bob_offset(time, colonist.age, active) * camera.zoom;

        let mut foot = camera.world_to_screen(position);
        foot.y -= bob;
        let rect = sprite_rect(foot, self.catalog.colonist_size() * camera.zoom);
        if !self.visible(&rect, &camera.viewport.bounds()) {
            out.culled += 1;
            return;
        }

        out.renderables.push(RenderableItem {
            depth: depth_of(position, COLONIST_DEPTH_OFFSET),
            draw: Box::new(move |surface| {
                surface.draw_sprite(SpriteKey::Colonist { frame, active }, rect);
            }),
        });
    }
}
