//! Pointer input: hit picking, selection and camera gestures.
//!
//! Hit regions come from the most recent composition, so a pointer event
//! between two ticks sees boxes that are at most one tick old.

use glam::Vec2;

use crate::core::types::{BuildingKind, EntityRef, WorldPos};

use super::camera::IsoCamera;
use super::compositor::InteractiveEntity;

/// Wheel delta to zoom factor exponent.
const WHEEL_ZOOM_RATE: f32 = 0.0015;

/// Topmost box containing the point; ties on depth go to the box whose
/// center is closest.
pub fn pick_best_hit(list: &[InteractiveEntity], x: f32, y: f32) -> Option<&InteractiveEntity> {
    let mut best: Option<(&InteractiveEntity, f32)> = None;
    for hit in list.iter().filter(|h| h.contains(x, y)) {
        let dist = Vec2::new(x - hit.center_x, y - hit.center_y).length();
        let better = match best {
            None => true,
            Some((current, current_dist)) => {
                hit.depth > current.depth || (hit.depth == current.depth && dist < current_dist)
            }
        };
        if better {
            best = Some((hit, dist));
        }
    }
    best.map(|(hit, _)| hit)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    Set(EntityRef),
    Clear,
    Keep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickResolution {
    pub outcome: SelectionOutcome,
    pub forward_ground_click: bool,
}

/// Selection transition for a click. In placement mode the click belongs to
/// the ground regardless of what is under it.
pub fn resolve_click_selection_outcome(
    placement: Option<BuildingKind>,
    hit: Option<EntityRef>,
) -> ClickResolution {
    match (placement, hit) {
        (None, Some(entity)) => ClickResolution {
            outcome: SelectionOutcome::Set(entity),
            forward_ground_click: false,
        },
        (None, None) => ClickResolution {
            outcome: SelectionOutcome::Clear,
            forward_ground_click: true,
        },
        (Some(_), _) => ClickResolution {
            outcome: SelectionOutcome::Keep,
            forward_ground_click: true,
        },
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected: Option<EntityRef>,
    pub hovered: Option<EntityRef>,
}

impl SelectionState {
    /// Apply a click outcome. Returns the new selection when it changed.
    pub fn apply(&mut self, outcome: SelectionOutcome) -> Option<Option<EntityRef>> {
        let next = match outcome {
            SelectionOutcome::Set(entity) => Some(entity),
            SelectionOutcome::Clear => None,
            SelectionOutcome::Keep => return None,
        };
        if self.selected == next {
            return None;
        }
        self.selected = next;
        Some(next)
    }
}

/// Ground click forwarded to the host.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundClick {
    pub world: WorldPos,
    pub tile: (i32, i32),
    pub placement: Option<BuildingKind>,
}

pub type GroundClickHandler = Box<dyn FnMut(GroundClick)>;
pub type PlacementPreviewHandler = Box<dyn FnMut(Option<(i32, i32)>)>;
pub type EntitySelectHandler = Box<dyn FnMut(Option<EntityRef>)>;

/// Camera operations the router drives. Implemented by each backend's
/// camera so the same pointer stream controls either.
pub trait GestureCamera {
    fn drag(&mut self, delta: Vec2);
    /// factor > 1.0 zooms in
    fn zoom_at(&mut self, screen: Vec2, factor: f32);
    fn ground_at(&self, screen: Vec2) -> Option<WorldPos>;
}

impl GestureCamera for IsoCamera {
    fn drag(&mut self, delta: Vec2) {
        self.pan_screen(delta);
    }

    fn zoom_at(&mut self, screen: Vec2, factor: f32) {
        self.zoom_toward(screen, factor);
    }

    fn ground_at(&self, screen: Vec2) -> Option<WorldPos> {
        let world = self.screen_to_world(screen);
        world.is_finite().then_some(world)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct PointerState {
    down_at: Option<Vec2>,
    last: Vec2,
    dragging: bool,
}

#[derive(Default)]
pub struct InteractionRouter {
    selection: SelectionState,
    placement: Option<BuildingKind>,
    preview: Option<(i32, i32)>,
    pointer: PointerState,
    drag_threshold: f32,
    on_ground_click: Option<GroundClickHandler>,
    on_placement_preview: Option<PlacementPreviewHandler>,
    on_entity_select: Option<EntitySelectHandler>,
}

impl InteractionRouter {
    pub fn new(drag_threshold: f32) -> Self {
        Self {
            drag_threshold,
            ..Default::default()
        }
    }

    pub fn set_ground_click_handler(&mut self, handler: GroundClickHandler) {
        self.on_ground_click = Some(handler);
    }

    pub fn set_placement_preview_handler(&mut self, handler: PlacementPreviewHandler) {
        self.on_placement_preview = Some(handler);
    }

    pub fn set_entity_select_handler(&mut self, handler: EntitySelectHandler) {
        self.on_entity_select = Some(handler);
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    pub fn placement(&self) -> Option<BuildingKind> {
        self.placement
    }

    pub fn preview(&self) -> Option<(i32, i32)> {
        self.preview
    }

    pub fn is_dragging(&self) -> bool {
        self.pointer.dragging
    }

    /// Enter or leave placement mode. Leaving drops the preview.
    pub fn set_placement_type(&mut self, placement: Option<BuildingKind>) {
        self.placement = placement;
        if placement.is_none() {
            self.set_preview(None);
        }
    }

    /// Host-driven preview; does not echo back through the preview handler.
    pub fn set_preview_position(&mut self, tile: (i32, i32)) {
        self.preview = Some(tile);
    }

    pub fn clear_preview(&mut self) {
        self.preview = None;
    }

    fn set_preview(&mut self, tile: Option<(i32, i32)>) {
        if self.preview == tile {
            return;
        }
        self.preview = tile;
        if let Some(handler) = self.on_placement_preview.as_mut() {
            handler(tile);
        }
    }

    /// Select programmatically, e.g. after `center_on_building`.
    pub fn select(&mut self, entity: Option<EntityRef>) {
        let outcome = match entity {
            Some(entity) => SelectionOutcome::Set(entity),
            None => SelectionOutcome::Clear,
        };
        if let Some(changed) = self.selection.apply(outcome) {
            if let Some(handler) = self.on_entity_select.as_mut() {
                handler(changed);
            }
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        let pos = Vec2::new(x, y);
        self.pointer = PointerState {
            down_at: Some(pos),
            last: pos,
            dragging: false,
        };
    }

    pub fn pointer_move(
        &mut self,
        x: f32,
        y: f32,
        hits: &[InteractiveEntity],
        camera: &mut dyn GestureCamera,
    ) {
        let pos = Vec2::new(x, y);
        if let Some(origin) = self.pointer.down_at {
            if !self.pointer.dragging && pos.distance(origin) >= self.drag_threshold {
                self.pointer.dragging = true;
                self.selection.hovered = None;
            }
            if self.pointer.dragging {
                camera.drag(pos - self.pointer.last);
            }
            self.pointer.last = pos;
            return;
        }

        self.selection.hovered = pick_best_hit(hits, x, y).map(|h| h.entity);
        if self.placement.is_some() {
            let tile = camera.ground_at(pos).map(|w| w.rounded());
            self.set_preview(tile);
        }
    }

    /// Finish a press. A press that turned into a drag is not a click.
    pub fn pointer_up(
        &mut self,
        x: f32,
        y: f32,
        hits: &[InteractiveEntity],
        camera: &mut dyn GestureCamera,
    ) -> Option<ClickResolution> {
        let pointer = std::mem::take(&mut self.pointer);
        if pointer.dragging || pointer.down_at.is_none() {
            return None;
        }
        Some(self.click(x, y, hits, camera))
    }

    pub fn click(
        &mut self,
        x: f32,
        y: f32,
        hits: &[InteractiveEntity],
        camera: &dyn GestureCamera,
    ) -> ClickResolution {
        let hit = pick_best_hit(hits, x, y).map(|h| h.entity);
        let resolution = resolve_click_selection_outcome(self.placement, hit);

        if let Some(changed) = self.selection.apply(resolution.outcome) {
            if let Some(handler) = self.on_entity_select.as_mut() {
                handler(changed);
            }
        }
        if resolution.forward_ground_click {
            if let Some(world) = camera.ground_at(Vec2::new(x, y)) {
                let click = GroundClick {
                    world,
                    tile: world.rounded(),
                    placement: self.placement,
                };
                if let Some(handler) = self.on_ground_click.as_mut() {
                    handler(click);
                }
            }
        }
        resolution
    }

    pub fn wheel(&mut self, x: f32, y: f32, delta_y: f32, camera: &mut dyn GestureCamera) {
        if !delta_y.is_finite() {
            return;
        }
        camera.zoom_at(Vec2::new(x, y), (-delta_y * WHEEL_ZOOM_RATE).exp());
    }

    /// `scale` is the pinch distance ratio since the last event.
    pub fn pinch(&mut self, x: f32, y: f32, scale: f32, camera: &mut dyn GestureCamera) {
        if scale.is_finite() && scale > 0.0 {
            camera.zoom_at(Vec2::new(x, y), scale);
        }
    }
}
