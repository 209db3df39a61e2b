//! Primary 2D backend: the full frame pipeline plus pointer routing.

use crate::core::config::ViewConfig;
use crate::core::error::{Result, ViewError};
use crate::core::types::{BuildingId, BuildingKind, EntityRef};
use crate::sim::events::SimEvent;
use crate::sim::snapshot::SimulationSnapshot;

use super::backend::{BackendRequest, RenderBackend, RendererMode};
use super::camera::CameraSnapshot;
use super::effects::ChaChaSource;
use super::interaction::{
    EntitySelectHandler, GroundClickHandler, InteractionRouter, PlacementPreviewHandler,
    SelectionState,
};
use super::metrics::DebugStats;
use super::pipeline::{FramePipeline, FrameReport, OverlayInputs};
use super::state::Viewport;
use super::surface::DrawSurface;

pub struct CanvasBackend {
    pipeline: FramePipeline,
    router: InteractionRouter,
    drag_threshold: f32,
    last_report: Option<FrameReport>,
    disposed: bool,
}

impl CanvasBackend {
    pub fn new(config: &ViewConfig, request: &BackendRequest) -> Result<Self> {
        if !request.capabilities.offscreen_raster {
            return Err(ViewError::BackendUnavailable(RendererMode::Canvas2d));
        }
        let pipeline = FramePipeline::new(
            config,
            request.viewport,
            Box::new(ChaChaSource::seeded(request.seed)),
        )?;
        Ok(Self {
            pipeline,
            router: InteractionRouter::new(config.drag_threshold),
            drag_threshold: config.drag_threshold,
            last_report: None,
            disposed: false,
        })
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    pub fn last_report(&self) -> Option<&FrameReport> {
        self.last_report.as_ref()
    }
}

impl RenderBackend for CanvasBackend {
    fn mode(&self) -> RendererMode {
        RendererMode::Canvas2d
    }

    fn render(&mut self, snapshot: &SimulationSnapshot, now_ms: f64, surface: &mut dyn DrawSurface) {
        if self.disposed {
            return;
        }
        let overlay = OverlayInputs {
            preview: self.router.preview(),
            selection: self.router.selection(),
        };
        self.last_report = Some(self.pipeline.tick(snapshot, now_ms, &overlay, surface));
    }

    fn resize(&mut self, viewport: Viewport) {
        if self.disposed {
            return;
        }
        if let Err(error) = self.pipeline.resize(viewport) {
            tracing::warn!(%error, "Terrain raster kept at previous size");
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.router = InteractionRouter::new(self.drag_threshold);
        self.pipeline.effects_mut().set_enabled(false);
        self.pipeline.release_terrain();
        self.last_report = None;
        tracing::debug!("Canvas renderer disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn notify(&mut self, event: &SimEvent) {
        if !self.disposed {
            self.pipeline.queue_event(event.clone());
        }
    }

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
        let Some(position) = self.pipeline.building_position(id) else {
            return false;
        };
        self.pipeline.camera_mut().center_on(position);
        self.router.select(Some(EntityRef::Building(id)));
        true
    }

    fn pointer_move(&mut self, x: f32, y: f32) {
        if self.disposed {
            return;
        }
        let (hits, camera) = self.pipeline.hits_and_camera();
        self.router.pointer_move(x, y, hits, camera);
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
        let (hits, camera) = self.pipeline.hits_and_camera();
        self.router.pointer_up(x, y, hits, camera);
    }

    fn wheel(&mut self, x: f32, y: f32, delta_y: f32) {
        if self.disposed {
            return;
        }
        self.router.wheel(x, y, delta_y, self.pipeline.camera_mut());
    }

    fn pinch(&mut self, x: f32, y: f32, scale: f32) {
        if self.disposed {
            return;
        }
        self.router.pinch(x, y, scale, self.pipeline.camera_mut());
    }

    fn selection(&self) -> SelectionState {
        self.router.selection()
    }

    fn camera_state(&self) -> CameraSnapshot {
        self.pipeline.camera().snapshot()
    }

    fn debug_stats(&self) -> Option<DebugStats> {
        Some(self.pipeline.debug_stats())
    }
}
