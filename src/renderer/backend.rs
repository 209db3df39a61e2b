//! Renderer backends and the factory that picks one.
//!
//! Both backends share the `RenderBackend` contract. The factory tries the
//! primary 2D backend first; if it can't be built the session falls back
//! to the scene backend and is marked degraded. Construction errors are
//! logged and never reach the caller.

use serde::{Deserialize, Serialize};

use crate::core::config::ViewConfig;
use crate::core::types::{BuildingId, BuildingKind};
use crate::sim::events::SimEvent;
use crate::sim::snapshot::SimulationSnapshot;

use super::camera::CameraSnapshot;
use super::canvas::CanvasBackend;
use super::interaction::{
    EntitySelectHandler, GroundClickHandler, PlacementPreviewHandler, SelectionState,
};
use super::metrics::DebugStats;
use super::scene::SceneBackend;
use super::state::Viewport;
use super::surface::DrawSurface;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererMode {
    /// Full pipeline: terrain cache, compositor, effects
    Canvas2d,
    /// Reduced scene-graph backend with an orbit camera
    Scene3d,
}

impl RendererMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RendererMode::Canvas2d => "canvas2d",
            RendererMode::Scene3d => "scene3d",
        }
    }
}

/// What the host can provide to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Whether an offscreen raster can be allocated for terrain caching
    pub offscreen_raster: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            offscreen_raster: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BackendRequest {
    pub viewport: Viewport,
    pub preferred: RendererMode,
    pub capabilities: HostCapabilities,
    /// Seed for effect randomness
    pub seed: u64,
}

impl BackendRequest {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            preferred: RendererMode::Canvas2d,
            capabilities: HostCapabilities::default(),
            seed: 0,
        }
    }
}

/// Contract shared by both renderers. Every operation is infallible from
/// the caller's side; problems degrade the picture instead.
pub trait RenderBackend {
    fn mode(&self) -> RendererMode;

    /// Run one tick against `snapshot`, drawing into `surface`.
    fn render(&mut self, snapshot: &SimulationSnapshot, now_ms: f64, surface: &mut dyn DrawSurface);
    fn resize(&mut self, viewport: Viewport);
    /// Release resources and drop handlers. Later calls are no-ops.
    fn dispose(&mut self);
    fn is_disposed(&self) -> bool;

    /// Forward a simulation event (e.g. to trigger effects).
    fn notify(&mut self, event: &SimEvent);

    fn set_ground_click_handler(&mut self, handler: GroundClickHandler);
    fn set_placement_preview_handler(&mut self, handler: PlacementPreviewHandler);
    fn set_entity_select_handler(&mut self, handler: EntitySelectHandler);

    fn set_preview_position(&mut self, tile: (i32, i32));
    fn clear_preview(&mut self);
    fn set_placement_type(&mut self, kind: Option<BuildingKind>);
    /// Select a building and move the camera to it. False if the building
    /// was not in the last rendered snapshot.
    fn center_on_building(&mut self, id: BuildingId) -> bool;

    fn pointer_move(&mut self, x: f32, y: f32);
    fn pointer_down(&mut self, x: f32, y: f32);
    fn pointer_up(&mut self, x: f32, y: f32);
    fn wheel(&mut self, x: f32, y: f32, delta_y: f32);
    fn pinch(&mut self, x: f32, y: f32, scale: f32);

    fn selection(&self) -> SelectionState;
    fn camera_state(&self) -> CameraSnapshot;
    fn debug_stats(&self) -> Option<DebugStats>;
}

pub struct RendererSession {
    backend: Box<dyn RenderBackend>,
    degraded: bool,
}

impl RendererSession {
    pub fn renderer_mode(&self) -> RendererMode {
        self.backend.mode()
    }

    /// True when the preferred backend failed and the fallback is running.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    pub fn into_backend(self) -> Box<dyn RenderBackend> {
        self.backend
    }
}

/// Modes the host could run, primary first.
pub fn available_modes(capabilities: &HostCapabilities) -> Vec<RendererMode> {
    let mut modes = Vec::with_capacity(2);
    if capabilities.offscreen_raster {
        modes.push(RendererMode::Canvas2d);
    }
    modes.push(RendererMode::Scene3d);
    modes
}

/// Build the preferred backend, falling back to the scene backend.
pub fn create_renderer(config: &ViewConfig, request: BackendRequest) -> RendererSession {
    if request.preferred == RendererMode::Scene3d {
        tracing::info!(mode = RendererMode::Scene3d.as_str(), "Renderer selected");
        return RendererSession {
            backend: Box::new(SceneBackend::new(config, request.viewport)),
            degraded: false,
        };
    }

    match CanvasBackend::new(config, &request) {
        Ok(backend) => {
            tracing::info!(mode = RendererMode::Canvas2d.as_str(), "Renderer selected");
            RendererSession {
                backend: Box::new(backend),
                degraded: false,
            }
        }
        Err(error) => {
            tracing::warn!(%error, "Primary renderer unavailable, falling back to scene renderer");
            RendererSession {
                backend: Box::new(SceneBackend::new(config, request.viewport)),
                degraded: true,
            }
        }
    }
}
