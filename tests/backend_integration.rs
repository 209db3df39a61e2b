//! Integration tests for backend selection and the shared backend contract
//!
//! Both renderers are driven through `dyn RenderBackend` with the same
//! scripted colony, so anything a host relies on is checked against each.

use std::cell::RefCell;
use std::rc::Rc;

use colony_view::core::types::{BuildingId, BuildingKind, EntityRef};
use colony_view::core::ViewConfig;
use colony_view::renderer::surface::DrawCommand;
use colony_view::renderer::{
    available_modes, create_renderer, BackendRequest, DisplayList, HostCapabilities,
    RenderBackend, RendererMode, Viewport,
};
use colony_view::sim::{EventKind, ScriptedColony, SimEvent, SimulationEngine};

const FRAME_MS: f64 = 1000.0 / 60.0;

fn request(width: u32, height: u32) -> BackendRequest {
    BackendRequest::new(Viewport::new(width, height, 1.0))
}

fn both_backends() -> Vec<Box<dyn RenderBackend>> {
    let config = ViewConfig::default();
    let mut scene = request(800, 600);
    scene.preferred = RendererMode::Scene3d;
    vec![
        create_renderer(&config, request(800, 600)).into_backend(),
        create_renderer(&config, scene).into_backend(),
    ]
}

// ============================================================================
// Factory
// ============================================================================

#[test]
fn test_factory_prefers_canvas() {
    let session = create_renderer(&ViewConfig::default(), request(800, 600));
    assert_eq!(session.renderer_mode(), RendererMode::Canvas2d);
    assert!(!session.is_degraded());
    assert!(session.backend().debug_stats().is_some());
}

#[test]
fn test_factory_falls_back_when_canvas_cannot_start() {
    let config = ViewConfig::default();

    let mut no_raster = request(800, 600);
    no_raster.capabilities = HostCapabilities { offscreen_raster: false };
    let empty = request(0, 0);
    let oversized = request(6000, 6000);

    for req in [no_raster, empty, oversized] {
        let session = create_renderer(&config, req);
        assert_eq!(session.renderer_mode(), RendererMode::Scene3d);
        assert!(session.is_degraded());
        assert!(session.backend().debug_stats().is_none());
    }
}

#[test]
fn test_small_raster_budget_forces_fallback() {
    let config = ViewConfig {
        max_raster_pixels: 100 * 100,
        ..Default::default()
    };
    let session = create_renderer(&config, request(320, 240));
    assert!(session.is_degraded());
}

#[test]
fn test_requested_scene_is_not_degraded() {
    let mut req = request(800, 600);
    req.preferred = RendererMode::Scene3d;
    let session = create_renderer(&ViewConfig::default(), req);
    assert_eq!(session.renderer_mode(), RendererMode::Scene3d);
    assert!(!session.is_degraded());
}

#[test]
fn test_available_modes_follow_capabilities() {
    let full = HostCapabilities::default();
    assert_eq!(
        available_modes(&full),
        vec![RendererMode::Canvas2d, RendererMode::Scene3d]
    );
    let bare = HostCapabilities { offscreen_raster: false };
    assert_eq!(available_modes(&bare), vec![RendererMode::Scene3d]);
}

// ============================================================================
// Shared Contract
// ============================================================================

#[test]
fn test_every_backend_balances_surface_state() {
    for mut backend in both_backends() {
        let mut colony = ScriptedColony::founded(13, 12);
        colony.queue_building(BuildingKind::Library, 6, 6);
        let mut list = DisplayList::new();

        for frame in 0..240 {
            colony.step(FRAME_MS / 1000.0);
            list.clear();
            backend.render(&colony.snapshot(), frame as f64 * FRAME_MS, &mut list);
            assert!(!list.is_empty(), "{:?} drew nothing", backend.mode());
            assert_eq!(list.save_depth(), 0);
            assert_eq!(list.unbalanced_restores(), 0);
        }
        assert!(list.count(|c| matches!(c, DrawCommand::Sprite { .. })) > 0);
    }
}

#[test]
fn test_every_backend_reports_selection_through_handler() {
    for mut backend in both_backends() {
        let selected: Rc<RefCell<Vec<Option<EntityRef>>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = selected.clone();
        backend.set_entity_select_handler(Box::new(move |e| sink.borrow_mut().push(e)));

        let snapshot = ScriptedColony::founded(2, 12).snapshot();
        let mut list = DisplayList::new();
        backend.render(&snapshot, 0.0, &mut list);

        assert!(backend.center_on_building(BuildingId(3)));
        assert_eq!(
            backend.selection().selected,
            Some(EntityRef::Building(BuildingId(3)))
        );
        assert_eq!(
            *selected.borrow(),
            vec![Some(EntityRef::Building(BuildingId(3)))]
        );
    }
}

#[test]
fn test_every_backend_accepts_events() {
    for mut backend in both_backends() {
        let event = SimEvent::new(EventKind::ConstructionComplete, "Well completed", 1.0);
        backend.notify(&event);
        let mut list = DisplayList::new();
        backend.render(&ScriptedColony::founded(4, 12).snapshot(), 0.0, &mut list);
        assert!(!list.is_empty());
    }
}

#[test]
fn test_disposed_backends_stop_drawing() {
    for mut backend in both_backends() {
        let snapshot = ScriptedColony::founded(6, 12).snapshot();
        let mut list = DisplayList::new();
        backend.render(&snapshot, 0.0, &mut list);

        backend.dispose();
        backend.dispose();
        assert!(backend.is_disposed());

        list.clear();
        backend.render(&snapshot, FRAME_MS, &mut list);
        assert!(list.is_empty());
        assert_eq!(backend.selection().selected, None);
    }
}

#[test]
fn test_resize_keeps_rendering() {
    for mut backend in both_backends() {
        let snapshot = ScriptedColony::founded(8, 12).snapshot();
        let mut list = DisplayList::new();
        backend.render(&snapshot, 0.0, &mut list);

        backend.resize(Viewport::new(1024, 768, 2.0));
        // invalid sizes are logged and ignored by the 2D backend
        backend.resize(Viewport::new(0, 0, 1.0));

        list.clear();
        backend.render(&snapshot, FRAME_MS, &mut list);
        assert!(!list.is_empty());
    }
}
