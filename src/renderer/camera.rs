//! Camera system with coordinate transformations.
//!
//! `IsoCamera` drives the primary 2D backend: an isometric projection of the
//! ground plane where world `x` runs down-right and world `z` down-left.
//! `OrbitCamera` drives the reduced 3D backend.

use glam::{Mat4, Vec2, Vec3};

use crate::core::config::ViewConfig;
use crate::core::types::WorldPos;

use super::state::Viewport;

/// Camera values exposed to the UI layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSnapshot {
    pub center: WorldPos,
    pub zoom: f32,
    pub viewport: Viewport,
    /// Orbit angles, only set by the 3D backend
    pub yaw: Option<f32>,
    pub pitch: Option<f32>,
}

#[derive(Clone, Debug)]
pub struct IsoCamera {
    pub center: WorldPos,
    pub zoom: f32,
    pub viewport: Viewport,
    tile_width: f32,
    tile_height: f32,
    elevation_scale: f32,
    min_zoom: f32,
    max_zoom: f32,
    follow_rate: f32,
    follow_target: Option<WorldPos>,
}

impl IsoCamera {
    /// Create a new camera centered at the world origin.
    pub fn new(config: &ViewConfig, viewport: Viewport) -> Self {
        Self {
            center: WorldPos::ORIGIN,
            zoom: 1.0_f32.clamp(config.min_zoom, config.max_zoom),
            viewport,
            tile_width: config.tile_width,
            tile_height: config.tile_height,
            elevation_scale: config.elevation_scale,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            follow_rate: config.camera_follow_rate,
            follow_target: None,
        }
    }

    /// Half a tile in screen pixels at the current zoom.
    pub fn half_tile(&self) -> Vec2 {
        Vec2::new(self.tile_width * 0.5, self.tile_height * 0.5) * self.zoom
    }

    fn screen_center(&self) -> Vec2 {
        self.viewport.size() * 0.5
    }

    /// Convert a ground-plane point to screen coordinates.
    /// Screen origin is top-left, Y increases downward.
    pub fn world_to_screen(&self, pos: WorldPos) -> Vec2 {
        let dx = pos.x - self.center.x;
        let dz = pos.z - self.center.z;
        let half = self.half_tile();
        self.screen_center() + Vec2::new((dx - dz) * half.x, (dx + dz) * half.y)
    }

    /// Same as `world_to_screen` for a point `height` units above the ground.
    pub fn world_to_screen_elevated(&self, pos: WorldPos, height: f32) -> Vec2 {
        let ground = self.world_to_screen(pos);
        Vec2::new(ground.x, ground.y - height * self.elevation_scale * self.zoom)
    }

    /// Convert screen coordinates back onto the ground plane.
    pub fn screen_to_world(&self, screen: Vec2) -> WorldPos {
        let offset = self.screen_delta_to_world(screen - self.screen_center());
        WorldPos::new(self.center.x + offset.x, self.center.z + offset.z)
    }

    /// World displacement matching a screen displacement.
    fn screen_delta_to_world(&self, delta: Vec2) -> WorldPos {
        let half = self.half_tile();
        let a = delta.x / half.x; // dx - dz
        let b = delta.y / half.y; // dx + dz
        WorldPos::new((a + b) * 0.5, (b - a) * 0.5)
    }

    /// Ground points under the four viewport corners.
    pub fn visible_corners(&self) -> [WorldPos; 4] {
        let size = self.viewport.size();
        [
            self.screen_to_world(Vec2::ZERO),
            self.screen_to_world(Vec2::new(size.x, 0.0)),
            self.screen_to_world(Vec2::new(0.0, size.y)),
            self.screen_to_world(size),
        ]
    }

    /// Drag the ground by a screen delta so content follows the pointer.
    pub fn pan_screen(&mut self, delta: Vec2) {
        let offset = self.screen_delta_to_world(delta);
        self.center.x -= offset.x;
        self.center.z -= offset.z;
        self.follow_target = None;
    }

    /// Zoom camera by factor; > 1.0 zooms in.
    pub fn zoom_by(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        }
    }

    /// Zoom toward a specific screen position (e.g., mouse cursor).
    /// This keeps the ground point under the cursor fixed.
    pub fn zoom_toward(&mut self, screen: Vec2, factor: f32) {
        let before = self.screen_to_world(screen);
        self.zoom_by(factor);
        let after = self.screen_to_world(screen);
        self.center.x += before.x - after.x;
        self.center.z += before.z - after.z;
    }

    /// Start a smooth move toward `target`.
    pub fn center_on(&mut self, target: WorldPos) {
        self.follow_target = Some(target);
    }

    pub fn is_following(&self) -> bool {
        self.follow_target.is_some()
    }

    /// Advance the smooth follow. Snaps once within a hundredth of a tile.
    pub fn update(&mut self, dt: f32) {
        let Some(target) = self.follow_target else {
            return;
        };
        let t = 1.0 - (-self.follow_rate * dt.max(0.0)).exp();
        self.center = self.center.lerp(target, t);
        if self.center.distance(target) < 0.01 {
            self.center = target;
            self.follow_target = None;
        }
    }

    /// Update viewport size (call on resize).
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            center: self.center,
            zoom: self.zoom,
            viewport: self.viewport,
            yaw: None,
            pitch: None,
        }
    }
}

const MIN_PITCH: f32 = 0.15;
const MAX_PITCH: f32 = 1.45;
const MIN_DISTANCE: f32 = 6.0;
const MAX_DISTANCE: f32 = 120.0;

/// Perspective orbit camera for the reduced 3D backend.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub fov_y: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: 0.75,
            distance: 36.0,
            fov_y: 45f32.to_radians(),
        }
    }
}

impl OrbitCamera {
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + delta_pitch).clamp(MIN_PITCH, MAX_PITCH);
    }

    /// factor > 1.0 moves closer.
    pub fn zoom_by(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.distance = (self.distance / factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
        }
    }

    pub fn eye(&self) -> Vec3 {
        let horizontal = self.distance * self.pitch.cos();
        self.target
            + Vec3::new(
                horizontal * self.yaw.cos(),
                self.distance * self.pitch.sin(),
                horizontal * self.yaw.sin(),
            )
    }

    pub fn view_projection(&self, viewport: &Viewport) -> Mat4 {
        let aspect = viewport.width.max(1) as f32 / viewport.height.max(1) as f32;
        let projection = Mat4::perspective_rh(self.fov_y, aspect, 0.1, 1000.0);
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        projection * view
    }

    /// Project a world point to screen pixels; None when behind the camera.
    pub fn project(&self, point: Vec3, viewport: &Viewport) -> Option<Vec2> {
        let clip = self.view_projection(viewport) * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.width as f32,
            (1.0 - ndc.y) * 0.5 * viewport.height as f32,
        ))
    }

    /// Ground-plane point under a screen position, if the ray hits it.
    pub fn ground_at(&self, screen: Vec2, viewport: &Viewport) -> Option<WorldPos> {
        let width = viewport.width.max(1) as f32;
        let height = viewport.height.max(1) as f32;
        let ndc_x = screen.x / width * 2.0 - 1.0;
        let ndc_y = 1.0 - screen.y / height * 2.0;
        let inverse = self.view_projection(viewport).inverse();
        let near = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 0.99));
        let dir = far - near;
        if dir.y.abs() <= f32::EPSILON {
            return None;
        }
        let t = -near.y / dir.y;
        if !t.is_finite() || t < 0.0 {
            return None;
        }
        let hit = near + dir * t;
        Some(WorldPos::new(hit.x, hit.z))
    }

    /// Distance to a world point, used to fade and order scene nodes.
    pub fn depth_of(&self, point: Vec3) -> f32 {
        self.eye().distance(point)
    }

    pub fn snapshot(&self, viewport: Viewport) -> CameraSnapshot {
        CameraSnapshot {
            center: WorldPos::new(self.target.x, self.target.z),
            zoom: MAX_DISTANCE / self.distance.max(MIN_DISTANCE),
            viewport,
            yaw: Some(self.yaw),
            pitch: Some(self.pitch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> IsoCamera {
        IsoCamera::new(&ViewConfig::default(), Viewport::new(800, 600, 1.0))
    }

    #[test]
    fn test_world_screen_roundtrip() {
        let mut camera = camera();
        camera.center = WorldPos::new(3.0, -2.0);
        camera.zoom = 1.5;

        let world = WorldPos::new(7.25, 1.5);
        let back = camera.screen_to_world(camera.world_to_screen(world));

        assert!(world.distance(back) < 0.001);
    }

    #[test]
    fn test_center_maps_to_screen_center() {
        let mut camera = camera();
        camera.center = WorldPos::new(50.0, 75.0);

        let screen = camera.world_to_screen(camera.center);
        assert!((screen.x - 400.0).abs() < 0.001);
        assert!((screen.y - 300.0).abs() < 0.001);
    }

    #[test]
    fn test_isometric_axes() {
        let camera = camera();
        let east = camera.world_to_screen(WorldPos::new(1.0, 0.0));
        let south = camera.world_to_screen(WorldPos::new(0.0, 1.0));
        // +x goes right and down, +z goes left and down, half a tile each
        assert_eq!(east, Vec2::new(432.0, 316.0));
        assert_eq!(south, Vec2::new(368.0, 316.0));
    }

    #[test]
    fn test_zoom_toward_keeps_point_fixed() {
        let mut camera = camera();
        let screen = Vec2::new(200.0, 150.0);

        let before = camera.screen_to_world(screen);
        camera.zoom_toward(screen, 1.6);
        let after = camera.screen_to_world(screen);

        assert!(before.distance(after) < 0.001);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut camera = camera();
        camera.zoom_by(100.0);
        assert_eq!(camera.zoom, ViewConfig::default().max_zoom);
        camera.zoom_by(f32::NAN);
        assert_eq!(camera.zoom, ViewConfig::default().max_zoom);
    }

    #[test]
    fn test_pan_moves_ground_with_pointer() {
        let mut camera = camera();
        let anchor = WorldPos::new(2.0, 1.0);
        let before = camera.world_to_screen(anchor);
        camera.pan_screen(Vec2::new(30.0, -12.0));
        let after = camera.world_to_screen(anchor);
        assert!((after - before - Vec2::new(30.0, -12.0)).length() < 0.001);
    }

    #[test]
    fn test_follow_converges() {
        let mut camera = camera();
        camera.center_on(WorldPos::new(10.0, 4.0));
        for _ in 0..240 {
            camera.update(1.0 / 60.0);
        }
        assert_eq!(camera.center, WorldPos::new(10.0, 4.0));
        assert!(!camera.is_following());
    }

    #[test]
    fn test_orbit_target_projects_to_center() {
        let orbit = OrbitCamera::default();
        let viewport = Viewport::new(800, 600, 1.0);
        let screen = orbit.project(orbit.target, &viewport).unwrap();
        assert!((screen.x - 400.0).abs() < 0.01);
        assert!((screen.y - 300.0).abs() < 0.01);
    }

    #[test]
    fn test_orbit_pitch_clamped() {
        let mut orbit = OrbitCamera::default();
        orbit.orbit(0.0, 10.0);
        assert_eq!(orbit.pitch, MAX_PITCH);
        orbit.orbit(0.0, -10.0);
        assert_eq!(orbit.pitch, MIN_PITCH);
    }

    #[test]
    fn test_orbit_ground_pick_inverts_projection() {
        let orbit = OrbitCamera::default();
        let viewport = Viewport::new(800, 600, 1.0);
        let point = Vec3::new(3.0, 0.0, -2.0);
        let screen = orbit.project(point, &viewport).unwrap();
        let ground = orbit.ground_at(screen, &viewport).unwrap();
        assert!((ground.x - 3.0).abs() < 0.05);
        assert!((ground.z + 2.0).abs() < 0.05);
    }
}
