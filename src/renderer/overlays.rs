//! Screen-space passes drawn around the entity list: background wash,
//! placement preview, hover/selection rings and the day/season tints.

use glam::Vec2;

use crate::core::types::{Season, WorldPos};

use super::camera::IsoCamera;
use super::clock::FrameContext;
use super::compositor::InteractiveEntity;
use super::state::{Color, Viewport};
use super::surface::{with_saved_state, DrawSurface};

const PULSE_HZ: f32 = 1.2;
const RING_WIDTH: f32 = 2.0;
const NIGHT_TINT_MAX_ALPHA: f32 = 0.45;

const DAY_WASH: Color = Color::rgb(0.56, 0.7, 0.48);
const NIGHT_WASH: Color = Color::rgb(0.08, 0.1, 0.18);
const NIGHT_TINT: Color = Color::rgb(0.04, 0.06, 0.2);
const PREVIEW_FILL: Color = Color::rgba(0.45, 0.85, 1.0, 0.35);
const PREVIEW_EDGE: Color = Color::rgba(0.45, 0.85, 1.0, 0.9);
pub const HOVER_RING: Color = Color::rgba(1.0, 1.0, 1.0, 0.7);
pub const SELECTED_RING: Color = Color::rgba(1.0, 0.85, 0.2, 0.95);

/// Ring growth in pixels at wall time `seconds`, between 0 and `amplitude`.
pub fn pulse_offset(seconds: f64, amplitude: f32) -> f32 {
    let phase = (seconds * (PULSE_HZ * std::f32::consts::TAU) as f64).sin() as f32;
    amplitude * (0.5 + 0.5 * phase)
}

pub fn season_tint(season: Season) -> Color {
    match season {
        Season::Spring => Color::rgba(0.6, 1.0, 0.6, 0.04),
        Season::Summer => Color::rgba(1.0, 0.9, 0.5, 0.05),
        Season::Autumn => Color::rgba(1.0, 0.55, 0.2, 0.08),
        Season::Winter => Color::rgba(0.85, 0.92, 1.0, 0.12),
    }
}

pub fn draw_background(surface: &mut dyn DrawSurface, viewport: &Viewport, daylight: f32) {
    surface.fill_rect(viewport.bounds(), NIGHT_WASH.lerp(DAY_WASH, daylight));
}

/// Ghost tile under the placement cursor.
pub fn draw_preview(surface: &mut dyn DrawSurface, camera: &IsoCamera, tile: Option<(i32, i32)>) {
    let Some((x, z)) = tile else {
        return;
    };
    let center = camera.world_to_screen(WorldPos::new(x as f32, z as f32));
    let half = camera.half_tile();
    surface.fill_diamond(center, half.x, half.y, PREVIEW_FILL);
    surface.stroke_ellipse(center, half.x, half.y, RING_WIDTH, PREVIEW_EDGE);
}

/// Pulsing ellipse at the foot of a hit box.
pub fn draw_ring(surface: &mut dyn DrawSurface, target: Option<&InteractiveEntity>, pulse: f32, color: Color) {
    with_saved_state(surface, |surface| {
        let Some(hit) = target else {
            return;
        };
        let radius_x = hit.half_width + pulse;
        let center = Vec2::new(hit.center_x, hit.center_y + hit.half_height);
        surface.set_alpha(color.a);
        surface.stroke_ellipse(center, radius_x, radius_x * 0.5, RING_WIDTH, color.with_alpha(1.0));
    });
}

/// Night darkening then the season wash, over the whole viewport.
pub fn draw_tints(surface: &mut dyn DrawSurface, ctx: &FrameContext) {
    let bounds = ctx.viewport.bounds();
    let night = ctx.night();
    if night > 0.0 {
        surface.fill_rect(bounds, NIGHT_TINT.with_alpha(night * NIGHT_TINT_MAX_ALPHA));
    }
    surface.fill_rect(bounds, season_tint(ctx.season));
}
