//! Per-tick timing.
//!
//! One `FrameContext` is built at the start of every tick and threaded
//! immutably through Dynamics and Draw, so every stage sees the same time
//! even if camera or UI state changes mid-tick.

use crate::core::config::ViewConfig;
use crate::core::types::Season;
use crate::sim::snapshot::SimulationSnapshot;

use super::state::Viewport;

/// Clamped elapsed seconds between two millisecond timestamps.
///
/// Non-finite or negative gaps become 0; anything longer than `max_delta`
/// (a suspended tab, a debugger pause) is cut to `max_delta`.
pub fn compute_delta(now_ms: f64, last_ms: f64, max_delta: f32) -> f32 {
    let raw = (now_ms - last_ms) / 1000.0;
    if !raw.is_finite() || raw < 0.0 {
        return 0.0;
    }
    (raw as f32).min(max_delta)
}

/// Exponential moving average of the frame rate.
pub fn update_smoothed_fps(prev: f32, delta: f32, smoothing: f32) -> f32 {
    if delta <= 0.0 {
        return prev;
    }
    prev * smoothing + (1.0 / delta) * (1.0 - smoothing)
}

/// 0 at midnight, 1 at noon. Simulation time 0 is dawn.
pub fn daylight_factor(elapsed: f64, day_length_seconds: f32) -> f32 {
    let phase = (elapsed / day_length_seconds as f64 + 0.25).rem_euclid(1.0);
    (0.5 - 0.5 * (phase * std::f64::consts::TAU).cos()) as f32
}

/// Timing and lighting shared by every stage of one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    pub now_ms: f64,
    /// Clamped seconds since the previous tick
    pub delta: f32,
    /// Smoothed frames per second after this tick
    pub fps: f32,
    pub viewport: Viewport,
    /// Simulation seconds, taken from the snapshot
    pub sim_time: f64,
    pub daylight: f32,
    pub season: Season,
    pub frame: u64,
}

impl FrameContext {
    pub fn night(&self) -> f32 {
        1.0 - self.daylight
    }
}

#[derive(Clone, Debug)]
pub struct FrameClock {
    last_ms: Option<f64>,
    fps: f32,
    frame: u64,
    max_delta: f32,
    smoothing: f32,
    day_length: f32,
    season_length_days: u32,
}

impl FrameClock {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            last_ms: None,
            fps: 60.0,
            frame: 0,
            max_delta: config.max_delta,
            smoothing: config.fps_smoothing,
            day_length: config.day_length_seconds,
            season_length_days: config.season_length_days,
        }
    }

    /// Build the context for the tick starting at `now_ms`.
    pub fn tick(
        &mut self,
        now_ms: f64,
        snapshot: &SimulationSnapshot,
        viewport: Viewport,
    ) -> FrameContext {
        let last = self.last_ms.unwrap_or(now_ms);
        let delta = compute_delta(now_ms, last, self.max_delta);
        if now_ms.is_finite() {
            self.last_ms = Some(now_ms);
        }
        self.fps = update_smoothed_fps(self.fps, delta, self.smoothing);
        self.frame += 1;

        FrameContext {
            now_ms,
            delta,
            fps: self.fps,
            viewport,
            sim_time: snapshot.elapsed,
            daylight: daylight_factor(snapshot.elapsed, self.day_length),
            season: Season::from_day(snapshot.day, self.season_length_days),
            frame: self.frame,
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}
