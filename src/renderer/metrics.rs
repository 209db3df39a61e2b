//! Frame timing and per-stage counters for the debug overlay.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

const WINDOW: usize = 120;

/// Point-in-time copy of the metrics, returned by `debug_stats()`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DebugStats {
    pub frame: u64,
    pub fps: f32,
    pub avg_frame_time_ms: f32,
    pub last_frame_time_ms: f32,
    pub max_frame_time_ms: f32,
    pub drawables: usize,
    pub interactives: usize,
    pub culled: usize,
    pub terrain_rebuilds: u64,
    pub terrain_reuses: u64,
    pub terrain_tiles: usize,
    pub particles: usize,
    pub floating_texts: usize,
    pub particle_quality: f32,
}

/// Tracks render performance over a rolling window of frames.
pub struct RenderMetrics {
    frame_times: VecDeque<Duration>,
    frame_start: Option<Instant>,
    pub frame: u64,
    /// Smoothed fps from the frame clock
    pub fps: f32,
    pub drawables: usize,
    pub interactives: usize,
    pub culled: usize,
    pub terrain_rebuilds: u64,
    pub terrain_reuses: u64,
    pub terrain_tiles: usize,
    pub particles: usize,
    pub floating_texts: usize,
    pub particle_quality: f32,
}

impl Default for RenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderMetrics {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(WINDOW),
            frame_start: None,
            frame: 0,
            fps: 0.0,
            drawables: 0,
            interactives: 0,
            culled: 0,
            terrain_rebuilds: 0,
            terrain_reuses: 0,
            terrain_tiles: 0,
            particles: 0,
            floating_texts: 0,
            particle_quality: 1.0,
        }
    }

    /// Call at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.frame_start = Some(Instant::now());
        self.frame += 1;
    }

    /// Call at the end of each frame. Without a matching `begin_frame` this
    /// does nothing.
    pub fn end_frame(&mut self) {
        if let Some(start) = self.frame_start.take() {
            self.record_frame_time(start.elapsed());
        }
    }

    pub fn record_frame_time(&mut self, elapsed: Duration) {
        self.frame_times.push_back(elapsed);
        if self.frame_times.len() > WINDOW {
            self.frame_times.pop_front();
        }
    }

    /// Average frame time in milliseconds over the window.
    pub fn avg_frame_time_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let sum: Duration = self.frame_times.iter().sum();
        sum.as_secs_f32() * 1000.0 / self.frame_times.len() as f32
    }

    pub fn max_frame_time_ms(&self) -> f32 {
        self.frame_times
            .iter()
            .max()
            .map(|d| d.as_secs_f32() * 1000.0)
            .unwrap_or(0.0)
    }

    pub fn last_frame_time_ms(&self) -> f32 {
        self.frame_times
            .back()
            .map(|d| d.as_secs_f32() * 1000.0)
            .unwrap_or(0.0)
    }

    pub fn stats(&self) -> DebugStats {
        DebugStats {
            frame: self.frame,
            fps: self.fps,
            avg_frame_time_ms: self.avg_frame_time_ms(),
            last_frame_time_ms: self.last_frame_time_ms(),
            max_frame_time_ms: self.max_frame_time_ms(),
            drawables: self.drawables,
            interactives: self.interactives,
            culled: self.culled,
            terrain_rebuilds: self.terrain_rebuilds,
            terrain_reuses: self.terrain_reuses,
            terrain_tiles: self.terrain_tiles,
            particles: self.particles,
            floating_texts: self.floating_texts,
            particle_quality: self.particle_quality,
        }
    }
}
