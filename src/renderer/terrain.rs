//! Cached terrain layer.
//!
//! The ground under the visible footprint is rasterised once into a
//! `TerrainRaster` and blitted every frame. A rebuild happens only when the
//! cheap checks in `refresh_reason` say the cached pixels could be stale.
//! Missing a needed rebuild is a correctness bug; an extra rebuild only
//! costs time, so every check errs toward rebuilding.

use ahash::AHashSet;
use glam::Vec2;

use crate::core::config::ViewConfig;
use crate::core::error::{Result, ViewError};
use crate::core::types::WorldPos;
use crate::sim::snapshot::{SimulationSnapshot, Structure};

use super::camera::IsoCamera;
use super::raster::TerrainRaster;
use super::state::{Color, Rect, Viewport};
use super::surface::DrawSurface;

/// Extra raster border, in tiles, so small camera moves can be absorbed by
/// shifting the blit.
const RASTER_MARGIN_TILES: f32 = 1.0;

/// Tiles beyond the world radius that still get ground drawn.
const RADIUS_SLACK: f32 = 3.0;

const FNV_OFFSET: u32 = 2_166_136_261;
const HASH_MULTIPLIER: u32 = 33;

/// Inclusive rectangle of world tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TileBounds {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl TileBounds {
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    pub fn tile_count(&self) -> usize {
        let w = (self.max_x - self.min_x + 1).max(0) as usize;
        let h = (self.max_z - self.min_z + 1).max(0) as usize;
        w * h
    }
}

/// World-tile rectangle covering the viewport's ground footprint.
pub fn compute_world_bounds(camera: &IsoCamera, padding: i32) -> TileBounds {
    let corners = camera.visible_corners();
    let mut min_x = f32::MAX;
    let mut min_z = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_z = f32::MIN;
    for corner in corners {
        min_x = min_x.min(corner.x);
        min_z = min_z.min(corner.z);
        max_x = max_x.max(corner.x);
        max_z = max_z.max(corner.z);
    }
    TileBounds {
        min_x: min_x.floor() as i32 - padding,
        min_z: min_z.floor() as i32 - padding,
        max_x: max_x.ceil() as i32 + padding,
        max_z: max_z.ceil() as i32 + padding,
    }
}

fn mix(hash: u32, value: u32) -> u32 {
    (hash ^ value).wrapping_mul(HASH_MULTIPLIER)
}

/// Order-independent fingerprint of structure positions and types.
///
/// Format is `"<count>:<hex>"`; the count separates lists of different
/// sizes that happen to hash alike.
pub fn build_terrain_signature(structures: &[Structure]) -> String {
    let mut keys: Vec<(i32, i32, &'static str)> = structures
        .iter()
        .map(|s| {
            let (x, z) = s.position.rounded();
            (x, z, s.kind.as_str())
        })
        .collect();
    keys.sort_unstable();

    let mut hash = FNV_OFFSET;
    for (x, z, kind) in &keys {
        hash = mix(hash, *x as u32);
        hash = mix(hash, *z as u32);
        for ch in kind.chars() {
            hash = mix(hash, ch as u32);
        }
    }
    format!("{}:{:x}", keys.len(), hash)
}

/// Everything the last rebuild was based on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainCacheState {
    pub valid: bool,
    pub center: WorldPos,
    pub zoom: f32,
    pub bounds: TileBounds,
    pub signature: String,
    pub world_radius: i32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub pixel_density: f32,
}

/// The values a tick would rebuild with.
#[derive(Clone, Debug)]
pub struct TerrainInputs<'a> {
    pub center: WorldPos,
    pub zoom: f32,
    pub bounds: TileBounds,
    pub signature: &'a str,
    pub world_radius: i32,
    pub viewport: Viewport,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshReason {
    NeverBuilt,
    ViewportResized,
    PixelDensityChanged,
    CameraMoved,
    ZoomChanged,
    BoundsChanged,
    WorldRadiusChanged,
    StructuresChanged,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefreshTolerance {
    pub center: f32,
    pub zoom: f32,
}

impl RefreshTolerance {
    pub fn from_config(config: &ViewConfig) -> Self {
        Self {
            center: config.terrain_center_tolerance,
            zoom: config.terrain_zoom_tolerance,
        }
    }
}

/// First reason the cached raster can't be reused, if any.
pub fn refresh_reason(
    state: &TerrainCacheState,
    next: &TerrainInputs<'_>,
    tolerance: RefreshTolerance,
) -> Option<RefreshReason> {
    if !state.valid {
        return Some(RefreshReason::NeverBuilt);
    }
    if state.viewport_width != next.viewport.width || state.viewport_height != next.viewport.height {
        return Some(RefreshReason::ViewportResized);
    }
    if state.pixel_density != next.viewport.pixel_density {
        return Some(RefreshReason::PixelDensityChanged);
    }
    // NaN distances must rebuild too, hence the negated comparison
    if !(state.center.distance(next.center) <= tolerance.center) {
        return Some(RefreshReason::CameraMoved);
    }
    if !((state.zoom - next.zoom).abs() <= tolerance.zoom) {
        return Some(RefreshReason::ZoomChanged);
    }
    if state.bounds != next.bounds {
        return Some(RefreshReason::BoundsChanged);
    }
    if state.world_radius != next.world_radius {
        return Some(RefreshReason::WorldRadiusChanged);
    }
    if state.signature != next.signature {
        return Some(RefreshReason::StructuresChanged);
    }
    None
}

pub fn should_refresh_terrain_cache(
    state: &TerrainCacheState,
    next: &TerrainInputs<'_>,
    tolerance: RefreshTolerance,
) -> bool {
    refresh_reason(state, next, tolerance).is_some()
}

/// Every tile occupied by a structure.
pub fn structure_tiles(structures: &[Structure]) -> AHashSet<(i32, i32)> {
    structures.iter().map(|s| s.position.rounded()).collect()
}

/// Greedy path connector.
///
/// Each structure walks to its Manhattan-nearest other structure (first
/// found wins ties), stepping along x fully and then along z. Every tile
/// stepped onto is recorded in visit order, the destination included; the
/// starting tile is not visited. Nothing is deduplicated: two structures
/// that are each other's nearest lay the same path twice.
pub fn path_tiles(structures: &[Structure]) -> Vec<(i32, i32)> {
    let tiles: Vec<(i32, i32)> = structures.iter().map(|s| s.position.rounded()).collect();
    let mut path = Vec::new();

    for (i, &(ax, az)) in tiles.iter().enumerate() {
        let mut nearest: Option<((i32, i32), i32)> = None;
        for (j, &(bx, bz)) in tiles.iter().enumerate() {
            if i == j {
                continue;
            }
            let distance = (ax - bx).abs() + (az - bz).abs();
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some(((bx, bz), distance));
            }
        }
        let Some(((bx, bz), _)) = nearest else {
            continue;
        };

        let (mut x, mut z) = (ax, az);
        while x != bx {
            x += (bx - x).signum();
            path.push((x, z));
        }
        while z != bz {
            z += (bz - z).signum();
            path.push((x, z));
        }
    }
    path
}

/// Deterministic per-tile noise; the same coordinates always give the same
/// value, independent of frame or rebuild order.
pub fn tile_noise(x: i32, z: i32) -> u32 {
    let mut h = (x as u32).wrapping_mul(374_761_393) ^ (z as u32).wrapping_mul(668_265_263);
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^ (h >> 16)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerrainClass {
    Grass,
    Dirt,
    Path,
}

impl TerrainClass {
    fn base_color(&self) -> Color {
        match self {
            TerrainClass::Grass => Color::rgb(0.42, 0.62, 0.30),
            TerrainClass::Dirt => Color::rgb(0.55, 0.44, 0.30),
            TerrainClass::Path => Color::rgb(0.70, 0.62, 0.46),
        }
    }

    /// Colour for one of `variants` visual variants.
    pub fn color(&self, variant: u32, variants: u32) -> Color {
        let shade = if variants <= 1 {
            0.0
        } else {
            variant as f32 / (variants - 1) as f32
        };
        self.base_color().lerp(Color::BLACK, 0.12 * shade)
    }
}

/// Path beats dirt beats grass.
pub fn classify_tile(
    tile: (i32, i32),
    paths: &AHashSet<(i32, i32)>,
    occupied: &AHashSet<(i32, i32)>,
) -> TerrainClass {
    if paths.contains(&tile) {
        TerrainClass::Path
    } else if occupied.contains(&tile) {
        TerrainClass::Dirt
    } else {
        TerrainClass::Grass
    }
}

/// One ground tile as drawn by the last rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainTile {
    pub x: i32,
    pub z: i32,
    pub class: TerrainClass,
    pub variant: u32,
}

/// Classify every tile in `bounds` that lies within the world radius.
pub fn layout_tiles(
    bounds: TileBounds,
    world_radius: i32,
    structures: &[Structure],
    variants: u32,
) -> Vec<TerrainTile> {
    let occupied = structure_tiles(structures);
    let paths: AHashSet<(i32, i32)> = path_tiles(structures).into_iter().collect();
    let limit = world_radius.max(0) as f32 + RADIUS_SLACK;
    let variants = variants.max(1);

    let mut tiles = Vec::with_capacity(bounds.tile_count());
    for z in bounds.min_z..=bounds.max_z {
        for x in bounds.min_x..=bounds.max_x {
            let distance = ((x * x + z * z) as f32).sqrt();
            if distance > limit {
                continue;
            }
            tiles.push(TerrainTile {
                x,
                z,
                class: classify_tile((x, z), &paths, &occupied),
                variant: tile_noise(x, z) % variants,
            });
        }
    }
    tiles
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TerrainStats {
    pub rebuilds: u64,
    pub reuses: u64,
    pub tiles_drawn: usize,
}

/// Owns the terrain raster and decides when to rebuild it.
pub struct TerrainCache {
    state: TerrainCacheState,
    raster: TerrainRaster,
    tolerance: RefreshTolerance,
    padding: i32,
    variants: u32,
    margin: f32,
    max_raster_pixels: u64,
    stats: TerrainStats,
}

impl TerrainCache {
    /// Allocates the raster; fails when the host can't back it.
    pub fn new(config: &ViewConfig, viewport: Viewport) -> Result<Self> {
        let margin = config.tile_width * RASTER_MARGIN_TILES;
        let raster = Self::allocate(viewport, margin, config.max_raster_pixels)?;
        Ok(Self {
            state: TerrainCacheState::default(),
            raster,
            tolerance: RefreshTolerance::from_config(config),
            padding: config.terrain_padding,
            variants: config.terrain_variants,
            margin,
            max_raster_pixels: config.max_raster_pixels,
            stats: TerrainStats::default(),
        })
    }

    fn allocate(viewport: Viewport, margin: f32, max_pixels: u64) -> Result<TerrainRaster> {
        if viewport.is_empty() {
            return Err(ViewError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        let pad = (margin * 2.0).ceil() as u32;
        TerrainRaster::new(
            viewport.width + pad,
            viewport.height + pad,
            viewport.pixel_density,
            max_pixels,
        )
    }

    /// Reallocate for a new viewport. On failure the old raster is kept
    /// and the cache is invalidated so the next tick rebuilds.
    pub fn resize(&mut self, viewport: Viewport) -> Result<()> {
        self.state.valid = false;
        self.raster = Self::allocate(viewport, self.margin, self.max_raster_pixels)?;
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.state.valid = false;
    }

    /// Free the raster's pixels; the next successful resize reallocates.
    pub fn release(&mut self) {
        self.state.valid = false;
        self.raster.release();
    }

    pub fn state(&self) -> &TerrainCacheState {
        &self.state
    }

    pub fn stats(&self) -> TerrainStats {
        self.stats
    }

    pub fn raster(&self) -> &TerrainRaster {
        &self.raster
    }

    /// Bring the raster up to date for this tick. Returns the reason when
    /// a rebuild happened.
    pub fn prepare(
        &mut self,
        camera: &IsoCamera,
        snapshot: &SimulationSnapshot,
    ) -> Option<RefreshReason> {
        let structures = snapshot.structures();
        let signature = build_terrain_signature(&structures);
        let bounds = compute_world_bounds(camera, self.padding);
        let inputs = TerrainInputs {
            center: camera.center,
            zoom: camera.zoom,
            bounds,
            signature: &signature,
            world_radius: snapshot.world_radius,
            viewport: camera.viewport,
        };

        let reason = refresh_reason(&self.state, &inputs, self.tolerance);
        match reason {
            Some(reason) => {
                self.rebuild(camera, bounds, snapshot.world_radius, &structures);
                self.state = TerrainCacheState {
                    valid: true,
                    center: camera.center,
                    zoom: camera.zoom,
                    bounds,
                    signature,
                    world_radius: snapshot.world_radius,
                    viewport_width: camera.viewport.width,
                    viewport_height: camera.viewport.height,
                    pixel_density: camera.viewport.pixel_density,
                };
                self.stats.rebuilds += 1;
                tracing::debug!(
                    ?reason,
                    tiles = self.stats.tiles_drawn,
                    revision = self.raster.revision(),
                    "Rebuilt terrain raster"
                );
            }
            None => self.stats.reuses += 1,
        }
        reason
    }

    fn rebuild(
        &mut self,
        camera: &IsoCamera,
        bounds: TileBounds,
        world_radius: i32,
        structures: &[Structure],
    ) {
        self.raster.begin_rebuild();
        let half = camera.half_tile();
        let offset = Vec2::splat(self.margin);
        let size = self.raster.layout_size();
        let extent = Rect::new(0.0, 0.0, size.x, size.y).expand(half.x.max(half.y));

        let tiles = layout_tiles(bounds, world_radius, structures, self.variants);
        let mut drawn = 0;
        for tile in &tiles {
            let center = camera.world_to_screen(WorldPos::new(tile.x as f32, tile.z as f32)) + offset;
            if center.x < extent.x
                || center.x > extent.right()
                || center.y < extent.y
                || center.y > extent.bottom()
            {
                continue;
            }
            let color = tile.class.color(tile.variant, self.variants);
            self.raster.fill_diamond(center, half.x, half.y, color);
            drawn += 1;
        }
        self.stats.tiles_drawn = drawn;
    }

    /// Draw the cached raster, shifted by however far the camera moved
    /// since the rebuild.
    pub fn blit(&self, surface: &mut dyn DrawSurface, camera: &IsoCamera) {
        if !self.state.valid {
            return;
        }
        let anchor = camera.world_to_screen(self.state.center);
        let shift = anchor - camera.viewport.size() * 0.5;
        let size = self.raster.layout_size();
        let dest = Rect::new(shift.x - self.margin, shift.y - self.margin, size.x, size.y);
        surface.blit_raster(&self.raster, dest);
    }
}
