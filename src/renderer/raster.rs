//! Offscreen RGBA raster backing the terrain cache.

use glam::Vec2;
use image::{Rgba, RgbaImage};

use crate::core::error::{Result, ViewError};

use super::state::Color;

pub struct TerrainRaster {
    image: RgbaImage,
    /// Device pixels per layout pixel
    pixel_density: f32,
    revision: u64,
}

impl TerrainRaster {
    /// Allocate a raster covering `width` x `height` layout pixels.
    pub fn new(width: u32, height: u32, pixel_density: f32, max_pixels: u64) -> Result<Self> {
        let density = if pixel_density.is_finite() && pixel_density > 0.0 {
            pixel_density
        } else {
            1.0
        };
        let device_w = (width as f32 * density).ceil() as u32;
        let device_h = (height as f32 * density).ceil() as u32;
        if device_w == 0 || device_h == 0 {
            return Err(ViewError::InvalidViewport { width, height });
        }
        let pixels = device_w as u64 * device_h as u64;
        if pixels > max_pixels {
            return Err(ViewError::RasterUnavailable(format!(
                "{}x{} device pixels exceeds limit of {}",
                device_w, device_h, max_pixels
            )));
        }
        Ok(Self {
            image: RgbaImage::new(device_w, device_h),
            pixel_density: density,
            revision: 0,
        })
    }

    /// Drop the pixel storage. The raster stays usable but covers nothing
    /// until it is reallocated.
    pub fn release(&mut self) {
        self.image = RgbaImage::new(0, 0);
        self.revision += 1;
    }

    /// Size in layout pixels.
    pub fn layout_size(&self) -> Vec2 {
        Vec2::new(
            self.image.width() as f32 / self.pixel_density,
            self.image.height() as f32 / self.pixel_density,
        )
    }

    pub fn device_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn pixel_density(&self) -> f32 {
        self.pixel_density
    }

    /// Bumped on every rebuild so blits can be traced to a raster version.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn begin_rebuild(&mut self) {
        self.revision += 1;
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Fill an isometric diamond given in layout pixels.
    pub fn fill_diamond(&mut self, center: Vec2, half_width: f32, half_height: f32, color: Color) {
        let scale = self.pixel_density;
        let cx = center.x * scale;
        let cy = center.y * scale;
        let hw = half_width * scale;
        let hh = half_height * scale;
        if hw <= 0.0 || hh <= 0.0 {
            return;
        }

        let (width, height) = self.image.dimensions();
        let rgba = Rgba(color.to_rgba8());
        let y_start = (cy - hh).ceil().max(0.0) as u32;
        let y_end = (cy + hh).floor().min(height as f32 - 1.0);
        if y_end < 0.0 {
            return;
        }
        for y in y_start..=(y_end as u32) {
            let row_half = hw * (1.0 - ((y as f32 - cy).abs() / hh));
            let x_start = (cx - row_half).ceil().max(0.0) as u32;
            let x_end = (cx + row_half).floor().min(width as f32 - 1.0);
            if x_end < 0.0 {
                continue;
            }
            for x in x_start..=(x_end as u32) {
                self.image.put_pixel(x, y, rgba);
            }
        }
    }

    /// Pixel at layout coordinates, if inside the raster.
    pub fn sample(&self, layout: Vec2) -> Option<[u8; 4]> {
        let x = (layout.x * self.pixel_density).floor();
        let y = (layout.y * self.pixel_density).floor();
        if x < 0.0 || y < 0.0 {
            return None;
        }
        self.image
            .get_pixel_checked(x as u32, y as u32)
            .map(|p| p.0)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_limits() {
        assert!(TerrainRaster::new(100, 100, 2.0, 40_000).is_ok());
        assert!(matches!(
            TerrainRaster::new(100, 100, 2.0, 39_999),
            Err(ViewError::RasterUnavailable(_))
        ));
        assert!(matches!(
            TerrainRaster::new(0, 100, 1.0, u64::MAX),
            Err(ViewError::InvalidViewport { .. })
        ));
    }

    #[test]
    fn test_fill_diamond_covers_center_not_corner() {
        let mut raster = TerrainRaster::new(64, 32, 1.0, u64::MAX).unwrap();
        raster.begin_rebuild();
        let green = Color::rgb(0.0, 1.0, 0.0);
        raster.fill_diamond(Vec2::new(32.0, 16.0), 32.0, 16.0, green);
        assert_eq!(raster.sample(Vec2::new(32.0, 16.0)), Some([0, 255, 0, 255]));
        assert_eq!(raster.sample(Vec2::new(1.0, 1.0)), Some([0, 0, 0, 0]));
        assert_eq!(raster.sample(Vec2::new(80.0, 1.0)), None);
    }

    #[test]
    fn test_diamond_fully_offscreen_is_ignored() {
        let mut raster = TerrainRaster::new(16, 16, 1.0, u64::MAX).unwrap();
        raster.fill_diamond(Vec2::new(-100.0, -100.0), 8.0, 4.0, Color::WHITE);
        raster.fill_diamond(Vec2::new(100.0, 100.0), 8.0, 4.0, Color::WHITE);
        assert!(raster.image().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_rebuild_bumps_revision_and_clears() {
        let mut raster = TerrainRaster::new(8, 8, 1.0, u64::MAX).unwrap();
        raster.fill_diamond(Vec2::new(4.0, 4.0), 4.0, 4.0, Color::WHITE);
        raster.begin_rebuild();
        assert_eq!(raster.revision(), 1);
        assert!(raster.image().pixels().all(|p| p.0[3] == 0));
    }
}
