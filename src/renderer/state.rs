//! Shared render value types.

use glam::Vec2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Component-wise blend toward `other`.
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0) as u8,
            (self.g.clamp(0.0, 1.0) * 255.0) as u8,
            (self.b.clamp(0.0, 1.0) * 255.0) as u8,
            (self.a.clamp(0.0, 1.0) * 255.0) as u8,
        ]
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
}

/// Axis-aligned screen rectangle (top-left origin, y down).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn expand(&self, by: f32) -> Self {
        Self::new(self.x - by, self.y - by, self.width + by * 2.0, self.height + by * 2.0)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }
}

/// Host surface size in CSS-style pixels plus device pixel density.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_density: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, pixel_density: f32) -> Self {
        Self {
            width,
            height,
            pixel_density,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersection() {
        let view = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(view.intersects(&Rect::new(90.0, 90.0, 20.0, 20.0)));
        assert!(!view.intersects(&Rect::new(101.0, 0.0, 5.0, 5.0)));
        assert!(view.intersects(&Rect::new(101.0, 0.0, 5.0, 5.0).expand(2.0)));
    }

    #[test]
    fn test_color_blend_and_bytes() {
        let grey = Color::BLACK.lerp(Color::WHITE, 0.5);
        assert_eq!(grey.to_rgba8(), [127, 127, 127, 255]);
        assert_eq!(Color::WHITE.lerp(Color::BLACK, 4.0), Color::BLACK);
        assert_eq!(Color::rgb(2.0, -1.0, 0.5).with_alpha(0.0).to_rgba8(), [255, 0, 127, 0]);
    }

    #[test]
    fn test_empty_viewport() {
        assert!(Viewport::new(0, 50, 1.0).is_empty());
        assert!(!Viewport::new(10, 50, 1.0).is_empty());
        assert_eq!(Viewport::new(10, 50, 1.0).bounds(), Rect::new(0.0, 0.0, 10.0, 50.0));
    }
}
