//! Drawing surface contract and the recording implementation.
//!
//! Backends never talk to a platform canvas directly; they draw into a
//! `DrawSurface`. `DisplayList` records the calls so hosts can replay them
//! and tests can inspect exactly what a frame produced.

use glam::Vec2;

use super::raster::TerrainRaster;
use super::sprites::SpriteKey;
use super::state::{Color, Rect};

pub trait DrawSurface {
    /// Push transient state (alpha, clip).
    fn save(&mut self);
    /// Pop transient state pushed by the matching `save`.
    fn restore(&mut self);
    fn set_alpha(&mut self, alpha: f32);
    fn clip(&mut self, rect: Rect);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    /// Isometric tile footprint.
    fn fill_diamond(&mut self, center: Vec2, half_width: f32, half_height: f32, color: Color);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn stroke_ellipse(&mut self, center: Vec2, radius_x: f32, radius_y: f32, width: f32, color: Color);
    fn draw_sprite(&mut self, sprite: SpriteKey, dest: Rect);
    fn draw_text(&mut self, text: &str, position: Vec2, size: f32, color: Color);
    fn blit_raster(&mut self, raster: &TerrainRaster, dest: Rect);
}

/// Run `draw` between a save and its restore. The restore happens on every
/// return path out of `draw`, including early "nothing to draw" returns.
pub fn with_saved_state<R>(
    surface: &mut dyn DrawSurface,
    draw: impl FnOnce(&mut dyn DrawSurface) -> R,
) -> R {
    surface.save();
    let result = draw(surface);
    surface.restore();
    result
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Save,
    Restore,
    SetAlpha(f32),
    Clip(Rect),
    FillRect {
        rect: Rect,
        color: Color,
    },
    FillDiamond {
        center: Vec2,
        half_width: f32,
        half_height: f32,
        color: Color,
    },
    FillCircle {
        center: Vec2,
        radius: f32,
        color: Color,
    },
    StrokeEllipse {
        center: Vec2,
        radius_x: f32,
        radius_y: f32,
        width: f32,
        color: Color,
    },
    Sprite {
        sprite: SpriteKey,
        dest: Rect,
    },
    Text {
        text: String,
        position: Vec2,
        size: f32,
        color: Color,
    },
    Blit {
        dest: Rect,
        revision: u64,
    },
}

/// Recording surface; one frame's worth of draw calls.
#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
    depth: usize,
    max_depth: usize,
    unbalanced_restores: usize,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.depth = 0;
        self.max_depth = 0;
        self.unbalanced_restores = 0;
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Saves not yet restored.
    pub fn save_depth(&self) -> usize {
        self.depth
    }

    pub fn max_save_depth(&self) -> usize {
        self.max_depth
    }

    /// Restores issued with no matching save.
    pub fn unbalanced_restores(&self) -> usize {
        self.unbalanced_restores
    }

    pub fn count(&self, pred: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }

    /// Sprites in the order they were drawn.
    pub fn sprites(&self) -> Vec<(SpriteKey, Rect)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Sprite { sprite, dest } => Some((*sprite, *dest)),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for DisplayList {
    fn save(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        if self.depth == 0 {
            self.unbalanced_restores += 1;
        } else {
            self.depth -= 1;
        }
        self.commands.push(DrawCommand::Restore);
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::SetAlpha(alpha.clamp(0.0, 1.0)));
    }

    fn clip(&mut self, rect: Rect) {
        self.commands.push(DrawCommand::Clip(rect));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn fill_diamond(&mut self, center: Vec2, half_width: f32, half_height: f32, color: Color) {
        self.commands.push(DrawCommand::FillDiamond {
            center,
            half_width,
            half_height,
            color,
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::FillCircle { center, radius, color });
    }

    fn stroke_ellipse(&mut self, center: Vec2, radius_x: f32, radius_y: f32, width: f32, color: Color) {
        self.commands.push(DrawCommand::StrokeEllipse {
            center,
            radius_x,
            radius_y,
            width,
            color,
        });
    }

    fn draw_sprite(&mut self, sprite: SpriteKey, dest: Rect) {
        self.commands.push(DrawCommand::Sprite { sprite, dest });
    }

    fn draw_text(&mut self, text: &str, position: Vec2, size: f32, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_owned(),
            position,
            size,
            color,
        });
    }

    fn blit_raster(&mut self, raster: &TerrainRaster, dest: Rect) {
        self.commands.push(DrawCommand::Blit {
            dest,
            revision: raster.revision(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_state_restored_on_early_return() {
        let mut list = DisplayList::new();
        let drew = with_saved_state(&mut list, |surface| {
            surface.set_alpha(0.5);
            let nothing_to_draw = true;
            if nothing_to_draw {
                return false;
            }
            surface.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE);
            true
        });
        assert!(!drew);
        assert_eq!(list.save_depth(), 0);
        assert_eq!(list.max_save_depth(), 1);
        assert_eq!(list.commands().last(), Some(&DrawCommand::Restore));
    }

    #[test]
    fn test_unbalanced_restore_counted() {
        let mut list = DisplayList::new();
        list.restore();
        assert_eq!(list.unbalanced_restores(), 1);
        assert_eq!(list.save_depth(), 0);
    }
}
