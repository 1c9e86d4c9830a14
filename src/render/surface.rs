//! Presentation Surface
//!
//! The boundary between renderers and whatever actually puts pixels on
//! screen. Renderers draw in world units; the surface owns the camera
//! mapping and the GPU side of textures.

use macroquad::color::Color;
use macroquad::math::Rect;
use super::assets::TextureId;

/// Drawing operations a renderer may issue.
pub trait Surface {
    /// Wipe the surface before a full redraw
    fn clear(&mut self, color: Color);

    /// Draw part (or all, with `source = None`) of a texture into `dest`
    fn draw_texture_region(&mut self, texture: TextureId, dest: Rect, source: Option<Rect>, flip_x: bool);

    fn draw_rect(&mut self, rect: Rect, color: Color);

    fn draw_rect_lines(&mut self, rect: Rect, thickness: f32, color: Color);

    /// Text anchored at its baseline-left corner
    fn draw_text(&mut self, text: &str, x: f32, y: f32, size: f32, color: Color);
}

/// One recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Texture {
        texture: TextureId,
        dest: Rect,
        source: Option<Rect>,
        flip_x: bool,
    },
    Rect(Rect, Color),
    RectLines(Rect, f32, Color),
    Text(String),
}

/// Surface that only records draw calls. Used by tests and by headless
/// runs where nothing needs to be shown.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_log(&mut self) {
        self.commands.clear();
    }

    pub fn count_clears(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, DrawCommand::Clear(_))).count()
    }

    pub fn textures(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().filter(|c| matches!(c, DrawCommand::Texture { .. }))
    }

    pub fn outlines(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().filter(|c| matches!(c, DrawCommand::RectLines(..)))
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn draw_texture_region(&mut self, texture: TextureId, dest: Rect, source: Option<Rect>, flip_x: bool) {
        self.commands.push(DrawCommand::Texture { texture, dest, source, flip_x });
    }

    fn draw_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::Rect(rect, color));
    }

    fn draw_rect_lines(&mut self, rect: Rect, thickness: f32, color: Color) {
        self.commands.push(DrawCommand::RectLines(rect, thickness, color));
    }

    fn draw_text(&mut self, text: &str, _x: f32, _y: f32, _size: f32, _color: Color) {
        self.commands.push(DrawCommand::Text(text.to_string()));
    }
}
