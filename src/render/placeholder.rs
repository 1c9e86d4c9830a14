//! Placeholder Visuals
//!
//! Shown while a sprite is still loading, when loading failed, or for
//! entities that never had art. A translucent box with a border, sized to
//! the collider, so layout problems are visible even without assets.

use macroquad::color::Color;

use crate::game::Entity;
use super::surface::Surface;
use super::{draw_debug_overlay, draw_highlight, entity_rect, RenderContext, Renderer};

pub const PLACEHOLDER_FILL: Color = Color::new(0.55, 0.6, 0.7, 0.35);
pub const PLACEHOLDER_BORDER: Color = Color::new(0.85, 0.88, 0.95, 1.0);

/// Draw the bordered placeholder box for `entity`
pub fn draw_placeholder(entity: &Entity, fill: Color, surface: &mut dyn Surface) {
    let rect = entity_rect(entity);
    surface.draw_rect(rect, fill);
    surface.draw_rect_lines(rect, 1.0, PLACEHOLDER_BORDER);
}

/// Renderer that only ever draws the placeholder box
#[derive(Debug, Clone)]
pub struct PlaceholderRenderer {
    fill: Color,
    debug: bool,
    initialized: bool,
}

impl PlaceholderRenderer {
    pub fn new() -> Self {
        Self::with_fill(PLACEHOLDER_FILL)
    }

    pub fn with_fill(fill: Color) -> Self {
        Self {
            fill,
            debug: false,
            initialized: false,
        }
    }
}

impl Default for PlaceholderRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlaceholderRenderer {
    fn initialize(&mut self, context: &RenderContext) {
        self.debug = context.debug;
        self.initialized = true;
    }

    fn render(&mut self, entity: &Entity, surface: &mut dyn Surface) {
        draw_placeholder(entity, self.fill, surface);
        draw_highlight(entity, surface);
        if self.debug {
            draw_debug_overlay(entity, surface);
        }
    }

    fn set_debug_mode(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    fn destroy(&mut self) {
        self.initialized = false;
    }
}
