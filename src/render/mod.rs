//! Entity Rendering
//!
//! Each entity that should be visible gets its own `Renderer`, registered in
//! the `RendererRegistry` under the entity's id. The world calls the
//! registry once per tick; renderers read entity state and draw it onto a
//! `Surface`. Renderers never touch physical state.
//!
//! Variants:
//! - `PlaceholderRenderer`: bordered box sized to the collider
//! - `SpriteRenderer`: one image, loaded in the background
//! - `AnimatedSpriteRenderer`: sprite sheet driven by a `CharacterAnimation`
//! - anything else implementing `Renderer` (custom per-type visuals)

pub mod assets;
pub mod surface;
pub mod registry;
pub mod placeholder;
pub mod sprite;
pub mod animated;
pub mod screen;

use std::cell::RefCell;
use std::rc::Rc;

use macroquad::color::Color;
use macroquad::math::Rect;

use crate::game::{Entity, Vector};

pub use assets::{AssetError, AssetLoader, DecodedImage, PendingImage, LoadState, TextureId, TextureStore};
pub use surface::{Surface, DrawCommand, RecordingSurface};
pub use registry::RendererRegistry;
pub use placeholder::PlaceholderRenderer;
pub use sprite::SpriteRenderer;
pub use animated::AnimatedSpriteRenderer;
pub use screen::ScreenSurface;

/// Size used for entities without a collider
pub const DEFAULT_VISUAL_SIZE: f64 = 16.0;

pub const DEBUG_COLOR: Color = Color::new(1.0, 0.2, 0.8, 1.0);
pub const HIGHLIGHT_COLOR: Color = Color::new(1.0, 0.85, 0.3, 1.0);

/// Shared services handed to renderers on initialization
#[derive(Clone, Default)]
pub struct RenderContext {
    pub loader: AssetLoader,
    pub textures: Rc<RefCell<TextureStore>>,
    pub debug: bool,
}

impl RenderContext {
    pub fn new(loader: AssetLoader) -> Self {
        Self {
            loader,
            textures: Rc::new(RefCell::new(TextureStore::new())),
            debug: false,
        }
    }
}

/// Per-entity visual adapter.
pub trait Renderer {
    /// Called once when registered. Start asset loads here.
    fn initialize(&mut self, context: &RenderContext);

    /// Draw `entity` in its current state
    fn render(&mut self, entity: &Entity, surface: &mut dyn Surface);

    /// Advance time-based visuals. Returns true when the visual changed and
    /// the world should redraw even if no entity moved.
    fn update(&mut self, _delta_time: f64) -> bool {
        false
    }

    fn set_debug_mode(&mut self, enabled: bool);

    /// Named gameplay event (e.g. "wave"). Returns true if the renderer
    /// reacted to it.
    fn handle_event(&mut self, _event: &str) -> bool {
        false
    }

    /// Release everything the renderer holds. Called before replacement or
    /// when the entity leaves the world.
    fn destroy(&mut self);
}

/// World-space rectangle covered by an entity's visual
pub fn entity_rect(entity: &Entity) -> Rect {
    let size = match entity.collider() {
        Some(c) => c.size,
        None => Vector::splat(DEFAULT_VISUAL_SIZE),
    };
    let center = match entity.collider() {
        Some(c) => entity.position() + c.offset,
        None => entity.position(),
    };
    let min = center - size * 0.5;
    Rect::new(min.x as f32, min.y as f32, size.x as f32, size.y as f32)
}

/// Hover outline drawn on top of any visual
pub fn draw_highlight(entity: &Entity, surface: &mut dyn Surface) {
    if entity.is_highlighted() {
        let r = entity_rect(entity);
        surface.draw_rect_lines(Rect::new(r.x - 1.0, r.y - 1.0, r.w + 2.0, r.h + 2.0), 2.0, HIGHLIGHT_COLOR);
    }
}

/// Collider outline and id label
pub fn draw_debug_overlay(entity: &Entity, surface: &mut dyn Surface) {
    if let Some(bounds) = entity.bounds() {
        let min = bounds.min();
        surface.draw_rect_lines(
            Rect::new(min.x as f32, min.y as f32, bounds.size.x as f32, bounds.size.y as f32),
            1.0,
            DEBUG_COLOR,
        );
    }
    let r = entity_rect(entity);
    surface.draw_text(entity.id().as_str(), r.x, r.y - 2.0, 10.0, DEBUG_COLOR);
}
