//! Sprite Renderer
//!
//! Draws one image stretched over the entity's collider. The image loads in
//! the background; until it arrives (or if it never does) the placeholder
//! box is drawn instead. Loading never blocks the tick.

use std::path::PathBuf;

use macroquad::color::Color;
use tracing::{debug, warn};

use crate::game::Entity;
use super::assets::{LoadState, PendingImage, TextureId};
use super::placeholder::{draw_placeholder, PLACEHOLDER_FILL};
use super::surface::Surface;
use super::{draw_debug_overlay, draw_highlight, entity_rect, RenderContext, Renderer};

/// Lifecycle of one texture owned by a renderer
#[derive(Default)]
pub(crate) enum ImageSlot {
    #[default]
    Unloaded,
    Loading(PendingImage),
    Ready {
        texture: TextureId,
        width: u32,
        height: u32,
    },
    /// Load failed; the placeholder stays for good
    Failed,
}

impl ImageSlot {
    /// Poll a pending load. Returns true when the slot changed state.
    pub(crate) fn poll(&mut self, context: Option<&RenderContext>) -> bool {
        let ImageSlot::Loading(pending) = self else {
            return false;
        };
        // Without a store the image has nowhere to go; keep it queued
        let Some(ctx) = context else {
            return false;
        };
        match pending.poll() {
            LoadState::Pending => false,
            LoadState::Ready(image) => {
                debug!("Loaded sprite {} ({}x{})", pending.path().display(), image.width, image.height);
                let (width, height) = (image.width, image.height);
                let texture = ctx.textures.borrow_mut().insert(image);
                *self = ImageSlot::Ready { texture, width, height };
                true
            }
            LoadState::Failed(e) => {
                warn!("Failed to load sprite {}: {}, using placeholder", pending.path().display(), e);
                *self = ImageSlot::Failed;
                true
            }
        }
    }

    pub(crate) fn texture(&self) -> Option<TextureId> {
        match self {
            ImageSlot::Ready { texture, .. } => Some(*texture),
            _ => None,
        }
    }

    /// Pixel size of the loaded image
    pub(crate) fn size(&self) -> Option<(u32, u32)> {
        match self {
            ImageSlot::Ready { width, height, .. } => Some((*width, *height)),
            _ => None,
        }
    }

    pub(crate) fn is_loading(&self) -> bool {
        matches!(self, ImageSlot::Loading(_))
    }

    /// Drop the texture from the shared store
    pub(crate) fn release(&mut self, context: Option<&RenderContext>) {
        if let (ImageSlot::Ready { texture, .. }, Some(ctx)) = (&*self, context) {
            ctx.textures.borrow_mut().remove(*texture);
        }
        *self = ImageSlot::Unloaded;
    }
}

/// Where a sprite's pixels come from
pub enum SpriteSource {
    /// Path relative to the loader's asset root
    Path(PathBuf),
    /// Handle to a load that was started elsewhere
    Pending(PendingImage),
}

pub struct SpriteRenderer {
    source: Option<SpriteSource>,
    slot: ImageSlot,
    context: Option<RenderContext>,
    placeholder_fill: Color,
    debug: bool,
}

impl SpriteRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::from_source(SpriteSource::Path(path.into()))
    }

    pub fn from_source(source: SpriteSource) -> Self {
        Self {
            source: Some(source),
            slot: ImageSlot::Unloaded,
            context: None,
            placeholder_fill: PLACEHOLDER_FILL,
            debug: false,
        }
    }

    pub fn with_placeholder_fill(mut self, fill: Color) -> Self {
        self.placeholder_fill = fill;
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.texture().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.slot.is_loading()
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.slot.texture()
    }
}

impl Renderer for SpriteRenderer {
    fn initialize(&mut self, context: &RenderContext) {
        self.debug = context.debug;
        self.context = Some(context.clone());
        // A second initialize must not start a second load
        if let Some(source) = self.source.take() {
            let pending = match source {
                SpriteSource::Path(path) => context.loader.load_image(path),
                SpriteSource::Pending(pending) => pending,
            };
            self.slot = ImageSlot::Loading(pending);
        }
    }

    fn render(&mut self, entity: &Entity, surface: &mut dyn Surface) {
        match self.slot.texture() {
            Some(texture) => surface.draw_texture_region(texture, entity_rect(entity), None, false),
            None => draw_placeholder(entity, self.placeholder_fill, surface),
        }
        draw_highlight(entity, surface);
        if self.debug {
            draw_debug_overlay(entity, surface);
        }
    }

    fn update(&mut self, _delta_time: f64) -> bool {
        let context = self.context.clone();
        self.slot.poll(context.as_ref())
    }

    fn set_debug_mode(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    fn destroy(&mut self) {
        let context = self.context.take();
        self.slot.release(context.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Vector;
    use crate::render::{AssetLoader, DecodedImage, DrawCommand, RecordingSurface};

    fn cow() -> Entity {
        Entity::new_dynamic("cow", Vector::new(8.0, 8.0), 1.0).with_size(Vector::new(16.0, 16.0))
    }

    #[test]
    fn test_poll_without_context_keeps_image() {
        let ctx = RenderContext::default();
        let pending = AssetLoader::default().ready("cow.png", DecodedImage::solid(4, 4, [255; 4]));
        let mut slot = ImageSlot::Loading(pending);

        assert!(!slot.poll(None));
        assert!(slot.is_loading());

        assert!(slot.poll(Some(&ctx)));
        assert_eq!(slot.size(), Some((4, 4)));
        assert_eq!(ctx.textures.borrow().len(), 1);
    }

    #[test]
    fn test_placeholder_until_update_swaps_texture() {
        let ctx = RenderContext::default();
        let pending = AssetLoader::default().ready("cow.png", DecodedImage::solid(4, 4, [255; 4]));
        let mut r = SpriteRenderer::from_source(SpriteSource::Pending(pending));
        r.initialize(&ctx);

        let mut surface = RecordingSurface::new();
        r.render(&cow(), &mut surface);
        assert_eq!(surface.textures().count(), 0);
        assert!(matches!(surface.commands[0], DrawCommand::Rect(..)));

        assert!(r.update(0.016));
        assert!(r.is_loaded());
        assert_eq!(ctx.textures.borrow().len(), 1);

        surface.clear_log();
        r.render(&cow(), &mut surface);
        assert_eq!(surface.textures().count(), 1);
    }

    #[test]
    fn test_failed_load_keeps_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RenderContext::new(AssetLoader::new(dir.path()));
        let pending = ctx.loader.decode_bytes("broken.png", b"garbage".to_vec());
        let mut r = SpriteRenderer::from_source(SpriteSource::Pending(pending));
        r.initialize(&ctx);

        let start = std::time::Instant::now();
        while r.is_loading() && start.elapsed() < std::time::Duration::from_secs(5) {
            r.update(0.016);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert!(!r.is_loaded());

        let mut surface = RecordingSurface::new();
        r.render(&cow(), &mut surface);
        assert_eq!(surface.textures().count(), 0);
        assert_eq!(surface.outlines().count(), 1);
    }

    #[test]
    fn test_destroy_releases_texture() {
        let ctx = RenderContext::default();
        let pending = AssetLoader::default().ready("cow.png", DecodedImage::solid(1, 1, [0; 4]));
        let mut r = SpriteRenderer::from_source(SpriteSource::Pending(pending));
        r.initialize(&ctx);
        r.update(0.0);
        assert_eq!(ctx.textures.borrow().len(), 1);

        r.destroy();
        assert!(ctx.textures.borrow().is_empty());
        assert!(!r.is_loaded());
    }
}
