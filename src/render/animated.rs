//! Animated Sprite Renderer
//!
//! Draws the current frame of a `CharacterAnimation` from a sprite sheet.
//! The renderer watches its entity's velocity and feeds the machine
//! "move"/"idle" events, and mirrors the sheet when walking left.

use macroquad::math::Rect;
use tracing::warn;

use crate::anim::{CharacterAnimation, FrameRect};
use crate::game::Entity;
use super::placeholder::{draw_placeholder, PLACEHOLDER_FILL};
use super::sprite::{ImageSlot, SpriteSource};
use super::surface::Surface;
use super::{draw_debug_overlay, draw_highlight, entity_rect, RenderContext, Renderer};

/// Speed below which an entity counts as standing still
pub const DEFAULT_MOTION_THRESHOLD: f64 = 0.5;

/// Event names sent to the machine when the entity starts or stops moving
#[derive(Debug, Clone, PartialEq)]
pub struct MotionEvents {
    pub moving: String,
    pub idle: String,
    pub threshold: f64,
}

impl Default for MotionEvents {
    fn default() -> Self {
        Self {
            moving: "move".to_string(),
            idle: "idle".to_string(),
            threshold: DEFAULT_MOTION_THRESHOLD,
        }
    }
}

/// What was on screen after the last update, to detect visual changes
#[derive(Debug, Clone, PartialEq, Default)]
struct Shown {
    state: Option<String>,
    frame: Option<FrameRect>,
    flip_x: bool,
}

pub struct AnimatedSpriteRenderer {
    sheet: Option<SpriteSource>,
    slot: ImageSlot,
    animation: CharacterAnimation,
    motion: Option<MotionEvents>,
    context: Option<RenderContext>,
    shown: Shown,
    out_of_bounds_reported: bool,
    debug: bool,
}

impl AnimatedSpriteRenderer {
    /// `initial_state` is queued right away and entered on the first update
    pub fn new(sheet: SpriteSource, mut animation: CharacterAnimation, initial_state: &str) -> Self {
        if animation.get_current_state_id().is_none() {
            let _ = animation.set_state(initial_state, true);
        }
        Self {
            sheet: Some(sheet),
            slot: ImageSlot::Unloaded,
            animation,
            motion: Some(MotionEvents::default()),
            context: None,
            shown: Shown::default(),
            out_of_bounds_reported: false,
            debug: false,
        }
    }

    pub fn with_motion_events(mut self, events: MotionEvents) -> Self {
        self.motion = Some(events);
        self
    }

    /// Leave state changes entirely to the caller
    pub fn without_motion_events(mut self) -> Self {
        self.motion = None;
        self
    }

    pub fn animation(&self) -> &CharacterAnimation {
        &self.animation
    }

    pub fn animation_mut(&mut self) -> &mut CharacterAnimation {
        &mut self.animation
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.texture().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.slot.is_loading()
    }

    fn observe_motion(&mut self, entity: &Entity) {
        let Some(motion) = &self.motion else {
            return;
        };
        let velocity = entity.velocity();
        let event = if velocity.length() > motion.threshold {
            &motion.moving
        } else {
            &motion.idle
        };
        // Only states that list the event react to it
        if self.animation.accepts(event) && !self.animation.has_pending_transition() {
            let event = event.clone();
            let _ = self.animation.trigger(&event);
        }
        if velocity.x < -motion.threshold {
            self.animation.set_flip_x(true);
        } else if velocity.x > motion.threshold {
            self.animation.set_flip_x(false);
        }
    }

    fn source_rect(&mut self, frame: FrameRect) -> Option<Rect> {
        let (w, h) = self.slot.size()?;
        if frame.x < 0.0 || frame.y < 0.0 || frame.x + frame.w > w as f32 || frame.y + frame.h > h as f32 {
            if !self.out_of_bounds_reported {
                warn!("Animation frame {:?} lies outside the {}x{} sheet", frame, w, h);
                self.out_of_bounds_reported = true;
            }
            return None;
        }
        Some(Rect::new(frame.x, frame.y, frame.w, frame.h))
    }

    fn snapshot(&self) -> Shown {
        let sprite = self.animation.get_sprite();
        Shown {
            state: self.animation.get_current_state_id().map(|s| s.to_string()),
            frame: sprite.frame,
            flip_x: sprite.flip_x,
        }
    }
}

impl Renderer for AnimatedSpriteRenderer {
    fn initialize(&mut self, context: &RenderContext) {
        self.debug = context.debug;
        self.context = Some(context.clone());
        if let Some(sheet) = self.sheet.take() {
            let pending = match sheet {
                SpriteSource::Path(path) => context.loader.load_image(path),
                SpriteSource::Pending(pending) => pending,
            };
            self.slot = ImageSlot::Loading(pending);
        }
    }

    fn render(&mut self, entity: &Entity, surface: &mut dyn Surface) {
        self.observe_motion(entity);

        let sprite = *self.animation.get_sprite();
        let drawn = match (self.slot.texture(), sprite.frame) {
            (Some(texture), Some(frame)) => match self.source_rect(frame) {
                Some(source) => {
                    surface.draw_texture_region(texture, entity_rect(entity), Some(source), sprite.flip_x);
                    true
                }
                None => false,
            },
            _ => false,
        };
        if !drawn {
            draw_placeholder(entity, PLACEHOLDER_FILL, surface);
        }

        draw_highlight(entity, surface);
        if self.debug {
            draw_debug_overlay(entity, surface);
        }
    }

    fn update(&mut self, delta_time: f64) -> bool {
        let context = self.context.clone();
        let loaded = self.slot.poll(context.as_ref());

        self.animation.update(delta_time);
        let now = self.snapshot();
        let changed = now != self.shown;
        self.shown = now;
        loaded || changed
    }

    fn set_debug_mode(&mut self, enabled: bool) {
        self.debug = enabled;
    }

    fn handle_event(&mut self, event: &str) -> bool {
        self.animation.accepts(event) && self.animation.trigger(event).is_ok()
    }

    fn destroy(&mut self) {
        let context = self.context.take();
        self.slot.release(context.as_ref());
        self.animation.clear_on_animation_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::AnimationState;
    use crate::game::Vector;
    use crate::render::{AssetLoader, DecodedImage, DrawCommand, RecordingSurface};

    fn machine() -> CharacterAnimation {
        let mut anim = CharacterAnimation::new();
        anim.add_state(
            AnimationState::new("idle", FrameRect::strip(0, 2, 16.0, 16.0), 0.25).with_transition("move", "walk"),
        )
        .unwrap();
        anim.add_state(
            AnimationState::new("walk", FrameRect::strip(1, 4, 16.0, 16.0), 0.1).with_transition("idle", "idle"),
        )
        .unwrap();
        anim
    }

    fn renderer(ctx: &RenderContext) -> AnimatedSpriteRenderer {
        let sheet = AssetLoader::default().ready("farmer.png", DecodedImage::solid(64, 32, [200; 4]));
        let mut r = AnimatedSpriteRenderer::new(SpriteSource::Pending(sheet), machine(), "idle");
        r.initialize(ctx);
        r
    }

    fn farmer(velocity: Vector) -> Entity {
        Entity::new_dynamic("farmer", Vector::new(8.0, 8.0), 1.0)
            .with_size(Vector::new(16.0, 16.0))
            .with_velocity(velocity)
    }

    #[test]
    fn test_first_update_enters_initial_state() {
        let ctx = RenderContext::default();
        let mut r = renderer(&ctx);
        assert!(r.update(0.0));
        assert_eq!(r.animation().get_current_state_id(), Some("idle"));
        assert!(r.is_loaded());

        // Nothing moves within one frame duration
        assert!(!r.update(0.1));
    }

    #[test]
    fn test_draws_current_frame_region() {
        let ctx = RenderContext::default();
        let mut r = renderer(&ctx);
        r.update(0.0);

        let mut surface = RecordingSurface::new();
        r.render(&farmer(Vector::ZERO), &mut surface);
        match &surface.commands[0] {
            DrawCommand::Texture { source, flip_x, .. } => {
                assert_eq!(*source, Some(Rect::new(0.0, 0.0, 16.0, 16.0)));
                assert!(!flip_x);
            }
            other => panic!("expected texture draw, got {:?}", other),
        }
    }

    #[test]
    fn test_velocity_drives_walk_and_facing() {
        let ctx = RenderContext::default();
        let mut r = renderer(&ctx);
        r.update(0.0);

        let mut surface = RecordingSurface::new();
        r.render(&farmer(Vector::new(-20.0, 0.0)), &mut surface);
        assert!(r.animation().has_pending_transition());
        assert!(r.update(0.016));
        assert_eq!(r.animation().get_current_state_id(), Some("walk"));
        assert!(r.animation().get_sprite().flip_x);

        r.render(&farmer(Vector::ZERO), &mut surface);
        r.update(0.016);
        assert_eq!(r.animation().get_current_state_id(), Some("idle"));
        // Facing is kept while standing
        assert!(r.animation().get_sprite().flip_x);
    }

    #[test]
    fn test_handle_event_uses_transition_table() {
        let ctx = RenderContext::default();
        let mut r = renderer(&ctx);
        r.update(0.0);
        assert!(!r.handle_event("dance"));
        assert!(r.handle_event("move"));
        r.update(0.0);
        assert_eq!(r.animation().get_current_state_id(), Some("walk"));
    }

    #[test]
    fn test_placeholder_while_sheet_loading() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RenderContext::new(AssetLoader::new(dir.path()));
        let mut r = AnimatedSpriteRenderer::new(SpriteSource::Path("missing.png".into()), machine(), "idle");
        r.initialize(&ctx);
        r.update(0.0);

        let mut surface = RecordingSurface::new();
        r.render(&farmer(Vector::ZERO), &mut surface);
        assert_eq!(surface.textures().count(), 0);
        assert!(matches!(surface.commands[0], DrawCommand::Rect(..)));
    }

    #[test]
    fn test_frame_outside_sheet_falls_back() {
        let ctx = RenderContext::default();
        let sheet = AssetLoader::default().ready("tiny.png", DecodedImage::solid(8, 8, [0; 4]));
        let mut r = AnimatedSpriteRenderer::new(SpriteSource::Pending(sheet), machine(), "idle");
        r.initialize(&ctx);
        r.update(0.0);

        let mut surface = RecordingSurface::new();
        r.render(&farmer(Vector::ZERO), &mut surface);
        assert_eq!(surface.textures().count(), 0);
    }

    #[test]
    fn test_destroy_releases_sheet() {
        let ctx = RenderContext::default();
        let mut r = renderer(&ctx);
        r.update(0.0);
        assert_eq!(ctx.textures.borrow().len(), 1);
        r.destroy();
        assert!(ctx.textures.borrow().is_empty());
    }
}
