//! Renderer Registry
//!
//! Maps entity ids to their renderers. At most one renderer per entity;
//! registering again destroys the old one before the new one starts.

use std::collections::HashMap;

use tracing::debug;

use crate::game::{Entity, EntityId};
use super::surface::Surface;
use super::{RenderContext, Renderer};

/// Background color behind all entities
pub const CLEAR_COLOR: macroquad::color::Color = macroquad::color::Color::new(0.42, 0.62, 0.35, 1.0);

pub struct RendererRegistry {
    renderers: HashMap<EntityId, Box<dyn Renderer>>,
    context: RenderContext,
}

impl RendererRegistry {
    pub fn new(context: RenderContext) -> Self {
        Self {
            renderers: HashMap::new(),
            context,
        }
    }

    /// Shared services (loader, texture store) passed to every renderer
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Attach `renderer` to `id`, replacing and destroying any previous one
    pub fn register(&mut self, id: EntityId, mut renderer: Box<dyn Renderer>) {
        if let Some(mut old) = self.renderers.remove(&id) {
            debug!("Replacing renderer for {}", id);
            old.destroy();
        }
        renderer.initialize(&self.context);
        self.renderers.insert(id, renderer);
    }

    /// Detach and destroy the renderer for `id`. Returns false if none existed.
    pub fn remove(&mut self, id: &EntityId) -> bool {
        match self.renderers.remove(id) {
            Some(mut renderer) => {
                renderer.destroy();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.renderers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Draw one entity. Entities without a renderer are invisible.
    pub fn render_entity(&mut self, entity: &Entity, surface: &mut dyn Surface) -> bool {
        match self.renderers.get_mut(entity.id()) {
            Some(renderer) => {
                renderer.render(entity, surface);
                true
            }
            None => false,
        }
    }

    /// Clear the surface, then draw `entities` in order (later on top).
    /// Inactive entities are skipped.
    pub fn render_all<'a>(&mut self, entities: impl IntoIterator<Item = &'a Entity>, surface: &mut dyn Surface) {
        surface.clear(CLEAR_COLOR);
        for entity in entities {
            if entity.is_active() {
                self.render_entity(entity, surface);
            }
        }
    }

    /// Forward a gameplay event to one entity's renderer
    pub fn send_event(&mut self, id: &EntityId, event: &str) -> bool {
        self.renderers
            .get_mut(id)
            .map(|renderer| renderer.handle_event(event))
            .unwrap_or(false)
    }

    /// Advance every renderer. Returns true when any of them changed visually.
    pub fn update_all(&mut self, delta_time: f64) -> bool {
        let mut changed = false;
        for renderer in self.renderers.values_mut() {
            changed |= renderer.update(delta_time);
        }
        changed
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.context.debug = enabled;
        for renderer in self.renderers.values_mut() {
            renderer.set_debug_mode(enabled);
        }
    }

    /// Destroy every renderer
    pub fn clear(&mut self) {
        for (_, mut renderer) in self.renderers.drain() {
            renderer.destroy();
        }
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new(RenderContext::default())
    }
}

impl Drop for RendererRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}
