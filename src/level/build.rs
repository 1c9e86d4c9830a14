//! World building
//!
//! Turns a validated `WorldConfig` into a live `World` with entities and
//! renderers registered. Building never fails: entries the world rejects
//! are logged and skipped, broken animation sets fall back to placeholders.

use tracing::{info, warn};

use crate::anim::{AnimationError, AnimationState, CharacterAnimation, FrameRect};
use crate::game::{Entity, SimulationClock, Tag, World};
use crate::render::sprite::SpriteSource;
use crate::render::{AnimatedSpriteRenderer, PlaceholderRenderer, RenderContext, Renderer, RendererRegistry, SpriteRenderer};
use super::{AnimationSetConfig, BodyKind, EntitySpawn, Visual, WorldConfig};

/// Build the state machine for one animation set
pub fn build_animation(set: &AnimationSetConfig) -> Result<CharacterAnimation, AnimationError> {
    let mut animation = CharacterAnimation::new();
    let (w, h) = set.cell;
    for config in &set.states {
        let mut state = AnimationState::new(
            config.id.as_str(),
            FrameRect::strip(config.row, config.frames, w, h),
            config.frame_duration,
        );
        for (event, target) in &config.transitions {
            state = state.with_transition(event.as_str(), target.as_str());
        }
        if let Some(then) = &config.then {
            state = state.play_once(then.as_str());
        }
        if let Some((seconds, fallback)) = &config.max_duration {
            state = state.with_max_duration(*seconds, fallback.as_str());
        }
        animation.add_state(state)?;
    }
    animation.validate()?;
    Ok(animation)
}

fn spawn_entity(spawn: &EntitySpawn) -> Entity {
    let mut entity = match spawn.body {
        BodyKind::Static => Entity::new_static(spawn.id.as_str(), spawn.position),
        BodyKind::Dynamic { mass } => Entity::new_dynamic(spawn.id.as_str(), spawn.position, mass),
    };
    if let Some(collider) = spawn.collider {
        entity = entity.with_collider(collider);
    }
    entity
        .with_tags(spawn.tags.iter().map(|t| Tag::from(t.as_str())))
        .with_velocity(spawn.velocity)
        .with_restitution(spawn.restitution)
        .with_friction(spawn.friction)
}

fn make_renderer(spawn: &EntitySpawn, config: &WorldConfig) -> Option<Box<dyn Renderer>> {
    match &spawn.visual {
        Visual::None => None,
        Visual::Placeholder => Some(Box::new(PlaceholderRenderer::new())),
        Visual::Sprite(path) => Some(Box::new(SpriteRenderer::new(path.as_str()))),
        Visual::Animated(name) => {
            let Some(set) = config.animation_set(name) else {
                warn!("No animation set '{}' for '{}', using placeholder", name, spawn.id);
                return Some(Box::new(PlaceholderRenderer::new()));
            };
            match build_animation(set) {
                Ok(animation) => Some(Box::new(AnimatedSpriteRenderer::new(
                    SpriteSource::Path(set.sheet.clone().into()),
                    animation,
                    &set.initial,
                ))),
                Err(e) => {
                    warn!("Animation set '{}' for '{}' unusable ({}), using placeholder", name, spawn.id, e);
                    Some(Box::new(PlaceholderRenderer::new()))
                }
            }
        }
    }
}

/// Create a world from `config`, with renderers sharing `context`
pub fn build_world(config: &WorldConfig, context: RenderContext) -> World {
    let mut clock = SimulationClock::with_max_delta(config.max_delta);
    clock.set_time_scale(config.time_scale);

    let mut world = World::new(clock, RendererRegistry::new(context));
    world.set_gravity(config.gravity);
    if let Some(bounds) = &config.bounds {
        // Already logged by the world
        let _ = world.set_world_bounds(bounds.min, bounds.max);
    }
    world.set_debug_mode(config.debug);

    for spawn in &config.entities {
        let entity = spawn_entity(spawn);
        let result = match make_renderer(spawn, config) {
            Some(renderer) => world.spawn(entity, renderer),
            None => world.add_entity(entity),
        };
        if let Err(e) = result {
            warn!("Skipped spawn '{}': {}", spawn.id, e);
        }
    }

    info!("Built world '{}' with {} entities", config.name, world.entity_count());
    world
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Vector;
    use crate::level::{demo_config, AnimationStateConfig};
    use crate::render::{AssetLoader, RecordingSurface};

    fn context() -> (tempfile::TempDir, RenderContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RenderContext::new(AssetLoader::new(dir.path()));
        (dir, ctx)
    }

    #[test]
    fn test_demo_world_builds() {
        let (_dir, ctx) = context();
        let config = demo_config();
        let world = build_world(&config, ctx);

        assert_eq!(world.entity_count(), config.entities.len());
        assert!(world.world_bounds().is_some());
        let farmer = world.get_entity("farmer").unwrap();
        assert!(farmer.has_tag(&Tag::Player));
        assert!(!farmer.is_static());
        assert!(world.get_entity("barn").unwrap().is_static());
        assert_eq!(world.get_entities_by_tag(&Tag::Collectible).len(), 3);
        assert_eq!(world.renderers().len(), config.entities.len());
    }

    #[test]
    fn test_duplicate_spawn_keeps_first() {
        let (_dir, ctx) = context();
        let mut config = WorldConfig::new("dupes");
        config.entities.push(EntitySpawn::new("rock", BodyKind::Static, Vector::new(1.0, 1.0)));
        config.entities.push(EntitySpawn::new("rock", BodyKind::Static, Vector::new(9.0, 9.0)));
        let world = build_world(&config, ctx);
        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.get_entity("rock").unwrap().position(), Vector::new(1.0, 1.0));
    }

    #[test]
    fn test_invisible_entities_have_no_renderer() {
        let (_dir, ctx) = context();
        let mut config = WorldConfig::new("ghosts");
        config
            .entities
            .push(EntitySpawn::new("wall", BodyKind::Static, Vector::ZERO).with_visual(Visual::None));
        let world = build_world(&config, ctx);
        assert_eq!(world.entity_count(), 1);
        assert!(world.renderers().is_empty());
    }

    #[test]
    fn test_missing_animation_set_falls_back_to_placeholder() {
        let config = WorldConfig::new("strays");
        let spawn = EntitySpawn::new("dog", BodyKind::Dynamic { mass: 1.0 }, Vector::ZERO)
            .with_size(8.0, 8.0)
            .with_visual(Visual::Animated("dog".to_string()));

        let mut renderer = make_renderer(&spawn, &config).unwrap();
        let mut surface = RecordingSurface::new();
        renderer.render(&spawn_entity(&spawn), &mut surface);
        assert_eq!(surface.textures().count(), 0);
        assert!(matches!(surface.commands[0], crate::render::DrawCommand::Rect(..)));
    }

    #[test]
    fn test_build_animation_from_set() {
        let config = demo_config();
        let set = config.animation_set("farmer").unwrap();
        let mut animation = build_animation(set).unwrap();
        assert_eq!(animation.state_count(), 3);

        animation.set_state("idle", true).unwrap();
        animation.update(0.0);
        assert!(animation.accepts("move"));
        assert_eq!(animation.get_sprite().frame, Some(FrameRect::new(0.0, 0.0, 16.0, 16.0)));
    }

    #[test]
    fn test_broken_animation_set_is_rejected() {
        let mut set = demo_config().animations[0].clone();
        set.states.push(AnimationStateConfig::new("idle", 4, 1, 0.1));
        assert!(matches!(build_animation(&set), Err(AnimationError::DuplicateState(_))));
    }

    #[test]
    fn test_built_world_ticks() {
        let (_dir, ctx) = context();
        let mut world = build_world(&demo_config(), ctx);
        let mut surface = RecordingSurface::new();
        assert!(world.step(1.0 / 60.0, &mut surface));
        assert_eq!(surface.count_clears(), 1);
        // The cow walks, so the next tick draws too
        assert!(world.step(1.0 / 60.0, &mut surface));
    }
}
