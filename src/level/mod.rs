//! World Configuration
//!
//! A world is described by a RON document: physics settings, named
//! animation sets, and the list of entities to spawn with their visuals.
//! `io` reads and writes these documents, `build` turns one into a live
//! `World`.

pub mod io;
pub mod build;

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::game::{Collider, Vector, DEFAULT_FRICTION, DEFAULT_RESTITUTION};
use crate::game::clock::DEFAULT_MAX_DELTA;

pub use io::{load_world_config, load_world_config_from_bytes, load_world_config_from_str, save_world_config, to_ron_string, validate_config, LevelError};
pub use build::{build_animation, build_world};

/// Default logical resolution of the view
pub const DEFAULT_VIEW: (u32, u32) = (320, 240);

fn default_max_delta() -> f64 {
    DEFAULT_MAX_DELTA
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_view() -> (u32, u32) {
    DEFAULT_VIEW
}

fn default_restitution() -> f64 {
    DEFAULT_RESTITUTION
}

fn default_friction() -> f64 {
    DEFAULT_FRICTION
}

fn default_frame_duration() -> f64 {
    0.1
}

/// Everything needed to build a world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub name: String,
    #[serde(default)]
    pub gravity: Vector,
    #[serde(default)]
    pub bounds: Option<BoundsConfig>,
    /// Largest simulation step in seconds
    #[serde(default = "default_max_delta")]
    pub max_delta: f64,
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
    #[serde(default)]
    pub debug: bool,
    /// Logical resolution (world pixels shown on screen)
    #[serde(default = "default_view")]
    pub view: (u32, u32),
    #[serde(default)]
    pub animations: Vec<AnimationSetConfig>,
    #[serde(default)]
    pub entities: Vec<EntitySpawn>,
}

impl WorldConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gravity: Vector::ZERO,
            bounds: None,
            max_delta: DEFAULT_MAX_DELTA,
            time_scale: 1.0,
            debug: false,
            view: DEFAULT_VIEW,
            animations: Vec::new(),
            entities: Vec::new(),
        }
    }

    pub fn animation_set(&self, name: &str) -> Option<&AnimationSetConfig> {
        self.animations.iter().find(|set| set.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsConfig {
    pub min: Vector,
    pub max: Vector,
}

/// Static bodies never move; dynamic ones have a finite mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BodyKind {
    Static,
    Dynamic { mass: f64 },
}

/// How an entity is drawn
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Visual {
    /// Invisible (no renderer registered)
    None,
    /// Bordered box sized to the collider
    #[default]
    Placeholder,
    /// Single image, path relative to the asset root
    Sprite(String),
    /// Sprite sheet driven by a named animation set
    Animated(String),
}

/// One entity to create when the world is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpawn {
    pub id: String,
    pub body: BodyKind,
    pub position: Vector,
    #[serde(default)]
    pub velocity: Vector,
    #[serde(default)]
    pub collider: Option<Collider>,
    /// Tag names, e.g. "structure", "collectible"
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_restitution")]
    pub restitution: f64,
    #[serde(default = "default_friction")]
    pub friction: f64,
    #[serde(default)]
    pub visual: Visual,
}

impl EntitySpawn {
    pub fn new(id: impl Into<String>, body: BodyKind, position: Vector) -> Self {
        Self {
            id: id.into(),
            body,
            position,
            velocity: Vector::ZERO,
            collider: None,
            tags: Vec::new(),
            restitution: DEFAULT_RESTITUTION,
            friction: DEFAULT_FRICTION,
            visual: Visual::Placeholder,
        }
    }

    pub fn with_size(mut self, w: f64, h: f64) -> Self {
        self.collider = Some(Collider::new(Vector::new(w, h)));
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_velocity(mut self, velocity: Vector) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_visual(mut self, visual: Visual) -> Self {
        self.visual = visual;
        self
    }
}

/// A sprite sheet and the state machine that plays it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSetConfig {
    pub name: String,
    /// Sheet path relative to the asset root
    pub sheet: String,
    /// Frame cell size in sheet pixels
    pub cell: (f32, f32),
    pub initial: String,
    pub states: Vec<AnimationStateConfig>,
}

/// One row of the sprite sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationStateConfig {
    pub id: String,
    pub row: u32,
    pub frames: u32,
    #[serde(default = "default_frame_duration")]
    pub frame_duration: f64,
    /// event -> target state
    #[serde(default)]
    pub transitions: BTreeMap<String, String>,
    /// Play once, then switch to this state
    #[serde(default)]
    pub then: Option<String>,
    /// (seconds, fallback state)
    #[serde(default)]
    pub max_duration: Option<(f64, String)>,
}

impl AnimationStateConfig {
    pub fn new(id: impl Into<String>, row: u32, frames: u32, frame_duration: f64) -> Self {
        Self {
            id: id.into(),
            row,
            frames,
            frame_duration,
            transitions: BTreeMap::new(),
            then: None,
            max_duration: None,
        }
    }

    pub fn on(mut self, event: &str, target: &str) -> Self {
        self.transitions.insert(event.to_string(), target.to_string());
        self
    }

    pub fn then(mut self, target: &str) -> Self {
        self.then = Some(target.to_string());
        self
    }

    pub fn max_duration(mut self, seconds: f64, fallback: &str) -> Self {
        self.max_duration = Some((seconds, fallback.to_string()));
        self
    }
}

/// Built-in farm used when no world file is found
pub fn demo_config() -> WorldConfig {
    let mut config = WorldConfig::new("Meadow Farm");
    config.bounds = Some(BoundsConfig {
        min: Vector::ZERO,
        max: Vector::new(320.0, 240.0),
    });

    config.animations.push(AnimationSetConfig {
        name: "farmer".to_string(),
        sheet: "sprites/farmer.png".to_string(),
        cell: (16.0, 16.0),
        initial: "idle".to_string(),
        states: vec![
            AnimationStateConfig::new("idle", 0, 2, 0.4).on("move", "walk").on("wave", "wave"),
            AnimationStateConfig::new("walk", 1, 4, 0.12).on("idle", "idle"),
            AnimationStateConfig::new("wave", 2, 4, 0.15).then("idle").max_duration(2.0, "idle"),
        ],
    });

    let dynamic = BodyKind::Dynamic { mass: 1.0 };
    let mut entities = vec![
        EntitySpawn::new("farmer", dynamic, Vector::new(160.0, 150.0))
            .with_size(14.0, 16.0)
            .with_tags(&["player", "character"])
            .with_visual(Visual::Animated("farmer".to_string())),
        EntitySpawn::new("farmhouse", BodyKind::Static, Vector::new(70.0, 60.0))
            .with_size(64.0, 48.0)
            .with_tags(&["structure"])
            .with_visual(Visual::Sprite("sprites/farmhouse.png".to_string())),
        EntitySpawn::new("barn", BodyKind::Static, Vector::new(250.0, 60.0))
            .with_size(72.0, 52.0)
            .with_tags(&["structure"])
            .with_visual(Visual::Sprite("sprites/barn.png".to_string())),
        EntitySpawn::new("well", BodyKind::Static, Vector::new(160.0, 90.0))
            .with_size(20.0, 20.0)
            .with_tags(&["structure"]),
        EntitySpawn::new("cow", BodyKind::Dynamic { mass: 4.0 }, Vector::new(250.0, 170.0))
            .with_size(24.0, 16.0)
            .with_tags(&["character"])
            .with_velocity(Vector::new(-12.0, 0.0)),
        EntitySpawn::new("flowers", BodyKind::Static, Vector::new(110.0, 200.0))
            .with_size(16.0, 8.0)
            .with_tags(&["decoration"]),
    ];
    for (i, x) in [40.0, 64.0, 88.0].into_iter().enumerate() {
        entities.push(
            EntitySpawn::new(format!("carrot_{}", i), BodyKind::Static, Vector::new(x, 180.0))
                .with_size(8.0, 8.0)
                .with_tags(&["collectible"]),
        );
    }
    config.entities = entities;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_is_valid() {
        let config = demo_config();
        assert!(validate_config(&config).is_ok());
        assert!(config.animation_set("farmer").is_some());
        assert_eq!(config.entities.iter().filter(|e| e.tags.contains(&"collectible".to_string())).count(), 3);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let src = r#"(
            name: "Tiny",
            entities: [
                (id: "rock", body: Static, position: (x: 1.0, y: 2.0)),
            ],
        )"#;
        let config: WorldConfig = ron::from_str(src).unwrap();
        assert_eq!(config.max_delta, DEFAULT_MAX_DELTA);
        assert_eq!(config.time_scale, 1.0);
        assert_eq!(config.view, DEFAULT_VIEW);
        let rock = &config.entities[0];
        assert_eq!(rock.visual, Visual::Placeholder);
        assert_eq!(rock.restitution, DEFAULT_RESTITUTION);
        assert!(rock.collider.is_none());
    }
}
