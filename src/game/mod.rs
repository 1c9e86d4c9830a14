//! Game Simulation Core
//!
//! A small real-time simulation for a top-down farm world. Everything that
//! moves, collides or can be clicked is an `Entity` owned by the `World`.
//!
//! Key concepts:
//! - Vector / Aabb: the math the rest is built on
//! - Entity: a body with a collider, tags and a dirty flag
//! - Tags: behavior comes from capability tables, not type hierarchies
//! - World: registry plus the fixed per-tick pipeline
//! - SimulationClock: owned time context, no global timers
//!
//! Design philosophy:
//! - Positional correction, not rigid-body dynamics
//! - Skip drawing when nothing changed
//! - Nothing here is fatal: bad input is logged and ignored

pub mod vector;
pub mod collider;
pub mod tags;
pub mod entity;
pub mod clock;
pub mod event;
pub mod world;

// Re-export main types
pub use vector::{Axis, Vector};
pub use collider::{Aabb, Collider};
pub use tags::{Capabilities, Tag, TagSet};
pub use entity::{Entity, EntityId, DEFAULT_FRICTION, DEFAULT_RESTITUTION};
pub use clock::SimulationClock;
pub use event::{EventQueue, PointerEvent, PointerKind, WorldEvent};
pub use world::{RegistryError, World};
