//! Simulated Entities
//!
//! An entity is a body in the world: position, motion, physical parameters,
//! an optional collider, tags, and a dirty flag. Every mutation of position
//! or velocity goes through a method that raises the dirty flag, so the
//! world can skip drawing when nothing moved.
//!
//! Two construction paths exist:
//! - static: infinite mass, never integrated, only pushes others
//! - dynamic: finite mass, affected by gravity and forces

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use super::collider::{Aabb, Collider};
use super::tags::{Capabilities, Tag, TagSet};
use super::vector::{Axis, Vector};

/// Unique, immutable identity of an entity, chosen by whoever creates it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(Arc<str>);

impl EntityId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId::new(s)
    }
}

/// Default bounce coefficient
pub const DEFAULT_RESTITUTION: f64 = 0.2;
/// Default contact drag coefficient
pub const DEFAULT_FRICTION: f64 = 0.1;

/// A simulated body.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    position: Vector,
    velocity: Vector,
    acceleration: Vector,
    /// > 0, or `f64::INFINITY` for immovable bodies
    mass: f64,
    collider: Option<Collider>,
    is_static: bool,
    is_active: bool,
    tags: TagSet,
    /// Bounce retained on contact (0 = dead stop, 1 = perfect bounce)
    pub restitution: f64,
    /// Tangential velocity lost on contact (0 = ice, 1 = glue)
    pub friction: f64,
    /// Set by pointer hover; drawn as an outline by renderers
    highlighted: bool,
    is_changed: bool,
}

impl Entity {
    /// Immovable entity with infinite mass.
    pub fn new_static(id: impl Into<EntityId>, position: Vector) -> Self {
        Self::base(id.into(), position, f64::INFINITY, true)
    }

    /// Movable entity. Non-positive or NaN mass is treated as 1.0.
    pub fn new_dynamic(id: impl Into<EntityId>, position: Vector, mass: f64) -> Self {
        let mass = if mass > 0.0 { mass } else { 1.0 };
        Self::base(id.into(), position, mass, false)
    }

    fn base(id: EntityId, position: Vector, mass: f64, is_static: bool) -> Self {
        Self {
            id,
            position,
            velocity: Vector::ZERO,
            acceleration: Vector::ZERO,
            mass,
            collider: None,
            is_static,
            is_active: true,
            tags: TagSet::new(),
            restitution: DEFAULT_RESTITUTION,
            friction: DEFAULT_FRICTION,
            highlighted: false,
            // New entities have never been drawn
            is_changed: true,
        }
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = Some(collider);
        self
    }

    /// Shorthand for a centered box collider of `size`
    pub fn with_size(self, size: Vector) -> Self {
        self.with_collider(Collider::new(size))
    }

    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag);
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        for tag in tags {
            self.tags.insert(tag);
        }
        self
    }

    pub fn with_velocity(mut self, velocity: Vector) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn position(&self) -> Vector {
        self.position
    }

    pub fn velocity(&self) -> Vector {
        self.velocity
    }

    pub fn acceleration(&self) -> Vector {
        self.acceleration
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn collider(&self) -> Option<&Collider> {
        self.collider.as_ref()
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.tags.capabilities()
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn is_changed(&self) -> bool {
        self.is_changed
    }

    /// Static, or so heavy that nothing can push it
    pub fn is_immovable(&self) -> bool {
        self.is_static || !self.mass.is_finite()
    }

    /// World-space collision box, if the entity has a collider
    pub fn bounds(&self) -> Option<Aabb> {
        self.collider.map(|c| c.aabb_at(self.position))
    }

    /// Half extents of the collider, zero without one
    pub fn half_size(&self) -> Vector {
        self.collider.map(|c| c.size * 0.5).unwrap_or(Vector::ZERO)
    }

    pub fn contains_point(&self, point: Vector) -> bool {
        self.bounds().map(|b| b.contains_point(point)).unwrap_or(false)
    }

    // =========================================================================
    // Mutators (all raise the dirty flag)
    // =========================================================================

    pub fn set_position(&mut self, position: Vector) {
        self.position = position;
        self.is_changed = true;
    }

    pub fn translate(&mut self, offset: Vector) {
        self.position += offset;
        self.is_changed = true;
    }

    pub fn set_velocity(&mut self, velocity: Vector) {
        self.velocity = velocity;
        self.is_changed = true;
    }

    pub fn set_velocity_axis(&mut self, axis: Axis, value: f64) {
        self.velocity.set_component(axis, value);
        self.is_changed = true;
    }

    /// Accumulate a force for the next integration step: `a += f / m`.
    /// Immovable entities ignore forces.
    pub fn apply_force(&mut self, force: Vector) {
        if self.is_immovable() {
            return;
        }
        self.acceleration += force * (1.0 / self.mass);
    }

    /// Instant velocity change: `v += impulse / m`
    pub fn apply_impulse(&mut self, impulse: Vector) {
        if self.is_immovable() {
            return;
        }
        self.velocity += impulse * (1.0 / self.mass);
        self.is_changed = true;
    }

    /// Drop accumulated forces. The world calls this after integration.
    pub fn clear_forces(&mut self) {
        self.acceleration = Vector::ZERO;
    }

    /// Semi-implicit Euler step. Static, inactive and infinite-mass entities
    /// are left untouched.
    pub fn integrate(&mut self, delta_time: f64) {
        if !self.is_active || self.is_immovable() || delta_time <= 0.0 {
            return;
        }
        if self.acceleration == Vector::ZERO && self.velocity == Vector::ZERO {
            return;
        }
        self.velocity += self.acceleration * delta_time;
        self.position += self.velocity * delta_time;
        self.is_changed = true;
    }

    pub fn set_collider(&mut self, collider: Option<Collider>) {
        self.collider = collider;
        self.is_changed = true;
    }

    pub fn add_tag(&mut self, tag: Tag) {
        if self.tags.insert(tag) {
            self.is_changed = true;
        }
    }

    pub fn remove_tag(&mut self, tag: &Tag) {
        if self.tags.remove(tag) {
            self.is_changed = true;
        }
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        if self.highlighted != highlighted {
            self.highlighted = highlighted;
            self.is_changed = true;
        }
    }

    /// Mark for removal. The world drops inactive entities during cleanup,
    /// never mid-tick.
    pub fn deactivate(&mut self) {
        if self.is_active {
            self.is_active = false;
            self.is_changed = true;
        }
    }

    pub(crate) fn reset_changed(&mut self) {
        self.is_changed = false;
    }
}
