//! Game World
//!
//! The World owns every entity and runs the per-tick pipeline. Stage order
//! is fixed; each stage assumes the state produced by the one before it:
//!
//! 1. delta time from the clock (clamped)
//! 2. gravity, as a force on every movable entity
//! 3. integration
//! 4. collision pass (all pairs, positional correction)
//! 5. world-bounds constraint
//! 6. cleanup of inactive entities
//! 7. render dispatch, skipped when nothing changed
//!
//! Removal is always deferred to stage 6 so the collision pass never sees a
//! half-removed entity.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::render::{Renderer, RendererRegistry, Surface};
use super::clock::SimulationClock;
use super::collider::{Aabb, MAX_SEPARATION_STEPS};
use super::entity::{Entity, EntityId};
use super::event::{EventQueue, PointerEvent, PointerKind, WorldEvent};
use super::tags::Tag;
use super::vector::{Axis, Vector};

/// Registry and configuration failures. None of them stop the simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// An entity with this id is already registered; the original stays
    DuplicateId(EntityId),
    /// Bounds with min >= max on some axis, or non-finite corners
    InvalidBounds { min: Vector, max: Vector },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DuplicateId(id) => write!(f, "Entity '{}' is already registered", id),
            RegistryError::InvalidBounds { min, max } => write!(
                f,
                "Invalid world bounds ({}, {})..({}, {})",
                min.x, min.y, max.x, max.y
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// The simulated world: entity registry, physics settings, clock, renderers.
pub struct World {
    /// Live entities in insertion order (also the draw order)
    entities: Vec<Entity>,
    /// id -> slot in `entities`
    index: HashMap<EntityId, usize>,

    gravity: Vector,
    bounds: Option<Aabb>,
    clock: SimulationClock,

    renderers: RendererRegistry,
    events: EventQueue<WorldEvent>,

    /// Draw next tick even if no entity changed
    force_full_render: bool,
    /// Clickable entity under the pointer
    hovered: Option<EntityId>,
    debug_mode: bool,
    render_count: u64,
}

impl World {
    pub fn new(clock: SimulationClock, renderers: RendererRegistry) -> Self {
        Self {
            entities: Vec::new(),
            index: HashMap::new(),
            gravity: Vector::ZERO,
            bounds: None,
            clock,
            renderers,
            events: EventQueue::new(),
            force_full_render: true,
            hovered: None,
            debug_mode: false,
            render_count: 0,
        }
    }

    // =========================================================================
    // Entity registry
    // =========================================================================

    /// Register an entity. A duplicate id is rejected and the original keeps
    /// its slot.
    pub fn add_entity(&mut self, entity: Entity) -> Result<(), RegistryError> {
        if self.index.contains_key(entity.id()) {
            warn!("Entity '{}' already exists, ignoring the new one", entity.id());
            return Err(RegistryError::DuplicateId(entity.id().clone()));
        }
        trace!("Adding entity '{}'", entity.id());
        self.index.insert(entity.id().clone(), self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    /// Register an entity together with its renderer
    pub fn spawn(&mut self, entity: Entity, renderer: Box<dyn Renderer>) -> Result<(), RegistryError> {
        let id = entity.id().clone();
        self.add_entity(entity)?;
        self.register_renderer(id, renderer);
        Ok(())
    }

    /// Mark an entity for removal. It leaves the registry during cleanup.
    /// Returns false if the id is unknown or already marked.
    pub fn remove_entity(&mut self, id: &str) -> bool {
        match self.get_entity_mut(id) {
            Some(entity) if entity.is_active() => {
                entity.deactivate();
                true
            }
            _ => false,
        }
    }

    pub fn get_entity(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&slot| &self.entities[slot])
    }

    pub fn get_entity_mut(&mut self, id: &str) -> Option<&mut Entity> {
        match self.index.get(id) {
            Some(&slot) => self.entities.get_mut(slot),
            None => None,
        }
    }

    /// Active entities in insertion order
    pub fn get_all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_active())
    }

    pub fn get_entities_by_tag(&self, tag: &Tag) -> Vec<&Entity> {
        self.get_all_entities().filter(|e| e.has_tag(tag)).collect()
    }

    /// Active entities whose position lies within `radius` of `point`
    pub fn get_entities_in_radius(&self, point: Vector, radius: f64) -> Vec<&Entity> {
        let r2 = radius * radius;
        self.get_all_entities()
            .filter(|e| e.position().distance_squared(point) <= r2)
            .collect()
    }

    /// Includes entities marked for removal but not yet cleaned up
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// True when any entity changed since the last render
    pub fn has_changes(&self) -> bool {
        self.entities.iter().any(|e| e.is_changed())
    }

    pub fn reset_all_changes(&mut self) {
        for entity in &mut self.entities {
            entity.reset_changed();
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn set_gravity(&mut self, gravity: Vector) {
        self.gravity = gravity;
    }

    pub fn gravity(&self) -> Vector {
        self.gravity
    }

    pub fn set_world_bounds(&mut self, min: Vector, max: Vector) -> Result<(), RegistryError> {
        if !(min.is_finite() && max.is_finite() && min.x < max.x && min.y < max.y) {
            warn!("Rejected world bounds ({}, {})..({}, {})", min.x, min.y, max.x, max.y);
            return Err(RegistryError::InvalidBounds { min, max });
        }
        self.bounds = Some(Aabb::from_min_max(min, max));
        Ok(())
    }

    pub fn clear_world_bounds(&mut self) {
        self.bounds = None;
    }

    pub fn world_bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut SimulationClock {
        &mut self.clock
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    pub fn renderers_mut(&mut self) -> &mut RendererRegistry {
        &mut self.renderers
    }

    /// Attach a renderer to an entity id, replacing any previous one
    pub fn register_renderer(&mut self, id: EntityId, renderer: Box<dyn Renderer>) {
        self.renderers.register(id, renderer);
        self.force_full_render = true;
    }

    pub fn remove_renderer(&mut self, id: &EntityId) -> bool {
        let removed = self.renderers.remove(id);
        if removed {
            self.force_full_render = true;
        }
        removed
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug_mode = enabled;
        self.renderers.set_debug_mode(enabled);
        self.force_full_render = true;
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// Draw on the next tick even if nothing moved
    pub fn request_full_render(&mut self) {
        self.force_full_render = true;
    }

    /// Number of render passes performed so far
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    // =========================================================================
    // Events and pointer input
    // =========================================================================

    /// Take all events raised since the last drain
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        self.events.drain().collect()
    }

    pub fn hovered(&self) -> Option<&EntityId> {
        self.hovered.as_ref()
    }

    /// Consume a pointer signal already mapped into world space
    pub fn handle_pointer(&mut self, pointer: PointerEvent) {
        // Topmost (last drawn) clickable entity under the pointer
        let hit = self
            .entities
            .iter()
            .rev()
            .find(|e| e.is_active() && e.capabilities().clickable && e.contains_point(pointer.position))
            .map(|e| e.id().clone());

        match pointer.kind {
            PointerKind::Move => {
                if hit == self.hovered {
                    return;
                }
                if let Some(old) = self.hovered.take() {
                    if let Some(entity) = self.get_entity_mut(old.as_str()) {
                        entity.set_highlighted(false);
                    }
                    self.events.send(WorldEvent::HoverLeave(old));
                }
                if let Some(new) = hit {
                    if let Some(entity) = self.get_entity_mut(new.as_str()) {
                        entity.set_highlighted(true);
                    }
                    self.events.send(WorldEvent::HoverEnter(new.clone()));
                    self.hovered = Some(new);
                }
            }
            PointerKind::Click => {
                if let Some(id) = hit {
                    debug!("Clicked '{}'", id);
                    self.events.send(WorldEvent::Clicked {
                        id,
                        point: pointer.position,
                    });
                }
            }
        }
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    /// Run one tick from a host timestamp in seconds. Returns true if the
    /// world was drawn.
    pub fn update(&mut self, now: f64, surface: &mut dyn Surface) -> bool {
        let delta_time = self.clock.tick_at(now);
        self.run_tick(delta_time, surface)
    }

    /// Run one tick with an explicit raw delta (still clamped by the clock)
    pub fn step(&mut self, raw_delta: f64, surface: &mut dyn Surface) -> bool {
        let delta_time = self.clock.advance(raw_delta);
        self.run_tick(delta_time, surface)
    }

    fn run_tick(&mut self, delta_time: f64, surface: &mut dyn Surface) -> bool {
        self.apply_gravity();
        self.integrate(delta_time);
        self.resolve_collisions();
        self.apply_world_bounds();
        self.cleanup();
        self.render(delta_time, surface)
    }

    fn apply_gravity(&mut self) {
        if self.gravity == Vector::ZERO {
            return;
        }
        for entity in &mut self.entities {
            if entity.is_active() && !entity.is_immovable() {
                let force = self.gravity * entity.mass();
                entity.apply_force(force);
            }
        }
    }

    fn integrate(&mut self, delta_time: f64) {
        for entity in &mut self.entities {
            entity.integrate(delta_time);
            entity.clear_forces();
        }
    }

    fn resolve_collisions(&mut self) {
        let count = self.entities.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (a, b) = pair_mut(&mut self.entities, i, j);
                if let Some(event) = resolve_pair(a, b) {
                    self.events.send(event);
                }
            }
        }
    }

    fn apply_world_bounds(&mut self) {
        let Some(bounds) = self.bounds else {
            return;
        };
        for entity in &mut self.entities {
            if entity.is_active() && !entity.is_immovable() {
                constrain_to_bounds(entity, &bounds);
            }
        }
    }

    fn cleanup(&mut self) {
        if self.entities.iter().all(|e| e.is_active()) {
            return;
        }

        let mut removed = Vec::new();
        self.entities.retain(|e| {
            if e.is_active() {
                true
            } else {
                removed.push(e.id().clone());
                false
            }
        });
        self.index = self
            .entities
            .iter()
            .enumerate()
            .map(|(slot, e)| (e.id().clone(), slot))
            .collect();

        for id in removed {
            debug!("Removed entity '{}'", id);
            self.renderers.remove(&id);
            if self.hovered.as_ref() == Some(&id) {
                self.hovered = None;
            }
            self.events.send(WorldEvent::Removed(id));
        }
        self.force_full_render = true;
    }

    fn render(&mut self, delta_time: f64, surface: &mut dyn Surface) -> bool {
        if self.renderers.update_all(delta_time) {
            self.force_full_render = true;
        }

        if !self.force_full_render && !self.has_changes() {
            trace!("Nothing changed, skipping render");
            return false;
        }

        self.renderers.render_all(self.entities.iter(), surface);
        self.reset_all_changes();
        self.force_full_render = false;
        self.render_count += 1;
        true
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(SimulationClock::new(), RendererRegistry::default())
    }
}

/// Two distinct mutable slots, `i < j`
fn pair_mut(entities: &mut [Entity], i: usize, j: usize) -> (&mut Entity, &mut Entity) {
    let (head, tail) = entities.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

/// Collision test and response for one pair
fn resolve_pair(a: &mut Entity, b: &mut Entity) -> Option<WorldEvent> {
    if !a.is_active() || !b.is_active() {
        return None;
    }
    if a.is_immovable() && b.is_immovable() {
        return None;
    }
    let (box_a, box_b) = (a.bounds()?, b.bounds()?);
    if !box_a.intersects(&box_b) {
        return None;
    }

    let (caps_a, caps_b) = (a.capabilities(), b.capabilities());
    if !(caps_a.solid && caps_b.solid) {
        return Some(trigger_overlap(a, b));
    }

    let mtv = box_a.minimum_translation_vector(&box_b)?;
    let normal = mtv.normalize();

    if a.is_immovable() {
        push(b, -mtv, -normal);
    } else if b.is_immovable() {
        push(a, mtv, normal);
    } else {
        push(a, mtv * 0.5, normal);
        push(b, mtv * -0.5, -normal);
    }
    settle(a, b, normal);

    trace!("Collision '{}' <-> '{}'", a.id(), b.id());
    Some(WorldEvent::Collision {
        a: a.id().clone(),
        b: b.id().clone(),
        normal,
    })
}

/// Non-solid contact: pickups and plain overlaps
fn trigger_overlap(a: &mut Entity, b: &mut Entity) -> WorldEvent {
    let (caps_a, caps_b) = (a.capabilities(), b.capabilities());
    if caps_a.collector && caps_b.collectible {
        b.deactivate();
        debug!("'{}' collected '{}'", a.id(), b.id());
        return WorldEvent::Collected {
            item: b.id().clone(),
            collector: a.id().clone(),
        };
    }
    if caps_b.collector && caps_a.collectible {
        a.deactivate();
        debug!("'{}' collected '{}'", b.id(), a.id());
        return WorldEvent::Collected {
            item: a.id().clone(),
            collector: b.id().clone(),
        };
    }
    WorldEvent::Overlap {
        a: a.id().clone(),
        b: b.id().clone(),
    }
}

/// Move `entity` by `offset` and damp its velocity against the contact.
///
/// Velocity into the surface is reflected and scaled by restitution; the
/// tangential part is scaled by `1 - friction`.
fn push(entity: &mut Entity, offset: Vector, normal: Vector) {
    entity.translate(offset);

    let velocity = entity.velocity();
    let into = velocity.dot(normal);
    let normal_part = normal * into;
    let tangent_part = velocity - normal_part;

    let normal_part = if into < 0.0 {
        normal_part * -entity.restitution
    } else {
        normal_part
    };
    let tangent_part = tangent_part * (1.0 - entity.friction).clamp(0.0, 1.0);
    entity.set_velocity(normal_part + tangent_part);
}

/// Nudge a just-resolved pair apart when rounding (split halves, collider
/// offsets) left their boxes a hair inside each other.
fn settle(a: &mut Entity, b: &mut Entity, normal: Vector) {
    let mut slop = None;
    for _ in 0..MAX_SEPARATION_STEPS {
        let (Some(box_a), Some(box_b)) = (a.bounds(), b.bounds()) else {
            return;
        };
        if !box_a.intersects(&box_b) {
            return;
        }
        let step = *slop.get_or_insert_with(|| box_a.separation_slop(&box_b));
        if !a.is_immovable() {
            a.translate(normal * step);
        }
        if !b.is_immovable() {
            b.translate(normal * -step);
        }
        slop = Some(step * 2.0);
    }
}

/// Clamp the entity's box into `bounds`, bouncing on each clamped axis
fn constrain_to_bounds(entity: &mut Entity, bounds: &Aabb) {
    let (center, half) = match entity.bounds() {
        Some(b) => (b.center, b.half_size()),
        None => (entity.position(), Vector::ZERO),
    };
    let (min, max) = (bounds.min(), bounds.max());

    let mut correction = Vector::ZERO;
    let mut clamped = Vec::with_capacity(2);
    for axis in [Axis::X, Axis::Y] {
        let lo = min.component(axis) + half.component(axis);
        let hi = max.component(axis) - half.component(axis);
        let c = center.component(axis);
        // Bigger than the world on this axis: center it
        let target = if lo > hi { (lo + hi) * 0.5 } else { c.max(lo).min(hi) };
        if target != c {
            correction.set_component(axis, target - c);
            clamped.push(axis);
        }
    }

    if clamped.is_empty() {
        return;
    }
    entity.translate(correction);
    let restitution = entity.restitution;
    for axis in clamped {
        let v = entity.velocity().component(axis);
        entity.set_velocity_axis(axis, -v * restitution);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Collider;
    use crate::render::{RecordingSurface, RenderContext};
    use std::cell::RefCell;
    use std::rc::Rc;

    const DT: f64 = 1.0 / 60.0;

    fn world() -> World {
        World::default()
    }

    fn crate_box(id: &str, position: Vector) -> Entity {
        Entity::new_dynamic(id, position, 1.0).with_size(Vector::new(4.0, 4.0))
    }

    /// Renderer double that logs lifecycle calls
    struct Probe {
        id: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Renderer for Probe {
        fn initialize(&mut self, _context: &RenderContext) {
            self.log.borrow_mut().push(format!("init:{}", self.id));
        }
        fn render(&mut self, _entity: &Entity, _surface: &mut dyn Surface) {
            self.log.borrow_mut().push(format!("render:{}", self.id));
        }
        fn set_debug_mode(&mut self, _enabled: bool) {}
        fn destroy(&mut self) {
            self.log.borrow_mut().push(format!("destroy:{}", self.id));
        }
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut w = world();
        w.add_entity(Entity::new_static("well", Vector::new(1.0, 1.0))).unwrap();
        let err = w.add_entity(Entity::new_static("well", Vector::new(2.0, 2.0))).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateId(EntityId::from("well")));
        assert_eq!(w.entity_count(), 1);
        assert_eq!(w.get_entity("well").unwrap().position(), Vector::new(1.0, 1.0));
    }

    #[test]
    fn test_gravity_matches_closed_form() {
        let mut w = world();
        let g = 9.8;
        w.set_gravity(Vector::new(0.0, g));
        w.add_entity(Entity::new_dynamic("apple", Vector::ZERO, 2.0)).unwrap();

        let mut surface = RecordingSurface::new();
        let n = 120;
        for _ in 0..n {
            w.step(DT, &mut surface);
        }

        let e = w.get_entity("apple").unwrap();
        let n = n as f64;
        let expected_v = g * n * DT;
        // Semi-implicit Euler: p_n = g dt^2 n(n+1)/2
        let expected_p = g * DT * DT * n * (n + 1.0) / 2.0;
        assert!((e.velocity().y - expected_v).abs() < 1e-9);
        assert!((e.position().y - expected_p).abs() < 1e-9);
        assert_eq!(e.position().x, 0.0);
        // Forces are recomputed each tick, never accumulated
        assert_eq!(e.acceleration(), Vector::ZERO);
    }

    #[test]
    fn test_static_entity_never_moves() {
        let mut w = world();
        w.set_gravity(Vector::new(0.0, 50.0));
        w.add_entity(Entity::new_static("barn", Vector::new(3.0, 4.0)).with_size(Vector::new(10.0, 10.0)))
            .unwrap();
        let mut surface = RecordingSurface::new();
        for _ in 0..10 {
            w.step(DT, &mut surface);
        }
        let barn = w.get_entity("barn").unwrap();
        assert_eq!(barn.position(), Vector::new(3.0, 4.0));
        assert_eq!(barn.velocity(), Vector::ZERO);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut w = world();
        w.add_entity(Entity::new_dynamic("cart", Vector::ZERO, 1.0).with_velocity(Vector::new(30.0, 0.0)))
            .unwrap();
        let mut surface = RecordingSurface::new();
        w.update(0.0, &mut surface);
        w.update(5.0, &mut surface);
        let x = w.get_entity("cart").unwrap().position().x;
        assert!((x - 1.0).abs() < 1e-9, "moved {} instead of one clamped step", x);
    }

    #[test]
    fn test_dynamic_lands_on_static() {
        let mut w = world();
        w.add_entity(Entity::new_static("ground", Vector::new(0.0, 10.0)).with_size(Vector::new(100.0, 10.0)))
            .unwrap();
        w.add_entity(crate_box("box", Vector::new(0.0, 1.0)).with_velocity(Vector::new(0.0, 192.0)).with_friction(0.0))
            .unwrap();

        let mut surface = RecordingSurface::new();
        w.step(1.0 / 32.0, &mut surface);

        let ground = w.get_entity("ground").unwrap();
        let boxed = w.get_entity("box").unwrap();
        assert_eq!(ground.position(), Vector::new(0.0, 10.0));
        assert!(!boxed.bounds().unwrap().intersects(&ground.bounds().unwrap()));
        assert_eq!(boxed.position(), Vector::new(0.0, 3.0));
        // Reflected and scaled by restitution
        assert!((boxed.velocity().y + 192.0 * boxed.restitution).abs() < 1e-9);

        let events = w.drain_events();
        assert!(events.iter().any(|e| matches!(e, WorldEvent::Collision { normal, .. } if normal.y != 0.0)));
    }

    #[test]
    fn test_custom_tag_keeps_body_solid() {
        let mut w = world();
        w.set_gravity(Vector::new(0.0, 100.0));
        w.add_entity(Entity::new_static("ground", Vector::new(0.0, 10.0)).with_size(Vector::new(100.0, 10.0)))
            .unwrap();
        w.add_entity(crate_box("plain", Vector::new(-20.0, 0.0))).unwrap();
        w.add_entity(crate_box("labelled", Vector::new(20.0, 0.0)).with_tag(Tag::from("red")))
            .unwrap();

        let mut surface = RecordingSurface::new();
        for _ in 0..120 {
            w.step(DT, &mut surface);
        }

        let plain = w.get_entity("plain").unwrap().position().y;
        let labelled = w.get_entity("labelled").unwrap().position().y;
        assert!(labelled < 3.5, "labelled box fell to y={}", labelled);
        assert!((plain - labelled).abs() < 1e-9);
    }

    #[test]
    fn test_dynamic_pair_splits_correction() {
        let mut w = world();
        w.add_entity(crate_box("a", Vector::ZERO)).unwrap();
        w.add_entity(crate_box("b", Vector::new(3.0, 0.0))).unwrap();

        let mut surface = RecordingSurface::new();
        w.step(DT, &mut surface);

        let a = w.get_entity("a").unwrap();
        let b = w.get_entity("b").unwrap();
        assert!((a.position().x + 0.5).abs() < 1e-9);
        assert!((b.position().x - 3.5).abs() < 1e-9);
        assert!(!a.bounds().unwrap().intersects(&b.bounds().unwrap()));
    }

    #[test]
    fn test_random_dynamic_pairs_end_apart() {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut surface = RecordingSurface::new();
        let mut resolved = 0;
        for _ in 0..2_000 {
            let mut w = world();
            let size = |rng: &mut rand::rngs::StdRng| Vector::new(rng.gen_range(0.1..30.0), rng.gen_range(0.1..30.0));
            let a = Entity::new_dynamic("a", Vector::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)), 1.0)
                .with_size(size(&mut rng));
            let b = Entity::new_dynamic("b", Vector::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)), 1.0)
                .with_size(size(&mut rng));
            let touching = a.bounds().unwrap().intersects(&b.bounds().unwrap());
            w.add_entity(a).unwrap();
            w.add_entity(b).unwrap();
            w.step(0.0, &mut surface);

            let box_a = w.get_entity("a").unwrap().bounds().unwrap();
            let box_b = w.get_entity("b").unwrap().bounds().unwrap();
            assert!(!box_a.intersects(&box_b), "{:?} and {:?} still overlap", box_a, box_b);
            if touching {
                resolved += 1;
                // A settled pair raises no new contact on the next tick
                w.drain_events();
                w.step(0.0, &mut surface);
                assert!(w.drain_events().is_empty());
            }
        }
        assert!(resolved > 100);
    }

    #[test]
    fn test_friction_slows_sliding_contact() {
        let mut w = world();
        w.add_entity(Entity::new_static("floor", Vector::new(0.0, 10.0)).with_size(Vector::new(100.0, 10.0)))
            .unwrap();
        w.add_entity(
            crate_box("sled", Vector::new(0.0, 4.0))
                .with_velocity(Vector::new(10.0, 30.0))
                .with_friction(0.5),
        )
        .unwrap();
        let mut surface = RecordingSurface::new();
        w.step(DT, &mut surface);
        let vx = w.get_entity("sled").unwrap().velocity().x;
        assert!((vx - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_entities_without_collider_pass_through() {
        let mut w = world();
        w.add_entity(Entity::new_static("rock", Vector::ZERO).with_size(Vector::new(10.0, 10.0))).unwrap();
        w.add_entity(Entity::new_dynamic("ghost", Vector::ZERO, 1.0)).unwrap();
        let mut surface = RecordingSurface::new();
        w.step(DT, &mut surface);
        assert_eq!(w.get_entity("ghost").unwrap().position(), Vector::ZERO);
        assert!(w.drain_events().is_empty());
    }

    #[test]
    fn test_world_bounds_clamp_and_bounce() {
        let mut w = world();
        w.set_world_bounds(Vector::ZERO, Vector::new(100.0, 100.0)).unwrap();
        w.add_entity(crate_box("ball", Vector::new(99.0, 50.0)).with_velocity(Vector::new(20.0, 0.0))).unwrap();

        let mut surface = RecordingSurface::new();
        w.step(DT, &mut surface);

        let ball = w.get_entity("ball").unwrap();
        let b = ball.bounds().unwrap();
        assert!(b.max().x <= 100.0 + 1e-9 && b.min().x >= 0.0);
        assert!((ball.position().x - 98.0).abs() < 1e-9);
        assert!(ball.velocity().x < 0.0);
        assert!((ball.velocity().x + 20.0 * ball.restitution).abs() < 1e-9);
        assert_eq!(ball.velocity().y, 0.0);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let mut w = world();
        assert!(w.set_world_bounds(Vector::new(10.0, 0.0), Vector::new(0.0, 10.0)).is_err());
        assert!(w.world_bounds().is_none());
    }

    #[test]
    fn test_reset_changes_is_idempotent() {
        let mut w = world();
        w.add_entity(crate_box("a", Vector::ZERO)).unwrap();
        assert!(w.has_changes());
        w.reset_all_changes();
        assert!(!w.has_changes());
        w.reset_all_changes();
        assert!(!w.has_changes());
    }

    #[test]
    fn test_render_skipped_when_nothing_changed() {
        let mut w = world();
        w.add_entity(Entity::new_static("barn", Vector::ZERO).with_size(Vector::new(8.0, 8.0))).unwrap();
        let mut surface = RecordingSurface::new();

        assert!(w.step(DT, &mut surface));
        assert!(!w.has_changes());
        assert!(!w.step(DT, &mut surface));
        assert_eq!(surface.count_clears(), 1);

        w.request_full_render();
        assert!(w.step(DT, &mut surface));
        assert_eq!(w.render_count(), 2);

        w.get_entity_mut("barn").unwrap().translate(Vector::new(1.0, 0.0));
        assert!(w.step(DT, &mut surface));
    }

    #[test]
    fn test_remove_is_deferred_to_cleanup() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut w = world();
        w.spawn(crate_box("cow", Vector::ZERO), Box::new(Probe { id: "cow", log: log.clone() }))
            .unwrap();

        assert!(w.remove_entity("cow"));
        assert!(!w.remove_entity("cow"));
        // Still registered until the tick's cleanup stage
        assert!(w.get_entity("cow").is_some());
        assert_eq!(w.get_all_entities().count(), 0);

        let mut surface = RecordingSurface::new();
        w.step(DT, &mut surface);
        assert!(w.get_entity("cow").is_none());
        assert!(!w.renderers().contains(&EntityId::from("cow")));
        assert!(log.borrow().contains(&"destroy:cow".to_string()));
        assert!(!log.borrow().contains(&"render:cow".to_string()));
        assert!(w.drain_events().contains(&WorldEvent::Removed(EntityId::from("cow"))));
    }

    #[test]
    fn test_index_survives_cleanup() {
        let mut w = world();
        for id in ["a", "b", "c"] {
            w.add_entity(crate_box(id, Vector::new(0.0, 0.0)).with_collider(Collider::new(Vector::ZERO)))
                .unwrap();
        }
        w.remove_entity("a");
        let mut surface = RecordingSurface::new();
        w.step(DT, &mut surface);
        assert_eq!(w.get_entity("c").unwrap().id().as_str(), "c");
        assert_eq!(w.entity_count(), 2);
    }

    #[test]
    fn test_player_collects_item() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut w = world();
        w.add_entity(crate_box("farmer", Vector::ZERO).with_tag(Tag::Player)).unwrap();
        w.spawn(
            Entity::new_static("carrot", Vector::new(1.0, 0.0))
                .with_size(Vector::new(2.0, 2.0))
                .with_tag(Tag::Collectible),
            Box::new(Probe { id: "carrot", log: log.clone() }),
        )
        .unwrap();

        let mut surface = RecordingSurface::new();
        w.step(DT, &mut surface);

        assert!(w.get_entity("carrot").is_none());
        assert_eq!(w.get_entity("farmer").unwrap().position(), Vector::ZERO);
        let events = w.drain_events();
        assert!(events.contains(&WorldEvent::Collected {
            item: EntityId::from("carrot"),
            collector: EntityId::from("farmer"),
        }));
        assert!(log.borrow().contains(&"destroy:carrot".to_string()));
    }

    #[test]
    fn test_decoration_overlap_is_trigger_only() {
        let mut w = world();
        w.add_entity(Entity::new_static("flowers", Vector::ZERO).with_size(Vector::new(4.0, 4.0)).with_tag(Tag::Decoration))
            .unwrap();
        w.add_entity(crate_box("farmer", Vector::new(1.0, 0.0)).with_tag(Tag::Player)).unwrap();
        let mut surface = RecordingSurface::new();
        w.step(DT, &mut surface);
        assert_eq!(w.get_entity("farmer").unwrap().position(), Vector::new(1.0, 0.0));
        assert!(matches!(w.drain_events().as_slice(), [WorldEvent::Overlap { .. }]));
    }

    #[test]
    fn test_queries() {
        let mut w = world();
        w.add_entity(Entity::new_static("house", Vector::new(0.0, 0.0)).with_tag(Tag::Structure)).unwrap();
        w.add_entity(Entity::new_static("barn", Vector::new(30.0, 40.0)).with_tag(Tag::Structure)).unwrap();
        w.add_entity(Entity::new_static("tree", Vector::new(3.0, 4.0)).with_tag(Tag::Decoration)).unwrap();

        assert_eq!(w.get_entities_by_tag(&Tag::Structure).len(), 2);
        let near = w.get_entities_in_radius(Vector::ZERO, 5.0);
        let ids: Vec<_> = near.iter().map(|e| e.id().as_str()).collect();
        assert_eq!(ids, vec!["house", "tree"]);
        assert_eq!(w.get_all_entities().count(), 3);
    }

    #[test]
    fn test_pointer_hover_and_click() {
        let mut w = world();
        w.add_entity(Entity::new_static("house", Vector::new(10.0, 10.0)).with_size(Vector::new(8.0, 8.0)).with_tag(Tag::Structure))
            .unwrap();
        w.add_entity(Entity::new_static("bush", Vector::new(30.0, 10.0)).with_size(Vector::new(8.0, 8.0)).with_tag(Tag::Decoration))
            .unwrap();
        w.reset_all_changes();

        w.handle_pointer(PointerEvent::moved(Vector::new(11.0, 11.0)));
        assert_eq!(w.hovered().map(|id| id.as_str()), Some("house"));
        assert!(w.get_entity("house").unwrap().is_highlighted());
        assert!(w.has_changes());

        // Decorations are not clickable
        w.handle_pointer(PointerEvent::moved(Vector::new(30.0, 10.0)));
        assert!(w.hovered().is_none());
        assert!(!w.get_entity("house").unwrap().is_highlighted());

        w.handle_pointer(PointerEvent::click(Vector::new(10.0, 10.0)));
        w.handle_pointer(PointerEvent::click(Vector::new(30.0, 10.0)));
        let events = w.drain_events();
        assert_eq!(
            events,
            vec![
                WorldEvent::HoverEnter(EntityId::from("house")),
                WorldEvent::HoverLeave(EntityId::from("house")),
                WorldEvent::Clicked {
                    id: EntityId::from("house"),
                    point: Vector::new(10.0, 10.0)
                },
            ]
        );
    }

    #[test]
    fn test_debug_mode_forces_render() {
        let mut w = world();
        w.add_entity(Entity::new_static("barn", Vector::ZERO)).unwrap();
        let mut surface = RecordingSurface::new();
        w.step(DT, &mut surface);
        assert!(!w.step(DT, &mut surface));
        w.set_debug_mode(true);
        assert!(w.step(DT, &mut surface));
        assert!(w.renderers().context().debug);
    }
}
