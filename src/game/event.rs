//! World Events
//!
//! Systems inside the tick don't call game logic directly. They queue
//! events, and the host drains them after `World::update`:
//! 1. Collision pass detects a player over a coin -> `Collected`
//! 2. Host reads `Collected` -> credits the wallet, plays a sound
//!
//! Pointer input flows the other way: the host maps screen coordinates to
//! world space and hands the world a `PointerEvent`.

use super::entity::EntityId;
use super::vector::Vector;

/// A queue for events of a single type.
/// Events are collected during the frame and drained at specific points.
#[derive(Debug)]
pub struct EventQueue<T> {
    events: Vec<T>,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Send an event (add to queue)
    pub fn send(&mut self, event: T) {
        self.events.push(event);
    }

    /// Iterate over events without clearing
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.events.iter()
    }

    /// Drain all events (returns iterator and clears queue)
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.events.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events without processing
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that happened in the world during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// Two solid entities were pushed apart. `normal` is the unit push
    /// direction applied to `a`.
    Collision {
        a: EntityId,
        b: EntityId,
        normal: Vector,
    },
    /// A non-solid entity overlapped another entity
    Overlap { a: EntityId, b: EntityId },
    /// A collector picked up a collectible (which is now inactive)
    Collected { item: EntityId, collector: EntityId },
    /// Entity left the registry during cleanup
    Removed(EntityId),
    /// Pointer started hovering a clickable entity
    HoverEnter(EntityId),
    /// Pointer stopped hovering a clickable entity
    HoverLeave(EntityId),
    /// Clickable entity was clicked
    Clicked { id: EntityId, point: Vector },
}

/// Kind of pointer signal supplied by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Move,
    Click,
}

/// Pointer signal already mapped into world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Vector,
    pub kind: PointerKind,
}

impl PointerEvent {
    pub fn moved(position: Vector) -> Self {
        Self { position, kind: PointerKind::Move }
    }

    pub fn click(position: Vector) -> Self {
        Self { position, kind: PointerKind::Click }
    }
}
