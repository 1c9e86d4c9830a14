//! Character Animation
//!
//! Sprite-sheet state machines. A `CharacterAnimation` owns a set of
//! `AnimationState`s and switches between them in response to events,
//! state hooks, and loop completion. Switching is always deferred to the
//! next `update` so the visible frame never changes mid-draw.

pub mod state;
pub mod machine;

pub use state::{AnimationState, FrameRect, StateBehavior, Looping, PlayOnce};
pub use machine::{AnimationError, CharacterAnimation, PendingTransition, Sprite};
