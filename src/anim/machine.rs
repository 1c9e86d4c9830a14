//! Character Animation State Machine
//!
//! Transition requests never run immediately. `set_state`, `transition_to`,
//! `trigger` and state hooks only fill a one-slot mailbox; the next
//! `update` consumes it before anything else happens. A newer request
//! overwrites an unconsumed older one.
//!
//! Update cycle:
//! 1. Pending transition? Run it (exit old, swap, enter new, refresh the
//!    visible frame) and stop there.
//! 2. Otherwise run the current state's `on_update` and max-duration guard;
//!    a requested transition is queued for the next cycle.
//! 3. If nothing is pending, advance the frame once its duration elapsed.
//!    Wrapping back to frame 0 fires the loop hooks.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::state::{AnimationState, FrameRect};

/// Slack for accumulated float time when comparing against frame duration
const TIME_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationError {
    UnknownState(String),
    UnknownEvent { state: String, event: String },
    DuplicateState(String),
    EmptyFrames(String),
    /// Transition target that no state in the machine provides
    DanglingTransition { state: String, target: String },
}

impl std::fmt::Display for AnimationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnimationError::UnknownState(id) => write!(f, "Unknown animation state '{}'", id),
            AnimationError::UnknownEvent { state, event } => {
                write!(f, "State '{}' has no transition for event '{}'", state, event)
            }
            AnimationError::DuplicateState(id) => write!(f, "Animation state '{}' already exists", id),
            AnimationError::EmptyFrames(id) => write!(f, "Animation state '{}' has no frames", id),
            AnimationError::DanglingTransition { state, target } => {
                write!(f, "State '{}' transitions to unknown state '{}'", state, target)
            }
        }
    }
}

impl std::error::Error for AnimationError {}

/// Queued state change
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransition {
    pub target: String,
    pub reset_frame: bool,
}

/// What a renderer needs to draw the character
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sprite {
    /// Sheet region currently visible
    pub frame: Option<FrameRect>,
    pub flip_x: bool,
}

type LoopCallback = Box<dyn FnMut(&str)>;

pub struct CharacterAnimation {
    states: HashMap<String, AnimationState>,
    current: Option<String>,
    previous: Option<String>,
    pending: Option<PendingTransition>,
    sprite: Sprite,
    /// Accumulated update time (seconds)
    now: f64,
    on_animation_loop: Option<LoopCallback>,
}

impl CharacterAnimation {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            current: None,
            previous: None,
            pending: None,
            sprite: Sprite::default(),
            now: 0.0,
            on_animation_loop: None,
        }
    }

    /// Register a state. Ids are unique and states need at least one frame.
    pub fn add_state(&mut self, state: AnimationState) -> Result<(), AnimationError> {
        if self.states.contains_key(state.id()) {
            warn!("Ignoring duplicate animation state '{}'", state.id());
            return Err(AnimationError::DuplicateState(state.id().to_string()));
        }
        if state.frame_count() == 0 {
            warn!("Ignoring animation state '{}' without frames", state.id());
            return Err(AnimationError::EmptyFrames(state.id().to_string()));
        }
        self.states.insert(state.id().to_string(), state);
        Ok(())
    }

    /// Check every transition table entry and max-duration fallback refers
    /// to a registered state. Call after all states are added.
    pub fn validate(&self) -> Result<(), AnimationError> {
        for state in self.states.values() {
            let fallback = state.max_duration().map(|(_, id)| id);
            for target in state.transition_targets().chain(fallback) {
                if !self.states.contains_key(target) {
                    return Err(AnimationError::DanglingTransition {
                        state: state.id().to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn has_state(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    /// Queue a switch to `id`. Unknown ids are rejected and the machine
    /// keeps whatever it was doing.
    pub fn set_state(&mut self, id: &str, reset_frame: bool) -> Result<(), AnimationError> {
        if !self.states.contains_key(id) {
            warn!("Rejected transition to unknown animation state '{}'", id);
            return Err(AnimationError::UnknownState(id.to_string()));
        }
        if let Some(old) = &self.pending {
            debug!("Pending transition to '{}' replaced by '{}'", old.target, id);
        }
        self.pending = Some(PendingTransition {
            target: id.to_string(),
            reset_frame,
        });
        Ok(())
    }

    /// Queue a switch that keeps the current frame index
    pub fn transition_to(&mut self, id: &str) -> Result<(), AnimationError> {
        self.set_state(id, false)
    }

    /// Look `event` up in the current state's transition table and queue
    /// the target.
    pub fn trigger(&mut self, event: &str) -> Result<(), AnimationError> {
        let target = self
            .current_state()
            .and_then(|s| s.transition_for(event))
            .map(|t| t.to_string());
        match target {
            Some(target) => self.set_state(&target, true),
            None => {
                let state = self.current.clone().unwrap_or_default();
                warn!("Animation state '{}' ignores event '{}'", state, event);
                Err(AnimationError::UnknownEvent {
                    state,
                    event: event.to_string(),
                })
            }
        }
    }

    /// True when the current state has a transition for `event`
    pub fn accepts(&self, event: &str) -> bool {
        self.current_state()
            .map(|s| s.transition_for(event).is_some())
            .unwrap_or(false)
    }

    /// Advance the machine by `delta_time` seconds
    pub fn update(&mut self, delta_time: f64) {
        if delta_time.is_finite() && delta_time > 0.0 {
            self.now += delta_time;
        }

        if let Some(pending) = self.pending.take() {
            self.apply_transition(pending);
            return;
        }

        let Some(current_id) = self.current.clone() else {
            return;
        };
        let now = self.now;

        // Hooks and guard
        let requested = match self.states.get_mut(&current_id) {
            Some(state) => {
                let mut next = state.on_update(delta_time);
                if next.is_none() {
                    if let Some((limit, fallback)) = state.max_duration() {
                        if now - state.entered_at + TIME_EPSILON >= limit && fallback != current_id {
                            debug!("Animation state '{}' hit its {}s limit", current_id, limit);
                            next = Some(fallback.to_string());
                        }
                    }
                }
                next
            }
            None => return,
        };
        if let Some(target) = requested {
            let _ = self.set_state(&target, true);
        }

        // Hold the frame while a swap is queued
        if self.pending.is_some() {
            return;
        }

        let wrapped = match self.states.get_mut(&current_id) {
            Some(state) => {
                let count = state.frame_count();
                let duration = state.frame_duration();
                if count == 0 || now - state.last_frame_time + TIME_EPSILON < duration {
                    return;
                }
                state.frame_index = (state.frame_index + 1) % count;
                state.last_frame_time += duration;
                // After a stall, don't try to catch up frame by frame
                if now - state.last_frame_time >= duration {
                    state.last_frame_time = now;
                }
                state.frame_index == 0
            }
            None => return,
        };
        self.refresh_sprite();

        if wrapped {
            self.on_loop_completed(&current_id);
        }
    }

    fn on_loop_completed(&mut self, state_id: &str) {
        let follow_up = self
            .states
            .get_mut(state_id)
            .and_then(|s| s.on_animation_loop_completed());
        if let Some(callback) = self.on_animation_loop.as_mut() {
            callback(state_id);
        }
        if let Some(target) = follow_up {
            let _ = self.set_state(&target, true);
        }
    }

    fn apply_transition(&mut self, pending: PendingTransition) {
        if !self.states.contains_key(&pending.target) {
            warn!("Dropping transition to vanished state '{}'", pending.target);
            return;
        }

        let old_id = self.current.clone();
        let mut carried_frame = 0;
        if let Some(old) = old_id.as_ref().and_then(|id| self.states.get_mut(id)) {
            carried_frame = old.frame_index;
            old.on_exit();
        }

        let now = self.now;
        if let Some(state) = self.states.get_mut(&pending.target) {
            state.on_enter();
            state.frame_index = if pending.reset_frame {
                0
            } else {
                carried_frame % state.frame_count().max(1)
            };
            state.last_frame_time = now;
            state.entered_at = now;
        }

        debug!(
            "Animation {} -> {}",
            old_id.as_deref().unwrap_or("<none>"),
            pending.target
        );
        self.previous = old_id;
        self.current = Some(pending.target);
        self.refresh_sprite();
    }

    fn refresh_sprite(&mut self) {
        self.sprite.frame = self.current_state().and_then(|s| s.current_frame());
    }

    fn current_state(&self) -> Option<&AnimationState> {
        self.current.as_ref().and_then(|id| self.states.get(id))
    }

    pub fn get_current_state_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn get_previous_state_id(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    pub fn pending_transition(&self) -> Option<&PendingTransition> {
        self.pending.as_ref()
    }

    pub fn has_pending_transition(&self) -> bool {
        self.pending.is_some()
    }

    /// Frame index of the current state (0 before any state is entered)
    pub fn frame_index(&self) -> usize {
        self.current_state().map(|s| s.frame_index()).unwrap_or(0)
    }

    pub fn get_sprite(&self) -> &Sprite {
        &self.sprite
    }

    pub fn set_flip_x(&mut self, flip: bool) {
        self.sprite.flip_x = flip;
    }

    /// Hook fired with the state id whenever any state's frames wrap
    pub fn set_on_animation_loop(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_animation_loop = Some(Box::new(callback));
    }

    pub fn clear_on_animation_loop(&mut self) {
        self.on_animation_loop = None;
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }
}

impl Default for CharacterAnimation {
    fn default() -> Self {
        Self::new()
    }
}
