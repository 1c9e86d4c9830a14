//! Animation States
//!
//! A state is a strip of sprite-sheet frames plus the rules for leaving it:
//! a transition table keyed by event name, optional behavior hooks, and an
//! optional max-duration guard that falls back to a default state.

use std::collections::HashMap;
use serde::{Serialize, Deserialize};

/// Region of a sprite sheet, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl FrameRect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// `count` cells of `w`x`h` laid out left to right on sheet row `row`
    pub fn strip(row: u32, count: u32, w: f32, h: f32) -> Vec<FrameRect> {
        (0..count)
            .map(|i| FrameRect::new(i as f32 * w, row as f32 * h, w, h))
            .collect()
    }
}

/// Per-state hooks. Every method has a no-op default.
///
/// Returning `Some(id)` from `on_update` or `on_animation_loop_completed`
/// queues a transition; it runs at the start of the next machine update.
pub trait StateBehavior {
    fn on_enter(&mut self) {}

    fn on_update(&mut self, _delta_time: f64) -> Option<String> {
        None
    }

    fn on_exit(&mut self) {}

    fn on_animation_loop_completed(&mut self) -> Option<String> {
        None
    }
}

/// Plays forever
#[derive(Debug, Default, Clone, Copy)]
pub struct Looping;

impl StateBehavior for Looping {}

/// Plays once, then moves to `then`
#[derive(Debug, Clone)]
pub struct PlayOnce {
    pub then: String,
}

impl StateBehavior for PlayOnce {
    fn on_animation_loop_completed(&mut self) -> Option<String> {
        Some(self.then.clone())
    }
}

/// One state of a `CharacterAnimation`. Owned by exactly one machine.
pub struct AnimationState {
    id: String,
    /// event name -> target state id
    transitions: HashMap<String, String>,
    frames: Vec<FrameRect>,
    /// Seconds each frame stays visible
    frame_duration: f64,
    pub(crate) frame_index: usize,
    /// Machine time of the last frame change
    pub(crate) last_frame_time: f64,
    /// Machine time the state was entered
    pub(crate) entered_at: f64,
    /// (limit in seconds, fallback state id)
    max_duration: Option<(f64, String)>,
    behavior: Box<dyn StateBehavior>,
}

impl AnimationState {
    /// Looping state. Non-positive frame durations are clamped to 1ms.
    pub fn new(id: impl Into<String>, frames: Vec<FrameRect>, frame_duration: f64) -> Self {
        Self {
            id: id.into(),
            transitions: HashMap::new(),
            frames,
            frame_duration: frame_duration.max(0.001),
            frame_index: 0,
            last_frame_time: 0.0,
            entered_at: 0.0,
            max_duration: None,
            behavior: Box::new(Looping),
        }
    }

    /// Go to `target` when `event` is triggered in this state
    pub fn with_transition(mut self, event: impl Into<String>, target: impl Into<String>) -> Self {
        self.transitions.insert(event.into(), target.into());
        self
    }

    pub fn with_behavior(mut self, behavior: impl StateBehavior + 'static) -> Self {
        self.behavior = Box::new(behavior);
        self
    }

    /// Play one cycle, then go to `then`
    pub fn play_once(self, then: impl Into<String>) -> Self {
        self.with_behavior(PlayOnce { then: then.into() })
    }

    /// Fall back to `fallback` after `seconds` in this state
    pub fn with_max_duration(mut self, seconds: f64, fallback: impl Into<String>) -> Self {
        self.max_duration = Some((seconds, fallback.into()));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn frames(&self) -> &[FrameRect] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_duration(&self) -> f64 {
        self.frame_duration
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn current_frame(&self) -> Option<FrameRect> {
        self.frames.get(self.frame_index).copied()
    }

    pub fn transition_for(&self, event: &str) -> Option<&str> {
        self.transitions.get(event).map(|s| s.as_str())
    }

    pub fn transition_targets(&self) -> impl Iterator<Item = &str> {
        self.transitions.values().map(|s| s.as_str())
    }

    pub fn max_duration(&self) -> Option<(f64, &str)> {
        self.max_duration.as_ref().map(|(secs, id)| (*secs, id.as_str()))
    }

    pub fn on_enter(&mut self) {
        self.behavior.on_enter();
    }

    pub fn on_update(&mut self, delta_time: f64) -> Option<String> {
        self.behavior.on_update(delta_time)
    }

    pub fn on_exit(&mut self) {
        self.behavior.on_exit();
    }

    pub fn on_animation_loop_completed(&mut self) -> Option<String> {
        self.behavior.on_animation_loop_completed()
    }
}

impl std::fmt::Debug for AnimationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationState")
            .field("id", &self.id)
            .field("frames", &self.frames.len())
            .field("frame_duration", &self.frame_duration)
            .field("frame_index", &self.frame_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_layout() {
        let frames = FrameRect::strip(2, 3, 16.0, 24.0);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], FrameRect::new(0.0, 48.0, 16.0, 24.0));
        assert_eq!(frames[2], FrameRect::new(32.0, 48.0, 16.0, 24.0));
    }

    #[test]
    fn test_transition_table() {
        let s = AnimationState::new("idle", FrameRect::strip(0, 2, 8.0, 8.0), 0.1)
            .with_transition("move", "walk")
            .with_transition("sleep", "nap");
        assert_eq!(s.transition_for("move"), Some("walk"));
        assert_eq!(s.transition_for("jump"), None);
        assert_eq!(s.transition_targets().count(), 2);
    }

    #[test]
    fn test_play_once_requests_follow_up() {
        let mut s = AnimationState::new("hoe", FrameRect::strip(0, 4, 8.0, 8.0), 0.1).play_once("idle");
        assert_eq!(s.on_update(0.1), None);
        assert_eq!(s.on_animation_loop_completed(), Some("idle".to_string()));
    }

    #[test]
    fn test_frame_duration_is_clamped() {
        let s = AnimationState::new("x", vec![FrameRect::default()], 0.0);
        assert!(s.frame_duration() > 0.0);
    }
}
