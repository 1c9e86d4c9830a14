//! Homestead: a small farm simulation
//!
//! Entities live in a 2D world with gravity, AABB collisions and bounds.
//! Each one is drawn by a pluggable renderer; characters play sprite sheet
//! animations driven by a state machine. The `homestead` binary hosts it
//! natively or in the browser.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod game;
pub mod render;
pub mod anim;
pub mod level;
