//! World file loading and saving
//!
//! World files are RON, either plain text or brotli-compressed.
//! - Reading: auto-detects the format from the first byte
//! - Writing: pretty RON, compressed on request

use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use tracing::warn;

use crate::game::Vector;
use super::{BodyKind, Visual, WorldConfig};

/// Validation limits to keep hostile files from exhausting memory
pub mod limits {
    /// Maximum entities in one world
    pub const MAX_ENTITIES: usize = 4096;
    /// Maximum animation sets in one world
    pub const MAX_ANIMATION_SETS: usize = 64;
    /// Maximum frames in one animation state
    pub const MAX_FRAMES: u32 = 256;
    /// Maximum length of ids, names and paths
    pub const MAX_STRING_LEN: usize = 256;
    /// Maximum coordinate magnitude
    pub const MAX_COORD: f64 = 1_000_000.0;
}

/// Error type for world file loading
#[derive(Debug)]
pub enum LevelError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    DecompressError(String),
    ValidationError(String),
}

impl From<std::io::Error> for LevelError {
    fn from(e: std::io::Error) -> Self {
        LevelError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for LevelError {
    fn from(e: ron::error::SpannedError) -> Self {
        LevelError::ParseError(e)
    }
}

impl From<ron::Error> for LevelError {
    fn from(e: ron::Error) -> Self {
        LevelError::SerializeError(e)
    }
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelError::IoError(e) => write!(f, "IO error: {}", e),
            LevelError::ParseError(e) => write!(f, "Parse error: {}", e),
            LevelError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            LevelError::DecompressError(e) => write!(f, "Decompress error: {}", e),
            LevelError::ValidationError(e) => write!(f, "Validation error: {}", e),
        }
    }
}

impl std::error::Error for LevelError {}

fn check_string(what: &str, s: &str) -> Result<(), LevelError> {
    if s.is_empty() {
        return Err(LevelError::ValidationError(format!("{} is empty", what)));
    }
    if s.len() > limits::MAX_STRING_LEN {
        return Err(LevelError::ValidationError(format!(
            "{} too long ({} > {})",
            what,
            s.len(),
            limits::MAX_STRING_LEN
        )));
    }
    Ok(())
}

fn check_vector(what: &str, v: Vector) -> Result<(), LevelError> {
    if !v.is_finite() || v.x.abs() > limits::MAX_COORD || v.y.abs() > limits::MAX_COORD {
        return Err(LevelError::ValidationError(format!(
            "{} out of range: ({}, {})",
            what, v.x, v.y
        )));
    }
    Ok(())
}

/// Check a config for values the simulation cannot handle.
///
/// Duplicate entity ids are allowed here; the world rejects the later ones
/// at build time.
pub fn validate_config(config: &WorldConfig) -> Result<(), LevelError> {
    check_string("world name", &config.name)?;
    check_vector("gravity", config.gravity)?;

    if let Some(bounds) = &config.bounds {
        check_vector("bounds min", bounds.min)?;
        check_vector("bounds max", bounds.max)?;
        if bounds.min.x >= bounds.max.x || bounds.min.y >= bounds.max.y {
            return Err(LevelError::ValidationError("bounds min must be below max".to_string()));
        }
    }
    if !(config.max_delta.is_finite() && config.max_delta > 0.0) {
        return Err(LevelError::ValidationError(format!("max_delta must be positive, got {}", config.max_delta)));
    }
    if !(config.time_scale.is_finite() && config.time_scale >= 0.0) {
        return Err(LevelError::ValidationError(format!("time_scale must be >= 0, got {}", config.time_scale)));
    }
    if config.view.0 == 0 || config.view.1 == 0 || config.view.0 > 4096 || config.view.1 > 4096 {
        return Err(LevelError::ValidationError(format!("view {:?} out of range", config.view)));
    }

    // Animation sets
    if config.animations.len() > limits::MAX_ANIMATION_SETS {
        return Err(LevelError::ValidationError(format!(
            "too many animation sets ({} > {})",
            config.animations.len(),
            limits::MAX_ANIMATION_SETS
        )));
    }
    let mut set_names = HashSet::new();
    for set in &config.animations {
        check_string("animation set name", &set.name)?;
        check_string("sprite sheet path", &set.sheet)?;
        if !set_names.insert(set.name.as_str()) {
            return Err(LevelError::ValidationError(format!("duplicate animation set '{}'", set.name)));
        }
        if !(set.cell.0 > 0.0 && set.cell.1 > 0.0) {
            return Err(LevelError::ValidationError(format!("animation set '{}' has an empty cell", set.name)));
        }
        if set.states.is_empty() {
            return Err(LevelError::ValidationError(format!("animation set '{}' has no states", set.name)));
        }

        let ids: HashSet<&str> = set.states.iter().map(|s| s.id.as_str()).collect();
        if ids.len() != set.states.len() {
            return Err(LevelError::ValidationError(format!("animation set '{}' repeats a state id", set.name)));
        }
        if !ids.contains(set.initial.as_str()) {
            return Err(LevelError::ValidationError(format!(
                "animation set '{}' starts in unknown state '{}'",
                set.name, set.initial
            )));
        }

        for state in &set.states {
            check_string("animation state id", &state.id)?;
            if state.frames == 0 || state.frames > limits::MAX_FRAMES {
                return Err(LevelError::ValidationError(format!(
                    "state '{}' must have 1..={} frames",
                    state.id,
                    limits::MAX_FRAMES
                )));
            }
            if !(state.frame_duration.is_finite() && state.frame_duration > 0.0) {
                return Err(LevelError::ValidationError(format!(
                    "state '{}' frame duration must be positive",
                    state.id
                )));
            }
            let targets = state
                .transitions
                .values()
                .chain(state.then.iter())
                .chain(state.max_duration.iter().map(|(_, fallback)| fallback));
            for target in targets {
                if !ids.contains(target.as_str()) {
                    return Err(LevelError::ValidationError(format!(
                        "state '{}' refers to unknown state '{}'",
                        state.id, target
                    )));
                }
            }
        }
    }

    // Entities
    if config.entities.len() > limits::MAX_ENTITIES {
        return Err(LevelError::ValidationError(format!(
            "too many entities ({} > {})",
            config.entities.len(),
            limits::MAX_ENTITIES
        )));
    }
    for spawn in &config.entities {
        check_string("entity id", &spawn.id)?;
        check_vector("entity position", spawn.position)?;
        check_vector("entity velocity", spawn.velocity)?;

        if let BodyKind::Dynamic { mass } = spawn.body {
            if !(mass.is_finite() && mass > 0.0) {
                return Err(LevelError::ValidationError(format!(
                    "entity '{}' needs a positive mass, got {}",
                    spawn.id, mass
                )));
            }
        }
        if let Some(collider) = &spawn.collider {
            check_vector("collider size", collider.size)?;
            check_vector("collider offset", collider.offset)?;
            if collider.size.x < 0.0 || collider.size.y < 0.0 {
                return Err(LevelError::ValidationError(format!("entity '{}' has a negative collider", spawn.id)));
            }
        }
        if !spawn.restitution.is_finite() || !spawn.friction.is_finite() {
            return Err(LevelError::ValidationError(format!("entity '{}' has non-finite coefficients", spawn.id)));
        }
        if !(0.0..=1.0).contains(&spawn.restitution) || !(0.0..=1.0).contains(&spawn.friction) {
            warn!("Entity '{}' has coefficients outside 0..1", spawn.id);
        }
        for tag in &spawn.tags {
            check_string("tag", tag)?;
        }
        match &spawn.visual {
            Visual::Sprite(path) => check_string("sprite path", path)?,
            Visual::Animated(set) => {
                if config.animation_set(set).is_none() {
                    return Err(LevelError::ValidationError(format!(
                        "entity '{}' uses unknown animation set '{}'",
                        spawn.id, set
                    )));
                }
            }
            Visual::None | Visual::Placeholder => {}
        }
    }

    Ok(())
}

/// Decode raw file bytes: plain RON or brotli-compressed RON
pub fn load_world_config_from_bytes(bytes: &[u8]) -> Result<WorldConfig, LevelError> {
    // Detect format: RON files start with '(' or whitespace, brotli is binary
    let is_plain_ron = bytes
        .first()
        .map(|&b| b == b'(' || b == b' ' || b == b'\n' || b == b'\r' || b == b'\t')
        .unwrap_or(false);

    let contents = if is_plain_ron {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| LevelError::DecompressError(format!("invalid UTF-8: {}", e)))?
    } else {
        let mut decompressed = Vec::new();
        brotli::BrotliDecompress(&mut Cursor::new(bytes), &mut decompressed)
            .map_err(|e| LevelError::DecompressError(format!("brotli decompression failed: {}", e)))?;
        String::from_utf8(decompressed)
            .map_err(|e| LevelError::DecompressError(format!("invalid UTF-8 after decompression: {}", e)))?
    };

    load_world_config_from_str(&contents)
}

/// Parse and validate a RON string
pub fn load_world_config_from_str(s: &str) -> Result<WorldConfig, LevelError> {
    let config: WorldConfig = match ron::from_str(s) {
        Ok(c) => c,
        Err(e) => {
            let pos = e.position;
            let line = s.lines().nth(pos.line.saturating_sub(1)).unwrap_or("");
            warn!("RON parse error at {}:{}: {}", pos.line, pos.col, e);
            warn!("  Line {}: {}", pos.line, line.trim());
            return Err(e.into());
        }
    };
    validate_config(&config)?;
    Ok(config)
}

/// Load a world file (compressed or plain)
pub fn load_world_config<P: AsRef<Path>>(path: P) -> Result<WorldConfig, LevelError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    load_world_config_from_bytes(&bytes).map_err(|e| {
        warn!("Failed to load world {}: {}", path.display(), e);
        e
    })
}

/// Pretty RON text for a config
pub fn to_ron_string(config: &WorldConfig) -> Result<String, LevelError> {
    let pretty = ron::ser::PrettyConfig::new()
        .depth_limit(5)
        .indentor("  ".to_string());
    Ok(ron::ser::to_string_pretty(config, pretty)?)
}

/// Save a config, brotli-compressed when `compress` is set
pub fn save_world_config<P: AsRef<Path>>(config: &WorldConfig, path: P, compress: bool) -> Result<(), LevelError> {
    let text = to_ron_string(config)?;
    if !compress {
        fs::write(path, text)?;
        return Ok(());
    }

    // Quality 6, window 22: good balance of speed and ratio
    let mut compressed = Vec::new();
    brotli::BrotliCompress(
        &mut Cursor::new(text.as_bytes()),
        &mut compressed,
        &brotli::enc::BrotliEncoderParams {
            quality: 6,
            lgwin: 22,
            ..Default::default()
        },
    )
    .map_err(|e| LevelError::DecompressError(format!("brotli compression failed: {}", e)))?;

    fs::write(path, compressed)?;
    Ok(())
}
