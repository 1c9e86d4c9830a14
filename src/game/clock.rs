//! Simulation Clock
//!
//! Owned time context handed to the world. Converts host timestamps into
//! clamped simulation deltas so a stall (tab in background, debugger pause)
//! can't blow up integration.

/// Largest step the simulator will take: the 30 FPS frame time
pub const DEFAULT_MAX_DELTA: f64 = 1.0 / 30.0;

/// Weight of the newest sample in the smoothed FPS estimate
const FPS_SMOOTHING: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct SimulationClock {
    /// Upper bound for a single delta (seconds)
    max_delta: f64,
    /// Multiplier applied before clamping (slow motion / fast forward)
    time_scale: f64,
    paused: bool,
    /// Host timestamp of the previous frame
    last_timestamp: Option<f64>,
    /// Total simulated seconds
    elapsed: f64,
    /// Delta returned by the most recent tick
    delta: f64,
    tick_count: u64,
    fps: f64,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::with_max_delta(DEFAULT_MAX_DELTA)
    }

    /// Non-positive or non-finite limits fall back to the default.
    pub fn with_max_delta(max_delta: f64) -> Self {
        let max_delta = if max_delta.is_finite() && max_delta > 0.0 {
            max_delta
        } else {
            DEFAULT_MAX_DELTA
        };
        Self {
            max_delta,
            time_scale: 1.0,
            paused: false,
            last_timestamp: None,
            elapsed: 0.0,
            delta: 0.0,
            tick_count: 0,
            fps: 0.0,
        }
    }

    /// Feed a host timestamp (seconds). Returns the simulation delta for
    /// this frame. The first call only establishes the reference point.
    pub fn tick_at(&mut self, now: f64) -> f64 {
        let raw = match self.last_timestamp {
            Some(last) => now - last,
            None => 0.0,
        };
        self.last_timestamp = Some(now);
        self.advance(raw)
    }

    /// Advance by an explicit raw delta. Negative and NaN deltas count as
    /// zero; the scaled delta never exceeds `max_delta`.
    pub fn advance(&mut self, raw_delta: f64) -> f64 {
        let raw = if raw_delta.is_finite() { raw_delta.max(0.0) } else { 0.0 };

        if raw > 0.0 {
            let instant = 1.0 / raw;
            self.fps = if self.fps == 0.0 {
                instant
            } else {
                self.fps + (instant - self.fps) * FPS_SMOOTHING
            };
        }

        let delta = if self.paused {
            0.0
        } else {
            (raw * self.time_scale).min(self.max_delta)
        };

        self.delta = delta;
        self.elapsed += delta;
        self.tick_count += 1;
        delta
    }

    pub fn max_delta(&self) -> f64 {
        self.max_delta
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = if scale.is_finite() { scale.max(0.0) } else { 1.0 };
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Total simulated seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Smoothed frames per second of the host loop
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}
