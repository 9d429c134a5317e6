//! Time utilities for the control simulation

use std::time::{Duration, Instant};

/// Process start time for uptime tracking
static PROCESS_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize process start time (call once at startup)
pub fn init_process_time() {
    PROCESS_START.get_or_init(Instant::now);
}

/// Get process uptime in seconds
pub fn uptime_secs() -> u64 {
    PROCESS_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default simulation rate (matches a 60 Hz render loop)
pub const DEFAULT_TPS: u32 = 60;
/// Default HUD publish rate
pub const DEFAULT_HUD_RATE: u32 = 10;

/// Duration of one simulation tick at the given rate
pub fn tick_delta(tps: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(tps.max(1)))
}

/// Longest step the body integrator accepts after a stall
pub fn max_step(tps: u32) -> Duration {
    tick_delta(tps) * 4
}

/// Play-time clock. Only advances while the session is running, so
/// reload and cooldown windows are measured in play time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionClock {
    elapsed: Duration,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.elapsed
    }

    pub fn advance(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
