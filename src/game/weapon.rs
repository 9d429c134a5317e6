//! Weapon state - magazine, reload timer, fire cooldown

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Rounds in the magazine when a session starts
pub const DEFAULT_START_AMMO: u32 = 30;
/// Magazine capacity
pub const DEFAULT_MAX_AMMO: u32 = 120;
/// Time from reload start to refill
pub const RELOAD_DURATION: Duration = Duration::from_millis(1500);
/// Minimum spacing between two shots (10 rounds per second)
pub const FIRE_COOLDOWN: Duration = Duration::from_millis(100);

/// Ammo counter visible to the HUD.
///
/// `current <= max` always holds: the counter only ever decrements with
/// saturation or is set to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoState {
    current: u32,
    max: u32,
    reloading: bool,
}

impl AmmoState {
    /// Build a counter, clamping `current` into `0..=max` and `max` to at
    /// least one round.
    pub fn new(current: u32, max: u32) -> Self {
        let max = max.max(1);
        Self {
            current: current.min(max),
            max,
            reloading: false,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }
}

impl Default for AmmoState {
    fn default() -> Self {
        Self::new(DEFAULT_START_AMMO, DEFAULT_MAX_AMMO)
    }
}

/// Timing constants for a weapon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponStats {
    pub reload_duration: Duration,
    pub fire_cooldown: Duration,
}

impl Default for WeaponStats {
    fn default() -> Self {
        Self {
            reload_duration: RELOAD_DURATION,
            fire_cooldown: FIRE_COOLDOWN,
        }
    }
}

/// The player's gun. All timestamps are session play time.
#[derive(Debug, Clone)]
pub struct Weapon {
    ammo: AmmoState,
    stats: WeaponStats,
    reload_started_at: Option<Duration>,
    last_shot_at: Option<Duration>,
}

impl Weapon {
    pub fn new(ammo: AmmoState, stats: WeaponStats) -> Self {
        Self {
            ammo,
            stats,
            reload_started_at: None,
            last_shot_at: None,
        }
    }

    pub fn ammo(&self) -> AmmoState {
        self.ammo
    }

    /// When the pending reload completes, if one is running
    pub fn reload_deadline(&self) -> Option<Duration> {
        self.reload_started_at
            .map(|started| started + self.stats.reload_duration)
    }

    pub fn can_start_reload(&self) -> bool {
        !self.ammo.reloading && !self.ammo.is_full()
    }

    /// Begin a reload. Does not touch the round count.
    pub fn start_reload(&mut self, now: Duration) -> bool {
        if !self.can_start_reload() {
            return false;
        }
        self.ammo.reloading = true;
        self.reload_started_at = Some(now);
        true
    }

    /// Refill once the reload duration has elapsed
    pub fn finish_reload_if_due(&mut self, now: Duration) -> bool {
        match self.reload_deadline() {
            Some(deadline) if now >= deadline => {
                self.ammo.current = self.ammo.max;
                self.ammo.reloading = false;
                self.reload_started_at = None;
                true
            }
            _ => false,
        }
    }

    /// Drop a pending reload without refilling
    pub fn cancel_reload(&mut self) -> bool {
        if self.reload_started_at.take().is_none() {
            return false;
        }
        self.ammo.reloading = false;
        true
    }

    pub fn can_fire(&self, now: Duration) -> bool {
        if self.ammo.reloading || self.ammo.is_empty() {
            return false;
        }
        match self.last_shot_at {
            Some(last) => now.saturating_sub(last) >= self.stats.fire_cooldown,
            None => true,
        }
    }

    /// Fire one round. Requests inside the cooldown window are dropped.
    pub fn try_fire(&mut self, now: Duration) -> bool {
        if !self.can_fire(now) {
            return false;
        }
        self.ammo.current = self.ammo.current.saturating_sub(1);
        self.last_shot_at = Some(now);
        debug_assert!(self.ammo.current <= self.ammo.max);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn new_clamps_current_to_max() {
        let ammo = AmmoState::new(500, 120);
        assert_eq!(ammo.current(), 120);
        assert_eq!(AmmoState::new(0, 0).max(), 1);
    }

    #[test]
    fn shot_decrements_and_empty_does_not_underflow() {
        let mut weapon = Weapon::new(AmmoState::new(1, 30), WeaponStats::default());
        assert!(weapon.try_fire(ms(0)));
        assert_eq!(weapon.ammo().current(), 0);
        assert!(!weapon.try_fire(ms(500)));
        assert_eq!(weapon.ammo().current(), 0);
    }

    #[test]
    fn cooldown_window_is_inclusive_at_boundary() {
        let mut weapon = Weapon::new(AmmoState::new(10, 30), WeaponStats::default());
        assert!(weapon.try_fire(ms(1000)));
        assert!(!weapon.try_fire(ms(1099)));
        assert!(weapon.try_fire(ms(1100)));
        assert_eq!(weapon.ammo().current(), 8);
    }

    #[test]
    fn reload_refills_after_duration() {
        let mut weapon = Weapon::new(AmmoState::new(4, 30), WeaponStats::default());
        assert!(weapon.start_reload(ms(200)));
        assert_eq!(weapon.reload_deadline(), Some(ms(1700)));
        assert!(!weapon.start_reload(ms(300)));
        assert!(!weapon.finish_reload_if_due(ms(1699)));
        assert_eq!(weapon.ammo().current(), 4);
        assert!(weapon.finish_reload_if_due(ms(1700)));
        assert_eq!(weapon.ammo().current(), 30);
        assert!(!weapon.ammo().is_reloading());
    }

    #[test]
    fn full_magazine_does_not_reload() {
        let mut weapon = Weapon::new(AmmoState::new(30, 30), WeaponStats::default());
        assert!(!weapon.start_reload(ms(0)));
        assert_eq!(weapon.reload_deadline(), None);
    }

    #[test]
    fn cancelled_reload_never_refills() {
        let mut weapon = Weapon::new(AmmoState::new(2, 30), WeaponStats::default());
        weapon.start_reload(ms(0));
        assert!(weapon.cancel_reload());
        assert!(!weapon.finish_reload_if_due(ms(10_000)));
        assert_eq!(weapon.ammo().current(), 2);
    }
}
