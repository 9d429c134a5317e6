//! Weather rolls and time of day

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Play time between two weather rolls
pub const WEATHER_ROLL_INTERVAL: Duration = Duration::from_secs(60);
/// In-game hours per real second
pub const HOURS_PER_SECOND: f32 = 0.01;
/// Session start hour
pub const START_HOUR: f32 = 12.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherKind {
    #[default]
    Clear,
    Rain,
    Storm,
}

impl WeatherKind {
    /// Map a uniform roll in [0, 1) to weather: 70% clear, 20% rain, 10% storm
    pub fn from_roll(roll: f32) -> Self {
        if roll < 0.7 {
            Self::Clear
        } else if roll < 0.9 {
            Self::Rain
        } else {
            Self::Storm
        }
    }
}

/// Seeded weather and day/night clock
#[derive(Debug, Clone)]
pub struct WeatherCycle {
    rng: ChaCha8Rng,
    weather: WeatherKind,
    time_of_day: f32,
    until_roll: Duration,
}

impl WeatherCycle {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            weather: WeatherKind::Clear,
            time_of_day: START_HOUR,
            until_roll: WEATHER_ROLL_INTERVAL,
        }
    }

    pub fn weather(&self) -> WeatherKind {
        self.weather
    }

    /// Hour of day in [0, 24)
    pub fn time_of_day(&self) -> f32 {
        self.time_of_day
    }

    /// Advance by `dt` of play time. Returns the new weather if it changed.
    pub fn advance(&mut self, dt: Duration) -> Option<WeatherKind> {
        self.time_of_day =
            (self.time_of_day + dt.as_secs_f32() * HOURS_PER_SECOND).rem_euclid(24.0);

        let before = self.weather;
        let mut remaining = dt;
        while remaining >= self.until_roll {
            remaining -= self.until_roll;
            self.until_roll = WEATHER_ROLL_INTERVAL;
            self.weather = WeatherKind::from_roll(self.rng.gen::<f32>());
        }
        self.until_roll -= remaining;

        (self.weather != before).then_some(self.weather)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_thresholds() {
        assert_eq!(WeatherKind::from_roll(0.0), WeatherKind::Clear);
        assert_eq!(WeatherKind::from_roll(0.69), WeatherKind::Clear);
        assert_eq!(WeatherKind::from_roll(0.7), WeatherKind::Rain);
        assert_eq!(WeatherKind::from_roll(0.89), WeatherKind::Rain);
        assert_eq!(WeatherKind::from_roll(0.9), WeatherKind::Storm);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = WeatherCycle::new(42);
        let mut b = WeatherCycle::new(42);
        for _ in 0..50 {
            a.advance(WEATHER_ROLL_INTERVAL);
            b.advance(WEATHER_ROLL_INTERVAL);
            assert_eq!(a.weather(), b.weather());
        }
    }

    #[test]
    fn no_roll_before_interval() {
        let mut cycle = WeatherCycle::new(7);
        for _ in 0..59 {
            assert_eq!(cycle.advance(Duration::from_secs(1)), None);
        }
        assert_eq!(cycle.weather(), WeatherKind::Clear);
    }

    #[test]
    fn time_of_day_wraps() {
        let mut cycle = WeatherCycle::new(1);
        cycle.advance(Duration::from_secs(1300));
        assert!((cycle.time_of_day() - 1.0).abs() < 1e-3);
    }
}
