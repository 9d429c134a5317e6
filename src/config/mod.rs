//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::game::camera::CameraRig;
use crate::game::controller::ControlTuning;
use crate::game::movement::MovementTuning;
use crate::game::weapon::{
    AmmoState, WeaponStats, DEFAULT_MAX_AMMO, DEFAULT_START_AMMO, FIRE_COOLDOWN, RELOAD_DURATION,
};
use crate::util::rate_limit::DEFAULT_INPUT_RATE_LIMIT;
use crate::util::time::{DEFAULT_HUD_RATE, DEFAULT_TPS};

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,

    /// Simulation ticks per second
    pub tick_rate: u32,
    /// HUD publishes per second
    pub hud_rate: u32,
    /// Weather RNG seed
    pub session_seed: u64,
    /// Input lines accepted per second
    pub input_rate_limit: u32,
    /// Skip the menu and start playing immediately
    pub auto_start: bool,

    pub player_speed: f32,
    pub sprint_multiplier: f32,
    pub jump_force: f32,
    pub reload_duration: Duration,
    pub fire_cooldown: Duration,
    pub start_ammo: u32,
    pub max_ammo: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let movement = MovementTuning::default();

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") | Some("") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        let config = Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,

            tick_rate: non_zero(&lookup, "TICK_RATE", DEFAULT_TPS)?,
            hud_rate: non_zero(&lookup, "HUD_RATE", DEFAULT_HUD_RATE)?,
            session_seed: match lookup("SESSION_SEED") {
                Some(raw) => parse_value("SESSION_SEED", &raw)?,
                None => rand::random(),
            },
            input_rate_limit: non_zero(&lookup, "INPUT_RATE_LIMIT", DEFAULT_INPUT_RATE_LIMIT)?,
            auto_start: parse_or(&lookup, "AUTO_START", false)?,

            player_speed: positive(&lookup, "PLAYER_SPEED", movement.speed)?,
            sprint_multiplier: positive(&lookup, "SPRINT_MULTIPLIER", movement.sprint_multiplier)?,
            jump_force: positive(&lookup, "JUMP_FORCE", movement.jump_force)?,
            reload_duration: Duration::from_millis(parse_or(
                &lookup,
                "RELOAD_MS",
                RELOAD_DURATION.as_millis() as u64,
            )?),
            fire_cooldown: Duration::from_millis(parse_or(
                &lookup,
                "FIRE_COOLDOWN_MS",
                FIRE_COOLDOWN.as_millis() as u64,
            )?),
            start_ammo: parse_or(&lookup, "START_AMMO", DEFAULT_START_AMMO)?,
            max_ammo: non_zero(&lookup, "MAX_AMMO", DEFAULT_MAX_AMMO)?,
        };

        if config.sprint_multiplier <= 1.0 {
            return Err(ConfigError::SprintMultiplier(config.sprint_multiplier));
        }

        if config.start_ammo > config.max_ammo {
            return Err(ConfigError::AmmoExceedsMax {
                start: config.start_ammo,
                max: config.max_ammo,
            });
        }

        Ok(config)
    }

    /// Controller tuning with env overrides applied
    pub fn control_tuning(&self) -> ControlTuning {
        ControlTuning {
            movement: MovementTuning {
                speed: self.player_speed,
                sprint_multiplier: self.sprint_multiplier,
                jump_force: self.jump_force,
                ..MovementTuning::default()
            },
            weapon: WeaponStats {
                reload_duration: self.reload_duration,
                fire_cooldown: self.fire_cooldown,
            },
            camera: CameraRig::default(),
            start_ammo: AmmoState::new(self.start_ammo, self.max_ammo),
        }
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn non_zero<F>(lookup: &F, key: &'static str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    match parse_or(lookup, key, default)? {
        0 => Err(ConfigError::Zero(key)),
        value => Ok(value),
    }
}

/// Finite, strictly positive tuning value
fn positive<F>(lookup: &F, key: &'static str, default: f32) -> Result<f32, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    let value: f32 = parse_or(lookup, key, default)?;
    if !value.is_finite() {
        return Err(ConfigError::NonFinite(key));
    }
    if value <= 0.0 {
        return Err(ConfigError::NotPositive { key, value });
    }
    Ok(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must be a finite number")]
    NonFinite(&'static str),

    #[error("{key} must be greater than zero, got {value}")]
    NotPositive { key: &'static str, value: f32 },

    #[error("SPRINT_MULTIPLIER must be greater than 1, got {0}")]
    SprintMultiplier(f32),

    #[error("START_AMMO ({start}) exceeds MAX_AMMO ({max})")]
    AmmoExceedsMax { start: u32, max: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&'static str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = load(&[]).expect("defaults");
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.hud_rate, 10);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.auto_start);

        let tuning = config.control_tuning();
        assert_eq!(tuning.start_ammo, AmmoState::new(30, 120));
        assert_eq!(tuning.weapon.reload_duration, Duration::from_millis(1500));
        assert_eq!(tuning.movement.speed, 5.0);
    }

    #[test]
    fn overrides_apply() {
        let config = load(&[
            ("TICK_RATE", "30"),
            ("LOG_FORMAT", "json"),
            ("SESSION_SEED", "99"),
            ("AUTO_START", "true"),
            ("RELOAD_MS", "800"),
            ("START_AMMO", "5"),
            ("MAX_AMMO", "10"),
        ])
        .expect("valid");
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.session_seed, 99);
        assert!(config.auto_start);

        let tuning = config.control_tuning();
        assert_eq!(tuning.weapon.reload_duration, Duration::from_millis(800));
        assert_eq!(tuning.start_ammo.current(), 5);
        assert_eq!(tuning.start_ammo.max(), 10);
    }

    #[test]
    fn start_ammo_above_max_is_rejected() {
        let err = load(&[("START_AMMO", "50"), ("MAX_AMMO", "40")]).unwrap_err();
        assert!(matches!(err, ConfigError::AmmoExceedsMax { start: 50, max: 40 }));
    }

    #[test]
    fn invalid_and_zero_values_are_rejected() {
        assert!(matches!(
            load(&[("TICK_RATE", "fast")]).unwrap_err(),
            ConfigError::Invalid { key: "TICK_RATE", .. }
        ));
        assert!(matches!(
            load(&[("TICK_RATE", "0")]).unwrap_err(),
            ConfigError::Zero("TICK_RATE")
        ));
        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]).unwrap_err(),
            ConfigError::Invalid { key: "LOG_FORMAT", .. }
        ));
        assert!(matches!(
            load(&[("PLAYER_SPEED", "NaN")]).unwrap_err(),
            ConfigError::NonFinite("PLAYER_SPEED")
        ));
        assert!(matches!(
            load(&[("PLAYER_SPEED", "inf")]).unwrap_err(),
            ConfigError::NonFinite("PLAYER_SPEED")
        ));
        assert!(matches!(
            load(&[("JUMP_FORCE", "-4")]).unwrap_err(),
            ConfigError::NotPositive { key: "JUMP_FORCE", .. }
        ));
        assert!(matches!(
            load(&[("PLAYER_SPEED", "0")]).unwrap_err(),
            ConfigError::NotPositive { key: "PLAYER_SPEED", .. }
        ));
        assert!(matches!(
            load(&[("SPRINT_MULTIPLIER", "0.5")]).unwrap_err(),
            ConfigError::SprintMultiplier(_)
        ));
        assert!(matches!(
            load(&[("SPRINT_MULTIPLIER", "1")]).unwrap_err(),
            ConfigError::SprintMultiplier(_)
        ));
        assert!(load(&[("SPRINT_MULTIPLIER", "1.5"), ("JUMP_FORCE", "6")]).is_ok());
    }
}
