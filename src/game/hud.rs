//! HUD state building and publish cadence

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::camera::ViewMode;
use super::controller::ControlStateMachine;
use super::movement::{BodyIntegrator, BodyKinematics};
use super::session::GamePhase;
use super::weather::{WeatherCycle, WeatherKind};

/// Full health
pub const MAX_HEALTH: u32 = 100;
/// Cash a new player starts with
pub const START_MONEY: u64 = 500;

/// Objective shown on the HUD
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub title: String,
    pub description: String,
    pub completed: bool,
}

impl Mission {
    /// Opening objective of a fresh session
    pub fn opening() -> Self {
        Self {
            id: "1".to_string(),
            title: "Welcome to the Frontier".to_string(),
            description: "Explore the city and find the military outpost.".to_string(),
            completed: false,
        }
    }
}

/// Player status owned by the session and shown on the HUD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStatus {
    health: u32,
    money: u64,
    mission: Option<Mission>,
}

impl PlayerStatus {
    /// Health is clamped to `0..=MAX_HEALTH`
    pub fn new(health: u32, money: u64, mission: Option<Mission>) -> Self {
        Self {
            health: health.min(MAX_HEALTH),
            money,
            mission,
        }
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn money(&self) -> u64 {
        self.money
    }

    pub fn mission(&self) -> Option<&Mission> {
        self.mission.as_ref()
    }
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self::new(MAX_HEALTH, START_MONEY, Some(Mission::opening()))
    }
}

/// Read-only display state for HUD and mobile overlays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudState {
    pub tick: u64,
    pub phase: GamePhase,
    pub health: u32,
    pub money: u64,
    pub current_mission: Option<Mission>,
    pub ammo: u32,
    pub max_ammo: u32,
    pub reloading: bool,
    pub view: ViewMode,
    pub position: Vec3,
    pub speed: f32,
    pub weather: WeatherKind,
    /// Hour of day in [0, 24)
    pub time_of_day: f32,
    pub clothes_color: String,
}

impl Default for HudState {
    fn default() -> Self {
        Self {
            tick: 0,
            phase: GamePhase::Menu,
            health: 0,
            money: 0,
            current_mission: None,
            ammo: 0,
            max_ammo: 0,
            reloading: false,
            view: ViewMode::default(),
            position: Vec3::ZERO,
            speed: 0.0,
            weather: WeatherKind::default(),
            time_of_day: 0.0,
            clothes_color: String::new(),
        }
    }
}

/// Decides when HUD state goes out and builds it
pub struct HudPublisher {
    /// Tick counter since last publish
    ticks_since_publish: u32,
    /// Publish interval in ticks
    publish_interval: u32,
}

impl HudPublisher {
    pub fn new(publish_interval: u32) -> Self {
        Self {
            ticks_since_publish: 0,
            publish_interval: publish_interval.max(1),
        }
    }

    /// Check if it's time to publish
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_publish += 1;
        if self.ticks_since_publish >= self.publish_interval {
            self.ticks_since_publish = 0;
            true
        } else {
            false
        }
    }

    /// Force a publish on the next check (ammo, view, weather changes)
    pub fn force_next(&mut self) {
        self.ticks_since_publish = self.publish_interval;
    }

    pub fn build(
        &self,
        tick: u64,
        phase: GamePhase,
        controller: &ControlStateMachine,
        body: &BodyKinematics,
        weather: &WeatherCycle,
        status: &PlayerStatus,
        clothes_color: &str,
    ) -> HudState {
        let ammo = controller.ammo();
        HudState {
            tick,
            phase,
            health: status.health(),
            money: status.money(),
            current_mission: status.mission().cloned(),
            ammo: ammo.current(),
            max_ammo: ammo.max(),
            reloading: ammo.is_reloading(),
            view: controller.view(),
            position: body.position,
            speed: BodyIntegrator::horizontal_speed(body),
            weather: weather.weather(),
            time_of_day: weather.time_of_day(),
            clothes_color: clothes_color.to_string(),
        }
    }
}
