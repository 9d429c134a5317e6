//! Player control state machine.
//!
//! One `step` per simulation tick turns an input frame and the latest body
//! kinematics into a desired velocity, camera pose, ammo/reload
//! transitions and at most one fire event. The only deferred transition
//! is reload completion, which the host may also drive early through
//! [`ControlStateMachine::complete_reload`] when its one-shot deadline
//! fires.

use std::time::Duration;

use glam::Vec3;
use tracing::{debug, trace};

use super::camera::{CameraPose, CameraRig, ViewMode};
use super::input::{EdgeDetector, InputSnapshot, Look};
use super::movement::{BodyKinematics, MovementSystem, MovementTuning};
use super::weapon::{AmmoState, Weapon, WeaponStats};

/// Everything the controller needs to know about the player
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlTuning {
    pub movement: MovementTuning,
    pub weapon: WeaponStats,
    pub camera: CameraRig,
    pub start_ammo: AmmoState,
}

/// A successful shot, for hit detection and effects downstream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireEvent {
    pub at: Duration,
    pub origin: Vec3,
    pub direction: Vec3,
    pub ammo_left: u32,
}

/// Result of one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutput {
    pub desired_velocity: Vec3,
    pub camera: CameraPose,
    pub ammo: AmmoState,
    pub view: ViewMode,
    pub shot: Option<FireEvent>,
    pub jumped: bool,
    pub reload_started: bool,
    pub reload_finished: bool,
    pub view_changed: bool,
}

pub struct ControlStateMachine {
    tuning: ControlTuning,
    weapon: Weapon,
    view: ViewMode,
    look: Look,
    edges: EdgeDetector,
    active: bool,
}

impl ControlStateMachine {
    pub fn new(tuning: ControlTuning) -> Self {
        Self {
            weapon: Weapon::new(tuning.start_ammo, tuning.weapon),
            tuning,
            view: ViewMode::default(),
            look: Look::default(),
            edges: EdgeDetector::default(),
            active: true,
        }
    }

    pub fn ammo(&self) -> AmmoState {
        self.weapon.ammo()
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    /// Play time at which the pending reload completes
    pub fn reload_deadline(&self) -> Option<Duration> {
        if self.active {
            self.weapon.reload_deadline()
        } else {
            None
        }
    }

    /// Complete a due reload outside of `step`
    pub fn complete_reload(&mut self, now: Duration) -> bool {
        if !self.active {
            return false;
        }
        let finished = self.weapon.finish_reload_if_due(now);
        if finished {
            debug!(ammo = self.weapon.ammo().current(), "Reload finished");
        }
        finished
    }

    /// Tear down. A pending reload is cancelled and can never complete.
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        if self.weapon.cancel_reload() {
            debug!("Pending reload cancelled on shutdown");
        }
        self.active = false;
    }

    pub fn step(&mut self, input: &InputSnapshot, body: &BodyKinematics, now: Duration) -> StepOutput {
        if !self.active {
            return self.frozen_output(body);
        }

        if input.look.is_finite() {
            self.look = input.look.sanitized();
        }
        let edges = self.edges.update(input);

        // Timer transition first, so this step sees the refilled magazine
        let reload_finished = self.complete_reload(now);

        let (desired_velocity, jumped) = MovementSystem::desired_velocity(
            input,
            edges.jump,
            body,
            self.look,
            &self.tuning.movement,
        );

        // Reload trigger and fire check both read the pre-shot count
        let ammo_before = self.weapon.ammo();
        let mut reload_started = false;
        if edges.reload || ammo_before.is_empty() {
            reload_started = self.weapon.start_reload(now);
        }

        let fired = input.shoot && self.weapon.try_fire(now);
        if fired && self.weapon.ammo().is_empty() {
            reload_started |= self.weapon.start_reload(now);
        }
        if reload_started {
            debug!(
                ammo = self.weapon.ammo().current(),
                deadline_ms = self.weapon.reload_deadline().map(|d| d.as_millis() as u64),
                "Reload started"
            );
        }

        let view_changed = edges.switch_view;
        if view_changed {
            self.view = self.view.next();
            debug!(view = self.view.name(), "View switched");
        }

        let camera = self
            .tuning
            .camera
            .pose(self.view, body.position, self.look);

        let shot = fired.then(|| {
            let ammo_left = self.weapon.ammo().current();
            trace!(ammo_left, "Shot fired");
            FireEvent {
                at: now,
                origin: camera.position,
                direction: camera.forward(),
                ammo_left,
            }
        });

        StepOutput {
            desired_velocity,
            camera,
            ammo: self.weapon.ammo(),
            view: self.view,
            shot,
            jumped,
            reload_started,
            reload_finished,
            view_changed,
        }
    }

    fn frozen_output(&self, body: &BodyKinematics) -> StepOutput {
        StepOutput {
            desired_velocity: body.velocity,
            camera: self.tuning.camera.pose(self.view, body.position, self.look),
            ammo: self.weapon.ammo(),
            view: self.view,
            shot: None,
            jumped: false,
            reload_started: false,
            reload_finished: false,
            view_changed: false,
        }
    }
}
