//! Player movement and the stand-in body integrator

use glam::{Vec3, Vec3Swizzles};
use serde::{Deserialize, Serialize};

use super::input::{InputSnapshot, Look};

/// Movement constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementTuning {
    /// Base ground speed (units per second)
    pub speed: f32,
    /// Sprint speed multiplier, > 1
    pub sprint_multiplier: f32,
    /// Vertical velocity set by a jump
    pub jump_force: f32,
    /// Vertical speed under which the body counts as grounded
    pub grounded_epsilon: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            speed: 5.0,
            sprint_multiplier: 1.8,
            jump_force: 4.0,
            grounded_epsilon: 0.05,
        }
    }
}

/// Position and velocity of the player body, owned by the physics side
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyKinematics {
    pub position: Vec3,
    pub velocity: Vec3,
}

impl BodyKinematics {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
        }
    }

    /// Grounded proxy: vertical speed below `epsilon`
    pub fn is_grounded(&self, epsilon: f32) -> bool {
        self.velocity.y.abs() < epsilon
    }
}

/// Movement rules for the on-foot player
pub struct MovementSystem;

impl MovementSystem {
    /// Horizontal velocity for this input, in world space.
    ///
    /// Camera-local direction is (strafe, 0, -forward), normalized, scaled
    /// by speed (and sprint), then turned by the camera heading.
    pub fn horizontal_velocity(input: &InputSnapshot, look: Look, tuning: &MovementTuning) -> Vec3 {
        let axes = input.move_axes();
        let local = Vec3::new(axes.x, 0.0, -axes.y).normalize_or_zero();
        let speed = if input.sprint {
            tuning.speed * tuning.sprint_multiplier
        } else {
            tuning.speed
        };
        look.heading() * (local * speed)
    }

    /// Full desired velocity. Vertical velocity is kept from the body
    /// unless a jump was pressed while grounded.
    /// Returns (velocity, jumped).
    pub fn desired_velocity(
        input: &InputSnapshot,
        jump_pressed: bool,
        body: &BodyKinematics,
        look: Look,
        tuning: &MovementTuning,
    ) -> (Vec3, bool) {
        let horizontal = Self::horizontal_velocity(input, look, tuning);
        let jumped = jump_pressed && body.is_grounded(tuning.grounded_epsilon);
        let vertical = if jumped {
            tuning.jump_force
        } else {
            body.velocity.y
        };
        (Vec3::new(horizontal.x, vertical, horizontal.z), jumped)
    }
}

/// Stand-in for the external rigid-body engine: gravity plus a flat
/// ground plane, enough to drive the controller headless.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyIntegrator {
    pub gravity: f32,
    /// Height of the body centre when resting on the ground
    pub ground_height: f32,
}

impl Default for BodyIntegrator {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            ground_height: 0.6,
        }
    }
}

impl BodyIntegrator {
    /// Semi-implicit Euler step
    pub fn integrate(&self, body: &mut BodyKinematics, dt: f32) {
        body.velocity.y -= self.gravity * dt;
        body.position += body.velocity * dt;

        if body.position.y <= self.ground_height {
            body.position.y = self.ground_height;
            if body.velocity.y < 0.0 {
                body.velocity.y = 0.0;
            }
        }
    }

    pub fn horizontal_speed(body: &BodyKinematics) -> f32 {
        body.velocity.xz().length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use std::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1e-4;

    fn held(f: impl FnOnce(&mut InputSnapshot)) -> InputSnapshot {
        let mut input = InputSnapshot::default();
        f(&mut input);
        input
    }

    #[test]
    fn forward_moves_along_negative_z() {
        let tuning = MovementTuning::default();
        let input = held(|i| i.move_forward = true);
        let v = MovementSystem::horizontal_velocity(&input, Look::default(), &tuning);
        assert!(v.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), EPS));
    }

    #[test]
    fn sprint_scales_speed() {
        let tuning = MovementTuning::default();
        let input = held(|i| {
            i.move_backward = true;
            i.sprint = true;
        });
        let v = MovementSystem::horizontal_velocity(&input, Look::default(), &tuning);
        assert!(v.abs_diff_eq(Vec3::new(0.0, 0.0, 9.0), EPS));
    }

    #[test]
    fn diagonal_is_normalized() {
        let tuning = MovementTuning::default();
        let input = held(|i| {
            i.move_forward = true;
            i.move_right = true;
        });
        let v = MovementSystem::horizontal_velocity(&input, Look::default(), &tuning);
        assert!((v.length() - 5.0).abs() < EPS);
        assert!(v.x > 0.0 && v.z < 0.0);
    }

    #[test]
    fn movement_follows_yaw_but_not_pitch() {
        let tuning = MovementTuning::default();
        let input = held(|i| i.move_forward = true);
        let look = Look::new(FRAC_PI_2, -1.2, 0.0);
        let v = MovementSystem::horizontal_velocity(&input, look, &tuning);
        assert!(v.abs_diff_eq(Vec3::new(-5.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn analog_used_when_keys_idle() {
        let tuning = MovementTuning::default();
        let input = held(|i| i.analog = Vec2::new(0.0, 0.5));
        let v = MovementSystem::horizontal_velocity(&input, Look::default(), &tuning);
        assert!(v.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), EPS));
    }

    #[test]
    fn idle_input_is_zero() {
        let tuning = MovementTuning::default();
        let v = MovementSystem::horizontal_velocity(
            &InputSnapshot::default(),
            Look::default(),
            &tuning,
        );
        assert_eq!(v, Vec3::ZERO);
    }

    #[test]
    fn jump_only_when_grounded() {
        let tuning = MovementTuning::default();
        let input = InputSnapshot::default();

        let grounded = BodyKinematics::default();
        let (v, jumped) =
            MovementSystem::desired_velocity(&input, true, &grounded, Look::default(), &tuning);
        assert!(jumped);
        assert_eq!(v.y, 4.0);

        let mut airborne = BodyKinematics::default();
        airborne.velocity.y = -1.0;
        let (v, jumped) =
            MovementSystem::desired_velocity(&input, true, &airborne, Look::default(), &tuning);
        assert!(!jumped);
        assert_eq!(v.y, -1.0);
    }

    #[test]
    fn integrator_rests_on_ground() {
        let integrator = BodyIntegrator::default();
        let mut body = BodyKinematics::at(Vec3::new(0.0, 0.6, 0.0));
        for _ in 0..10 {
            integrator.integrate(&mut body, 1.0 / 60.0);
        }
        assert_eq!(body.position.y, 0.6);
        assert_eq!(body.velocity.y, 0.0);
        assert!(body.is_grounded(0.05));
    }

    #[test]
    fn integrator_jump_arc_lands() {
        let integrator = BodyIntegrator::default();
        let mut body = BodyKinematics::at(Vec3::new(0.0, 0.6, 0.0));
        body.velocity = Vec3::new(1.0, 4.0, 0.0);
        integrator.integrate(&mut body, 1.0 / 60.0);
        assert!(body.position.y > 0.6);
        assert!(!body.is_grounded(0.05));
        for _ in 0..120 {
            integrator.integrate(&mut body, 1.0 / 60.0);
        }
        assert_eq!(body.position.y, 0.6);
        assert_eq!(BodyIntegrator::horizontal_speed(&body), 1.0);
    }
}
