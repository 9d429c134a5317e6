//! View modes and camera pose derivation

use std::f32::consts::FRAC_PI_2;

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::input::Look;

/// Camera behaviour selected by the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    FirstPerson,
    ThirdPerson,
    TopDown,
}

impl ViewMode {
    /// Fixed cycle: first person -> third person -> top down -> first person
    pub fn next(self) -> Self {
        match self {
            Self::FirstPerson => Self::ThirdPerson,
            Self::ThirdPerson => Self::TopDown,
            Self::TopDown => Self::FirstPerson,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FirstPerson => "FPP",
            Self::ThirdPerson => "TPP",
            Self::TopDown => "TOP",
        }
    }
}

/// Camera placement relative to the player body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    /// First person eye height above body centre
    pub eye_height: f32,
    /// Third person offset, rotated by the full free-look orientation
    pub follow_offset: Vec3,
    /// Third person look-at height above body centre
    pub chest_height: f32,
    /// Top down height above body centre
    pub overhead_height: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            eye_height: 0.75,
            follow_offset: Vec3::new(0.0, 2.0, 5.0),
            chest_height: 0.5,
            overhead_height: 20.0,
        }
    }
}

/// Derived every step, never stored
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
    pub rotation: Quat,
}

impl CameraPose {
    /// Unit vector the camera looks along
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

impl CameraRig {
    pub fn pose(&self, view: ViewMode, body: Vec3, look: Look) -> CameraPose {
        match view {
            ViewMode::FirstPerson => {
                let position = body + Vec3::Y * self.eye_height;
                let rotation = look.rotation();
                CameraPose {
                    position,
                    target: position + rotation * Vec3::NEG_Z,
                    rotation,
                }
            }
            ViewMode::ThirdPerson => {
                let position = body + look.rotation() * self.follow_offset;
                let target = body + Vec3::Y * self.chest_height;
                CameraPose {
                    position,
                    target,
                    rotation: look_rotation(target - position, look.yaw),
                }
            }
            ViewMode::TopDown => {
                // Straight down, heading kept, roll forced to zero
                CameraPose {
                    position: body + Vec3::Y * self.overhead_height,
                    target: body,
                    rotation: Quat::from_euler(EulerRot::YXZ, look.yaw, -FRAC_PI_2, 0.0),
                }
            }
        }
    }
}

/// Roll-free rotation looking along `dir`. Falls back to `yaw` when
/// `dir` is vertical or degenerate.
fn look_rotation(dir: Vec3, fallback_yaw: f32) -> Quat {
    let horizontal = dir.x.hypot(dir.z);
    let yaw = if horizontal > f32::EPSILON {
        (-dir.x).atan2(-dir.z)
    } else {
        fallback_yaw
    };
    let pitch = dir.y.atan2(horizontal);
    Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0)
}
