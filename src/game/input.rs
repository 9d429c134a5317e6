//! Input frames delivered by the input source, and edge detection for
//! one-shot actions.

use std::f32::consts::FRAC_PI_2;

use glam::{EulerRot, Quat, Vec2};
use serde::{Deserialize, Serialize};

/// Free-look camera orientation in radians (Y-X-Z order, -Z is forward)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Look {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Look {
    #[cfg(test)]
    pub fn new(yaw: f32, pitch: f32, roll: f32) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Replace non-finite angles with zero and clamp pitch to straight
    /// up / straight down.
    pub fn sanitized(self) -> Self {
        let finite = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self {
            yaw: finite(self.yaw),
            pitch: finite(self.pitch).clamp(-FRAC_PI_2, FRAC_PI_2),
            roll: finite(self.roll),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }

    /// Full orientation, roll included
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    /// Heading only, used to turn movement into the camera frame
    pub fn heading(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }
}

/// A point-in-time record of everything the input source reports.
///
/// Directional flags, sprint and shoot are level-triggered. Jump, reload
/// and switch-view are held flags too; the controller turns them into
/// one action per press with [`EdgeDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSnapshot {
    pub move_forward: bool,
    pub move_backward: bool,
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,
    pub sprint: bool,
    pub shoot: bool,
    pub reload: bool,
    pub switch_view: bool,
    pub interact: bool,
    /// On-screen joystick, x = right, y = forward, each in [-1, 1]
    pub analog: Vec2,
    pub look: Look,
    /// Cosmetic only
    pub clothes_color: String,
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            move_forward: false,
            move_backward: false,
            move_left: false,
            move_right: false,
            jump: false,
            sprint: false,
            shoot: false,
            reload: false,
            switch_view: false,
            interact: false,
            analog: Vec2::ZERO,
            look: Look::default(),
            clothes_color: "blue".to_string(),
        }
    }
}

impl InputSnapshot {
    /// True when any directional key is held. Digital input then wins
    /// over the analog stick, even if opposing keys cancel out.
    pub fn digital_active(&self) -> bool {
        self.move_forward || self.move_backward || self.move_left || self.move_right
    }

    /// Movement axes as (strafe right, forward)
    pub fn move_axes(&self) -> Vec2 {
        if self.digital_active() {
            let axis = |pos: bool, neg: bool| f32::from(u8::from(pos)) - f32::from(u8::from(neg));
            Vec2::new(
                axis(self.move_right, self.move_left),
                axis(self.move_forward, self.move_backward),
            )
        } else if self.analog.is_finite() {
            self.analog.clamp(Vec2::NEG_ONE, Vec2::ONE)
        } else {
            Vec2::ZERO
        }
    }
}

/// Momentary flags collected between two simulation ticks, so a press
/// and release that both land inside one tick still count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PressLatch {
    jump: bool,
    reload: bool,
    switch_view: bool,
    shoot: bool,
}

impl PressLatch {
    pub fn record(&mut self, frame: &InputSnapshot) {
        self.jump |= frame.jump;
        self.reload |= frame.reload;
        self.switch_view |= frame.switch_view;
        self.shoot |= frame.shoot;
    }

    /// Frame to step with: the latest frame plus anything pressed since
    /// the last tick. Clears the latch.
    pub fn take_into(&mut self, latest: &InputSnapshot) -> InputSnapshot {
        let mut frame = latest.clone();
        frame.jump |= self.jump;
        frame.reload |= self.reload;
        frame.switch_view |= self.switch_view;
        frame.shoot |= self.shoot;
        *self = Self::default();
        frame
    }
}

/// Actions that fired this step (rising edges)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edges {
    pub jump: bool,
    pub reload: bool,
    pub switch_view: bool,
}

/// Rising-edge detector for jump, reload and switch-view
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDetector {
    held: Edges,
}

impl EdgeDetector {
    pub fn update(&mut self, input: &InputSnapshot) -> Edges {
        let pressed = Edges {
            jump: input.jump && !self.held.jump,
            reload: input.reload && !self.held.reload,
            switch_view: input.switch_view && !self.held.switch_view,
        };
        self.held = Edges {
            jump: input.jump,
            reload: input.reload,
            switch_view: input.switch_view,
        };
        pressed
    }
}
