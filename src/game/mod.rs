//! Player control simulation modules

pub mod camera;
pub mod controller;
pub mod hud;
pub mod input;
pub mod movement;
pub mod session;
pub mod weapon;
pub mod weather;

pub use session::{GameSession, SessionSettings};
