//! JSON-lines protocol between the session and its input source / display
//! These are the wire types read from stdin and written to stdout

use chrono::{DateTime, Utc};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::camera::ViewMode;
use crate::game::hud::HudState;
use crate::game::input::InputSnapshot;
use crate::game::session::GamePhase;
use crate::game::weather::WeatherKind;

/// Messages sent from the input source to the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Latest input frame; omitted fields default to released / zero
    Input(InputSnapshot),

    /// Leave the menu and start playing
    Start,

    /// Freeze the simulation
    Pause,

    /// Resume after pause
    Resume,

    /// End the session
    Quit,
}

/// Messages sent from the session to the display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// HUD state (sent at the HUD rate and after changes)
    Hud(HudState),

    /// A shot left the muzzle
    Fired {
        tick: u64,
        ammo_left: u32,
        /// Camera position at fire time
        origin: Vec3,
        /// Camera forward at fire time
        direction: Vec3,
    },

    ReloadStarted {
        tick: u64,
        ammo: u32,
    },

    ReloadFinished {
        tick: u64,
        ammo: u32,
    },

    ViewChanged {
        tick: u64,
        view: ViewMode,
    },

    WeatherChanged {
        tick: u64,
        weather: WeatherKind,
    },

    PhaseChanged {
        tick: u64,
        phase: GamePhase,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Final message before the session task exits
    SessionEnd {
        session_id: Uuid,
        started_at: DateTime<Utc>,
        ticks: u64,
        shots_fired: u32,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Non-finite value in field {0}")]
    NonFinite(&'static str),
}

impl ProtocolError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::NonFinite(_) => "non_finite",
        }
    }
}

/// Parse and validate one input line
pub fn parse_client_line(line: &str) -> Result<ClientMsg, ProtocolError> {
    let msg: ClientMsg = serde_json::from_str(line)?;
    if let ClientMsg::Input(frame) = &msg {
        if !frame.analog.is_finite() {
            return Err(ProtocolError::NonFinite("analog"));
        }
        if !frame.look.is_finite() {
            return Err(ProtocolError::NonFinite("look"));
        }
    }
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn parses_sparse_input_frame() {
        let msg =
            parse_client_line(r#"{"type":"input","move_forward":true,"analog":[0.25,-1.0]}"#)
                .expect("valid line");
        match msg {
            ClientMsg::Input(frame) => {
                assert!(frame.move_forward);
                assert!(!frame.shoot);
                assert_eq!(frame.analog, Vec2::new(0.25, -1.0));
                assert_eq!(frame.clothes_color, "blue");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_look_and_commands() {
        let msg = parse_client_line(r#"{"type":"input","look":{"yaw":1.5}}"#).expect("valid");
        assert!(matches!(msg, ClientMsg::Input(ref f) if f.look.yaw == 1.5 && f.look.pitch == 0.0));
        assert_eq!(parse_client_line(r#"{"type":"pause"}"#).expect("valid"), ClientMsg::Pause);
        assert_eq!(parse_client_line(r#"{"type":"quit"}"#).expect("valid"), ClientMsg::Quit);
    }

    #[test]
    fn rejects_malformed_line() {
        let err = parse_client_line("{not json").unwrap_err();
        assert_eq!(err.code(), "malformed");
        let err = parse_client_line(r#"{"type":"teleport"}"#).unwrap_err();
        assert_eq!(err.code(), "malformed");
    }

    #[test]
    fn rejects_overflowing_analog() {
        let err = parse_client_line(r#"{"type":"input","analog":[1e40,0.0]}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::NonFinite("analog")) || err.code() == "malformed");
    }

    #[test]
    fn server_msg_is_tagged_snake_case() {
        let json = serde_json::to_string(&ServerMsg::ViewChanged {
            tick: 3,
            view: ViewMode::ThirdPerson,
        })
        .expect("serialize");
        assert!(json.contains(r#""type":"view_changed""#));
        assert!(json.contains(r#""view":"third_person""#));
    }
}
