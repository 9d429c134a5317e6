//! Play session and its fixed-rate tick loop

use std::time::Duration;

use chrono::{DateTime, Utc};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::io::protocol::{ClientMsg, ServerMsg};
use crate::util::time::{max_step, tick_delta, SessionClock, Timer};

use super::controller::{ControlStateMachine, ControlTuning, StepOutput};
use super::hud::{HudPublisher, HudState, PlayerStatus};
use super::input::{InputSnapshot, PressLatch};
use super::movement::{BodyIntegrator, BodyKinematics};
use super::weather::WeatherCycle;

/// Player spawn, standing on the ground plane
pub const SPAWN_POINT: Vec3 = Vec3::new(0.0, 0.6, 0.0);

/// Session phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Title screen, simulation idle
    #[default]
    Menu,
    /// Simulation running
    Playing,
    /// Simulation frozen, play clock stopped
    Paused,
    /// Session over
    GameOver,
}

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session has ended")]
    Closed,

    #[error("Session task already joined or shut down")]
    Detached,

    #[error("Session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Everything needed to start a session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub tick_rate: u32,
    pub hud_rate: u32,
    pub seed: u64,
    pub auto_start: bool,
    pub spawn: Vec3,
    pub control: ControlTuning,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_rate: config.tick_rate,
            hud_rate: config.hud_rate,
            seed: config.session_seed,
            auto_start: config.auto_start,
            spawn: SPAWN_POINT,
            control: config.control_tuning(),
        }
    }

    fn hud_interval(&self) -> u32 {
        (self.tick_rate / self.hud_rate.max(1)).max(1)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_rate: crate::util::time::DEFAULT_TPS,
            hud_rate: crate::util::time::DEFAULT_HUD_RATE,
            seed: 0,
            auto_start: false,
            spawn: SPAWN_POINT,
            control: ControlTuning::default(),
        }
    }
}

/// Totals reported when the session ends
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ticks: u64,
    pub play_time: Duration,
    pub shots_fired: u32,
}

/// Cloneable sending side of a session, for transports
#[derive(Clone)]
pub struct SessionLink {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<ClientMsg>,
    pub events_tx: broadcast::Sender<ServerMsg>,
}

impl SessionLink {
    pub async fn send(&self, msg: ClientMsg) -> Result<(), SessionError> {
        self.input_tx.send(msg).await.map_err(|_| SessionError::Closed)
    }

    /// Publish a message to every subscriber alongside session output
    pub fn publish(&self, msg: ServerMsg) {
        let _ = self.events_tx.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.events_tx.subscribe()
    }
}

/// Owner handle of a running session. Dropping it aborts the session
/// task, which tears the controller down with it.
pub struct SessionHandle {
    link: SessionLink,
    hud_rx: watch::Receiver<HudState>,
    task: Option<JoinHandle<SessionSummary>>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.link.id
    }

    pub fn link(&self) -> SessionLink {
        self.link.clone()
    }

    pub async fn send(&self, msg: ClientMsg) -> Result<(), SessionError> {
        self.link.send(msg).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.link.subscribe()
    }

    /// Latest HUD state
    pub fn hud(&self) -> HudState {
        self.hud_rx.borrow().clone()
    }

    /// HUD receiver for pollers that outlive this handle
    #[cfg(test)]
    pub fn hud_receiver(&self) -> watch::Receiver<HudState> {
        self.hud_rx.clone()
    }

    /// Wait for the session to end on its own (after a quit)
    pub async fn join(&mut self) -> Result<SessionSummary, SessionError> {
        let task = self.task.as_mut().ok_or(SessionError::Detached)?;
        let summary = task.await?;
        self.task = None;
        Ok(summary)
    }

    /// Cancel the session task immediately
    pub fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!(session_id = %self.link.id, "Session aborted");
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The play session: one player, one controller, one stand-in body
pub struct GameSession {
    id: Uuid,
    settings: SessionSettings,
    phase: GamePhase,
    tick: u64,
    clock: SessionClock,
    started_at: DateTime<Utc>,
    controller: ControlStateMachine,
    body: BodyKinematics,
    integrator: BodyIntegrator,
    weather: WeatherCycle,
    status: PlayerStatus,
    latest_input: InputSnapshot,
    latch: PressLatch,
    shots_fired: u32,
    hud: HudPublisher,
    input_rx: mpsc::Receiver<ClientMsg>,
    events_tx: broadcast::Sender<ServerMsg>,
    hud_tx: watch::Sender<HudState>,
}

impl GameSession {
    /// Create a session and spawn its tick loop
    pub fn spawn(settings: SessionSettings) -> SessionHandle {
        let (session, link, hud_rx) = Self::new(settings);
        let task = tokio::spawn(session.run());
        SessionHandle {
            link,
            hud_rx,
            task: Some(task),
        }
    }

    fn new(settings: SessionSettings) -> (Self, SessionLink, watch::Receiver<HudState>) {
        let id = Uuid::new_v4();
        let (input_tx, input_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(256);
        let (hud_tx, hud_rx) = watch::channel(HudState::default());

        let link = SessionLink {
            id,
            input_tx,
            events_tx: events_tx.clone(),
        };

        let session = Self {
            id,
            phase: GamePhase::Menu,
            tick: 0,
            clock: SessionClock::new(),
            started_at: Utc::now(),
            controller: ControlStateMachine::new(settings.control),
            body: BodyKinematics::at(settings.spawn),
            integrator: BodyIntegrator::default(),
            weather: WeatherCycle::new(settings.seed),
            status: PlayerStatus::default(),
            latest_input: InputSnapshot::default(),
            latch: PressLatch::default(),
            shots_fired: 0,
            hud: HudPublisher::new(settings.hud_interval()),
            settings,
            input_rx,
            events_tx,
            hud_tx,
        };

        (session, link, hud_rx)
    }

    /// Run the tick loop until the session is quit
    pub async fn run(mut self) -> SessionSummary {
        info!(session_id = %self.id, tick_rate = self.settings.tick_rate, "Session started");

        if self.settings.auto_start {
            self.set_phase(GamePhase::Playing);
        }
        self.publish_hud();

        let tick_duration = tick_delta(self.settings.tick_rate);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Body and weather advance per tick; the play clock also moves
        // when a reload deadline fires between ticks
        let mut last_tick = Instant::now();
        let mut clock_synced = last_tick;

        loop {
            let reload_wake = self.reload_wake_at(clock_synced);

            tokio::select! {
                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now - last_tick;
                    let clock_dt = now - clock_synced;
                    last_tick = now;
                    clock_synced = now;

                    let timer = Timer::new();
                    self.process_inputs();
                    self.run_tick(dt, clock_dt);
                    let cost = timer.elapsed_micros();
                    if cost > tick_duration.as_micros() as u64 {
                        warn!(session_id = %self.id, tick = self.tick, cost_us = cost, "Tick over budget");
                    }
                }
                _ = wait_until(reload_wake) => {
                    let now = Instant::now();
                    self.clock.advance(now - clock_synced);
                    clock_synced = now;
                    self.finish_reload();
                }
            }

            if self.phase == GamePhase::GameOver {
                break;
            }
        }

        self.controller.shutdown();
        let summary = SessionSummary {
            session_id: self.id,
            started_at: self.started_at,
            ticks: self.tick,
            play_time: self.clock.now(),
            shots_fired: self.shots_fired,
        };

        info!(
            session_id = %self.id,
            ticks = summary.ticks,
            play_time_ms = summary.play_time.as_millis() as u64,
            shots_fired = summary.shots_fired,
            "Session ended"
        );

        let _ = self.events_tx.send(ServerMsg::SessionEnd {
            session_id: self.id,
            started_at: self.started_at,
            ticks: self.tick,
            shots_fired: self.shots_fired,
        });

        summary
    }

    /// Wall-clock instant at which the pending reload is due. Only
    /// scheduled while playing, since the play clock is frozen otherwise.
    fn reload_wake_at(&self, clock_synced: Instant) -> Option<Instant> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let deadline = self.controller.reload_deadline()?;
        Some(clock_synced + deadline.saturating_sub(self.clock.now()))
    }

    /// Drain all pending messages from the input source
    fn process_inputs(&mut self) {
        while let Ok(msg) = self.input_rx.try_recv() {
            match msg {
                ClientMsg::Input(frame) => {
                    self.latch.record(&frame);
                    self.latest_input = frame;
                }
                ClientMsg::Start => self.transition(GamePhase::Menu, GamePhase::Playing),
                ClientMsg::Pause => self.transition(GamePhase::Playing, GamePhase::Paused),
                ClientMsg::Resume => self.transition(GamePhase::Paused, GamePhase::Playing),
                ClientMsg::Quit => self.set_phase(GamePhase::GameOver),
            }
        }
    }

    fn transition(&mut self, from: GamePhase, to: GamePhase) {
        if self.phase != from {
            warn!(session_id = %self.id, phase = ?self.phase, requested = ?to, "Invalid phase transition");
            let _ = self.events_tx.send(ServerMsg::error(
                "invalid_transition",
                format!("cannot move from {:?} to {:?}", self.phase, to),
            ));
            return;
        }
        self.set_phase(to);
    }

    fn set_phase(&mut self, phase: GamePhase) {
        if self.phase == phase {
            return;
        }
        info!(session_id = %self.id, from = ?self.phase, to = ?phase, "Phase changed");
        self.phase = phase;
        let _ = self.events_tx.send(ServerMsg::PhaseChanged {
            tick: self.tick,
            phase,
        });
        self.hud.force_next();
    }

    /// Run a single simulation tick. `dt` is the time since the last
    /// tick, `clock_dt` the play time not yet applied to the clock.
    fn run_tick(&mut self, dt: Duration, clock_dt: Duration) {
        self.tick += 1;

        match self.phase {
            GamePhase::Menu | GamePhase::Paused | GamePhase::GameOver => {
                // Inputs still drain, presses made while idle are dropped
                self.latch = PressLatch::default();
            }
            GamePhase::Playing => {
                self.clock.advance(clock_dt);
                let now = self.clock.now();

                let frame = self.latch.take_into(&self.latest_input);
                let output = self.controller.step(&frame, &self.body, now);

                // Controller writes velocity, the body integrates it
                self.body.velocity = output.desired_velocity;
                let step = dt.min(max_step(self.settings.tick_rate));
                self.integrator.integrate(&mut self.body, step.as_secs_f32());

                self.emit_step_events(&output);

                if let Some(weather) = self.weather.advance(dt) {
                    debug!(session_id = %self.id, ?weather, "Weather changed");
                    let _ = self.events_tx.send(ServerMsg::WeatherChanged {
                        tick: self.tick,
                        weather,
                    });
                    self.hud.force_next();
                }
            }
        }

        if self.hud.should_send() {
            self.publish_hud();
        }
    }

    fn emit_step_events(&mut self, output: &StepOutput) {
        if output.jumped {
            debug!(session_id = %self.id, tick = self.tick, "Jumped");
        }
        if let Some(shot) = output.shot {
            self.shots_fired += 1;
            trace!(
                session_id = %self.id,
                at_ms = shot.at.as_millis() as u64,
                camera = ?output.camera.position,
                "Fire event"
            );
            let _ = self.events_tx.send(ServerMsg::Fired {
                tick: self.tick,
                ammo_left: shot.ammo_left,
                origin: shot.origin,
                direction: shot.direction,
            });
            self.hud.force_next();
        }
        if output.reload_finished {
            let _ = self.events_tx.send(ServerMsg::ReloadFinished {
                tick: self.tick,
                ammo: output.ammo.current(),
            });
            self.hud.force_next();
        }
        if output.reload_started {
            let _ = self.events_tx.send(ServerMsg::ReloadStarted {
                tick: self.tick,
                ammo: output.ammo.current(),
            });
            self.hud.force_next();
        }
        if output.view_changed {
            let _ = self.events_tx.send(ServerMsg::ViewChanged {
                tick: self.tick,
                view: output.view,
            });
            self.hud.force_next();
        }
    }

    /// One-shot reload deadline fired between ticks
    fn finish_reload(&mut self) {
        if self.controller.complete_reload(self.clock.now()) {
            let _ = self.events_tx.send(ServerMsg::ReloadFinished {
                tick: self.tick,
                ammo: self.controller.ammo().current(),
            });
            self.publish_hud();
        }
    }

    fn publish_hud(&mut self) {
        let state = self.hud.build(
            self.tick,
            self.phase,
            &self.controller,
            &self.body,
            &self.weather,
            &self.status,
            &self.latest_input.clothes_color,
        );
        self.hud_tx.send_replace(state.clone());
        let _ = self.events_tx.send(ServerMsg::Hud(state));
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
