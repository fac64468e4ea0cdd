//! Headless gaze viewer: solar system scene, scripted head and frame loop

use std::sync::Arc;

use engine_core::{Engine, FrameInput, FrameOutput};
use gaze_select::{Action, AppState, HudView, QueueStats, SelectionStateMachine, SideEffects, UiEvent};
use glam::Vec3;
use parking_lot::Mutex;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::GazeConfig;
use crate::head_pose::{GazeScript, HeadPose};
use crate::solar_system::SolarSystem;

mod audit;
pub use audit::{SelectionAudit, SelectionRecord, SelectionSource};

/// What a finished run looked like
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub frames: u64,
    pub final_state: Arc<AppState>,
    pub selections: Vec<SelectionRecord>,
    pub queue: QueueStats,
}

pub struct App {
    engine: Engine<SolarSystem, SelectionAudit>,
    machine: SelectionStateMachine<SelectionAudit>,
    audit: SelectionAudit,
    head: HeadPose,
    script: GazeScript,
    run_frames: Option<u64>,
}

impl App {
    /// Must be called inside a Tokio runtime
    pub fn new(config: &GazeConfig) -> anyhow::Result<Self> {
        let audit = SelectionAudit::new();
        let machine = SelectionStateMachine::with_effects(AppState::default(), audit.clone())?;
        log_hud_changes(&machine);

        let scene = SolarSystem::new(config.scene.clone());
        let engine = Engine::new_fixed_hz(config.engine.tick_hz, scene, machine.clone())
            .with_dwell(config.selection.dwell, config.selection.cursor);

        Ok(Self {
            engine,
            machine,
            audit,
            head: HeadPose::new(Vec3::from(config.head.position)),
            script: GazeScript::from_config(&config.head),
            run_frames: config.engine.run_frames,
        })
    }

    pub fn machine(&self) -> &SelectionStateMachine<SelectionAudit> {
        &self.machine
    }

    pub fn hud(&self) -> HudView {
        HudView::from_state(&self.machine.snapshot())
    }

    /// Route a HUD widget event to the state machine
    pub fn ui_event(&self, event: UiEvent) -> Arc<AppState> {
        let action = event.to_action(&self.hud());
        self.machine.handle_action(action)
    }

    /// One frame at `timestamp_ms` into the run
    pub fn frame(&mut self, timestamp_ms: f64) -> FrameOutput {
        self.aim_head(timestamp_ms);
        self.engine.tick_once(FrameInput {
            ray: self.head.gaze_ray(),
            timestamp_ms,
        })
    }

    /// Start the session, run the frame loop, then end the session
    pub async fn run(mut self) -> anyhow::Result<RunSummary> {
        self.machine.handle_action(Action::AppInit);
        info!(tick_hz = self.engine.tick_hz(), frames = ?self.run_frames, "session started");

        let mut ticker = interval(self.engine.dt());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let started = Instant::now();
        let mut frames = 0u64;
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            if self.run_frames.is_some_and(|limit| frames >= limit) {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    let timestamp_ms = started.elapsed().as_secs_f64() * 1000.0;
                    self.frame(timestamp_ms);
                    frames += 1;
                }
                _ = &mut shutdown => {
                    info!("interrupted");
                    break;
                }
            }
        }

        self.ui_event(UiEvent::ExitClicked);
        self.machine.flush().await?;

        let summary = RunSummary {
            frames,
            final_state: self.machine.snapshot(),
            selections: self.audit.records(),
            queue: self.machine.queue_stats(),
        };
        info!(
            frames = summary.frames,
            selections = summary.selections.len(),
            failed_effects = summary.queue.failed + summary.queue.panicked,
            "session ended"
        );
        Ok(summary)
    }

    fn aim_head(&mut self, timestamp_ms: f64) {
        let body = self
            .script
            .body_at(timestamp_ms)
            .and_then(|name| self.engine.scene().body(name));

        match body {
            Some(body) => self.head.look_at(body.position),
            // Look back over the shoulder, away from the scene.
            None => self.head.look_at(self.head.position + Vec3::Z),
        }
    }
}

/// Log overlay changes the way the HUD would redraw them
fn log_hud_changes<E: SideEffects>(machine: &SelectionStateMachine<E>) {
    let last = Mutex::new(HudView::from_state(&machine.snapshot()));
    machine.subscribe(move |state: &AppState| {
        let view = HudView::from_state(state);
        let mut last = last.lock();
        if view.pause_glyph != last.pause_glyph {
            info!(glyph = view.pause_glyph, "pause button");
        }
        if view.selection_value != last.selection_value {
            info!(selection = %view.selection_value, "selection dropdown");
        }
        if view.end_session && !last.end_session {
            warn!("session end requested");
        }
        *last = view;
    });
}
