//! Fixed-rate frame engine for gaze selection
//!
//! Each tick runs the same ordered phases: pick what the gaze ray hits,
//! dispatch the dwell reading to the state machine, advance the scene while
//! it plays, then build the cursor and HUD from the latest state. Frames are
//! skipped entirely while no session is active.

use std::sync::Arc;
use std::time::Duration;

use gaze_select::{
    AppState, CursorAnimator, CursorConfig, CursorFrame, DwellConfig, DwellPicker, DwellReading,
    HudView, NoEffects, PickTarget, SelectionStateMachine, SideEffects,
};
use math_util::Ray;
use tracing::debug;

mod scene;
pub use scene::{Scene, StaticScene};

/// Per-tick input from the host
#[derive(Debug, Clone, Copy)]
pub struct FrameInput {
    /// Screen-center gaze ray
    pub ray: Ray,
    pub timestamp_ms: f64,
}

/// Everything the renderer needs after a tick
#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub state: Arc<AppState>,
    pub reading: Option<DwellReading>,
    pub cursor: CursorFrame,
    pub hud: HudView,
    /// No frame work happened (session inactive)
    pub skipped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pick,
    Dispatch,
    Advance,
    Present,
}

pub struct Schedule {
    phases: [Phase; 4],
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            phases: [Phase::Pick, Phase::Dispatch, Phase::Advance, Phase::Present],
        }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    pub skipped: u64,
    pub advanced: u64,
}

/// Scratch data handed from one phase to the next
#[derive(Default)]
struct FrameScratch {
    targets: Vec<PickTarget>,
    reading: Option<DwellReading>,
    presented: Option<(Arc<AppState>, CursorFrame, HudView)>,
}

pub struct Engine<S: Scene, E: SideEffects = NoEffects> {
    tick_hz: u32,
    dt: Duration,
    schedule: Schedule,
    scene: S,
    machine: SelectionStateMachine<E>,
    picker: DwellPicker,
    cursor: CursorAnimator,
    stats: EngineStats,
    last_timestamp_ms: Option<f64>,
    // 1 Hz telemetry over simulated time
    window_start_ms: f64,
    ticks_in_window: u32,
}

impl<S: Scene, E: SideEffects> Engine<S, E> {
    pub fn new_fixed_hz(tick_hz: u32, scene: S, machine: SelectionStateMachine<E>) -> Self {
        let tick_hz = tick_hz.max(1);
        let picker = DwellPicker::default();
        let cursor = CursorAnimator::new(CursorConfig::default(), picker.threshold_ms());
        Self {
            tick_hz,
            dt: Duration::from_secs_f64(1.0 / tick_hz as f64),
            schedule: Schedule::new(),
            scene,
            machine,
            picker,
            cursor,
            stats: EngineStats::default(),
            last_timestamp_ms: None,
            window_start_ms: 0.0,
            ticks_in_window: 0,
        }
    }

    /// Dwell threshold also sets the cursor spin period
    pub fn with_dwell(mut self, dwell: DwellConfig, cursor: CursorConfig) -> Self {
        self.picker = DwellPicker::with_config(dwell);
        self.cursor = CursorAnimator::new(cursor, self.picker.threshold_ms());
        self
    }

    pub fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    /// Fixed frame interval
    pub fn dt(&self) -> Duration {
        self.dt
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn machine(&self) -> &SelectionStateMachine<E> {
        &self.machine
    }

    pub fn picker(&self) -> &DwellPicker {
        &self.picker
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn tick_once(&mut self, input: FrameInput) -> FrameOutput {
        let dt_ms = match self.last_timestamp_ms {
            Some(last) => (input.timestamp_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_timestamp_ms = Some(input.timestamp_ms);
        self.stats.ticks += 1;
        self.report(input.timestamp_ms);

        let state = self.machine.snapshot();
        if !state.session_active {
            self.stats.skipped += 1;
            // Gaze time does not carry across an inactive stretch.
            self.picker.reset();
            return FrameOutput {
                hud: HudView::from_state(&state),
                state,
                reading: None,
                cursor: CursorFrame::hidden(),
                skipped: true,
            };
        }

        let mut frame = FrameScratch::default();
        let phases = self.schedule.phases;
        for phase in phases {
            self.run_phase(phase, &input, dt_ms, &mut frame);
        }

        let (state, cursor, hud) = match frame.presented {
            Some(presented) => presented,
            None => {
                let state = self.machine.snapshot();
                (Arc::clone(&state), CursorFrame::hidden(), HudView::from_state(&state))
            }
        };
        FrameOutput {
            state,
            reading: frame.reading,
            cursor,
            hud,
            skipped: false,
        }
    }

    fn run_phase(&mut self, phase: Phase, input: &FrameInput, dt_ms: f64, frame: &mut FrameScratch) {
        match phase {
            Phase::Pick => {
                frame.targets = self.scene.pick_targets();
                frame.reading = Some(self.picker.sample(&input.ray, &frame.targets, input.timestamp_ms));
            }
            Phase::Dispatch => {
                if let Some(reading) = &frame.reading {
                    self.machine.handle_action(reading.to_action());
                }
            }
            Phase::Advance => {
                if self.machine.snapshot().playing {
                    self.scene.advance(dt_ms);
                    self.stats.advanced += 1;
                    frame.targets = self.scene.pick_targets();
                }
            }
            Phase::Present => {
                let state = self.machine.snapshot();
                let cursor = self.cursor.frame(&state, &frame.targets, input.timestamp_ms);
                let hud = HudView::from_state(&state);
                frame.presented = Some((state, cursor, hud));
            }
        }
    }

    fn report(&mut self, timestamp_ms: f64) {
        self.ticks_in_window += 1;
        if self.stats.ticks == 1 {
            self.window_start_ms = timestamp_ms;
            return;
        }
        if timestamp_ms - self.window_start_ms >= 1000.0 {
            debug!(
                tick = self.stats.ticks,
                hz = self.tick_hz,
                last_sec_ticks = self.ticks_in_window,
                skipped = self.stats.skipped,
                "engine"
            );
            self.ticks_in_window = 0;
            self.window_start_ms = timestamp_ms;
        }
    }
}
