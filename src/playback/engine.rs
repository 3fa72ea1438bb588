use serde::Serialize;

use crate::playback::schedule::{PhotonPose, StepSchedule};
use crate::trace::{Trace, TraceError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    pub step_duration_ms: f64,
    pub loop_dwell_ms: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            step_duration_ms: 2400.0,
            loop_dwell_ms: 2000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Idle,
    Running,
    Paused,
    CycleComplete,
}

impl EngineState {
    pub fn label(self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Running => "running",
            EngineState::Paused => "paused",
            EngineState::CycleComplete => "cycle complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlaybackError {
    #[error("trace rejected: {0}")]
    InvalidTrace(#[from] TraceError),
    #[error("{operation} is not allowed while playback is {}", .state.label())]
    StateViolation {
        operation: &'static str,
        state: EngineState,
    },
}

/// Single-owner playback clock over one loaded [`Trace`].
///
/// All time passes through `tick`; the engine never schedules its own
/// timers. Progress is accumulated in milliseconds and the step fraction is
/// derived on read, so splitting a span across many ticks lands on exactly
/// the same state as one large tick.
#[derive(Debug)]
pub struct PlaybackEngine {
    config: PlaybackConfig,
    trace: Option<Trace>,
    state: EngineState,
    current_step: usize,
    elapsed_in_step_ms: f64,
    dwell_remaining_ms: f64,
    channel_width: f64,
}

impl PlaybackEngine {
    pub fn new(config: PlaybackConfig) -> Self {
        assert!(
            config.step_duration_ms > 0.0 && config.step_duration_ms.is_finite(),
            "step duration must be a positive number of milliseconds"
        );
        assert!(
            config.loop_dwell_ms >= 0.0 && config.loop_dwell_ms.is_finite(),
            "loop dwell must be a non-negative number of milliseconds"
        );
        PlaybackEngine {
            config,
            trace: None,
            state: EngineState::Idle,
            current_step: 0,
            elapsed_in_step_ms: 0.0,
            dwell_remaining_ms: 0.0,
            channel_width: 0.0,
        }
    }

    /// Accepts a trace and starts playback at step 0. Only legal from
    /// `Idle`; call `reset` first to replace a trace mid-flight.
    pub fn load(&mut self, trace: Trace) -> Result<(), PlaybackError> {
        if self.state != EngineState::Idle {
            return Err(PlaybackError::StateViolation {
                operation: "load",
                state: self.state,
            });
        }
        trace.validate()?;
        self.trace = Some(trace);
        self.state = EngineState::Running;
        self.current_step = 0;
        self.elapsed_in_step_ms = 0.0;
        self.dwell_remaining_ms = 0.0;
        Ok(())
    }

    /// Feeds `elapsed_ms` of host-clock time into the playback. Carries any
    /// surplus across step boundaries and through the loop dwell, so a
    /// single oversized tick traverses the same transitions as many small
    /// ones. No-op while `Idle` or `Paused`.
    pub fn tick(&mut self, elapsed_ms: f64) {
        debug_assert!(
            elapsed_ms.is_finite() && elapsed_ms >= 0.0,
            "tick expects a non-negative finite elapsed time"
        );
        match self.state {
            EngineState::Idle | EngineState::Paused => return,
            EngineState::Running | EngineState::CycleComplete => {}
        }
        let mut remaining = elapsed_ms.max(0.0);
        while remaining > 0.0 {
            if self.state == EngineState::CycleComplete {
                if remaining < self.dwell_remaining_ms {
                    self.dwell_remaining_ms -= remaining;
                    remaining = 0.0;
                } else {
                    remaining -= self.dwell_remaining_ms;
                    self.restart_cycle();
                }
            } else {
                let step_left = self.config.step_duration_ms - self.elapsed_in_step_ms;
                if remaining < step_left {
                    self.elapsed_in_step_ms += remaining;
                    remaining = 0.0;
                } else {
                    remaining -= step_left;
                    self.advance_step();
                }
            }
        }
    }

    /// Freezes the step clock where it stands. In-flight photon positions
    /// stay put because they are derived from the frozen clock, not from
    /// wall time.
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        if self.state != EngineState::Running {
            return Err(PlaybackError::StateViolation {
                operation: "pause",
                state: self.state,
            });
        }
        self.state = EngineState::Paused;
        Ok(())
    }

    /// Picks the step clock back up from the frozen position. The rest of
    /// the step plays out in `(1 - progress) * step_duration_ms` of ticked
    /// time, never from the start of the step.
    pub fn resume(&mut self) -> Result<(), PlaybackError> {
        if self.state != EngineState::Paused {
            return Err(PlaybackError::StateViolation {
                operation: "resume",
                state: self.state,
            });
        }
        self.state = EngineState::Running;
        Ok(())
    }

    /// Discards the trace and returns to `Idle`. Legal in every state.
    /// Clearing the dwell counter here is what cancels a pending loop
    /// restart: a later `load` starts from a clean clock.
    pub fn reset(&mut self) {
        self.trace = None;
        self.state = EngineState::Idle;
        self.current_step = 0;
        self.elapsed_in_step_ms = 0.0;
        self.dwell_remaining_ms = 0.0;
    }

    /// Records the latest channel layout measurement. Descriptors are
    /// recomputed from this value on demand, so a resize retargets photon
    /// positions without disturbing step progress.
    pub fn set_channel_width(&mut self, width: f64) {
        self.channel_width = width.max(0.0);
    }

    fn advance_step(&mut self) {
        self.elapsed_in_step_ms = 0.0;
        self.current_step += 1;
        let step_count = self
            .trace
            .as_ref()
            .expect("engine cannot be running without a trace")
            .step_count();
        if self.current_step >= step_count {
            self.current_step = step_count;
            self.state = EngineState::CycleComplete;
            self.dwell_remaining_ms = self.config.loop_dwell_ms;
        }
    }

    fn restart_cycle(&mut self) {
        self.current_step = 0;
        self.elapsed_in_step_ms = 0.0;
        self.dwell_remaining_ms = 0.0;
        self.state = EngineState::Running;
    }

    pub fn config(&self) -> PlaybackConfig {
        self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    pub fn step_count(&self) -> usize {
        self.trace.as_ref().map_or(0, Trace::step_count)
    }

    /// Index of the step currently playing. Equals `step_count` while the
    /// loop banner is up, which is also the only time it may equal it.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn step_progress(&self) -> f64 {
        self.elapsed_in_step_ms / self.config.step_duration_ms
    }

    pub fn elapsed_in_step_ms(&self) -> f64 {
        self.elapsed_in_step_ms
    }

    pub fn dwell_remaining_ms(&self) -> f64 {
        self.dwell_remaining_ms
    }

    pub fn loop_banner_visible(&self) -> bool {
        self.state == EngineState::CycleComplete
    }

    pub fn channel_width(&self) -> f64 {
        self.channel_width
    }

    /// Flight plan for the current step against the latest channel width,
    /// or `None` when idle or before the first layout measurement.
    pub fn schedule(&self) -> Option<StepSchedule> {
        let trace = self.trace.as_ref()?;
        if self.state == EngineState::CycleComplete {
            return None;
        }
        StepSchedule::plan(trace, self.config.step_duration_ms, self.channel_width)
    }

    /// Photon positions at the current step clock. Empty while idle, during
    /// the loop dwell, or while the channel is still unmeasured.
    pub fn photon_poses(&self) -> Vec<PhotonPose> {
        self.schedule()
            .map(|schedule| schedule.poses_at(self.elapsed_in_step_ms))
            .unwrap_or_default()
    }
}
