use serde::Serialize;

use crate::trace::{Role, Trace};

/// One photon glide across (part of) the channel, expressed relative to the
/// start of the current step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhotonFlight {
    pub role: Role,
    pub start_offset_ms: f64,
    pub duration_ms: f64,
    pub start_position: f64,
    pub end_position: f64,
}

impl PhotonFlight {
    pub fn position_at(&self, elapsed_in_step_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return self.end_position;
        }
        let local = ((elapsed_in_step_ms - self.start_offset_ms) / self.duration_ms).clamp(0.0, 1.0);
        self.start_position + (self.end_position - self.start_position) * local
    }

    pub fn is_active_at(&self, elapsed_in_step_ms: f64) -> bool {
        elapsed_in_step_ms >= self.start_offset_ms
            && elapsed_in_step_ms < self.start_offset_ms + self.duration_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhotonPose {
    pub role: Role,
    pub position: f64,
}

/// Flight plan for one playback step. Geometry is shared by every step of a
/// trace: what varies per step is the bit/basis content, not the path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSchedule {
    flights: Vec<PhotonFlight>,
}

impl StepSchedule {
    /// Lays out the photon flights for one step. Returns `None` until the
    /// channel has been measured: a zero-width channel has nowhere to draw,
    /// and planning against it would bake degenerate positions into the
    /// descriptors.
    pub fn plan(trace: &Trace, step_duration_ms: f64, channel_width: f64) -> Option<Self> {
        if channel_width <= 0.0 {
            return None;
        }
        let flights = if trace.has_interceptor() {
            // Relay through Eve: each leg covers half the channel in half
            // the step window, the second departing as the first lands.
            let leg_ms = step_duration_ms / 2.0;
            let midpoint = channel_width / 2.0;
            vec![
                PhotonFlight {
                    role: Role::Alice,
                    start_offset_ms: 0.0,
                    duration_ms: leg_ms,
                    start_position: 0.0,
                    end_position: midpoint,
                },
                PhotonFlight {
                    role: Role::Eve,
                    start_offset_ms: leg_ms,
                    duration_ms: leg_ms,
                    start_position: midpoint,
                    end_position: channel_width,
                },
            ]
        } else {
            vec![PhotonFlight {
                role: Role::Alice,
                start_offset_ms: 0.0,
                duration_ms: step_duration_ms,
                start_position: 0.0,
                end_position: channel_width,
            }]
        };
        Some(StepSchedule { flights })
    }

    pub fn flights(&self) -> &[PhotonFlight] {
        &self.flights
    }

    /// Photon positions for render time `elapsed_in_step_ms`. A flight only
    /// contributes while the step clock sits inside its window, so during a
    /// relay step exactly one photon is visible at a time.
    pub fn poses_at(&self, elapsed_in_step_ms: f64) -> Vec<PhotonPose> {
        self.flights
            .iter()
            .filter(|flight| flight.is_active_at(elapsed_in_step_ms))
            .map(|flight| PhotonPose {
                role: flight.role,
                position: flight.position_at(elapsed_in_step_ms),
            })
            .collect()
    }
}
