pub mod client;
pub mod playback;
pub mod trace;
pub mod ui;
pub mod utils;

pub use client::{
    DiagramRequest, SimulationClient, SimulationParams, TraceResponse, UpstreamError,
};
pub use playback::{
    EngineState, PhotonFlight, PhotonPose, PlaybackConfig, PlaybackEngine, PlaybackError,
    StepSchedule,
};
pub use trace::{Basis, Bit, Role, RoleRecord, Trace, TraceError};
pub use ui::{ReplayVisualizer, WebReplayVisualizer};
