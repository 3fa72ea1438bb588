pub mod engine;
pub mod schedule;

pub use engine::{EngineState, PlaybackConfig, PlaybackEngine, PlaybackError};
pub use schedule::{PhotonFlight, PhotonPose, StepSchedule};
