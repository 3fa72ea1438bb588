use crate::client::SimulationParams;
use crate::trace::Trace;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// A trace together with the parameters that produced it, as stored on
/// disk. Keeping the parameters makes an archived run reproducible against
/// the simulation service and lets the replay view label itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceArchive {
    pub trace: Trace,
    pub params: Option<SimulationParams>,
}

impl TraceArchive {
    pub fn new(trace: Trace) -> Self {
        TraceArchive {
            trace,
            params: None,
        }
    }

    pub fn with_params(trace: Trace, params: SimulationParams) -> Self {
        TraceArchive {
            trace,
            params: Some(params),
        }
    }
}

pub fn save_trace_archive<P: AsRef<Path>>(path: P, archive: &TraceArchive) -> io::Result<()> {
    let bytes = bincode::serialize(archive)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, format!("serialize trace: {err}")))?;
    let mut file = fs::File::create(path)?;
    file.write_all(&bytes)
}

pub fn load_trace_archive<P: AsRef<Path>>(path: P) -> io::Result<TraceArchive> {
    let bytes = fs::read(path)?;
    bincode::deserialize(&bytes)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, format!("deserialize trace: {err}")))
}
