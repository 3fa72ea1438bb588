use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::trace::{Basis, Bit, Role, RoleRecord, Trace, TraceError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

fn debug_log(msg: &str) {
    if env::var("QKD_DEBUG_HTTP").is_ok() {
        eprintln!("{}", msg);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("simulation service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("simulation service answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("simulation response is not a playable trace: {0}")]
    Malformed(#[from] TraceError),
    #[error("sifted key entry {index} is not a bit: {value:?}")]
    InvalidKeyBit { index: usize, value: String },
}

/// Knobs forwarded verbatim to the simulation service. Field names follow
/// the service's JSON contract, so adding a knob here is enough to expose
/// it end to end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationParams {
    pub bit_count: u32,
    #[serde(rename = "isEveMode")]
    pub eve_mode: bool,
    pub perturb_probability: f64,
    pub sop_mean_deviation: f64,
    pub source_efficiency: f64,
    pub fiber_length: f64,
    pub fiber_loss: f64,
    pub detector_efficiency: f64,
    pub source_rate: f64,
}

impl Default for SimulationParams {
    /// The lossless-channel preset the reset control falls back to: every
    /// photon survives and nothing perturbs it.
    fn default() -> Self {
        SimulationParams {
            bit_count: 50,
            eve_mode: false,
            perturb_probability: 0.0,
            sop_mean_deviation: 0.0,
            source_efficiency: 1.0,
            fiber_length: 0.0,
            fiber_loss: 0.0,
            detector_efficiency: 1.0,
            source_rate: 72.6,
        }
    }
}

/// Raw `/bb84` response body. Cell values stay as wire integers here;
/// `into_trace` is where they become typed and checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResponse {
    pub alice_bits: Vec<u8>,
    pub alice_bases: Vec<u8>,
    pub bob_bits: Vec<Option<u8>>,
    pub bob_bases: Vec<u8>,
    #[serde(default)]
    pub eve_bits: Vec<Option<u8>>,
    #[serde(default)]
    pub eve_bases: Vec<Option<u8>>,
    pub sifted_key: Vec<String>,
    /// The service reports QBER as a percentage.
    pub quantum_bit_error_rate: f64,
    pub matching_bases_count: u32,
}

impl TraceResponse {
    pub fn into_trace(self) -> Result<Trace, UpstreamError> {
        let step_count = self.alice_bits.len();
        let alice = RoleRecord {
            bits: decode_bit_cells(Role::Alice, self.alice_bits.iter().map(|&v| Some(v)))?,
            bases: decode_basis_cells(Role::Alice, self.alice_bases.iter().map(|&v| Some(v)))?,
        };
        let bob = RoleRecord {
            bits: decode_bit_cells(Role::Bob, self.bob_bits.iter().copied())?,
            bases: decode_basis_cells(Role::Bob, self.bob_bases.iter().map(|&v| Some(v)))?,
        };
        // The no-interceptor endpoint omits the eve arrays entirely.
        let eve = if self.eve_bits.is_empty() && self.eve_bases.is_empty() {
            RoleRecord::absent(step_count)
        } else {
            RoleRecord {
                bits: decode_bit_cells(Role::Eve, self.eve_bits.iter().copied())?,
                bases: decode_basis_cells(Role::Eve, self.eve_bases.iter().copied())?,
            }
        };
        let mut sifted_key = Vec::with_capacity(self.sifted_key.len());
        for (index, entry) in self.sifted_key.iter().enumerate() {
            let bit = entry
                .parse::<u8>()
                .ok()
                .and_then(Bit::from_u8)
                .ok_or_else(|| UpstreamError::InvalidKeyBit {
                    index,
                    value: entry.clone(),
                })?;
            sifted_key.push(bit);
        }
        let trace = Trace::new(
            alice,
            eve,
            bob,
            sifted_key,
            self.matching_bases_count,
            self.quantum_bit_error_rate / 100.0,
        )?;
        Ok(trace)
    }
}

fn decode_bit_cells(
    role: Role,
    cells: impl IntoIterator<Item = Option<u8>>,
) -> Result<Vec<Option<Bit>>, TraceError> {
    cells
        .into_iter()
        .map(|cell| match cell {
            None => Ok(None),
            Some(value) => Bit::from_u8(value)
                .map(Some)
                .ok_or(TraceError::InvalidBit { role, value }),
        })
        .collect()
}

fn decode_basis_cells(
    role: Role,
    cells: impl IntoIterator<Item = Option<u8>>,
) -> Result<Vec<Option<Basis>>, TraceError> {
    cells
        .into_iter()
        .map(|cell| match cell {
            None => Ok(None),
            Some(value) => Basis::from_u8(value)
                .map(Some)
                .ok_or(TraceError::InvalidBasis { role, value }),
        })
        .collect()
}

/// Body for `/bb84_circuit`, which renders the exchange as an SVG circuit
/// diagram.
#[derive(Debug, Clone, Serialize)]
pub struct DiagramRequest {
    pub alice_bits: Vec<u8>,
    pub alice_bases: Vec<u8>,
    pub bob_bases: Vec<u8>,
    pub eve_bases: Vec<Option<u8>>,
    #[serde(rename = "perturbProbability")]
    pub perturb_probability: f64,
}

impl DiagramRequest {
    pub fn from_trace(trace: &Trace, params: &SimulationParams) -> Self {
        let bit_to_wire = |cell: Option<Bit>| cell.map_or(0, Bit::to_u8);
        let basis_to_wire = |cell: Option<Basis>| cell.map_or(0, Basis::to_u8);
        DiagramRequest {
            alice_bits: trace.alice().bits.iter().map(|&c| bit_to_wire(c)).collect(),
            alice_bases: trace.alice().bases.iter().map(|&c| basis_to_wire(c)).collect(),
            bob_bases: trace.bob().bases.iter().map(|&c| basis_to_wire(c)).collect(),
            eve_bases: trace
                .eve()
                .bases
                .iter()
                .map(|cell| cell.map(Basis::to_u8))
                .collect(),
            perturb_probability: params.perturb_probability,
        }
    }
}

/// Blocking HTTP client for the simulation service. One instance per run;
/// the service is the black box that actually executes the protocol.
pub struct SimulationClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl SimulationClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, UpstreamError> {
        // Large runs push the circuit simulator into minutes of work, so the
        // read timeout is generous while the connect timeout stays tight.
        let http = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(180))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(SimulationClient { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Runs one simulation and returns the raw wire payload.
    pub fn run_simulation(&self, params: &SimulationParams) -> Result<TraceResponse, UpstreamError> {
        let endpoint = format!("{}/bb84", self.base_url);
        debug_log(&format!(
            "POST {endpoint} (qubits={}, eve={})",
            params.bit_count, params.eve_mode
        ));
        let response = self.http.post(&endpoint).json(params).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "unreadable response body".to_string());
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let payload = response.json::<TraceResponse>()?;
        debug_log(&format!(
            "{} answered with {} steps",
            endpoint,
            payload.alice_bits.len()
        ));
        Ok(payload)
    }

    /// Runs one simulation and adapts the payload into a playable trace.
    pub fn fetch_trace(&self, params: &SimulationParams) -> Result<Trace, UpstreamError> {
        self.run_simulation(params)?.into_trace()
    }

    /// Asks the service to render the exchange as an SVG document.
    pub fn fetch_circuit_diagram(&self, request: &DiagramRequest) -> Result<String, UpstreamError> {
        let endpoint = format!("{}/bb84_circuit", self.base_url);
        let response = self.http.post(&endpoint).json(request).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "unreadable response body".to_string());
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.text()?)
    }
}
