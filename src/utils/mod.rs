pub mod sample_trace;
pub mod serialization;
