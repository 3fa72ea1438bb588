pub mod exchange;

pub use exchange::{Basis, Bit, Role, RoleRecord, Trace, TraceError};
