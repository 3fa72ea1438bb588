use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bit {
    Zero,
    One,
}

impl Bit {
    pub fn to_u8(self) -> u8 {
        match self {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Bit::Zero),
            1 => Some(Bit::One),
            _ => None,
        }
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Basis {
    Rectilinear,
    Diagonal,
}

impl Basis {
    pub fn to_u8(self) -> u8 {
        match self {
            Basis::Rectilinear => 0,
            Basis::Diagonal => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Basis::Rectilinear),
            1 => Some(Basis::Diagonal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Alice,
    Eve,
    Bob,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Alice => "Alice",
            Role::Eve => "Eve",
            Role::Bob => "Bob",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub bits: Vec<Option<Bit>>,
    pub bases: Vec<Option<Basis>>,
}

impl RoleRecord {
    pub fn absent(step_count: usize) -> Self {
        RoleRecord {
            bits: vec![None; step_count],
            bases: vec![None; step_count],
        }
    }

    pub fn measured(bits: Vec<Bit>, bases: Vec<Basis>) -> Self {
        RoleRecord {
            bits: bits.into_iter().map(Some).collect(),
            bases: bases.into_iter().map(Some).collect(),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.bits.iter().all(Option::is_none) && self.bases.iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TraceError {
    #[error("trace contains no steps")]
    Empty,
    #[error("{} {sequence} length {actual} does not match step count {expected}", .role.label())]
    LengthMismatch {
        role: Role,
        sequence: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("sifted key length {actual} exceeds step count {step_count}")]
    SiftedKeyTooLong { actual: usize, step_count: usize },
    #[error("matching bases count {count} exceeds step count {step_count}")]
    MatchingCountOutOfRange { count: u32, step_count: usize },
    #[error("error rate {rate} is outside [0, 1]")]
    ErrorRateOutOfRange { rate: f64 },
    #[error("{} record carries invalid bit value {value}", .role.label())]
    InvalidBit { role: Role, value: u8 },
    #[error("{} record carries invalid basis value {value}", .role.label())]
    InvalidBasis { role: Role, value: u8 },
}

/// Immutable record of one simulated exchange. Index `i` refers to the same
/// protocol step across every role; `None` marks a step a role did not
/// measure (absent eavesdropper or lost photon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    alice: RoleRecord,
    eve: RoleRecord,
    bob: RoleRecord,
    sifted_key: Vec<Bit>,
    matching_bases_count: u32,
    error_rate: f64,
}

impl Trace {
    pub fn new(
        alice: RoleRecord,
        eve: RoleRecord,
        bob: RoleRecord,
        sifted_key: Vec<Bit>,
        matching_bases_count: u32,
        error_rate: f64,
    ) -> Result<Self, TraceError> {
        let trace = Trace {
            alice,
            eve,
            bob,
            sifted_key,
            matching_bases_count,
            error_rate,
        };
        trace.check_structure()?;
        Ok(trace)
    }

    /// Playability check used by the engine's `load`: the structural
    /// invariants plus the non-empty requirement. Deserialized archives
    /// bypass `new`, so this re-checks everything.
    pub fn validate(&self) -> Result<(), TraceError> {
        self.check_structure()?;
        if self.step_count() == 0 {
            return Err(TraceError::Empty);
        }
        Ok(())
    }

    fn check_structure(&self) -> Result<(), TraceError> {
        let expected = self.alice.bits.len();
        for role in [Role::Alice, Role::Eve, Role::Bob] {
            let record = self.role(role);
            if record.bits.len() != expected {
                return Err(TraceError::LengthMismatch {
                    role,
                    sequence: "bits",
                    expected,
                    actual: record.bits.len(),
                });
            }
            if record.bases.len() != expected {
                return Err(TraceError::LengthMismatch {
                    role,
                    sequence: "bases",
                    expected,
                    actual: record.bases.len(),
                });
            }
        }
        if self.sifted_key.len() > expected {
            return Err(TraceError::SiftedKeyTooLong {
                actual: self.sifted_key.len(),
                step_count: expected,
            });
        }
        if self.matching_bases_count as usize > expected {
            return Err(TraceError::MatchingCountOutOfRange {
                count: self.matching_bases_count,
                step_count: expected,
            });
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(TraceError::ErrorRateOutOfRange {
                rate: self.error_rate,
            });
        }
        Ok(())
    }

    pub fn step_count(&self) -> usize {
        self.alice.bits.len()
    }

    pub fn role(&self, role: Role) -> &RoleRecord {
        match role {
            Role::Alice => &self.alice,
            Role::Eve => &self.eve,
            Role::Bob => &self.bob,
        }
    }

    pub fn alice(&self) -> &RoleRecord {
        &self.alice
    }

    pub fn eve(&self) -> &RoleRecord {
        &self.eve
    }

    pub fn bob(&self) -> &RoleRecord {
        &self.bob
    }

    pub fn bit(&self, role: Role, step: usize) -> Option<Bit> {
        self.role(role).bits.get(step).copied().flatten()
    }

    pub fn basis(&self, role: Role, step: usize) -> Option<Basis> {
        self.role(role).bases.get(step).copied().flatten()
    }

    pub fn has_interceptor(&self) -> bool {
        !self.eve.is_absent()
    }

    pub fn sifted_key(&self) -> &[Bit] {
        &self.sifted_key
    }

    pub fn matching_bases_count(&self) -> u32 {
        self.matching_bases_count
    }

    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }
}
