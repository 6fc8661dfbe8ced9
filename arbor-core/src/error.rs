//! Registration-time errors.
//!
//! Nothing that happens while a traversal is running is reported through
//! these types: walks degrade to "absent" or "blocked" and surface overflow
//! as a flag instead.

#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown growth logic kit: {0}")]
    UnknownGrowthLogic(String),

    #[error("unknown cell kit: {0}")]
    UnknownCellKit(String),

    #[error("unknown family: {0}")]
    UnknownFamily(String),

    #[error("unknown leaves properties: {0}")]
    UnknownLeaves(String),

    #[error("{kind} `{name}` is already registered")]
    Duplicate { kind: &'static str, name: String },

    #[error(
        "family `{family}` has invalid thickness (primary {primary}, secondary {secondary}, max {max})"
    )]
    InvalidThickness {
        family: String,
        primary: u8,
        secondary: u8,
        max: u8,
    },

    #[error("cell kit `{kit}` has hydration {value} outside 1..=4")]
    InvalidHydration { kit: String, value: u8 },

    #[error("cell kit `{kit}` has invalid solver code {code:#06x}")]
    InvalidSolverCode { kit: String, code: u16 },

    #[error("leaf cluster expects {expected} cells, got {actual}")]
    InvalidLeafCluster { expected: usize, actual: usize },

    #[error("species `{species}` uses leaves `{leaves}` from a different family")]
    FamilyMismatch { species: String, leaves: String },
}
