//! Error taxonomy for the equilibration engine.
//!
//! Every variant is local to a single run: the driver catches them, halts the
//! run and reports the cause, and the surrounding process carries on.

use serde::Serialize;
use thiserror::Error;

/// Engine result type
pub type Result<T> = std::result::Result<T, ReactionError>;

/// Settable scalar that a domain check was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quantity {
    Volume,
    Temperature,
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantity::Volume => write!(f, "volume"),
            Quantity::Temperature => write!(f, "temperature"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum ReactionError {
    #[error("{quantity} {value} is outside [{min}, {max}]")]
    Domain {
        quantity: Quantity,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("reaction quotient is undefined for [B] = {conc_b}")]
    UndefinedQuotient { conc_b: f64 },

    #[error("solution volume is negative ({solution_volume} L)")]
    NegativeSolutionVolume { solution_volume: f64 },

    #[error("step {step} produced a non-finite mole inventory")]
    NonFiniteState { step: u32 },

    #[error("{operation} is not allowed while equilibrating")]
    RunActive { operation: &'static str },

    #[error("invalid reaction parameters: {0}")]
    InvalidParams(String),
}

impl ReactionError {
    /// True for errors raised by the numerics rather than by the caller.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ReactionError::UndefinedQuotient { .. }
                | ReactionError::NegativeSolutionVolume { .. }
                | ReactionError::NonFiniteState { .. }
        )
    }
}
