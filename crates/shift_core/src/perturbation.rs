use serde::{Deserialize, Serialize};

use crate::state::SystemState;

/// Moles added by `AddB` / `AddC`.
pub const ADD_AMOUNT: f64 = 0.2;
/// Fraction kept by `RemoveB` / `RemoveC`.
pub const REMOVE_FACTOR: f64 = 0.5;

/// External disturbances of the gas-phase inventory.
///
/// Adding is a fixed increment while removing halves what is present, so an
/// add followed by a remove does not return to the starting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Perturbation {
    AddB,
    RemoveB,
    AddC,
    RemoveC,
}

impl Perturbation {
    pub fn apply(self, state: &mut SystemState) {
        match self {
            Perturbation::AddB => state.moles_b += ADD_AMOUNT,
            Perturbation::AddC => state.moles_c += ADD_AMOUNT,
            Perturbation::RemoveB => state.moles_b *= REMOVE_FACTOR,
            Perturbation::RemoveC => state.moles_c *= REMOVE_FACTOR,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Perturbation::AddB => "Add B(g)",
            Perturbation::RemoveB => "Remove B(g)",
            Perturbation::AddC => "Add C(g)",
            Perturbation::RemoveC => "Remove C(g)",
        }
    }
}
