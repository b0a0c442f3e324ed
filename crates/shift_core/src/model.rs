//! Derived equilibrium quantities.
//!
//! Nothing here is cached: a snapshot is computed from one `SystemState` and
//! is stale as soon as that state is mutated.

use serde::Serialize;

use crate::error::{ReactionError, Result};
use crate::params::ReactionParams;
use crate::state::{Species, SystemState};

/// Van't Hoff equilibrium constant at `temperature`, normalised to 1 at the
/// reference temperature.
pub fn equilibrium_constant(temperature: f64, params: &ReactionParams) -> f64 {
    let slope = params.delta_h / params.gas_constant;
    (-slope * (1.0 / temperature - 1.0 / params.reference_temperature)).exp()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquilibriumSnapshot {
    pub k: f64,
    pub conc_b: f64,
    pub conc_c: f64,
    pub volume_a: f64,
    pub volume_d: f64,
    /// Volume left for the gas-phase species once the solids are accounted
    /// for. Can be negative for large solid inventories.
    pub solution_volume: f64,
    density_a: f64,
    density_d: f64,
}

impl EquilibriumSnapshot {
    pub fn of(state: &SystemState, params: &ReactionParams) -> Self {
        let volume = state.volume();
        let volume_a = state.moles_a / params.density_a;
        let volume_d = state.moles_d / params.density_d;
        Self {
            k: equilibrium_constant(state.temperature(), params),
            conc_b: state.moles_b / volume,
            conc_c: state.moles_c / volume,
            volume_a,
            volume_d,
            solution_volume: volume - volume_a - volume_d,
            density_a: params.density_a,
            density_d: params.density_d,
        }
    }

    /// Q = [C]² / [B].
    ///
    /// A non-positive [B] has no physical quotient and is reported instead of
    /// producing an infinite or negative value.
    pub fn reaction_quotient(&self) -> Result<f64> {
        if !(self.conc_b.is_finite() && self.conc_b > 0.0) {
            return Err(ReactionError::UndefinedQuotient {
                conc_b: self.conc_b,
            });
        }
        Ok(self.conc_c * self.conc_c / self.conc_b)
    }

    /// ln(Q/K). Negative infinity when no C is present.
    pub fn log_ratio(&self) -> Result<f64> {
        Ok((self.reaction_quotient()? / self.k).ln())
    }

    pub fn checked_solution_volume(&self) -> Result<f64> {
        if self.solution_volume < 0.0 {
            return Err(ReactionError::NegativeSolutionVolume {
                solution_volume: self.solution_volume,
            });
        }
        Ok(self.solution_volume)
    }

    /// Molar concentration of a dissolved species, or the fixed activity of
    /// a pure solid (its molar density).
    pub fn concentration(&self, species: Species) -> f64 {
        match species {
            Species::A => self.density_a,
            Species::B => self.conc_b,
            Species::C => self.conc_c,
            Species::D => self.density_d,
        }
    }
}
