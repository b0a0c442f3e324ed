use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::error::{ReactionError, Result};

/// Equation shown alongside the simulation.
pub const REACTION_EQUATION: &str = "3A(s) + B(g) ⇌ 2C(g) + D(s)";

/// Physical constants and integration settings for the 3A + B ⇌ 2C + D system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionParams {
    /// Reaction enthalpy, J/mol.
    pub delta_h: f64,
    /// J/(mol·K)
    pub gas_constant: f64,
    /// Temperature at which K == 1.
    pub reference_temperature: f64,
    /// Molar density of solid A, mol/L.
    pub density_a: f64,
    /// Molar density of solid D, mol/L.
    pub density_d: f64,
    /// Fixed integration step, seconds.
    pub dt: f64,
    pub rate_constant: f64,
    /// Convergence threshold on |ln(Q/K)|.
    pub tolerance: f64,
    pub max_steps: u32,
    /// Wall-clock delay between ticks of a timed run.
    pub tick_interval_ms: u64,
}

impl Default for ReactionParams {
    fn default() -> Self {
        Self {
            delta_h: -50_000.0,
            gas_constant: 8.314,
            reference_temperature: 300.0,
            density_a: 50.0,
            density_d: 40.0,
            dt: 0.1,
            rate_constant: 0.5,
            tolerance: 1e-4,
            max_steps: 200,
            tick_interval_ms: 100,
        }
    }
}

impl ReactionParams {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("gas_constant", self.gas_constant),
            ("reference_temperature", self.reference_temperature),
            ("density_a", self.density_a),
            ("density_d", self.density_d),
            ("dt", self.dt),
            ("rate_constant", self.rate_constant),
            ("tolerance", self.tolerance),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ReactionError::InvalidParams(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if !self.delta_h.is_finite() {
            return Err(ReactionError::InvalidParams(format!(
                "delta_h must be finite, got {}",
                self.delta_h
            )));
        }
        if self.max_steps == 0 {
            return Err(ReactionError::InvalidParams(
                "max_steps must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_exothermic(&self) -> bool {
        self.delta_h < 0.0
    }

    /// Mole change of (A, B, C, D) per unit change of B.
    ///
    /// Forward reaction consumes B, so A and B move together while C and D
    /// move against them.
    pub fn stoichiometry(&self) -> Vector4<f64> {
        Vector4::new(3.0, 1.0, -2.0, -1.0)
    }
}
