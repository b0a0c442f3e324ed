use nalgebra::Vector4;
use serde::Serialize;
use tracing::debug;

use crate::error::{ReactionError, Result};
use crate::model::EquilibriumSnapshot;
use crate::state::SystemState;
use crate::traits::{ReactionSystem, Steppable};

/// Everything one tick computed, for debugging displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepReport {
    /// Counter value after the step.
    pub step: u32,
    pub db_dt: f64,
    pub dc_dt: f64,
    pub da: f64,
    pub db: f64,
    pub dc: f64,
    pub dd: f64,
    pub dt: f64,
    pub solution_volume: f64,
    pub conc_b: f64,
    pub conc_c: f64,
    pub k: f64,
}

/// Explicit Euler on the single reaction extent.
///
/// One rate evaluation per step; the extent is scaled by the solution volume
/// and distributed over the species by their stoichiometric coefficients.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardEuler;

impl ForwardEuler {
    pub fn new() -> Self {
        Self
    }
}

impl Steppable for ForwardEuler {
    fn step(
        &mut self,
        system: &impl ReactionSystem,
        state: &mut SystemState,
        dt: f64,
    ) -> Result<StepReport> {
        let snapshot = EquilibriumSnapshot::of(state, system.params());
        let solution_volume = snapshot.checked_solution_volume()?;

        let db_dt = system.rate(&snapshot);
        let dc_dt = -2.0 * db_dt;

        // Moles of B gained this step; every other species follows from it.
        let extent = db_dt * solution_volume * dt;
        let delta: Vector4<f64> = system.params().stoichiometry() * extent;

        let next = state.moles() + delta;
        if next.iter().any(|value| !value.is_finite()) {
            return Err(ReactionError::NonFiniteState {
                step: state.step() + 1,
            });
        }

        state.apply_delta(&delta);

        let report = StepReport {
            step: state.step(),
            db_dt,
            dc_dt,
            da: delta[0],
            db: delta[1],
            dc: delta[2],
            dd: delta[3],
            dt,
            solution_volume,
            conc_b: snapshot.conc_b,
            conc_c: snapshot.conc_c,
            k: snapshot.k,
        };
        debug!(
            step = report.step,
            db_dt = report.db_dt,
            db = report.db,
            solution_volume = report.solution_volume,
            "reaction step"
        );
        Ok(report)
    }
}
