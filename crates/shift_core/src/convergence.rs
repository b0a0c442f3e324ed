use serde::Serialize;
use tracing::trace;

use crate::error::Result;
use crate::model::EquilibriumSnapshot;
use crate::params::ReactionParams;
use crate::state::SystemState;

/// Outcome of checking a state against the stopping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Continue,
    Equilibrium,
    BudgetExhausted,
}

#[derive(Debug, Clone, Copy)]
pub struct ConvergenceMonitor {
    tolerance: f64,
    max_steps: u32,
}

impl Default for ConvergenceMonitor {
    fn default() -> Self {
        Self::from_params(&ReactionParams::default())
    }
}

impl ConvergenceMonitor {
    pub fn from_params(params: &ReactionParams) -> Self {
        Self {
            tolerance: params.tolerance,
            max_steps: params.max_steps,
        }
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Classifies `state`, recomputing Q and K from scratch.
    ///
    /// Equilibrium takes precedence over an exhausted budget when both hold.
    /// Errors when the quotient cannot be formed.
    pub fn assess(&self, state: &SystemState, params: &ReactionParams) -> Result<Verdict> {
        let log_ratio = EquilibriumSnapshot::of(state, params).log_ratio()?;
        trace!(step = state.step(), log_ratio, "convergence check");
        if log_ratio.abs() <= self.tolerance {
            Ok(Verdict::Equilibrium)
        } else if state.step() >= self.max_steps {
            Ok(Verdict::BudgetExhausted)
        } else {
            Ok(Verdict::Continue)
        }
    }

    /// True iff |ln(Q/K)| is above tolerance and the step budget is not spent.
    ///
    /// Does not say which condition stopped the run, and an undefined
    /// quotient also reads as `false`; use [`ConvergenceMonitor::assess`] to
    /// tell them apart.
    pub fn should_continue(&self, state: &SystemState, params: &ReactionParams) -> bool {
        matches!(self.assess(state, params), Ok(Verdict::Continue))
    }

    /// Whether `state` is within tolerance of equilibrium, regardless of the
    /// step counter.
    pub fn is_at_equilibrium(&self, state: &SystemState, params: &ReactionParams) -> bool {
        EquilibriumSnapshot::of(state, params)
            .log_ratio()
            .map(|ratio| ratio.abs() < self.tolerance)
            .unwrap_or(false)
    }
}
