use crate::error::Result;
use crate::model::EquilibriumSnapshot;
use crate::params::ReactionParams;
use crate::solvers::StepReport;
use crate::state::SystemState;

/// A reaction whose progress is tracked through the concentration of B.
pub trait ReactionSystem {
    fn params(&self) -> &ReactionParams;

    /// Net rate of change of [B] in mol/(L·s): reverse minus forward.
    fn rate(&self, snapshot: &EquilibriumSnapshot) -> f64;
}

/// A trait for integrators that advance a reaction by one fixed increment.
pub trait Steppable {
    /// Performs one step of size dt.
    /// state: current state (updated after step, untouched on error)
    /// dt: step size in seconds
    fn step(
        &mut self,
        system: &impl ReactionSystem,
        state: &mut SystemState,
        dt: f64,
    ) -> Result<StepReport>;
}
