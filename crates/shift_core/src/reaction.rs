use crate::model::EquilibriumSnapshot;
use crate::params::ReactionParams;
use crate::traits::ReactionSystem;

/// 3A(s) + B(g) ⇌ 2C(g) + D(s) with mass-action kinetics on the gas phase.
///
/// The solids have unit activity, so only [B] and [C] enter the rate law.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeterogeneousReaction {
    params: ReactionParams,
}

impl HeterogeneousReaction {
    pub fn new(params: ReactionParams) -> Self {
        Self { params }
    }
}

impl ReactionSystem for HeterogeneousReaction {
    fn params(&self) -> &ReactionParams {
        &self.params
    }

    fn rate(&self, snapshot: &EquilibriumSnapshot) -> f64 {
        self.params.rate_constant
            * (snapshot.conc_c * snapshot.conc_c - snapshot.conc_b * snapshot.k)
    }
}
