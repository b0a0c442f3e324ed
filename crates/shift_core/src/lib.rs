pub mod convergence;
pub mod display;
pub mod driver;
pub mod error;
pub mod model;
pub mod params;
pub mod perturbation;
pub mod reaction;
pub mod solvers;
pub mod state;
/// The `shift_core` crate drives the heterogeneous equilibrium
/// 3A(s) + B(g) ⇌ 2C(g) + D(s) towards equilibrium one fixed step at a time.
///
/// Key components:
/// - **Model**: `EquilibriumSnapshot` derives concentrations, solution volume, Q and K.
/// - **Traits**: `ReactionSystem` (rate law) and `Steppable` (integrators).
/// - **Solvers**: `ForwardEuler`, the fixed-step stoichiometric update.
/// - **Convergence**: the |ln(Q/K)| and step-budget stopping rule.
/// - **Driver**: the Idle/Running state machine that callers tick at their own cadence.
pub mod traits;

pub use driver::{Driver, DriverPhase, RunStart, RunSummary, StopReason, Tick};
pub use error::{ReactionError, Result};
pub use params::ReactionParams;
pub use perturbation::Perturbation;
pub use state::SystemState;
