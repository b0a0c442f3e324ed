//! Run orchestration for the equilibration engine.
//!
//! The driver is a two-state machine. While `Idle` the caller may change the
//! volume and temperature and perturb the inventory; `equilibrate` enters
//! `Running`, after which the caller delivers ticks (one forward-Euler step
//! each) at its own cadence until a tick reports that the run stopped.
//!
//! The driver never schedules anything itself: `next_tick_in` tells a
//! scheduler whether a pending tick should exist, and `cancel` is the
//! teardown path that makes any tick already in flight inert.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::convergence::{ConvergenceMonitor, Verdict};
use crate::display::EquilibriumStatus;
use crate::error::{ReactionError, Result};
use crate::model::EquilibriumSnapshot;
use crate::params::ReactionParams;
use crate::perturbation::Perturbation;
use crate::reaction::HeterogeneousReaction;
use crate::solvers::{ForwardEuler, StepReport};
use crate::state::SystemState;
use crate::traits::{ReactionSystem, Steppable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverPhase {
    Idle,
    Running,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StopReason {
    Equilibrium,
    BudgetExhausted,
    Cancelled,
    Fault(ReactionError),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Equilibrium => write!(f, "equilibrium reached"),
            StopReason::BudgetExhausted => write!(f, "step budget exhausted"),
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Fault(err) => write!(f, "fault: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Steps applied during the run.
    pub ticks: u32,
    pub reason: StopReason,
    pub last_step: Option<StepReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RunStart {
    /// Ticks are expected.
    Scheduled,
    /// The run ended before its first tick.
    Settled(RunSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Tick {
    /// No run is active; nothing was touched.
    Idle,
    Continue(StepReport),
    Stopped(RunSummary),
}

#[derive(Debug, Clone)]
pub struct Driver {
    reaction: HeterogeneousReaction,
    solver: ForwardEuler,
    monitor: ConvergenceMonitor,
    state: SystemState,
    phase: DriverPhase,
    last_step: Option<StepReport>,
}

impl Default for Driver {
    fn default() -> Self {
        Self::from_valid_params(ReactionParams::default())
    }
}

impl Driver {
    pub fn new(params: ReactionParams) -> Result<Self> {
        params.validate()?;
        Ok(Self::from_valid_params(params))
    }

    fn from_valid_params(params: ReactionParams) -> Self {
        Self {
            reaction: HeterogeneousReaction::new(params),
            solver: ForwardEuler::new(),
            monitor: ConvergenceMonitor::from_params(&params),
            state: SystemState::default(),
            phase: DriverPhase::Idle,
            last_step: None,
        }
    }

    /// Replaces the inventory. Any active run is dropped without a summary.
    pub fn with_state(mut self, state: SystemState) -> Self {
        self.state = state;
        self.state.reset_step();
        self.phase = DriverPhase::Idle;
        self.last_step = None;
        self
    }

    pub fn params(&self) -> &ReactionParams {
        self.reaction.params()
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == DriverPhase::Running
    }

    pub fn snapshot(&self) -> EquilibriumSnapshot {
        EquilibriumSnapshot::of(&self.state, self.params())
    }

    /// Diagnostics of the most recent tick of the active run.
    pub fn last_step(&self) -> Option<&StepReport> {
        self.last_step.as_ref()
    }

    pub fn status(&self) -> EquilibriumStatus {
        if self.is_running() {
            EquilibriumStatus::Equilibrating
        } else if self.monitor.is_at_equilibrium(&self.state, self.params()) {
            EquilibriumStatus::AtEquilibrium
        } else {
            EquilibriumStatus::Displaced
        }
    }

    /// Delay before the next tick is due, or `None` when no tick should be
    /// pending.
    pub fn next_tick_in(&self) -> Option<Duration> {
        self.is_running().then(|| Duration::from_millis(self.params().tick_interval_ms))
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        self.ensure_idle("setVolume")?;
        self.state.set_volume(volume)?;
        debug!(volume, "volume set");
        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
        self.ensure_idle("setTemperature")?;
        self.state.set_temperature(temperature)?;
        debug!(temperature, "temperature set");
        Ok(())
    }

    pub fn perturb(&mut self, perturbation: Perturbation) -> Result<()> {
        self.ensure_idle(perturbation.label())?;
        perturbation.apply(&mut self.state);
        debug!(
            ?perturbation,
            moles_b = self.state.moles_b,
            moles_c = self.state.moles_c,
            "system perturbed"
        );
        Ok(())
    }

    pub fn add_b(&mut self) -> Result<()> {
        self.perturb(Perturbation::AddB)
    }

    pub fn remove_b(&mut self) -> Result<()> {
        self.perturb(Perturbation::RemoveB)
    }

    pub fn add_c(&mut self) -> Result<()> {
        self.perturb(Perturbation::AddC)
    }

    pub fn remove_c(&mut self) -> Result<()> {
        self.perturb(Perturbation::RemoveC)
    }

    /// Starts a run from `Idle`.
    ///
    /// The stopping rule is checked once before any tick, so a system that is
    /// already at equilibrium (or has no defined quotient) finishes with zero
    /// ticks and the driver is `Idle` again on return.
    pub fn equilibrate(&mut self) -> Result<RunStart> {
        self.ensure_idle("equilibrate")?;
        self.state.reset_step();
        self.last_step = None;
        self.phase = DriverPhase::Running;
        info!(
            volume = self.state.volume(),
            temperature = self.state.temperature(),
            "equilibration started"
        );

        match self.monitor.assess(&self.state, self.params()) {
            Ok(Verdict::Continue) => Ok(RunStart::Scheduled),
            Ok(Verdict::Equilibrium) => Ok(RunStart::Settled(self.finish(StopReason::Equilibrium))),
            Ok(Verdict::BudgetExhausted) => {
                Ok(RunStart::Settled(self.finish(StopReason::BudgetExhausted)))
            }
            Err(err) => Ok(RunStart::Settled(self.finish(StopReason::Fault(err)))),
        }
    }

    /// Advances an active run by one step and re-checks the stopping rule.
    ///
    /// A numeric error halts the run; the failed step is not applied.
    pub fn tick(&mut self) -> Tick {
        if !self.is_running() {
            return Tick::Idle;
        }

        let dt = self.params().dt;
        let report = match self.solver.step(&self.reaction, &mut self.state, dt) {
            Ok(report) => report,
            Err(err) => return Tick::Stopped(self.finish(StopReason::Fault(err))),
        };
        self.last_step = Some(report);

        match self.monitor.assess(&self.state, self.params()) {
            Ok(Verdict::Continue) => Tick::Continue(report),
            Ok(Verdict::Equilibrium) => Tick::Stopped(self.finish(StopReason::Equilibrium)),
            Ok(Verdict::BudgetExhausted) => {
                Tick::Stopped(self.finish(StopReason::BudgetExhausted))
            }
            Err(err) => Tick::Stopped(self.finish(StopReason::Fault(err))),
        }
    }

    /// Teardown: ends an active run without further mutation.
    pub fn cancel(&mut self) -> Option<RunSummary> {
        self.is_running().then(|| self.finish(StopReason::Cancelled))
    }

    /// Delivers up to `batch_size` ticks back to back. Returns the summary if
    /// the run stopped within the batch.
    pub fn run_steps(&mut self, batch_size: usize) -> Option<RunSummary> {
        for _ in 0..batch_size {
            match self.tick() {
                Tick::Continue(_) => {}
                Tick::Stopped(summary) => return Some(summary),
                Tick::Idle => return None,
            }
        }
        None
    }

    /// Starts a run and ticks it to the end without waiting between ticks.
    pub fn run_to_completion(&mut self) -> Result<RunSummary> {
        if let RunStart::Settled(summary) = self.equilibrate()? {
            return Ok(summary);
        }
        loop {
            match self.tick() {
                Tick::Continue(_) => {}
                Tick::Stopped(summary) => return Ok(summary),
                Tick::Idle => {
                    return Ok(RunSummary {
                        ticks: 0,
                        reason: StopReason::Cancelled,
                        last_step: None,
                    })
                }
            }
        }
    }

    fn finish(&mut self, reason: StopReason) -> RunSummary {
        let summary = RunSummary {
            ticks: self.state.step(),
            reason,
            last_step: self.last_step.take(),
        };
        self.state.reset_step();
        self.phase = DriverPhase::Idle;

        match &summary.reason {
            StopReason::Fault(err) => {
                warn!(ticks = summary.ticks, error = %err, "equilibration halted")
            }
            reason => info!(ticks = summary.ticks, %reason, "equilibration stopped"),
        }
        summary
    }

    fn ensure_idle(&self, operation: &'static str) -> Result<()> {
        if self.is_running() {
            return Err(ReactionError::RunActive { operation });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{TEMPERATURE_RANGE, VOLUME_RANGE};
    use approx::assert_relative_eq;

    fn driver_with(state: SystemState) -> Driver {
        Driver::default().with_state(state)
    }

    fn log_ratio(driver: &Driver) -> f64 {
        driver.snapshot().log_ratio().expect("quotient should be defined")
    }

    #[test]
    fn default_system_settles_without_ticks() {
        let mut driver = Driver::default();
        let before = *driver.state();

        let start = driver.equilibrate().expect("equilibrate from idle");
        match start {
            RunStart::Settled(summary) => {
                assert_eq!(summary.ticks, 0);
                assert_eq!(summary.reason, StopReason::Equilibrium);
                assert!(summary.last_step.is_none());
            }
            other => panic!("expected an immediate stop, got {other:?}"),
        }
        assert_eq!(driver.phase(), DriverPhase::Idle);
        assert_eq!(*driver.state(), before);
        assert_eq!(driver.status(), EquilibriumStatus::AtEquilibrium);
    }

    #[test]
    fn adding_b_requires_ticks_and_converges() {
        let mut driver = Driver::default();
        driver.add_b().expect("perturb while idle");
        assert_relative_eq!(driver.state().moles_b, 0.45, epsilon = 1e-12);
        assert_relative_eq!(
            driver.snapshot().reaction_quotient().expect("defined"),
            0.25 / 0.45,
            epsilon = 1e-12
        );
        assert_relative_eq!(log_ratio(&driver).abs(), 0.5878, epsilon = 1e-3);
        assert_eq!(driver.status(), EquilibriumStatus::Displaced);

        assert_eq!(driver.equilibrate().expect("start"), RunStart::Scheduled);
        assert!(driver.is_running());
        assert_eq!(driver.status(), EquilibriumStatus::Equilibrating);

        let mut ticks = 0;
        let summary = loop {
            match driver.tick() {
                Tick::Continue(report) => {
                    ticks += 1;
                    assert_eq!(report.step, ticks);
                    assert_eq!(driver.last_step(), Some(&report));
                }
                Tick::Stopped(summary) => break summary,
                Tick::Idle => panic!("run ended without a summary"),
            }
        };

        assert!(summary.ticks >= 1);
        assert_eq!(summary.ticks, ticks + 1);
        assert_eq!(summary.reason, StopReason::Equilibrium);
        assert!(summary.last_step.is_some());
        assert!(log_ratio(&driver).abs() <= 1e-4);
        assert_eq!(driver.phase(), DriverPhase::Idle);
        assert_eq!(driver.state().step(), 0);
        assert!(driver.last_step().is_none());
        assert!(!driver.monitor.should_continue(driver.state(), driver.params()));
    }

    #[test]
    fn converged_state_barely_moves_on_another_step() {
        let mut driver = Driver::default();
        driver.add_b().expect("perturb while idle");
        let summary = driver.run_to_completion().expect("run");
        assert_eq!(summary.reason, StopReason::Equilibrium);

        let mut state = *driver.state();
        let before = state.moles();
        ForwardEuler::new()
            .step(&driver.reaction, &mut state, driver.params().dt)
            .expect("step");
        let relative = (state.moles() - before).component_div(&before).amax();
        assert!(relative < 1e-5, "moles moved by {relative} relative");
    }

    #[test]
    fn with_state_ends_an_active_run() {
        let mut driver = Driver::default();
        driver.add_b().expect("perturb while idle");
        driver.equilibrate().expect("start");
        assert!(matches!(driver.tick(), Tick::Continue(_)));

        let driver = driver.with_state(SystemState::default());
        assert!(!driver.is_running());
        assert!(driver.last_step().is_none());
        assert_eq!(driver.next_tick_in(), None);
        assert_eq!(*driver.state(), SystemState::default());
    }

    #[test]
    fn driver_state_stays_inside_the_slider_domain() {
        let mut driver = Driver::default();
        for volume in [0.0, -2.0, 0.09, 11.0, f64::NAN, f64::INFINITY] {
            assert!(driver.set_volume(volume).is_err());
        }
        for temperature in [-5.0, 0.0, 99.9, 600.1, f64::NAN] {
            assert!(driver.set_temperature(temperature).is_err());
        }
        assert!(SystemState::new(0.0, -5.0).is_err());
        assert!(VOLUME_RANGE.contains(&driver.state().volume()));
        assert!(TEMPERATURE_RANGE.contains(&driver.state().temperature()));

        let json = serde_json::to_value(driver.state()).expect("state serializes");
        assert_eq!(json["volume"], 1.0);
        assert_eq!(json["temperature"], 300.0);
    }

    #[test]
    fn removing_c_halves_it() {
        let mut driver = Driver::default();
        driver.remove_c().expect("perturb while idle");
        assert_eq!(driver.state().moles_c, 0.25);
        assert_relative_eq!(
            driver.snapshot().reaction_quotient().expect("defined"),
            0.25,
            epsilon = 1e-12
        );
    }

    #[test]
    fn hot_system_hits_the_step_budget() {
        let state = SystemState::new(1.0, 350.0).expect("valid state");
        let mut driver = driver_with(state);
        let summary = driver.run_to_completion().expect("run");
        assert_eq!(summary.reason, StopReason::BudgetExhausted);
        assert_eq!(summary.ticks, 200);
        assert!(log_ratio(&driver).abs() > 1e-4);
        assert_eq!(driver.state().step(), 0);
    }

    #[test]
    fn runs_always_terminate_within_budget() {
        for temperature in [100.0, 200.0, 280.0, 300.0, 320.0, 400.0, 600.0] {
            for volume in [0.1, 1.0, 10.0] {
                for (b, c) in [(0.25, 0.5), (0.45, 0.5), (0.25, 0.25), (1.0, 0.01)] {
                    let state = SystemState::new(volume, temperature)
                        .expect("valid state")
                        .with_moles(2.0, b, c, 2.0);
                    let mut driver = driver_with(state);
                    let summary = driver.run_to_completion().expect("run");
                    assert!(summary.ticks <= 200, "run exceeded budget: {summary:?}");
                    assert!(!driver.is_running());
                    if summary.reason == StopReason::Equilibrium {
                        assert!(log_ratio(&driver).abs() <= 1e-4);
                    }
                }
            }
        }
    }

    #[test]
    fn overshoot_into_negative_b_halts_with_fault() {
        let state = SystemState::new(1.0, 250.0).expect("valid state");
        let mut driver = driver_with(state);
        let summary = driver.run_to_completion().expect("run");
        assert_eq!(summary.ticks, 1);
        assert!(matches!(
            summary.reason,
            StopReason::Fault(ReactionError::UndefinedQuotient { .. })
        ));
        assert!(driver.state().moles_b < 0.0);
        assert!(!driver.is_running());
    }

    #[test]
    fn negative_solution_volume_halts_before_mutating() {
        let state = SystemState::default().with_moles(30.0, 0.45, 0.5, 20.0);
        let mut driver = driver_with(state);
        assert_eq!(driver.equilibrate().expect("start"), RunStart::Scheduled);

        match driver.tick() {
            Tick::Stopped(summary) => {
                assert_eq!(summary.ticks, 0);
                assert!(matches!(
                    summary.reason,
                    StopReason::Fault(ReactionError::NegativeSolutionVolume { .. })
                ));
            }
            other => panic!("expected a fault, got {other:?}"),
        }
        assert_eq!(driver.state().moles(), state.moles());
        assert_eq!(driver.phase(), DriverPhase::Idle);
    }

    #[test]
    fn zero_b_never_starts_a_run() {
        let state = SystemState::default().with_moles(2.0, 0.0, 0.5, 2.0);
        let mut driver = driver_with(state);
        match driver.equilibrate().expect("start") {
            RunStart::Settled(summary) => assert!(matches!(
                summary.reason,
                StopReason::Fault(ReactionError::UndefinedQuotient { .. })
            )),
            other => panic!("expected a fault, got {other:?}"),
        }
        assert!(!driver.is_running());
    }

    #[test]
    fn controls_are_rejected_while_running() {
        let mut driver = Driver::default();
        driver.add_b().expect("perturb while idle");
        driver.equilibrate().expect("start");
        let before = *driver.state();

        for result in [
            driver.add_b(),
            driver.remove_b(),
            driver.add_c(),
            driver.remove_c(),
            driver.set_volume(2.0),
            driver.set_temperature(350.0),
        ] {
            assert!(matches!(result, Err(ReactionError::RunActive { .. })));
        }
        assert!(matches!(
            driver.equilibrate(),
            Err(ReactionError::RunActive { operation: "equilibrate" })
        ));
        assert_eq!(*driver.state(), before);
    }

    #[test]
    fn setters_validate_domain_while_idle() {
        let mut driver = Driver::default();
        assert!(matches!(
            driver.set_volume(0.0),
            Err(ReactionError::Domain { .. })
        ));
        assert!(matches!(
            driver.set_temperature(-10.0),
            Err(ReactionError::Domain { .. })
        ));
        driver.set_volume(2.5).expect("valid volume");
        driver.set_temperature(450.0).expect("valid temperature");
        assert_eq!(driver.state().volume(), 2.5);
        assert_eq!(driver.state().temperature(), 450.0);
    }

    #[test]
    fn cancel_releases_the_run() {
        let mut driver = Driver::default();
        driver.add_b().expect("perturb while idle");
        driver.equilibrate().expect("start");
        assert_eq!(driver.next_tick_in(), Some(Duration::from_millis(100)));
        assert!(matches!(driver.tick(), Tick::Continue(_)));

        let summary = driver.cancel().expect("active run");
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.reason, StopReason::Cancelled);
        assert_eq!(driver.next_tick_in(), None);
        assert_eq!(driver.state().step(), 0);

        let after_cancel = *driver.state();
        assert_eq!(driver.tick(), Tick::Idle);
        assert_eq!(*driver.state(), after_cancel);
        assert!(driver.cancel().is_none());
        driver.add_c().expect("controls are available again");
    }

    #[test]
    fn run_steps_stops_inside_a_batch() {
        let mut driver = Driver::default();
        driver.add_b().expect("perturb while idle");
        driver.equilibrate().expect("start");

        assert!(driver.run_steps(5).is_none());
        assert_eq!(driver.state().step(), 5);
        let summary = driver.run_steps(1_000).expect("run should stop");
        assert_eq!(summary.reason, StopReason::Equilibrium);
        assert!(driver.run_steps(3).is_none());
    }

    #[test]
    fn reaction_shifts_back_towards_b_after_adding_c() {
        let mut driver = Driver::default();
        driver.add_c().expect("perturb while idle");
        let start_b = driver.state().moles_b;
        let summary = driver.run_to_completion().expect("run");
        assert_eq!(summary.reason, StopReason::Equilibrium);
        assert!(driver.state().moles_b > start_b);
        assert!(driver.state().moles_a > 2.0);
        assert!(driver.state().moles_d < 2.0);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let params = ReactionParams {
            rate_constant: -1.0,
            ..ReactionParams::default()
        };
        assert!(matches!(
            Driver::new(params),
            Err(ReactionError::InvalidParams(_))
        ));
    }
}
