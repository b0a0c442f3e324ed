//! Browser-facing reaction session.
//!
//! The page owns the cadence: after `equilibrate` it calls `tick` from a
//! `setTimeout` chain, re-arming only while `next_tick_ms` returns a value,
//! and calls `dispose` when the component unmounts.

use anyhow::anyhow;
use js_sys::Float64Array;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use shift_core::display::{
    species_table, EquilibriumStatus, NumberLine, ReactionInfo, SpeciesRow,
};
use shift_core::model::EquilibriumSnapshot;
use shift_core::solvers::StepReport;
use shift_core::{Driver, Perturbation, ReactionParams, SystemState};
use wasm_bindgen::prelude::*;

/// Everything the view renders for one frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Readout {
    pub state: SystemState,
    pub snapshot: EquilibriumSnapshot,
    pub quotient: Option<f64>,
    pub log_ratio: Option<f64>,
    pub number_line: NumberLine,
    pub status: EquilibriumStatus,
    pub status_label: &'static str,
    pub running: bool,
    pub species: Vec<SpeciesRow>,
    pub reaction: ReactionInfo,
    pub last_step: Option<StepReport>,
}

impl Readout {
    pub(crate) fn of(driver: &Driver) -> Self {
        let snapshot = driver.snapshot();
        let status = driver.status();
        Self {
            state: *driver.state(),
            snapshot,
            quotient: snapshot.reaction_quotient().ok(),
            log_ratio: snapshot.log_ratio().ok(),
            number_line: NumberLine::of(&snapshot),
            status,
            status_label: status.label(),
            running: driver.is_running(),
            species: species_table(driver.state(), &snapshot),
            reaction: ReactionInfo::of(driver.params()),
            last_step: driver.last_step().copied(),
        }
    }
}

/// WASM-exported equilibration session.
#[wasm_bindgen]
pub struct WasmReactionSession {
    driver: Driver,
}

#[wasm_bindgen]
impl WasmReactionSession {
    /// Create a session in the default state. `params_val` may be
    /// `undefined` or a partial `ReactionParams` object.
    #[wasm_bindgen(constructor)]
    pub fn new(params_val: JsValue) -> Result<WasmReactionSession, JsValue> {
        console_error_panic_hook::set_once();

        let params = if params_val.is_undefined() || params_val.is_null() {
            ReactionParams::default()
        } else {
            from_value(params_val)
                .map_err(|e| to_js_error(anyhow!("Invalid reaction params: {}", e)))?
        };
        let driver = Driver::new(params).map_err(|e| to_js_error(e.into()))?;

        Ok(WasmReactionSession { driver })
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<(), JsValue> {
        self.driver
            .set_volume(volume)
            .map_err(|e| to_js_error(e.into()))
    }

    pub fn set_temperature(&mut self, temperature: f64) -> Result<(), JsValue> {
        self.driver
            .set_temperature(temperature)
            .map_err(|e| to_js_error(e.into()))
    }

    pub fn add_b(&mut self) -> Result<(), JsValue> {
        self.perturb(Perturbation::AddB)
    }

    pub fn remove_b(&mut self) -> Result<(), JsValue> {
        self.perturb(Perturbation::RemoveB)
    }

    pub fn add_c(&mut self) -> Result<(), JsValue> {
        self.perturb(Perturbation::AddC)
    }

    pub fn remove_c(&mut self) -> Result<(), JsValue> {
        self.perturb(Perturbation::RemoveC)
    }

    /// Start a run. Resolves to `"Scheduled"` or `{ Settled: summary }`.
    pub fn equilibrate(&mut self) -> Result<JsValue, JsValue> {
        let start = self
            .driver
            .equilibrate()
            .map_err(|e| to_js_error(e.into()))?;
        serialize(&start)
    }

    /// Deliver one tick. Returns `"Idle"`, `{ Continue: report }` or
    /// `{ Stopped: summary }`.
    pub fn tick(&mut self) -> Result<JsValue, JsValue> {
        let tick = self.driver.tick();
        serialize(&tick)
    }

    /// Run a batch of ticks without waiting; returns the summary or `null`.
    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let summary = self.driver.run_steps(batch_size as usize);
        serialize(&summary)
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_running()
    }

    /// Milliseconds until the next tick is due, or `undefined` when no tick
    /// should be pending.
    pub fn next_tick_ms(&self) -> Option<f64> {
        self.driver
            .next_tick_in()
            .map(|delay| delay.as_millis() as f64)
    }

    /// End any active run. Call on unmount; ticks delivered afterwards are
    /// no-ops.
    pub fn dispose(&mut self) -> Result<JsValue, JsValue> {
        let summary = self.driver.cancel();
        serialize(&summary)
    }

    /// Moles of A, B, C, D.
    pub fn get_moles(&self) -> Float64Array {
        Float64Array::from(self.driver.state().moles().as_slice())
    }

    pub fn get_readout(&self) -> Result<JsValue, JsValue> {
        serialize(&Readout::of(&self.driver))
    }
}

impl WasmReactionSession {
    fn perturb(&mut self, perturbation: Perturbation) -> Result<(), JsValue> {
        self.driver
            .perturb(perturbation)
            .map_err(|e| to_js_error(e.into()))
    }
}

fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{}", err))
}
