use std::ops::RangeInclusive;

use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::error::{Quantity, ReactionError, Result};

/// Liters.
pub const VOLUME_RANGE: RangeInclusive<f64> = 0.1..=10.0;
/// Kelvin.
pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 100.0..=600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Solid,
    Gas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Species {
    A,
    B,
    C,
    D,
}

impl Species {
    pub const ALL: [Species; 4] = [Species::A, Species::B, Species::C, Species::D];

    pub fn phase(self) -> Phase {
        match self {
            Species::A | Species::D => Phase::Solid,
            Species::B | Species::C => Phase::Gas,
        }
    }

    /// Position in the (A, B, C, D) mole vector.
    pub fn index(self) -> usize {
        match self {
            Species::A => 0,
            Species::B => 1,
            Species::C => 2,
            Species::D => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Species::A => "3A(s)",
            Species::B => "B(g)",
            Species::C => "2C(g)",
            Species::D => "D(s)",
        }
    }
}

/// The whole mutable state of one reaction vessel.
///
/// Mole counts are not constrained to be non-negative; the model reports the
/// resulting undefined quantities instead of clamping them. Volume and
/// temperature only enter through the range-checked constructor and setters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SystemState {
    volume: f64,
    temperature: f64,
    pub moles_a: f64,
    pub moles_b: f64,
    pub moles_c: f64,
    pub moles_d: f64,
    step: u32,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            volume: 1.0,
            temperature: 300.0,
            moles_a: 2.0,
            moles_b: 0.25,
            moles_c: 0.5,
            moles_d: 2.0,
            step: 0,
        }
    }
}

impl SystemState {
    pub fn new(volume: f64, temperature: f64) -> Result<Self> {
        let mut state = Self::default();
        state.set_volume(volume)?;
        state.set_temperature(temperature)?;
        Ok(state)
    }

    pub fn with_moles(mut self, a: f64, b: f64, c: f64, d: f64) -> Self {
        self.moles_a = a;
        self.moles_b = b;
        self.moles_c = c;
        self.moles_d = d;
        self
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        check_range(Quantity::Volume, volume, &VOLUME_RANGE)?;
        self.volume = volume;
        Ok(())
    }

    pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
        check_range(Quantity::Temperature, temperature, &TEMPERATURE_RANGE)?;
        self.temperature = temperature;
        Ok(())
    }

    pub fn moles(&self) -> Vector4<f64> {
        Vector4::new(self.moles_a, self.moles_b, self.moles_c, self.moles_d)
    }

    pub fn moles_of(&self, species: Species) -> f64 {
        self.moles()[species.index()]
    }

    /// Adds `delta` to the inventory and advances the step counter.
    pub(crate) fn apply_delta(&mut self, delta: &Vector4<f64>) {
        self.moles_a += delta[0];
        self.moles_b += delta[1];
        self.moles_c += delta[2];
        self.moles_d += delta[3];
        self.step += 1;
    }

    pub(crate) fn reset_step(&mut self) {
        self.step = 0;
    }
}

fn check_range(quantity: Quantity, value: f64, range: &RangeInclusive<f64>) -> Result<()> {
    if value.is_finite() && range.contains(&value) {
        Ok(())
    } else {
        Err(ReactionError::Domain {
            quantity,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}
