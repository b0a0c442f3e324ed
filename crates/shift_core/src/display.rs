//! Read-only quantities a view layer shows next to the simulation.
//!
//! Formatting (fixed point, scientific notation) stays with the view.

use serde::Serialize;

use crate::model::EquilibriumSnapshot;
use crate::params::{ReactionParams, REACTION_EQUATION};
use crate::state::{Phase, Species, SystemState};

/// Decade range of the Q/K number line, as log10 bounds.
pub const NUMBER_LINE_DECADES: (f64, f64) = (-3.0, 3.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EquilibriumStatus {
    Equilibrating,
    AtEquilibrium,
    Displaced,
}

impl EquilibriumStatus {
    /// Caption for the equilibrate control.
    pub fn label(self) -> &'static str {
        match self {
            EquilibriumStatus::Equilibrating => "Equilibrating...",
            EquilibriumStatus::AtEquilibrium => "At Equilibrium",
            EquilibriumStatus::Displaced => "Equilibrate System",
        }
    }
}

/// Marker positions of Q and K on a log scale, in percent of its width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumberLine {
    /// `None` when Q is undefined.
    pub q_percent: Option<f64>,
    pub k_percent: f64,
}

impl NumberLine {
    pub fn of(snapshot: &EquilibriumSnapshot) -> Self {
        Self {
            q_percent: snapshot.reaction_quotient().ok().map(log_position),
            k_percent: log_position(snapshot.k),
        }
    }
}

/// Percent position of `value` on the number line, clamped to [0, 100].
/// Zero maps to the left end.
pub fn log_position(value: f64) -> f64 {
    let (min, max) = NUMBER_LINE_DECADES;
    let position = (value.log10() - min) / (max - min) * 100.0;
    if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeciesRow {
    pub species: Species,
    pub label: &'static str,
    pub phase: Phase,
    pub moles: f64,
    /// mol/L for gases, fixed activity for solids.
    pub concentration: f64,
}

pub fn species_table(state: &SystemState, snapshot: &EquilibriumSnapshot) -> Vec<SpeciesRow> {
    Species::ALL
        .iter()
        .map(|&species| SpeciesRow {
            species,
            label: species.label(),
            phase: species.phase(),
            moles: state.moles_of(species),
            concentration: snapshot.concentration(species),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct ReactionInfo {
    pub equation: &'static str,
    pub delta_h: f64,
    pub exothermic: bool,
}

impl ReactionInfo {
    pub fn of(params: &ReactionParams) -> Self {
        Self {
            equation: REACTION_EQUATION,
            delta_h: params.delta_h,
            exothermic: params.is_exothermic(),
        }
    }
}
