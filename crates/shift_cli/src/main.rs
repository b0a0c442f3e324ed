//! Shift CLI
//!
//! Drives 3A(s) + B(g) ⇌ 2C(g) + D(s) to equilibrium in the terminal, one
//! step per tick, and prints the final inventory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use shift_core::display::{species_table, NumberLine, ReactionInfo};
use shift_core::{Driver, Perturbation, ReactionParams, RunSummary, SystemState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod run;

/// Shift - heterogeneous equilibrium simulator
#[derive(Parser, Debug)]
#[command(name = "shift")]
#[command(version = "0.1.0")]
#[command(about = "Equilibrate 3A(s) + B(g) ⇌ 2C(g) + D(s) with a fixed-step integrator")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Vessel volume in liters [0.1, 10]
    #[arg(long, default_value_t = 1.0)]
    volume: f64,

    /// Temperature in kelvin [100, 600]
    #[arg(long, default_value_t = 300.0)]
    temperature: f64,

    #[arg(long, default_value_t = 2.0)]
    moles_a: f64,

    #[arg(long, default_value_t = 0.25)]
    moles_b: f64,

    #[arg(long, default_value_t = 0.5)]
    moles_c: f64,

    #[arg(long, default_value_t = 2.0)]
    moles_d: f64,

    /// Disturbance applied before equilibrating; repeatable, applied in order
    #[arg(long = "perturb", value_enum)]
    perturbations: Vec<PerturbArg>,

    /// JSON file with reaction parameters; missing fields keep their defaults
    #[arg(long)]
    params: Option<PathBuf>,

    /// Milliseconds between ticks (overrides the params file)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Run every tick back to back without waiting
    #[arg(long)]
    instant: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PerturbArg {
    AddB,
    RemoveB,
    AddC,
    RemoveC,
}

impl From<PerturbArg> for Perturbation {
    fn from(arg: PerturbArg) -> Self {
        match arg {
            PerturbArg::AddB => Perturbation::AddB,
            PerturbArg::RemoveB => Perturbation::RemoveB,
            PerturbArg::AddC => Perturbation::AddC,
            PerturbArg::RemoveC => Perturbation::RemoveC,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let mut driver = build_driver(&cli)?;
    print_state("initial", &driver);

    let summary = if cli.instant {
        driver.run_to_completion()?
    } else {
        run::run_timed(&mut driver, async {
            if signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?
    };

    info!(ticks = summary.ticks, reason = %summary.reason, "run finished");
    print_summary(&summary);
    print_state("final", &driver);
    Ok(())
}

fn build_driver(cli: &Cli) -> Result<Driver> {
    let mut params = match &cli.params {
        Some(path) => load_params(path)?,
        None => ReactionParams::default(),
    };
    if let Some(interval_ms) = cli.interval_ms {
        params.tick_interval_ms = interval_ms;
    }

    let state = SystemState::new(cli.volume, cli.temperature)
        .context("Invalid initial conditions")?
        .with_moles(cli.moles_a, cli.moles_b, cli.moles_c, cli.moles_d);
    let mut driver = Driver::new(params)
        .context("Invalid reaction parameters")?
        .with_state(state);

    for &perturbation in &cli.perturbations {
        driver.perturb(perturbation.into())?;
    }
    Ok(driver)
}

fn load_params(path: &Path) -> Result<ReactionParams> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read params file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse params file {}", path.display()))
}

fn print_summary(summary: &RunSummary) {
    println!("stopped after {} ticks: {}", summary.ticks, summary.reason);
    if let Some(step) = &summary.last_step {
        println!(
            "  last step: dB/dt = {:.3e} M/s, dB = {:.3e} mol, Vsoln = {:.3} L",
            step.db_dt, step.db, step.solution_volume
        );
    }
}

fn print_state(label: &str, driver: &Driver) {
    let snapshot = driver.snapshot();
    let reaction = ReactionInfo::of(driver.params());
    println!(
        "{label}: {}  (V = {:.2} L, T = {:.1} K, ΔH = {} J/mol)",
        reaction.equation,
        driver.state().volume(),
        driver.state().temperature(),
        reaction.delta_h
    );
    for row in species_table(driver.state(), &snapshot) {
        println!(
            "  {:<6} {:>10.3} mol  {:>8.3} M",
            row.label, row.moles, row.concentration
        );
    }
    match snapshot.reaction_quotient() {
        Ok(q) => {
            let line = NumberLine::of(&snapshot);
            println!(
                "  Q = {:.2e}  K = {:.2e}  [{}]  (Q at {:.0}%, K at {:.0}% of 1e-3..1e3)",
                q,
                snapshot.k,
                driver.status().label(),
                line.q_percent.unwrap_or_default(),
                line.k_percent
            );
        }
        Err(err) => println!("  Q undefined ({err}), K = {:.2e}", snapshot.k),
    }
}
