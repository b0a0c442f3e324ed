//! Timed equilibration loop.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use shift_core::{Driver, RunStart, RunSummary, StopReason, Tick};
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

/// Runs one equilibration with a tick every `next_tick_in` until the driver
/// stops or `shutdown` resolves.
///
/// The interval lives only inside this call, so no tick can fire once it
/// returns.
pub async fn run_timed<F>(driver: &mut Driver, shutdown: F) -> Result<RunSummary>
where
    F: Future<Output = ()>,
{
    if let RunStart::Settled(summary) = driver.equilibrate()? {
        return Ok(summary);
    }

    let period = driver
        .next_tick_in()
        .unwrap_or(Duration::from_millis(driver.params().tick_interval_ms));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick is immediate; the first step is one period out.
    ticker.tick().await;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match driver.tick() {
                    Tick::Continue(report) => {
                        let log_ratio = driver.snapshot().log_ratio().unwrap_or(f64::NAN);
                        info!(
                            step = report.step,
                            moles_b = driver.state().moles_b,
                            moles_c = driver.state().moles_c,
                            log_ratio,
                            "tick"
                        );
                    }
                    Tick::Stopped(summary) => return Ok(summary),
                    Tick::Idle => return Ok(idle_summary()),
                }
            }
            _ = &mut shutdown => {
                info!("shutdown requested, cancelling equilibration");
                return Ok(driver.cancel().unwrap_or_else(idle_summary));
            }
        }
    }
}

fn idle_summary() -> RunSummary {
    RunSummary {
        ticks: 0,
        reason: StopReason::Cancelled,
        last_step: None,
    }
}
