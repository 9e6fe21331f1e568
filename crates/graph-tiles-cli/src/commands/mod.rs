//! CLI command implementations.

pub mod config;
pub mod generate;
pub mod layout;

use std::time::Duration;

use anyhow::{Context, Result};
use graph_tiles_layout::{SimulationState, TerminatedBy};
use graph_tiles_ops::Config;

/// Apply `--max-ticks` / `--timeout` to the simulation settings.
pub(crate) fn apply_simulation_overrides(
    config: &mut Config,
    max_ticks: Option<u64>,
    timeout: Option<f64>,
) -> Result<()> {
    if let Some(max_ticks) = max_ticks {
        config.simulation.max_ticks = max_ticks;
    }
    if let Some(secs) = timeout {
        config.simulation.quiescence_timeout = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("Invalid timeout: {}", secs))?;
    }
    Ok(())
}

/// Human readable reason a simulation stopped.
pub(crate) fn describe_termination(state: &SimulationState) -> &'static str {
    match state.terminated_by {
        Some(TerminatedBy::MaxTicks) => "tick limit reached",
        Some(TerminatedBy::Cooled) => "cooled down",
        Some(TerminatedBy::Timeout) => "stalled, timed out",
        Some(TerminatedBy::Cancelled) => "cancelled",
        None => "not run",
    }
}
