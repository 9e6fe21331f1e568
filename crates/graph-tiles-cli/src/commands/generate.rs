//! Generate command implementation.
//!
//! Runs the force simulation and writes the tile pyramid to disk.

use std::path::PathBuf;

use anyhow::{Context, Result};
use graph_tiles_core::{Phase, ProgressEvent};
use graph_tiles_ops::{Config, ForceGraph, FsTileStore, GenerationReport};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::info;

use crate::input::GraphInput;

/// Command-line overrides for a generation run.
#[derive(Debug, Default, Clone)]
pub struct GenerateOptions {
    pub output: Option<PathBuf>,
    pub zoom_levels: Option<u32>,
    pub tile_size: Option<u32>,
    pub max_ticks: Option<u64>,
    pub timeout: Option<f64>,
    pub clean: bool,
}

impl GenerateOptions {
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(zoom_levels) = self.zoom_levels {
            config.zoom_levels = zoom_levels;
        }
        if let Some(tile_size) = self.tile_size {
            config.tile_size = tile_size;
        }
        super::apply_simulation_overrides(config, self.max_ticks, self.timeout)
    }
}

/// Execute the generate command.
pub async fn execute(
    mut config: Config,
    input: GraphInput,
    options: &GenerateOptions,
    show_progress: bool,
) -> Result<GenerationReport> {
    options.apply(&mut config)?;
    let output_dir = config.output_dir.clone();

    if options.clean && output_dir.exists() {
        std::fs::remove_dir_all(&output_dir)
            .with_context(|| format!("Failed to clean {}", output_dir.display()))?;
        info!(path = %output_dir.display(), "Removed previous output");
    }

    let mut graph = ForceGraph::new(input.nodes, input.links, config)?;
    let printer = show_progress.then(|| tokio::spawn(print_progress(graph.subscribe())));

    let store = FsTileStore::new(&output_dir);
    let report = graph.generate_tiles(&store).await;

    // Closing the channel lets the printer drain and exit.
    drop(graph);
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    let report = report?;

    println!(
        "✅ Generated {} tiles over {} zoom level(s) in {}",
        report.tiles_stored(),
        report.zooms.len(),
        store.base().display()
    );
    println!(
        "   Simulation: {} ticks ({})",
        report.simulation.tick_count,
        super::describe_termination(&report.simulation)
    );
    for failure in report.failures() {
        println!("⚠️  {} {}: {}", failure.coordinate, failure.key, failure.message);
    }

    Ok(report)
}

/// Print the last tick of the simulation and each finished zoom level.
///
/// A run can stop before `max` ticks, so the latest simulating event is held
/// back until tiling starts or the channel closes.
async fn print_progress(mut rx: broadcast::Receiver<ProgressEvent>) {
    let mut last_tick = None;
    loop {
        match rx.recv().await {
            Ok(event) if event.phase == Phase::Simulating => last_tick = Some(event),
            Ok(event) => {
                if let Some(tick) = last_tick.take() {
                    eprintln!("⏳ {}", tick);
                }
                if event.current == event.max {
                    eprintln!("⏳ {}", event);
                }
            }
            Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => break,
        }
    }
    if let Some(tick) = last_tick {
        eprintln!("⏳ {}", tick);
    }
}
