//! Layout command implementation.
//!
//! Runs only the force simulation and writes node positions as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use graph_tiles_core::{Graph, NodeId};
use graph_tiles_layout::{ForceLayout, SimulationState};
use graph_tiles_ops::Config;
use serde::Serialize;

use crate::input::GraphInput;

#[derive(Debug, Default, Clone)]
pub struct LayoutOptions {
    /// Write JSON here instead of stdout.
    pub output: Option<PathBuf>,
    pub max_ticks: Option<u64>,
    pub timeout: Option<f64>,
}

/// A node with its final position.
#[derive(Debug, Serialize)]
struct PositionedNode<'a> {
    id: NodeId,
    group: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize)]
struct LayoutDocument<'a> {
    simulation: SimulationState,
    nodes: Vec<PositionedNode<'a>>,
}

/// Execute the layout command.
pub fn execute(mut config: Config, input: GraphInput, options: &LayoutOptions) -> Result<()> {
    super::apply_simulation_overrides(&mut config, options.max_ticks, options.timeout)?;

    let graph = Graph::new(input.nodes, input.links)?;
    let mut layout = ForceLayout::new(&graph, config.simulation)?;
    let simulation = layout.simulate();

    let document = LayoutDocument {
        simulation,
        nodes: graph
            .nodes()
            .iter()
            .zip(layout.positions())
            .map(|(node, p)| PositionedNode {
                id: node.id,
                group: node.group,
                name: node.name.as_deref(),
                x: p.x,
                y: p.y,
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&document)?;

    match &options.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "✅ Laid out {} nodes in {} ticks ({}) → {}",
                graph.node_count(),
                simulation.tick_count,
                super::describe_termination(&simulation),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
