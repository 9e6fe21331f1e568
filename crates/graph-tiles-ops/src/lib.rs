//! Operations layer for graph-tiles.
//!
//! Turns a converged force layout into a zoomable tile pyramid:
//!
//! - [`ForceGraph`] owns a graph, its [`graph_tiles_layout::ForceLayout`]
//!   and a progress channel, and sequences `simulate` → `project` →
//!   `slice_and_store` for every zoom level.
//! - [`Scene`] / [`Renderer`] describe and rasterize one zoom level
//!   ([`SkiaRenderer`] is the tiny-skia backend).
//! - [`TileGrid`] addresses tiles; [`TileStore`] persists them
//!   ([`FsTileStore`], [`MemoryTileStore`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! use graph_tiles_core::{GraphLink, GraphNode};
//! use graph_tiles_ops::{Config, ForceGraph, FsTileStore};
//!
//! # async fn run() -> graph_tiles_ops::OpsResult<()> {
//! let nodes = vec![GraphNode::new(0, 0), GraphNode::new(1, 1)];
//! let links = vec![GraphLink::new(0, 1)];
//! let mut graph = ForceGraph::new(nodes, links, Config::default())?;
//! let report = graph.generate_tiles(&FsTileStore::new("generated_tiles")).await?;
//! println!("{} tiles", report.tiles_stored());
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod graph;
mod projector;
mod pyramid;
mod store;
mod style;

pub use config::{Config, FailurePolicy};
pub use error::{OpsError, OpsResult, RenderError, StoreError};
pub use graph::{generate_tiles, ForceGraph, GenerationReport};
pub use projector::{
    LinkDraw, NodeDraw, Raster, Renderer, Scene, SkiaRaster, SkiaRenderer, ViewTransform,
};
pub use pyramid::{TileCoordinate, TileFailure, TileGrid, TileRect, ZoomReport};
pub use store::{FsTileStore, MemoryTileStore, TileStore};
pub use style::{parse_color, GroupPalette, LineCap, Style, TABLEAU10};
