//! Layout a graph and cut it into a tile pyramid.

use graph_tiles_core::{
    Graph, GraphLink, GraphNode, Position, ProgressChannel, ProgressEvent,
};
use graph_tiles_layout::{ForceLayout, LayoutState, SimulationState};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, FailurePolicy};
use crate::error::{OpsError, OpsResult};
use crate::projector::{Raster, Renderer, Scene, SkiaRenderer};
use crate::pyramid::{TileFailure, TileGrid, ZoomReport};
use crate::store::{FsTileStore, TileStore};

// =============================================================================
// Report
// =============================================================================

/// Outcome of a full tile generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub simulation: SimulationState,
    /// One entry per zoom level, ascending.
    pub zooms: Vec<ZoomReport>,
}

impl GenerationReport {
    /// Tiles stored across every zoom level.
    pub fn tiles_stored(&self) -> u64 {
        self.zooms.iter().map(|z| z.stored).sum()
    }

    /// Every tile that could not be stored.
    pub fn failures(&self) -> impl Iterator<Item = &TileFailure> {
        self.zooms.iter().flat_map(|z| z.failed.iter())
    }

    pub fn is_complete(&self) -> bool {
        self.zooms.iter().all(ZoomReport::is_complete)
    }
}

// =============================================================================
// ForceGraph
// =============================================================================

/// A graph, its layout and everything needed to turn it into tiles.
///
/// Instances share no state; each owns its own progress channel and
/// cancellation token.
pub struct ForceGraph<R: Renderer = SkiaRenderer> {
    graph: Graph,
    config: Config,
    layout: ForceLayout,
    renderer: R,
    progress: ProgressChannel,
    cancel: CancellationToken,
}

impl ForceGraph<SkiaRenderer> {
    /// Resolve `nodes`/`links` and prepare a layout rendered with tiny-skia.
    pub fn new(nodes: Vec<GraphNode>, links: Vec<GraphLink>, config: Config) -> OpsResult<Self> {
        Self::with_renderer(nodes, links, config, SkiaRenderer)
    }
}

impl<R: Renderer> ForceGraph<R> {
    /// Like [`ForceGraph::new`] with a custom renderer.
    pub fn with_renderer(
        nodes: Vec<GraphNode>,
        links: Vec<GraphLink>,
        config: Config,
        renderer: R,
    ) -> OpsResult<Self> {
        config.validate()?;
        let graph = Graph::new(nodes, links)?;

        let progress = ProgressChannel::new(config.progress_capacity);
        let cancel = CancellationToken::new();
        let layout = ForceLayout::new(&graph, config.simulation.clone())?
            .with_progress(progress.clone())
            .with_cancellation(cancel.clone());

        debug!(
            nodes = graph.node_count(),
            links = graph.link_count(),
            groups = graph.groups().len(),
            "Force graph ready"
        );

        Ok(Self {
            graph,
            config,
            layout,
            renderer,
            progress,
            cancel,
        })
    }

    /// Receive progress events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.progress.subscribe()
    }

    /// Token that stops the simulation between ticks and tiling between tiles.
    ///
    /// [`ForceGraph::reset`] installs a fresh token; tokens handed out before
    /// that no longer affect this graph.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &ForceLayout {
        &self.layout
    }

    /// Current node positions, slot-aligned with [`ForceGraph::graph`].
    pub fn positions(&self) -> &[Position] {
        self.layout.positions()
    }

    /// Whether a converged layout is available for projection.
    pub fn is_simulated(&self) -> bool {
        self.layout.is_converged()
    }

    /// Run the force simulation. A second call warm-starts from the current
    /// positions.
    pub fn simulate(&mut self) -> SimulationState {
        self.layout.simulate()
    }

    /// Drop the current layout and start over from the initial placement,
    /// clearing any earlier cancellation.
    pub fn reset(&mut self) {
        self.cancel = CancellationToken::new();
        self.layout.set_cancellation(self.cancel.clone());
        self.layout.reset();
    }

    /// Scene for zoom level `zoom`.
    pub fn scene(&self, zoom: u32) -> OpsResult<Scene> {
        if !self.is_simulated() {
            return Err(OpsError::NotSimulated);
        }
        check_zoom(zoom)?;
        let size = self
            .config
            .canvas_size(zoom)
            .ok_or_else(|| OpsError::Config(format!("canvas at zoom {} overflows", zoom)))?;

        Ok(Scene::new(
            &self.graph,
            self.layout.positions(),
            &self.config.style,
            size,
            self.config.zoom_scale(zoom),
        )?)
    }

    /// Render zoom level `zoom`. Fails with [`OpsError::NotSimulated`] until
    /// the layout has converged.
    pub fn project(&self, zoom: u32) -> OpsResult<R::Raster> {
        let scene = self.scene(zoom)?;
        Ok(self.renderer.render(&scene)?)
    }

    /// Cut `raster` into tiles and hand each one to `store`.
    pub async fn slice_and_store(
        &self,
        zoom: u32,
        raster: &R::Raster,
        store: &dyn TileStore,
    ) -> OpsResult<ZoomReport> {
        check_zoom(zoom)?;
        let (width, height) = (raster.width(), raster.height());
        let grid = TileGrid::new(zoom, width, height, self.config.tile_size);
        let max = grid.len();
        let mut report = ZoomReport::new(&grid, width, height);

        info!(
            zoom,
            width,
            height,
            columns = grid.columns(),
            rows = grid.rows(),
            "Tiling zoom level"
        );

        for (done, tile) in grid.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(OpsError::Cancelled);
            }

            let key = tile.storage_key();
            let bytes = raster.extract(grid.rect(tile))?.encode()?;
            match store.store(bytes, &key).await {
                Ok(()) => {
                    report.stored += 1;
                    debug!(%tile, key = %key, "Tile stored");
                }
                Err(err) if self.config.failure_policy == FailurePolicy::Abort => {
                    return Err(OpsError::storage(key, err));
                }
                Err(err) => {
                    warn!(%tile, key = %key, error = %err, "Failed to store tile");
                    report.failed.push(TileFailure {
                        coordinate: tile,
                        key,
                        message: err.to_string(),
                    });
                }
            }

            self.progress
                .publish(ProgressEvent::tiling(done as u64 + 1, max, zoom));
        }

        info!(
            zoom,
            stored = report.stored,
            failed = report.failed.len(),
            "Zoom level done"
        );
        Ok(report)
    }

    /// Simulate (unless already converged), then render and store every zoom
    /// level in ascending order.
    pub async fn generate_tiles(&mut self, store: &dyn TileStore) -> OpsResult<GenerationReport> {
        let simulation = if self.is_simulated() {
            self.layout.simulation_state()
        } else {
            self.simulate()
        };
        if self.layout.state() == LayoutState::Aborted {
            return Err(OpsError::Cancelled);
        }

        let mut zooms = Vec::with_capacity(self.config.zoom_levels as usize);
        for zoom in 1..=self.config.zoom_levels {
            let raster = self.project(zoom)?;
            zooms.push(self.slice_and_store(zoom, &raster, store).await?);
        }

        let report = GenerationReport { simulation, zooms };
        info!(
            zoom_levels = report.zooms.len(),
            tiles = report.tiles_stored(),
            failed = report.failures().count(),
            "Tile generation finished"
        );
        Ok(report)
    }
}

/// Zoom levels start at 1.
fn check_zoom(zoom: u32) -> OpsResult<()> {
    if zoom == 0 {
        return Err(OpsError::Config("zoom must be >= 1".into()));
    }
    Ok(())
}

/// Lay out `nodes`/`links` and write the pyramid below `config.output_dir`.
pub async fn generate_tiles(
    nodes: Vec<GraphNode>,
    links: Vec<GraphLink>,
    config: Config,
) -> OpsResult<GenerationReport> {
    let store = FsTileStore::new(&config.output_dir);
    let mut graph = ForceGraph::new(nodes, links, config)?;
    graph.generate_tiles(&store).await
}
