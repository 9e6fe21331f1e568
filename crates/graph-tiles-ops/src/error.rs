//! Error types for the operations layer.

use std::path::PathBuf;

use graph_tiles_core::GraphError;
use graph_tiles_layout::LayoutError;
use thiserror::Error;

/// Result type for operations.
pub type OpsResult<T> = Result<T, OpsError>;

/// Errors that can occur during operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The node/link input could not be resolved.
    #[error("Malformed graph: {0}")]
    Graph(#[from] GraphError),

    /// The layout engine rejected the graph or its configuration.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// A raster was requested before the layout converged.
    #[error("Layout has not converged. Run simulate first.")]
    NotSimulated,

    /// Scene rasterization failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// A tile could not be written.
    #[error("Failed to store tile {key}: {source}")]
    Storage {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The cancellation token fired.
    #[error("Tile generation cancelled")]
    Cancelled,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OpsError {
    /// Create a storage error for the tile stored under `key`.
    pub fn storage(key: impl Into<String>, source: StoreError) -> Self {
        Self::Storage {
            key: key.into(),
            source,
        }
    }
}

/// Errors raised by the rasterizer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to allocate a {width}x{height} pixmap")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("invalid color: {0:?}")]
    InvalidColor(String),
    #[error("expected {expected} node positions, got {actual}")]
    PositionCount { expected: usize, actual: usize },
}

/// Errors raised by a [`crate::TileStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Writing to the filesystem failed.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store refused the tile.
    #[error("{0}")]
    Rejected(String),
}
