//! Error types for layout operations.

use thiserror::Error;

/// Errors that can occur while setting up a layout.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// Invalid graph data.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// A configuration value is out of range.
    #[error("Invalid layout config: {0}")]
    InvalidConfig(String),
}
