//! Force-directed graph layout with a Barnes-Hut quadtree.
//!
//! [`ForceLayout`] assigns a 2D position to every node of a
//! [`graph_tiles_core::Graph`] by running a velocity-Verlet style simulation
//! with three forces:
//!
//! ```text
//!   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//!   │  Repulsion  │───▶│    Links    │───▶│  Centering  │───▶│  Integrate  │
//!   │ (BH approx) │    │  (springs)  │    │ (centroid)  │    │  positions  │
//!   └─────────────┘    └─────────────┘    └─────────────┘    └─────────────┘
//! ```
//!
//! A run ends when any of these fire first: the tick budget is spent, the
//! temperature (alpha) drops below its floor, the cancellation token fires,
//! or no tick completes within the quiescence timeout.
//!
//! ## Performance
//!
//! - Exact repulsion: O(n²) per tick
//! - Barnes-Hut approximation: O(n log n) per tick

mod error;
mod layout;
mod quadtree;

pub use error::LayoutError;
pub use layout::{ForceLayout, LayoutConfig, LayoutState, SimulationState, TerminatedBy};
pub use quadtree::{pairwise_force, QuadTree, QuadTreeNode, Repulsion};

/// Result type for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;
