//! Barnes-Hut quadtree for O(n log n) repulsion.
//!
//! The quadtree recursively subdivides space and computes the center of mass
//! of each cell. Cells that are small relative to their distance from the
//! queried node are treated as a single point mass, reducing the O(n²)
//! pairwise sum to O(n log n).

use graph_tiles_core::Position;

/// Offset used to separate coincident nodes.
pub(crate) const JITTER: f64 = 1e-6;

/// Deterministic nudge for a zero-length separation between `index` and
/// `other`; the sign flips with the pair order so the two are pushed apart.
pub(crate) fn jitter(index: usize, other: usize) -> f64 {
    if index < other {
        JITTER
    } else {
        -JITTER
    }
}

/// Parameters of the many-body repulsion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repulsion {
    /// Charge of every node; positive values push nodes apart.
    pub strength: f64,
    /// Barnes-Hut accuracy threshold (cell width / distance).
    /// Zero disables the approximation.
    pub theta: f64,
    /// Distances below this are softened so the force stays bounded.
    pub distance_min: f64,
    /// Pairs farther apart than this do not interact.
    pub distance_max: Option<f64>,
}

impl Default for Repulsion {
    fn default() -> Self {
        Self {
            strength: 30.0,
            theta: 0.9,
            distance_min: 1.0,
            distance_max: None,
        }
    }
}

impl Repulsion {
    /// Force exerted on a node by `mass` units of charge at offset `(dx, dy)`.
    fn between(&self, index: usize, other: usize, dx: f64, dy: f64, mass: f64) -> (f64, f64) {
        let (dx, dy) = if dx == 0.0 && dy == 0.0 {
            (jitter(index, other), jitter(index, other))
        } else {
            (dx, dy)
        };
        let mut l2 = dx * dx + dy * dy;

        if let Some(max) = self.distance_max {
            if l2 >= max * max {
                return (0.0, 0.0);
            }
        }

        let min2 = self.distance_min * self.distance_min;
        if l2 < min2 {
            l2 = (min2 * l2).sqrt();
        }

        let k = -self.strength * mass / l2;
        (dx * k, dy * k)
    }
}

/// One cell of the flattened tree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuadTreeNode {
    /// Center of mass X
    pub center_x: f64,
    /// Center of mass Y
    pub center_y: f64,
    /// Total mass (number of nodes in this cell)
    pub mass: f64,
    /// Cell lower-left corner X
    pub min_x: f64,
    /// Cell lower-left corner Y
    pub min_y: f64,
    /// Cell width (cells are square)
    pub width: f64,
    /// Child cells in NW, NE, SW, SE order.
    pub children: [Option<u32>; 4],
    /// First entry of this leaf in the point list.
    pub first_point: u32,
    /// Number of points held by this leaf; zero for internal cells.
    pub point_count: u32,
}

impl QuadTreeNode {
    pub fn is_leaf(&self) -> bool {
        self.point_count > 0
    }

    fn contains(&self, pos: &Position) -> bool {
        pos.x >= self.min_x
            && pos.x < self.min_x + self.width
            && pos.y >= self.min_y
            && pos.y < self.min_y + self.width
    }
}

/// A Barnes-Hut quadtree over one snapshot of node positions.
///
/// Cells live in a single arena and refer to their children by index. Leaves
/// hold at most one node, except at `max_depth` where coincident nodes share
/// a leaf.
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<QuadTreeNode>,
    /// Node slots referenced by leaves.
    points: Vec<u32>,
    positions: Vec<Position>,
    bounds_min: Position,
    bounds_max: Position,
}

impl QuadTree {
    /// Build a quadtree from node positions.
    ///
    /// # Arguments
    /// * `positions` - Node positions, indexed by node slot
    /// * `max_depth` - Maximum tree depth (typically 12-16)
    pub fn build(positions: &[Position], max_depth: usize) -> Self {
        if positions.is_empty() {
            return Self {
                nodes: Vec::new(),
                points: Vec::new(),
                positions: Vec::new(),
                bounds_min: Position::default(),
                bounds_max: Position::default(),
            };
        }

        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;

        for pos in positions {
            min_x = min_x.min(pos.x);
            min_y = min_y.min(pos.y);
            max_x = max_x.max(pos.x);
            max_y = max_y.max(pos.y);
        }

        // Pad so that no node sits on the outer edge, then make it square.
        let padding = ((max_x - min_x).max(max_y - min_y) * 0.1).max(1.0);
        min_x -= padding;
        min_y -= padding;
        max_x += padding;
        max_y += padding;

        let width = (max_x - min_x).max(max_y - min_y);
        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;

        let bounds_min = Position::new(center_x - width / 2.0, center_y - width / 2.0);
        let bounds_max = Position::new(center_x + width / 2.0, center_y + width / 2.0);

        let mut nodes = Vec::with_capacity(positions.len() * 2);
        let mut points = Vec::with_capacity(positions.len());
        let mut builder = TreeBuilder {
            positions,
            nodes: &mut nodes,
            points: &mut points,
            max_depth,
        };

        let indices: Vec<u32> = (0..positions.len() as u32).collect();
        builder.build_node(&indices, bounds_min.x, bounds_min.y, width, 0);

        Self {
            nodes,
            points,
            positions: positions.to_vec(),
            bounds_min,
            bounds_max,
        }
    }

    /// The flattened cells; the root is at index 0.
    pub fn nodes(&self) -> &[QuadTreeNode] {
        &self.nodes
    }

    /// Corners of the padded square root cell, min then max.
    pub fn bounds(&self) -> (Position, Position) {
        (self.bounds_min, self.bounds_max)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Net repulsive force on the node in slot `index` from every other node.
    ///
    /// Cells that do not contain the node and whose `width / distance` ratio
    /// is below `theta` are collapsed to their center of mass.
    pub fn force_on(&self, index: usize, repulsion: &Repulsion) -> (f64, f64) {
        let Some(pos) = self.positions.get(index).copied() else {
            return (0.0, 0.0);
        };
        let mut force = (0.0, 0.0);
        if !self.nodes.is_empty() {
            self.accumulate(0, index, pos, repulsion, &mut force);
        }
        force
    }

    fn accumulate(
        &self,
        cell: usize,
        index: usize,
        pos: Position,
        repulsion: &Repulsion,
        force: &mut (f64, f64),
    ) {
        let node = &self.nodes[cell];

        if node.is_leaf() {
            let start = node.first_point as usize;
            let end = start + node.point_count as usize;
            for &other in &self.points[start..end] {
                let other = other as usize;
                if other == index {
                    continue;
                }
                let target = self.positions[other];
                let (fx, fy) =
                    repulsion.between(index, other, target.x - pos.x, target.y - pos.y, 1.0);
                force.0 += fx;
                force.1 += fy;
            }
            return;
        }

        let dx = node.center_x - pos.x;
        let dy = node.center_y - pos.y;
        let distance = dx.hypot(dy);
        if !node.contains(&pos) && node.width < repulsion.theta * distance {
            let (fx, fy) = repulsion.between(index, usize::MAX, dx, dy, node.mass);
            force.0 += fx;
            force.1 += fy;
            return;
        }

        for child in node.children.iter().flatten() {
            self.accumulate(*child as usize, index, pos, repulsion, force);
        }
    }
}

/// Exact O(n) repulsion on one node, summed over every other node.
///
/// Used when the Barnes-Hut approximation is disabled and as the reference
/// the approximation is measured against.
pub fn pairwise_force(positions: &[Position], index: usize, repulsion: &Repulsion) -> (f64, f64) {
    let Some(pos) = positions.get(index) else {
        return (0.0, 0.0);
    };
    positions
        .iter()
        .enumerate()
        .filter(|(other, _)| *other != index)
        .fold((0.0, 0.0), |acc, (other, target)| {
            let (fx, fy) = repulsion.between(index, other, target.x - pos.x, target.y - pos.y, 1.0);
            (acc.0 + fx, acc.1 + fy)
        })
}

struct TreeBuilder<'a> {
    positions: &'a [Position],
    nodes: &'a mut Vec<QuadTreeNode>,
    points: &'a mut Vec<u32>,
    max_depth: usize,
}

impl TreeBuilder<'_> {
    fn build_node(&mut self, indices: &[u32], x: f64, y: f64, width: f64, depth: usize) -> Option<u32> {
        if indices.is_empty() {
            return None;
        }

        let node_idx = self.nodes.len();
        self.nodes.push(QuadTreeNode::default());

        let mass = indices.len() as f64;
        let (sum_x, sum_y) = indices.iter().fold((0.0, 0.0), |(sx, sy), &i| {
            let p = self.positions[i as usize];
            (sx + p.x, sy + p.y)
        });

        let mut cell = QuadTreeNode {
            center_x: sum_x / mass,
            center_y: sum_y / mass,
            mass,
            min_x: x,
            min_y: y,
            width,
            ..Default::default()
        };

        if indices.len() == 1 || depth >= self.max_depth {
            cell.first_point = self.points.len() as u32;
            cell.point_count = indices.len() as u32;
            self.points.extend_from_slice(indices);
            self.nodes[node_idx] = cell;
            return Some(node_idx as u32);
        }

        let half_width = width / 2.0;
        let mid_x = x + half_width;
        let mid_y = y + half_width;

        let mut nw_indices = Vec::new();
        let mut ne_indices = Vec::new();
        let mut sw_indices = Vec::new();
        let mut se_indices = Vec::new();

        for &i in indices {
            let pos = &self.positions[i as usize];
            if pos.x < mid_x {
                if pos.y < mid_y {
                    sw_indices.push(i);
                } else {
                    nw_indices.push(i);
                }
            } else if pos.y < mid_y {
                se_indices.push(i);
            } else {
                ne_indices.push(i);
            }
        }

        cell.children = [
            self.build_node(&nw_indices, x, mid_y, half_width, depth + 1),
            self.build_node(&ne_indices, mid_x, mid_y, half_width, depth + 1),
            self.build_node(&sw_indices, x, y, half_width, depth + 1),
            self.build_node(&se_indices, mid_x, y, half_width, depth + 1),
        ];
        self.nodes[node_idx] = cell;

        Some(node_idx as u32)
    }
}
