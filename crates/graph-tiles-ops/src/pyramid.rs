//! Tile addressing for the zoom pyramid.
//!
//! Zoom level `z` renders a `z * base` pixel square canvas that is cut into
//! `tile_size` squares. Tiles are addressed by `(zoom, col, row)` with the
//! origin at the top-left corner and visited row by row, column fastest.

use serde::{Deserialize, Serialize};

/// Address of one tile in the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoordinate {
    pub zoom: u32,
    pub col: u32,
    pub row: u32,
}

impl TileCoordinate {
    pub fn new(zoom: u32, col: u32, row: u32) -> Self {
        Self { zoom, col, row }
    }

    /// Storage key, relative to the store root.
    pub fn storage_key(&self) -> String {
        format!("tiles/{}/{}-{}.png", self.zoom, self.col, self.row)
    }
}

impl std::fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.zoom, self.col, self.row)
    }
}

/// A rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }
}

/// The tiling of one zoom level's canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    zoom: u32,
    width: u32,
    height: u32,
    tile_size: u32,
}

impl TileGrid {
    /// `tile_size` must be non-zero.
    pub fn new(zoom: u32, width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            zoom,
            width,
            height,
            tile_size: tile_size.max(1),
        }
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn columns(&self) -> u32 {
        self.width.div_ceil(self.tile_size)
    }

    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.tile_size)
    }

    /// Number of tiles in the grid.
    pub fn len(&self) -> u64 {
        u64::from(self.columns()) * u64::from(self.rows())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every tile in visiting order.
    pub fn iter(&self) -> impl Iterator<Item = TileCoordinate> + '_ {
        let zoom = self.zoom;
        let columns = self.columns();
        (0..self.rows()).flat_map(move |row| (0..columns).map(move |col| TileCoordinate::new(zoom, col, row)))
    }

    /// Full `tile_size` square of a tile. Edge tiles may extend past the canvas.
    pub fn rect(&self, tile: TileCoordinate) -> TileRect {
        TileRect {
            left: tile.col * self.tile_size,
            top: tile.row * self.tile_size,
            width: self.tile_size,
            height: self.tile_size,
        }
    }

    /// Part of a tile that lies on the canvas.
    pub fn visible_rect(&self, tile: TileCoordinate) -> TileRect {
        let full = self.rect(tile);
        TileRect {
            width: full.width.min(self.width.saturating_sub(full.left)),
            height: full.height.min(self.height.saturating_sub(full.top)),
            ..full
        }
    }
}

/// A tile that could not be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileFailure {
    pub coordinate: TileCoordinate,
    pub key: String,
    pub message: String,
}

/// Outcome of tiling one zoom level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomReport {
    pub zoom: u32,
    pub width: u32,
    pub height: u32,
    pub columns: u32,
    pub rows: u32,
    /// Tiles handed to the store successfully.
    pub stored: u64,
    pub failed: Vec<TileFailure>,
}

impl ZoomReport {
    pub(crate) fn new(grid: &TileGrid, width: u32, height: u32) -> Self {
        Self {
            zoom: grid.zoom(),
            width,
            height,
            columns: grid.columns(),
            rows: grid.rows(),
            stored: 0,
            failed: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_layout() {
        assert_eq!(TileCoordinate::new(2, 3, 1).storage_key(), "tiles/2/3-1.png");
    }

    #[test]
    fn exact_grid() {
        let grid = TileGrid::new(1, 512, 512, 256);
        assert_eq!((grid.columns(), grid.rows(), grid.len()), (2, 2, 4));
        let tiles: Vec<_> = grid.iter().collect();
        assert_eq!(
            tiles,
            vec![
                TileCoordinate::new(1, 0, 0),
                TileCoordinate::new(1, 1, 0),
                TileCoordinate::new(1, 0, 1),
                TileCoordinate::new(1, 1, 1),
            ]
        );
    }

    #[test]
    fn partial_tiles_round_up() {
        let grid = TileGrid::new(3, 1536, 1536, 500);
        assert_eq!(grid.columns(), 4);
        assert_eq!(grid.len(), 16);
        let last = grid.iter().last().unwrap();
        assert_eq!(grid.rect(last).width, 500);
        assert_eq!(grid.visible_rect(last).width, 36);
    }

    #[test]
    fn tiles_cover_canvas_without_overlap() {
        for (w, h, t) in [(512, 512, 256), (1536, 1536, 500), (300, 120, 64), (1, 1, 256)] {
            let grid = TileGrid::new(1, w, h, t);
            let mut hits = vec![0u8; (w * h) as usize];
            for tile in grid.iter() {
                let r = grid.visible_rect(tile);
                assert!(r.width > 0 && r.height > 0, "empty tile {tile} in {w}x{h}/{t}");
                for y in r.top..r.bottom() {
                    for x in r.left..r.right() {
                        hits[(y * w + x) as usize] += 1;
                    }
                }
            }
            assert!(hits.iter().all(|&n| n == 1), "{w}x{h}/{t}");
            assert_eq!(grid.iter().count() as u64, grid.len());
        }
    }

    #[test]
    fn zero_tile_size_is_clamped() {
        let grid = TileGrid::new(1, 4, 4, 0);
        assert_eq!(grid.tile_size(), 1);
        assert_eq!(grid.len(), 16);
    }
}
