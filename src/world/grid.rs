//! Infinite aligned lattices over the block plane.
//!
//! A [`Grid`] partitions the XZ plane into rectangles of a fixed size with an
//! optional offset, giving each rectangle an integer cell coordinate. Chunks,
//! regions and map tiles are all grids over the same plane, so converting
//! between them is a pair of grid lookups rather than special-cased division.

use crate::util::floor_div;

/// An axis-aligned partition of the XZ plane into `size`-sized cells, shifted
/// by `offset` blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grid {
    pub size: (i32, i32),
    pub offset: (i32, i32),
}

impl Grid {
    /// A square grid with no offset.
    pub fn new(size: i32) -> Self {
        Grid {
            size: (size, size),
            offset: (0, 0),
        }
    }

    /// A grid with explicit per-axis size and offset.
    pub fn with_offset(size: (i32, i32), offset: (i32, i32)) -> Self {
        Grid { size, offset }
    }

    /// The cell containing the given point.
    pub fn cell(&self, pos: (i32, i32)) -> (i32, i32) {
        (
            floor_div(pos.0 - self.offset.0, self.size.0),
            floor_div(pos.1 - self.offset.1, self.size.1),
        )
    }

    /// The smallest point inside a cell.
    pub fn cell_min(&self, cell: (i32, i32)) -> (i32, i32) {
        (
            cell.0 * self.size.0 + self.offset.0,
            cell.1 * self.size.1 + self.offset.1,
        )
    }

    /// The largest point inside a cell.
    pub fn cell_max(&self, cell: (i32, i32)) -> (i32, i32) {
        let min = self.cell_min((cell.0 + 1, cell.1 + 1));
        (min.0 - 1, min.1 - 1)
    }

    /// The cell of `target` containing this grid's cell minimum. Together with
    /// [`cell_max_in`](Self::cell_max_in) this gives the exact rectangle of
    /// `target` cells overlapping one cell of this grid.
    pub fn cell_min_in(&self, cell: (i32, i32), target: &Grid) -> (i32, i32) {
        target.cell(self.cell_min(cell))
    }

    /// The cell of `target` containing this grid's cell maximum.
    pub fn cell_max_in(&self, cell: (i32, i32), target: &Grid) -> (i32, i32) {
        target.cell(self.cell_max(cell))
    }

    /// Compose two grids: a cell of the result covers `self.size` cells of
    /// `other`. Composing a 32x32 grid with a 16-block chunk grid yields the
    /// 512-block region grid.
    pub fn multiply(&self, other: &Grid) -> Grid {
        Grid {
            size: (self.size.0 * other.size.0, self.size.1 * other.size.1),
            offset: (
                self.offset.0 * other.size.0 + other.offset.0,
                self.offset.1 * other.size.1 + other.offset.1,
            ),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
