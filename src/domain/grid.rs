/// Grid vocabulary: cells, doors, partitions and cell classes.
/// Cell classes are queried via methods on `GridDims`, not stored as flags,
/// so the obstacle layout is centralized here and can never drift.
///
/// ## Cell Classes
///
/// ┌──────────────────────────────┬─────────────────────┐
/// │ Coordinates                   │ Class               │
/// ├──────────────────────────────┼─────────────────────┤
/// │ outside 0..cols × 0..rows     │ out of bounds       │
/// │ col/row on the outer ring     │ wall (doors excepted)│
/// │ interior, even col + even row │ obstacle (table)    │
/// │ interior, exactly one even    │ bridge (partition ok)│
/// │ interior, odd col + odd row   │ always open         │
/// └──────────────────────────────┴─────────────────────┘

use super::entity::Facing;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

impl Cell {
    pub const fn new(col: i32, row: i32) -> Self {
        Cell { col, row }
    }

    pub fn offset(self, dc: i32, dr: i32) -> Cell {
        Cell::new(self.col + dc, self.row + dr)
    }

    /// Neighbouring cell in the given direction.
    pub fn step(self, facing: Facing) -> Cell {
        let (dc, dr) = facing.delta();
        self.offset(dc, dr)
    }

    /// Euclidean distance in cells.
    pub fn distance(self, other: Cell) -> f32 {
        let dc = (self.col - other.col) as f32;
        let dr = (self.row - other.row) as f32;
        (dc * dc + dr * dr).sqrt()
    }

    pub fn manhattan(self, other: Cell) -> i32 {
        (self.col - other.col).abs() + (self.row - other.row).abs()
    }

    /// Both axis deltas strictly below `reach` (a square neighbourhood).
    pub fn within(self, other: Cell, reach: i32) -> bool {
        (self.col - other.col).abs() < reach && (self.row - other.row).abs() < reach
    }
}

// ── Grid dimensions + cell class queries ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GridDims {
    pub cols: i32,
    pub rows: i32,
}

impl GridDims {
    pub const fn new(cols: i32, rows: i32) -> Self {
        GridDims { cols, rows }
    }

    pub fn in_bounds(self, c: Cell) -> bool {
        c.col >= 0 && c.col < self.cols && c.row >= 0 && c.row < self.rows
    }

    /// Inside the outer wall ring.
    pub fn is_interior(self, c: Cell) -> bool {
        c.col >= 1 && c.col < self.cols - 1 && c.row >= 1 && c.row < self.rows - 1
    }

    /// Permanent obstacle: interior cell with even col and even row.
    pub fn is_obstacle(self, c: Cell) -> bool {
        self.is_interior(c) && c.col % 2 == 0 && c.row % 2 == 0
    }

    /// Bridge cell: interior, exactly one of col/row even.
    pub fn is_bridge(self, c: Cell) -> bool {
        self.is_interior(c) && (c.col % 2 == 0) != (c.row % 2 == 0)
    }

    /// Orientation a partition takes on this bridge cell.
    /// Odd row + even col sits between two horizontal neighbours → vertical.
    pub fn bridge_axis(self, c: Cell) -> Option<Axis> {
        if !self.is_bridge(c) {
            return None;
        }
        if c.row % 2 == 1 { Some(Axis::Vertical) } else { Some(Axis::Horizontal) }
    }

    /// Point reflection through the grid center.
    pub fn mirror(self, c: Cell) -> Cell {
        Cell::new(self.cols - 1 - c.col, self.rows - 1 - c.row)
    }

    /// Which outer edge a cell lies on, if any.
    pub fn edge_of(self, c: Cell) -> Option<Side> {
        if !self.in_bounds(c) {
            None
        } else if c.col == 0 {
            Some(Side::Left)
        } else if c.col == self.cols - 1 {
            Some(Side::Right)
        } else if c.row == 0 {
            Some(Side::Top)
        } else if c.row == self.rows - 1 {
            Some(Side::Bottom)
        } else {
            None
        }
    }

    pub fn interior_cells(self) -> impl Iterator<Item = Cell> {
        (1..self.rows - 1).flat_map(move |row| (1..self.cols - 1).map(move |col| Cell::new(col, row)))
    }

    pub fn cell_count(self) -> usize {
        (self.cols.max(0) * self.rows.max(0)) as usize
    }

    /// Row-major index for dense per-cell grids.
    pub fn index(self, c: Cell) -> Option<usize> {
        if self.in_bounds(c) {
            Some((c.row * self.cols + c.col) as usize)
        } else {
            None
        }
    }
}

impl Default for GridDims {
    fn default() -> Self {
        GridDims::new(17, 11)
    }
}

// ── Doors ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    /// Unit step from the door cell into the room.
    pub fn inward(self) -> (i32, i32) {
        match self {
            Side::Top => (0, 1),
            Side::Bottom => (0, -1),
            Side::Left => (1, 0),
            Side::Right => (-1, 0),
        }
    }

    /// Direction the player faces when arriving through this side.
    pub fn arrival_facing(self) -> Facing {
        match self {
            Side::Top => Facing::Down,
            Side::Bottom => Facing::Up,
            Side::Left => Facing::Right,
            Side::Right => Facing::Left,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DoorKind {
    Entry,
    Exit,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Door {
    pub cell: Cell,
    pub side: Side,
    pub kind: DoorKind,
}

impl Door {
    pub fn new(cell: Cell, side: Side, kind: DoorKind) -> Self {
        Door { cell, side, kind }
    }

    /// The `depth` cells directly inward from the door, nearest first.
    pub fn corridor(&self, depth: i32) -> Vec<Cell> {
        let (dc, dr) = self.side.inward();
        (1..=depth).map(|i| self.cell.offset(dc * i, dr * i)).collect()
    }

    /// First interior cell inside the door.
    pub fn landing(&self) -> Cell {
        let (dc, dr) = self.side.inward();
        self.cell.offset(dc, dr)
    }

    /// Entry door for the next room: the mirrored cell, with the side
    /// re-derived from whichever edge the mirror lands on.
    pub fn mirrored(&self, dims: GridDims) -> Door {
        let cell = dims.mirror(self.cell);
        let side = dims.edge_of(cell).unwrap_or(Side::Left);
        Door::new(cell, side, DoorKind::Entry)
    }
}

// ── Partitions ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Partition {
    pub cell: Cell,
    pub axis: Axis,
}
