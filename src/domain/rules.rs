/// Grid rules: cell openness, blast footprint, sight lines, bomb placement.
///
/// Pure functions operating on an immutable view of the room, no side
/// effects. These encode "what is legal / what would be hit" without
/// performing the action; `sim::step` does the mutation.
///
/// ## Cell Openness Truth Table
///
/// Used by enemies, sight lines, and spawning. First match wins.
/// ┌──────────────────────┬─────────┬──────────────────┐
/// │ Condition             │ Open?   │ Notes            │
/// ├──────────────────────┼─────────┼──────────────────┤
/// │ Outside interior      │ NO      │ walls, doors too │
/// │ Obstacle (even/even)  │ NO      │ permanent        │
/// │ Partition             │ NO      │ until blasted    │
/// │ Bomb                  │ NO      │ enemies never ghost │
/// │ Otherwise             │ YES     │                  │
/// └──────────────────────┴─────────┴──────────────────┘
///
/// ## Blast Walk (each cardinal direction, up to radius)
/// ┌──────────────────────┬──────────────────────────────┐
/// │ Cell                  │ Effect                       │
/// ├──────────────────────┼──────────────────────────────┤
/// │ Outside interior      │ stop, cell excluded          │
/// │ Obstacle              │ stop, cell excluded          │
/// │ Partition             │ include, break it, stop      │
/// │ Otherwise (bombs too) │ include, continue            │
/// └──────────────────────┴──────────────────────────────┘
/// The origin cell is always included.
///
/// ## Sight
/// Same row or column, axis distance ≤ range, every cell strictly
/// between the two open. Anything else: no sight.

use super::entity::{Bomb, Facing};
use super::grid::{Cell, GridDims, Partition};

/// Immutable view of the room for rule queries.
pub struct MapView<'a> {
    pub dims: GridDims,
    pub partitions: &'a [Partition],
    pub bombs: &'a [Bomb],
}

impl<'a> MapView<'a> {
    pub fn partition_at(&self, c: Cell) -> Option<&'a Partition> {
        self.partitions.iter().find(|p| p.cell == c)
    }

    pub fn bomb_at(&self, c: Cell) -> Option<&'a Bomb> {
        self.bombs.iter().find(|b| b.cell == c)
    }

    /// Whole-cell passability. See truth table above.
    pub fn cell_open(&self, c: Cell) -> bool {
        self.dims.is_interior(c)
            && !self.dims.is_obstacle(c)
            && self.partition_at(c).is_none()
            && self.bomb_at(c).is_none()
    }

    /// Cardinal directions whose neighbouring cell is open.
    pub fn open_directions(&self, c: Cell) -> Vec<Facing> {
        Facing::ALL.iter().copied().filter(|&f| self.cell_open(c.step(f))).collect()
    }
}

// ── Bomb placement ──

/// Can a bomb go down at `cell` with `charges` left?
pub fn can_place_bomb(map: &MapView, cell: Cell, charges: u32) -> bool {
    if charges == 0 { return false; }
    if !map.dims.is_interior(cell) { return false; }
    if map.dims.is_obstacle(cell) { return false; }
    if map.partition_at(cell).is_some() { return false; }
    map.bomb_at(cell).is_none()
}

// ── Blast footprint ──

/// Cells touched by one detonation, plus the partitions it breaks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Blast {
    pub cells: Vec<Cell>,
    pub broken: Vec<Cell>,
}

impl Blast {
    pub fn contains(&self, c: Cell) -> bool {
        self.cells.contains(&c)
    }
}

/// Walk the four arms of a blast. See truth table above.
pub fn blast_footprint(map: &MapView, origin: Cell, radius: i32) -> Blast {
    let mut blast = Blast { cells: vec![origin], broken: vec![] };

    for facing in Facing::ALL {
        let mut c = origin;
        for _ in 0..radius {
            c = c.step(facing);
            if !map.dims.is_interior(c) || map.dims.is_obstacle(c) {
                break;
            }
            blast.cells.push(c);
            if map.partition_at(c).is_some() {
                blast.broken.push(c);
                break;
            }
        }
    }
    blast
}

// ── Sight ──

/// Grid-aligned line of sight from `from` to `to`.
/// Returns the direction to face when the target is visible.
/// Same cell returns `None`: contact resolution handles that case.
pub fn line_of_sight(map: &MapView, from: Cell, to: Cell, range: i32) -> Option<Facing> {
    if from == to { return None; }

    let facing = if from.col == to.col {
        if (to.row - from.row).abs() > range { return None; }
        if to.row > from.row { Facing::Down } else { Facing::Up }
    } else if from.row == to.row {
        if (to.col - from.col).abs() > range { return None; }
        if to.col > from.col { Facing::Right } else { Facing::Left }
    } else {
        return None;
    };

    let mut c = from.step(facing);
    while c != to {
        if !map.cell_open(c) { return None; }
        c = c.step(facing);
    }
    Some(facing)
}
