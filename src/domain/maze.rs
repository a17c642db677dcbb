/// Maze generator: the static layout of one room.
///
/// ## Pipeline
///
///   1. Recursive division over the interior. Walls land on even lines,
///      holes on odd cells, one arm of every cross stays shut. The result
///      is a perfect maze over the odd/odd cells.
///   2. Entry door: mirrored previous exit, or the default left-side door.
///   3. Entry corridor carved open.
///   4. Exit door (or goal table in the final room), corridor carved open.
///   5. Scanner: extra partitions on long open runs along odd rows.
///   6. Every remaining solid bridge becomes a partition.
///
/// ## Connectivity
///
/// The base maze links every odd/odd cell. Doors sit on odd edge
/// positions so their landings are odd/odd cells. Corridors and the goal
/// neighbourhood are only ever opened. The scanner is the one step that
/// closes cells, and it keeps a partition only after a flood fill shows
/// the entry still reaches the target. Step 6 never changes passability:
/// it only gives existing solid bridges their partition shape.

use std::collections::VecDeque;

use rand::seq::IndexedRandom;
use rand::Rng;

use super::grid::{Cell, Door, DoorKind, GridDims, Partition, Side};

pub const ENTRY_CORRIDOR: i32 = 4;
pub const EXIT_CORRIDOR: i32 = 2;
/// Exit/goal must be farther than this from the entry (cells, Euclidean).
pub const MIN_DOOR_SPREAD: f32 = 8.0;

const ENTRY_KEEP_OUT: i32 = 3;
const DOOR_KEEP_OUT: i32 = 2;
const GOAL_KEEP_OUT: i32 = 2;

#[derive(Clone, Debug)]
pub struct RoomLayout {
    pub dims: GridDims,
    pub partitions: Vec<Partition>,
    pub doors: Vec<Door>,
    /// Final room only: the table holding the prize.
    pub goal: Option<Cell>,
}

impl RoomLayout {
    pub fn entry(&self) -> Option<Door> {
        self.doors.iter().copied().find(|d| d.kind == DoorKind::Entry)
    }

    pub fn exit(&self) -> Option<Door> {
        self.doors.iter().copied().find(|d| d.kind == DoorKind::Exit)
    }
}

pub fn default_entry() -> Door {
    Door::new(Cell::new(0, 1), Side::Left, DoorKind::Entry)
}

// ══════════════════════════════════════════════════════════════
// Solid mask
// ══════════════════════════════════════════════════════════════

/// Working solid/open mask. Out of bounds reads as solid.
struct Solid {
    dims: GridDims,
    cells: Vec<bool>,
}

impl Solid {
    fn with_border(dims: GridDims) -> Self {
        let mut cells = vec![false; dims.cell_count()];
        for row in 0..dims.rows {
            for col in 0..dims.cols {
                let c = Cell::new(col, row);
                if !dims.is_interior(c) {
                    if let Some(i) = dims.index(c) { cells[i] = true; }
                }
            }
        }
        Solid { dims, cells }
    }

    fn get(&self, c: Cell) -> bool {
        self.dims.index(c).map_or(true, |i| self.cells[i])
    }

    fn set(&mut self, c: Cell, v: bool) {
        if let Some(i) = self.dims.index(c) {
            self.cells[i] = v;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Step 1: recursive division
// ══════════════════════════════════════════════════════════════

/// Inclusive interior box: (col0, row0, col1, row1).
type Chamber = (i32, i32, i32, i32);

fn divide<R: Rng + ?Sized>(dims: GridDims, rng: &mut R) -> Solid {
    let mut solid = Solid::with_border(dims);
    let mut queue: VecDeque<Chamber> = VecDeque::new();
    queue.push_back((1, 1, dims.cols - 2, dims.rows - 2));
    while let Some(ch) = queue.pop_front() {
        split_chamber(&mut solid, ch, rng, &mut queue);
    }
    solid
}

fn split_chamber<R: Rng + ?Sized>(
    solid: &mut Solid,
    (x0, y0, x1, y1): Chamber,
    rng: &mut R,
    queue: &mut VecDeque<Chamber>,
) {
    // Wall lines must meet solid walls at both ends
    let xs: Vec<i32> = (x0 + 1..x1)
        .filter(|&x| x % 2 == 0 && solid.get(Cell::new(x, y0 - 1)) && solid.get(Cell::new(x, y1 + 1)))
        .collect();
    let ys: Vec<i32> = (y0 + 1..y1)
        .filter(|&y| y % 2 == 0 && solid.get(Cell::new(x0 - 1, y)) && solid.get(Cell::new(x1 + 1, y)))
        .collect();
    let (Some(&x), Some(&y)) = (xs.choose(rng), ys.choose(rng)) else {
        return;
    };

    // Four arms meet at (x, y); odd cells on each arm are hole candidates
    let mut arms: [Vec<Cell>; 4] = Default::default();
    solid.set(Cell::new(x, y), true);
    for i in x0..x {
        solid.set(Cell::new(i, y), true);
        if i % 2 == 1 { arms[0].push(Cell::new(i, y)); }
    }
    for i in x + 1..=x1 {
        solid.set(Cell::new(i, y), true);
        if i % 2 == 1 { arms[1].push(Cell::new(i, y)); }
    }
    for j in y0..y {
        solid.set(Cell::new(x, j), true);
        if j % 2 == 1 { arms[2].push(Cell::new(x, j)); }
    }
    for j in y + 1..=y1 {
        solid.set(Cell::new(x, j), true);
        if j % 2 == 1 { arms[3].push(Cell::new(x, j)); }
    }

    let shut = rng.random_range(0..arms.len());
    for (k, arm) in arms.iter().enumerate() {
        if k == shut { continue; }
        if let Some(&hole) = arm.choose(rng) {
            solid.set(hole, false);
        }
    }

    queue.push_back((x0, y0, x - 1, y - 1));
    queue.push_back((x + 1, y0, x1, y - 1));
    queue.push_back((x0, y + 1, x - 1, y1));
    queue.push_back((x + 1, y + 1, x1, y1));
}

// ══════════════════════════════════════════════════════════════
// Steps 2–4: doors and goal
// ══════════════════════════════════════════════════════════════

fn pick_exit<R: Rng + ?Sized>(dims: GridDims, entry: &Door, first_room: bool, rng: &mut R) -> Door {
    let mut cands: Vec<Door> = vec![];
    let exit = |col: i32, row: i32, side: Side| Door::new(Cell::new(col, row), side, DoorKind::Exit);

    if first_room {
        // Lower-right quadrant only
        for row in (dims.rows / 2..dims.rows - 1).filter(|r| r % 2 == 1) {
            cands.push(exit(dims.cols - 1, row, Side::Right));
        }
        for col in (dims.cols / 2..dims.cols - 1).filter(|c| c % 2 == 1) {
            cands.push(exit(col, dims.rows - 1, Side::Bottom));
        }
    } else {
        for row in (1..dims.rows - 1).filter(|r| r % 2 == 1) {
            cands.push(exit(0, row, Side::Left));
            cands.push(exit(dims.cols - 1, row, Side::Right));
        }
        for col in (1..dims.cols - 1).filter(|c| c % 2 == 1) {
            cands.push(exit(col, 0, Side::Top));
            cands.push(exit(col, dims.rows - 1, Side::Bottom));
        }
    }

    cands.retain(|d| d.cell != entry.cell && d.cell.distance(entry.cell) > MIN_DOOR_SPREAD);
    cands
        .choose(rng)
        .copied()
        .unwrap_or_else(|| exit(dims.cols - 1, dims.rows - 2, Side::Right))
}

fn pick_goal<R: Rng + ?Sized>(dims: GridDims, entry: Cell, rng: &mut R) -> Cell {
    let tables: Vec<Cell> = dims.interior_cells().filter(|&c| dims.is_obstacle(c)).collect();
    let far: Vec<Cell> = tables.iter().copied().filter(|c| c.distance(entry) > MIN_DOOR_SPREAD).collect();
    if let Some(&c) = far.choose(rng) {
        return c;
    }
    tables
        .into_iter()
        .max_by(|a, b| a.distance(entry).total_cmp(&b.distance(entry)))
        .unwrap_or_else(|| Cell::new(dims.cols - 3, dims.rows - 3))
}

/// Cells that count as "arrived": the exit door, or the goal's open neighbours.
fn target_cells(dims: GridDims, doors: &[Door], goal: Option<Cell>) -> Vec<Cell> {
    match goal {
        Some(g) => [(0, -1), (0, 1), (-1, 0), (1, 0)]
            .iter()
            .map(|&(dc, dr)| g.offset(dc, dr))
            .filter(|&c| dims.is_interior(c) && !dims.is_obstacle(c))
            .collect(),
        None => doors.iter().filter(|d| d.kind == DoorKind::Exit).map(|d| d.cell).collect(),
    }
}

// ══════════════════════════════════════════════════════════════
// Reachability
// ══════════════════════════════════════════════════════════════

/// Flood fill from `start` over cells for which `open` holds.
/// Returns a row-major visited mask.
pub fn flood<F: Fn(Cell) -> bool>(dims: GridDims, start: Cell, open: F) -> Vec<bool> {
    let mut seen = vec![false; dims.cell_count()];
    let Some(i0) = dims.index(start) else { return seen; };
    if !open(start) { return seen; }
    seen[i0] = true;
    let mut queue = VecDeque::from([start]);
    while let Some(c) = queue.pop_front() {
        for (dc, dr) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
            let n = c.offset(dc, dr);
            if let Some(i) = dims.index(n) {
                if !seen[i] && open(n) {
                    seen[i] = true;
                    queue.push_back(n);
                }
            }
        }
    }
    seen
}

fn entry_reaches(solid: &Solid, doors: &[Door], entry: Cell, targets: &[Cell]) -> bool {
    let dims = solid.dims;
    let seen = flood(dims, entry, |c| {
        doors.iter().any(|d| d.cell == c)
            || (dims.is_interior(c) && !dims.is_obstacle(c) && !solid.get(c))
    });
    targets.iter().any(|&t| dims.index(t).map_or(false, |i| seen[i]))
}

// ══════════════════════════════════════════════════════════════
// Steps 5–6: partitions
// ══════════════════════════════════════════════════════════════

fn run_threshold<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    4 + rng.random_range(0..3)
}

struct KeepOut<'a> {
    entry: Cell,
    doors: &'a [Door],
    goal: Option<Cell>,
    protected: &'a [Cell],
}

impl KeepOut<'_> {
    fn blocks(&self, c: Cell) -> bool {
        c.within(self.entry, ENTRY_KEEP_OUT)
            || self.doors.iter().any(|d| c.within(d.cell, DOOR_KEEP_OUT))
            || self.goal.map_or(false, |g| c.within(g, GOAL_KEEP_OUT))
            || self.protected.contains(&c)
    }
}

fn scan_partitions<R: Rng + ?Sized>(
    solid: &mut Solid,
    keep: &KeepOut,
    targets: &[Cell],
    rng: &mut R,
) {
    let dims = solid.dims;
    for row in (1..dims.rows - 1).step_by(2) {
        let mut run = 0;
        let mut limit = run_threshold(rng);
        for col in 1..dims.cols - 1 {
            let c = Cell::new(col, row);
            if solid.get(c) {
                run = 0;
                continue;
            }
            run += 1;
            if run < limit || col % 2 != 0 || keep.blocks(c) {
                continue;
            }
            solid.set(c, true);
            if !entry_reaches(solid, keep.doors, keep.entry, targets) {
                solid.set(c, false);
                continue;
            }
            run = 0;
            limit = run_threshold(rng);
        }
    }
}

fn shape_partitions(solid: &Solid, doors: &[Door], protected: &[Cell]) -> Vec<Partition> {
    let dims = solid.dims;
    dims.interior_cells()
        .filter(|&c| solid.get(c))
        .filter(|c| !protected.contains(c))
        .filter(|&c| doors.iter().all(|d| d.cell.manhattan(c) > 1))
        .filter_map(|c| dims.bridge_axis(c).map(|axis| Partition { cell: c, axis }))
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Entry point
// ══════════════════════════════════════════════════════════════

/// Build one room. `forced_entry` is the already-mirrored door from the
/// previous room; `None` means this is the first room.
pub fn generate<R: Rng + ?Sized>(
    dims: GridDims,
    forced_entry: Option<Door>,
    final_room: bool,
    rng: &mut R,
) -> RoomLayout {
    let mut solid = divide(dims, rng);

    let entry = match forced_entry {
        Some(d) => Door { kind: DoorKind::Entry, ..d },
        None => default_entry(),
    };
    let mut doors = vec![entry];
    let mut protected: Vec<Cell> = entry.corridor(ENTRY_CORRIDOR);

    let mut goal = None;
    if final_room {
        let g = pick_goal(dims, entry.cell, rng);
        for dr in -1..=1 {
            for dc in -1..=1 {
                protected.push(g.offset(dc, dr));
            }
        }
        goal = Some(g);
    } else {
        let exit = pick_exit(dims, &entry, forced_entry.is_none(), rng);
        protected.extend(exit.corridor(EXIT_CORRIDOR));
        doors.push(exit);
    }
    protected.retain(|&c| dims.is_interior(c) && !dims.is_obstacle(c));
    for &c in &protected {
        solid.set(c, false);
    }

    let targets = target_cells(dims, &doors, goal);
    let keep = KeepOut { entry: entry.cell, doors: &doors, goal, protected: &protected };
    scan_partitions(&mut solid, &keep, &targets, rng);

    let partitions = shape_partitions(&solid, &doors, &protected);
    log::debug!(
        "maze: entry {:?} {:?}, {} partitions, goal {:?}",
        entry.cell, entry.side, partitions.len(), goal
    );
    RoomLayout { dims, partitions, doors, goal }
}
