/// Collision model for continuous-position actors.
///
/// ## Architecture
///
/// Two layers:
///   1. CELL: `rules::MapView::cell_open`. Whole-cell answers, used by
///      enemies, sight lines, and spawning.
///   2. RECT: `CollisionMap::passable`. Sub-tile answers for the player.
///      Obstacles and partitions are tested against their real cross-section
///      so an actor can stand flush against them.
///
/// ## Rect Truth Table (per overlapped cell, first match wins)
///
/// ┌──────────────────────────────┬───────────┐
/// │ Cell                          │ Result    │
/// ├──────────────────────────────┼───────────┤
/// │ Door                          │ pass      │
/// │ Bomb, id in ghost set         │ pass      │
/// │ Bomb, otherwise               │ BLOCK     │
/// │ Outside interior              │ BLOCK     │
/// │ Obstacle, rect hits inset box │ BLOCK     │
/// │ Partition, rect hits strip    │ BLOCK     │
/// │ Otherwise                     │ pass      │
/// └──────────────────────────────┴───────────┘
///
/// ## Ghosting
///
/// The ghost set is an explicit list of bomb ids carried by the mover
/// (`Player::standing_on`). A bomb id joins the set when the bomb is
/// placed and leaves once the mover's hitbox no longer overlaps its cell.
/// Nothing is inferred from position deltas.

use super::grid::{Axis, Cell, Door, Partition};
use super::rules::MapView;

/// Axis-aligned rectangle in world units.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Rect { x, y, w, h }
    }

    /// Strict overlap: touching edges do not count.
    pub fn overlaps(&self, o: &Rect) -> bool {
        self.x < o.x + o.w && self.x + self.w > o.x && self.y < o.y + o.h && self.y + self.h > o.y
    }

    /// Every cell this rect has area in.
    pub fn cells(&self, tile: f32) -> Vec<Cell> {
        let c0 = (self.x / tile).floor() as i32;
        let c1 = ((self.x + self.w) / tile).ceil() as i32 - 1;
        let r0 = (self.y / tile).floor() as i32;
        let r1 = ((self.y + self.h) / tile).ceil() as i32 - 1;
        let mut out = Vec::with_capacity(4);
        for row in r0..=r1.max(r0) {
            for col in c0..=c1.max(c0) {
                out.push(Cell::new(col, row));
            }
        }
        out
    }
}

// ══════════════════════════════════════════════════════════════
// Geometry: every size in one place, scaled from a 64-unit tile
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct Geometry {
    pub tile: f32,
    /// Multiplier against the 64-unit reference tile.
    pub scale: f32,
    pub sprite_w: f32,
    pub sprite_h: f32,
    pub hitbox_inset_x: f32,
    pub hitbox_offset_y: f32,
    pub hitbox_w: f32,
    pub hitbox_h: f32,
    pub probe_x: f32,
    pub probe_y: f32,
    pub obstacle_margin: f32,
    pub partition_thickness: f32,
    pub partition_pad: f32,
    pub player_align: f32,
    pub enemy_align: f32,
}

impl Geometry {
    pub const REFERENCE_TILE: f32 = 64.0;

    pub fn for_tile(tile: f32) -> Self {
        let k = tile / Self::REFERENCE_TILE;
        let sprite_h = 50.0 * k;
        let hitbox_h = 24.0 * k;
        Geometry {
            tile,
            scale: k,
            sprite_w: 40.0 * k,
            sprite_h,
            hitbox_inset_x: 8.0 * k,
            // Lower half of the sprite: feet, not head
            hitbox_offset_y: (sprite_h - hitbox_h) / 2.0 + 10.0 * k,
            hitbox_w: 24.0 * k,
            hitbox_h,
            probe_x: 15.0 * k,
            probe_y: 20.0 * k,
            obstacle_margin: 4.0 * k,
            partition_thickness: 14.0 * k,
            partition_pad: 4.0 * k,
            player_align: 3.0 * k,
            enemy_align: 2.5 * k,
        }
    }

    // ── Cells ──

    pub fn cell_at(&self, px: f32, py: f32) -> Cell {
        Cell::new((px / self.tile).floor() as i32, (py / self.tile).floor() as i32)
    }

    pub fn cell_rect(&self, c: Cell) -> Rect {
        Rect::new(c.col as f32 * self.tile, c.row as f32 * self.tile, self.tile, self.tile)
    }

    pub fn cell_center(&self, c: Cell) -> (f32, f32) {
        ((c.col as f32 + 0.5) * self.tile, (c.row as f32 + 0.5) * self.tile)
    }

    /// Sprite top-left that centres a sprite in `c`.
    pub fn sprite_origin(&self, c: Cell) -> (f32, f32) {
        (self.lane_x(c.col), self.lane_y(c.row))
    }

    /// Sprite x that centres a sprite in column `col`.
    pub fn lane_x(&self, col: i32) -> f32 {
        col as f32 * self.tile + (self.tile - self.sprite_w) / 2.0
    }

    /// Sprite y that centres a sprite in row `row`.
    pub fn lane_y(&self, row: i32) -> f32 {
        row as f32 * self.tile + (self.tile - self.sprite_h) / 2.0
    }

    // ── Actors (player and enemies share sprite size) ──

    pub fn sprite_center(&self, x: f32, y: f32) -> (f32, f32) {
        (x + self.sprite_w / 2.0, y + self.sprite_h / 2.0)
    }

    /// Cell the sprite centre is in.
    pub fn sprite_cell(&self, x: f32, y: f32) -> Cell {
        let (cx, cy) = self.sprite_center(x, y);
        self.cell_at(cx, cy)
    }

    pub fn hitbox(&self, x: f32, y: f32) -> Rect {
        Rect::new(x + self.hitbox_inset_x, y + self.hitbox_offset_y, self.hitbox_w, self.hitbox_h)
    }

    // ── Obstacle shapes ──

    pub fn obstacle_rect(&self, c: Cell) -> Rect {
        let m = self.obstacle_margin;
        Rect::new(
            c.col as f32 * self.tile + m,
            c.row as f32 * self.tile + m,
            self.tile - 2.0 * m,
            self.tile - 2.0 * m,
        )
    }

    pub fn partition_rect(&self, p: &Partition) -> Rect {
        let t = self.tile;
        let th = self.partition_thickness;
        let off = (t - th) / 2.0;
        let (x, y) = (p.cell.col as f32 * t, p.cell.row as f32 * t);
        match p.axis {
            Axis::Vertical => Rect::new(x + off, y, th, t),
            Axis::Horizontal => Rect::new(x, y + off - self.partition_pad, t, th + 2.0 * self.partition_pad),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Motion helpers (shared by player and enemies)
// ══════════════════════════════════════════════════════════════

/// `signum` that maps zero to zero.
pub fn sign(v: f32) -> f32 {
    if v > 0.0 { 1.0 } else if v < 0.0 { -1.0 } else { 0.0 }
}

/// Bounded correction from `pos` toward `target`.
pub fn align_step(pos: f32, target: f32, max_step: f32) -> f32 {
    let diff = target - pos;
    sign(diff) * diff.abs().min(max_step)
}

// ══════════════════════════════════════════════════════════════
// Rect collision
// ══════════════════════════════════════════════════════════════

/// Room view + doors + geometry: everything a mover collides with.
pub struct CollisionMap<'a> {
    pub view: MapView<'a>,
    pub doors: &'a [Door],
    pub geo: &'a Geometry,
}

impl<'a> CollisionMap<'a> {
    fn is_door(&self, c: Cell) -> bool {
        self.doors.iter().any(|d| d.cell == c)
    }

    /// Can a mover occupy `target`? See truth table above.
    pub fn passable(&self, target: &Rect, ghosts: &[u32]) -> bool {
        for c in target.cells(self.geo.tile) {
            if self.is_door(c) { continue; }

            if let Some(bomb) = self.view.bomb_at(c) {
                if ghosts.contains(&bomb.id) { continue; }
                return false;
            }

            let dims = self.view.dims;
            if !dims.is_interior(c) { return false; }

            if dims.is_obstacle(c) {
                if target.overlaps(&self.geo.obstacle_rect(c)) { return false; }
                continue;
            }

            if let Some(p) = self.view.partition_at(c) {
                if target.overlaps(&self.geo.partition_rect(p)) { return false; }
            }
        }
        true
    }

    /// Does `rect` have any area inside cell `c`?
    pub fn overlaps_cell(&self, rect: &Rect, c: Cell) -> bool {
        rect.overlaps(&self.geo.cell_rect(c))
    }
}
