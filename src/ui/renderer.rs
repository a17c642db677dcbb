/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into the `front` buffer
///   2. Compare each glyph with the `back` buffer (previous frame)
///   3. Only emit terminal commands for glyphs that changed
///   4. Batch everything with `queue!`, flush once
///   5. Swap front/back
///
/// Board projection: one grid cell is `CELL_W` × `CELL_H` terminal cells.
/// Actors move in continuous world units, so their sprite centre is
/// projected to the nearest terminal cell rather than snapped to the grid.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{EnemyState, SpeechBubble};
use crate::domain::grid::{Axis, Cell, DoorKind};
use crate::sim::world::{Phase, WorldState};

// ── Glyph: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Glyph {
    ch: [u8; 8],
    ch_len: u8,
    fg: Color,
    bg: Color,
    /// Occupies two terminal columns.
    wide: bool,
    /// Right half of a wide glyph; never printed.
    cont: bool,
}

impl Glyph {
    /// Explicit background for every empty cell, so gaps between rows
    /// match on terminals that paint them with the last Clear colour.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Glyph = Glyph {
        ch: [b' ', 0, 0, 0, 0, 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: Glyph::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Glyph = Glyph {
        ch: [0; 8],
        ch_len: 0,
        fg: Color::White,
        bg: Glyph::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Differs from every real glyph; forces a full repaint.
    const INVALID: Glyph = Glyph {
        ch: [b'?', 0, 0, 0, 0, 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    fn new(c: char, fg: Color, bg: Color) -> Self {
        let mut g = Self::BLANK;
        g.ch_len = c.encode_utf8(&mut g.ch).len() as u8;
        g.fg = fg;
        g.bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        g
    }

    fn wide(c: char) -> Self {
        let mut g = Self::new(c, Color::Reset, Color::Reset);
        g.wide = true;
        g
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("?")
    }
}

// ── FrameBuffer: a 2D grid of glyphs ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Glyph>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Glyph::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            *self = FrameBuffer::new(w, h);
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Glyph::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, g: Glyph) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = g;
        }
    }

    fn get(&self, x: usize, y: usize) -> Glyph {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Glyph::BLANK
        }
    }

    /// Wide glyph plus its continuation half.
    fn set_wide(&mut self, x: usize, y: usize, c: char) {
        if x + 1 < self.width {
            self.set(x, y, Glyph::wide(c));
            self.set(x + 1, y, Glyph::WIDE_CONT);
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Glyph::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Glyph::new(' ', Color::White, bg));
        }
    }

    fn put_centered(&mut self, y: usize, span: usize, s: &str, fg: Color, bg: Color) {
        let x = span.saturating_sub(s.chars().count()) / 2;
        self.put_str(x, y, s, fg, bg);
    }
}

// ── Layout ──

const CELL_W: usize = 4;
const CELL_H: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const WALL: Color = Color::Rgb { r: 120, g: 120, b: 120 };
const PILLAR: Color = Color::Rgb { r: 90, g: 90, b: 100 };
const PAPER: Color = Color::Rgb { r: 235, g: 225, b: 190 };
const HI: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const GOLD: Color = Color::Rgb { r: 255, g: 220, b: 50 };

/// Ticks the room intro banner stays up; main.rs counts against this.
pub const INTRO_TICKS: u32 = 90;

/// Terminal cell for a world-space point.
fn project(tile: f32, px: f32, py: f32) -> (usize, usize) {
    let col = (px / tile * CELL_W as f32).max(0.0) as usize;
    let row = (py / tile * CELL_H as f32).max(0.0) as usize;
    (col, MAP_ROW + row)
}

/// "●●○" style pip meter.
fn pips(filled: u32, max: u32) -> String {
    (0..max).map(|i| if i < filled { '●' } else { '○' }).collect()
}

fn fuse_color(ratio: f32) -> Color {
    if ratio < 0.25 {
        Color::Rgb { r: 255, g: 60, b: 40 }
    } else if ratio < 0.6 {
        Color::Rgb { r: 255, g: 160, b: 40 }
    } else {
        Color::Rgb { r: 200, g: 200, b: 200 }
    }
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Glyph::BASE_BG),
            Clear(ClearType::All)
        )?;
        self.sync_size()?;
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn sync_size(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
        }
        Ok(())
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        self.sync_size()?;

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Glyph::INVALID);
            queue!(self.writer, SetBackgroundColor(Glyph::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        let board_w = world.dims.cols as usize * CELL_W;
        let board_h = world.dims.rows as usize * CELL_H;
        let fits = self.term_w >= board_w && self.term_h >= MAP_ROW + board_h + 2;

        match world.phase {
            Phase::Title => self.compose_title(),
            _ if !fits => self.compose_too_small(board_w, MAP_ROW + board_h + 2),
            Phase::RoomIntro => {
                self.compose_board(world);
                self.compose_intro_banner(world);
            }
            Phase::Playing | Phase::Dying => self.compose_board(world),
            Phase::GameOver => self.compose_game_over(world),
            Phase::StageComplete => {
                self.compose_board(world);
                self.compose_stage_complete(world);
            }
        }

        if world.paused {
            self.compose_pause_overlay(world);
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed glyphs ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Glyph::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colours; ResetColor would fall back to the
        // terminal default and leave seams.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let g = self.front.get(x, y);
                let prev = self.back.get(x, y);
                if g.cont {
                    x += 1;
                    continue;
                }
                let cont_changed = g.wide && self.front.get(x + 1, y) != self.back.get(x + 1, y);
                if g == prev && !cont_changed {
                    x += 1;
                    continue;
                }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if g.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(g.fg))?;
                    last_fg = g.fg;
                }
                if g.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(g.bg))?;
                    last_bg = g.bg;
                }
                queue!(self.writer, Print(g.as_str()))?;

                let advance = if g.wide { 2 } else { 1 };
                x += advance;
                cursor_at = Some((x, y));
            }
        }

        self.writer.flush()
    }

    // ── Board ──

    fn compose_board(&mut self, w: &WorldState) {
        self.compose_hud(w);
        self.compose_terrain(w);
        self.compose_effects(w);
        self.compose_actors(w);
        self.compose_messages(w);
    }

    fn compose_hud(&mut self, w: &WorldState) {
        self.front.fill_row(HUD_ROW, HUD_BG);
        let recharge = w
            .charges
            .next_recharge_progress(w.rules.recharge_frames)
            .map(|p| format!(" +{:>3}%", (p * 100.0) as u32))
            .unwrap_or_default();
        let hud = format!(
            " Room {}/2   Bombs {}{:<6}  Enemies {}   Time {:>6.1}s   Score {}",
            w.room,
            pips(w.charges.charges, w.charges.max),
            recharge,
            w.enemies.len(),
            w.elapsed,
            w.score,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    /// Paint a whole grid cell with one glyph.
    fn fill_cell(&mut self, c: Cell, ch: char, fg: Color, bg: Color) {
        let x0 = c.col as usize * CELL_W;
        let y0 = MAP_ROW + c.row as usize * CELL_H;
        for dy in 0..CELL_H {
            for dx in 0..CELL_W {
                self.front.set(x0 + dx, y0 + dy, Glyph::new(ch, fg, bg));
            }
        }
    }

    fn compose_terrain(&mut self, w: &WorldState) {
        let dims = w.dims;
        for row in 0..dims.rows {
            for col in 0..dims.cols {
                let c = Cell::new(col, row);
                if !dims.is_interior(c) {
                    self.fill_cell(c, '▓', WALL, Color::Rgb { r: 60, g: 60, b: 60 });
                } else if dims.is_obstacle(c) {
                    self.fill_cell(c, '█', PILLAR, Color::Reset);
                }
            }
        }

        for p in &w.partitions {
            let x0 = p.cell.col as usize * CELL_W;
            let y0 = MAP_ROW + p.cell.row as usize * CELL_H;
            match p.axis {
                Axis::Vertical => {
                    for dy in 0..CELL_H {
                        self.front.set(x0 + CELL_W / 2 - 1, y0 + dy, Glyph::new('▐', PAPER, Color::Reset));
                        self.front.set(x0 + CELL_W / 2, y0 + dy, Glyph::new('▌', PAPER, Color::Reset));
                    }
                }
                Axis::Horizontal => {
                    for dx in 0..CELL_W {
                        self.front.set(x0 + dx, y0 + CELL_H / 2, Glyph::new('▀', PAPER, Color::Reset));
                    }
                }
            }
        }

        for d in &w.doors {
            let (ch, fg) = match d.kind {
                DoorKind::Entry => ('▒', Color::Rgb { r: 90, g: 160, b: 90 }),
                DoorKind::Exit => ('▒', GOLD),
            };
            self.fill_cell(d.cell, ch, fg, Color::Reset);
        }

        if let Some(goal) = w.goal {
            let (cx, cy) = w.geo.cell_center(goal);
            let (x, y) = project(w.geo.tile, cx, cy);
            let fg = if (w.anim_tick / 10) % 2 == 0 { GOLD } else { Color::Rgb { r: 255, g: 140, b: 0 } };
            self.front.set(x.saturating_sub(1), y, Glyph::new('★', fg, Color::Reset));
        }
    }

    fn compose_effects(&mut self, w: &WorldState) {
        for ash in &w.ashes {
            let shade = (60.0 + ash.life * 120.0) as u8;
            self.fill_cell(ash.cell, '░', Color::Rgb { r: shade, g: shade, b: shade }, Color::Reset);
        }

        for e in &w.explosions {
            let heat = e.life.clamp(0.0, 1.0);
            let bg = Color::Rgb { r: (120.0 + 135.0 * heat) as u8, g: (40.0 + 120.0 * heat) as u8, b: 20 };
            for &c in &e.cells {
                let ch = if c == e.origin { '✸' } else { '✹' };
                self.fill_cell(c, ch, Color::Rgb { r: 255, g: 240, b: 120 }, bg);
            }
        }

        for b in &w.bombs {
            let (cx, cy) = w.geo.cell_center(b.cell);
            let (x, y) = project(w.geo.tile, cx, cy);
            let fg = fuse_color(b.fuse_ratio());
            let blink = b.fuse_ratio() < 0.25 && (w.anim_tick / 4) % 2 == 0;
            let ch = if blink { '◉' } else { '●' };
            self.front.set(x.saturating_sub(1), y, Glyph::new(ch, fg, Color::Reset));
            let secs = (b.fuse / 60.0).ceil().max(0.0) as u32;
            self.front.put_str(x, y, &secs.to_string(), fg, Color::Reset);
        }
    }

    fn compose_actors(&mut self, w: &WorldState) {
        let tile = w.geo.tile;

        for e in &w.enemies {
            let (cx, cy) = w.geo.sprite_center(e.x, e.y);
            let (x, y) = project(tile, cx, cy);
            let ch = match e.state {
                EnemyState::Patrol if (e.frame / 12.0) as u32 % 2 == 1 => '👽',
                EnemyState::Patrol => '👾',
                EnemyState::Chase => '👹',
                EnemyState::Stunned => '💫',
            };
            self.front.set_wide(x.saturating_sub(1), y, ch);
            self.compose_bubble(x, y, e.bubble.as_ref());
        }

        for a in &w.ashes {
            if let Some(b) = &a.bubble {
                let (cx, cy) = w.geo.cell_center(a.cell);
                let (x, y) = project(tile, cx, cy);
                self.compose_bubble(x, y, Some(b));
            }
        }

        let p = &w.player;
        let (cx, cy) = w.geo.sprite_center(p.x, p.y);
        let (x, y) = project(tile, cx, cy);
        let ch = if !p.alive {
            '💀'
        } else if !p.moving {
            '🧍'
        } else if (p.frame / 8.0) as u32 % 2 == 1 {
            '🏃'
        } else {
            '🚶'
        };
        self.front.set_wide(x.saturating_sub(1), y, ch);
        self.compose_bubble(x, y, p.bubble.as_ref());
    }

    /// Speech bubble centred one row above the actor.
    fn compose_bubble(&mut self, x: usize, y: usize, bubble: Option<&SpeechBubble>) {
        let Some(b) = bubble else { return };
        if y <= MAP_ROW { return; }
        let text = format!(" {} ", b.text);
        let len = text.chars().count();
        let left = x.saturating_sub(len / 2);
        // Last quarter of its life: greyed out
        let bg = if b.timer < b.max * 0.25 {
            Color::Rgb { r: 150, g: 150, b: 150 }
        } else {
            Color::Rgb { r: 240, g: 240, b: 240 }
        };
        self.front.put_str(left, y - 1, &text, Color::Black, bg);
    }

    fn compose_messages(&mut self, w: &WorldState) {
        let map_bottom = MAP_ROW + w.dims.rows as usize * CELL_H;
        if !w.message.is_empty() && map_bottom < self.front.height {
            self.front.fill_row(map_bottom, MSG_BG);
            self.front.put_str(0, map_bottom, &format!(" ◈ {} ", w.message), Color::Black, MSG_BG);
        }
        let help_row = map_bottom + 1;
        if help_row < self.front.height {
            let help = " ←→↑↓/WASD Move  Space/Z Bomb  R Restart  F1 Pause  Esc Title";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    // ── Overlays and static screens ──

    fn compose_intro_banner(&mut self, w: &WorldState) {
        let span = w.dims.cols as usize * CELL_W;
        let mid = MAP_ROW + w.dims.rows as usize * CELL_H / 2;
        let dark = Color::Rgb { r: 10, g: 10, b: 30 };
        for y in mid - 1..=mid + 1 {
            for x in span / 4..span - span / 4 {
                self.front.set(x, y, Glyph::new(' ', Color::White, dark));
            }
        }
        let title = if w.goal.is_some() { "FINAL ROOM: reach the ★" } else { "ROOM 1: find the exit" };
        self.front.put_centered(mid - 1, span, title, GOLD, dark);
        let left = INTRO_TICKS.saturating_sub(w.anim_tick) / 30 + 1;
        self.front.put_centered(mid + 1, span, &format!("▸▸▸ {left} ◂◂◂"), HI, dark);
    }

    fn compose_title(&mut self) {
        let title = [
            r"  ___  _               _    __  __               ",
            r" | _ )| | __ _  ___ | |_ |  \/  | __ _  ___ ___ ",
            r" | _ \| |/ _` |(_-< |  _|| |\/| |/ _` ||_ // -_)",
            r" |___/|_|\__,_|/__/  \__||_|  |_|\__,_|/__|\___|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, GOLD, Color::Reset);
        }
        self.front.put_str(8, 7, "◈◈  two rooms, paper walls, short fuses  ◈◈", HI, Color::Reset);

        self.front.put_str(8, 10, "ENTER   Start", HI, Color::Reset);
        self.front.put_str(8, 11, "  Q     Quit", Color::White, Color::Reset);

        let help = [
            "Controls",
            "  ←→↑↓ / WASD    Move",
            "  Space / Z      Drop bomb (2 charges, 3s recharge)",
            "  R Restart room   F1 Pause   Esc Title",
            "",
            "Blasts break paper partitions and burn enemies.",
            "Enemies near a blast are stunned and harmless.",
            "Walk off a fresh bomb before it goes off.",
        ];
        for (i, line) in help.iter().enumerate() {
            let fg = if i == 0 { GOLD } else { Color::White };
            self.front.put_str(8, 14 + i, line, fg, Color::Reset);
        }
    }

    fn compose_too_small(&mut self, need_w: usize, need_h: usize) {
        let msg = format!("Terminal too small: need {need_w}×{need_h}, have {}×{}", self.term_w, self.term_h);
        self.front.put_str(0, 0, &msg, GOLD, Color::Reset);
    }

    fn compose_game_over(&mut self, w: &WorldState) {
        let red = Color::Rgb { r: 255, g: 60, b: 60 };
        let box_art = [
            "╔══════════════════════════════╗",
            "║        ✕  BLOWN  UP  ✕       ║",
            "╚══════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(6, 4 + i, l, red, Color::Reset);
        }
        self.front.put_str(8, 9, &format!("◈ Room reached: {}", w.room), Color::White, Color::Reset);
        self.front.put_str(8, 10, &format!("◈ Time: {:.1}s", w.elapsed), Color::White, Color::Reset);
        self.front.put_str(8, 12, "▸ ENTER: Retry this room", HI, Color::Reset);
        self.front.put_str(8, 13, "▸ ESC:   Back to Title", Color::DarkGrey, Color::Reset);
    }

    fn compose_stage_complete(&mut self, w: &WorldState) {
        let span = w.dims.cols as usize * CELL_W;
        let mid = MAP_ROW + w.dims.rows as usize * CELL_H / 2;
        let dark = Color::Rgb { r: 10, g: 30, b: 10 };
        for y in mid - 2..=mid + 2 {
            for x in span / 6..span - span / 6 {
                self.front.set(x, y, Glyph::new(' ', Color::White, dark));
            }
        }
        self.front.put_centered(mid - 2, span, "★ STAGE COMPLETE ★", GOLD, dark);
        self.front.put_centered(mid, span, &format!("Score {}   Time {:.1}s", w.score, w.elapsed), Color::White, dark);
        self.front.put_centered(mid + 2, span, "ENTER play again   ESC title", HI, dark);
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let blink = (w.anim_tick / 8) % 2 == 0;
        let span = w.dims.cols as usize * CELL_W;
        let box_w = 32.min(span);
        let box_x = span.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + 4;

        for y in box_y..box_y + 8 {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Glyph::new(' ', Color::Reset, dim));
            }
        }
        let label = if blink { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_str(box_x + (box_w - 12) / 2, box_y + 1, label, GOLD, dim);
        let key = Color::Rgb { r: 100, g: 200, b: 255 };
        self.front.put_str(box_x + 3, box_y + 3, "F1 / P   Resume", key, dim);
        self.front.put_str(box_x + 3, box_y + 4, "R        Restart room", key, dim);
        self.front.put_str(box_x + 3, box_y + 5, "Esc      Back to title", key, dim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_scales_cells() {
        assert_eq!(project(64.0, 0.0, 0.0), (0, MAP_ROW));
        // Centre of cell (1,1)
        assert_eq!(project(64.0, 96.0, 96.0), (6, MAP_ROW + 3));
        assert_eq!(project(64.0, -5.0, -5.0), (0, MAP_ROW));
    }

    #[test]
    fn pip_meter() {
        assert_eq!(pips(1, 2), "●○");
        assert_eq!(pips(0, 3), "○○○");
    }

    #[test]
    fn glyphs_diff_by_colour() {
        let a = Glyph::new('x', Color::White, Color::Reset);
        let b = Glyph::new('x', Color::Red, Color::Reset);
        assert!(a != b);
        assert_eq!(a.bg, Glyph::BASE_BG);
        assert_eq!(Glyph::wide('👾').as_str(), "👾");
    }
}
